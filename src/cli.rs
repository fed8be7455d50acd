//! Command-line interface module for filetidy.
//!
//! Parses arguments, loads configuration, and dispatches to the sorter and
//! renamer held by a [`Session`]. Results are printed as a colored summary or,
//! with `--json`, as the raw report.

use crate::config::AppConfig;
use crate::numbering::NumberingMode;
use crate::output::OutputFormatter;
use crate::renamer::{MassRenameOptions, Renamer};
use crate::report::OperationReport;
use crate::sorter::{FileSorter, SortOptions};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "filetidy", version)]
#[command(about = "Sort files into category folders and batch-rename them, with undo")]
pub struct Cli {
    /// Increase verbosity (-v=DEBUG, -vv=TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Configuration file (TOML)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Also write log lines to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Print the operation report as JSON instead of a summary
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Represents a CLI command to execute.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Sort a folder's top-level files and folders into category folders
    Sort(SortArgs),
    /// Rename files with sequential or scrambled numbers
    Rename(RenameArgs),
    /// Clean up music file names
    Music(MusicArgs),
    /// Replace a keyword in file names
    Keyword(KeywordArgs),
    /// Undo operations recorded in this session
    Undo {
        #[arg(long, value_enum, default_value_t = UndoTarget::All)]
        target: UndoTarget,
    },
}

#[derive(Debug, Clone, Args)]
pub struct SortArgs {
    #[arg(long, default_value = ".")]
    pub source: PathBuf,
    #[arg(long, default_value = "sorted")]
    pub dest: PathBuf,
    #[arg(long)]
    pub dry_run: bool,
    /// Only group similar titles; do not classify the rest
    #[arg(long)]
    pub series: bool,
    /// Group folders only, never single files
    #[arg(long)]
    pub no_group_files: bool,
    /// Classification worker count (overrides config)
    #[arg(long)]
    pub workers: Option<usize>,
}

#[derive(Debug, Clone, Args)]
pub struct RenameArgs {
    #[arg(long, default_value = ".")]
    pub source: PathBuf,
    /// Extension to rename; "*" renames every file and keeps its extension
    #[arg(long, default_value = "*")]
    pub extension: String,
    #[arg(long, default_value = "")]
    pub prefix: String,
    #[arg(long, default_value_t = 1)]
    pub start: u64,
    /// Zero-pad numbers to this many digits
    #[arg(long, default_value_t = 0)]
    pub padding: usize,
    #[arg(long)]
    pub dry_run: bool,
    /// Use random distinct numbers instead of counting up
    #[arg(long)]
    pub scramble: bool,
    /// Random range is file count times this
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..=10))]
    pub multiplier: u32,
    #[arg(long)]
    pub preserve_timestamps: bool,
}

#[derive(Debug, Clone, Args)]
pub struct MusicArgs {
    #[arg(long, default_value = ".")]
    pub source: PathBuf,
    #[arg(long, value_delimiter = ',', default_value = "mp3")]
    pub extensions: Vec<String>,
    #[arg(long)]
    pub dry_run: bool,
    #[arg(long)]
    pub preserve_timestamps: bool,
}

#[derive(Debug, Clone, Args)]
pub struct KeywordArgs {
    #[arg(long, default_value = ".")]
    pub source: PathBuf,
    #[arg(long)]
    pub extension: String,
    #[arg(long)]
    pub keyword: String,
    #[arg(long, default_value = "")]
    pub replacement: String,
    #[arg(long)]
    pub dry_run: bool,
    #[arg(long)]
    pub preserve_timestamps: bool,
}

/// Which history `undo` replays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum UndoTarget {
    Sort,
    Rename,
    All,
}

/// A sorter and a renamer with their own in-memory histories.
pub struct Session {
    pub sorter: FileSorter,
    pub renamer: Renamer,
    last_sort_dest: Option<PathBuf>,
}

impl Session {
    pub fn new(sorter: FileSorter) -> Self {
        Self {
            sorter,
            renamer: Renamer::new(),
            last_sort_dest: None,
        }
    }

    /// Builds a session from configuration.
    pub fn from_config(config: &AppConfig) -> Result<Self, String> {
        let sorter = FileSorter::from_config(config)
            .map_err(|e| format!("Error compiling filters: {}", e))?;
        Ok(Self::new(sorter))
    }

    /// Runs one command and returns its report, if it produces one.
    pub fn execute(&mut self, command: &Command, config: &AppConfig) -> Option<OperationReport> {
        match command {
            Command::Sort(args) => {
                let options = SortOptions::default()
                    .dry_run(args.dry_run)
                    .series_mode(args.series)
                    .group_files(config.sorter.group_files && !args.no_group_files);
                self.last_sort_dest = Some(args.dest.clone());
                Some(self.sorter.sort_directory(&args.source, &args.dest, options))
            }
            Command::Rename(args) => {
                let numbering = if args.scramble {
                    NumberingMode::Scramble {
                        multiplier: args.multiplier,
                    }
                } else {
                    NumberingMode::Sequential { start: args.start }
                };
                let options = MassRenameOptions {
                    extension: Some(args.extension.clone()),
                    prefix: args.prefix.clone(),
                    numbering,
                    zero_padding: args.padding,
                    preserve_timestamps: args.preserve_timestamps,
                    dry_run: args.dry_run,
                };
                Some(self.renamer.mass_rename(&args.source, &options))
            }
            Command::Music(args) => Some(self.renamer.rename_music(
                &args.source,
                &args.extensions,
                args.dry_run,
                args.preserve_timestamps,
            )),
            Command::Keyword(args) => Some(self.renamer.rename_by_keyword(
                &args.source,
                &args.extension,
                &args.keyword,
                &args.replacement,
                args.preserve_timestamps,
                args.dry_run,
            )),
            Command::Undo { target } => {
                self.undo(*target);
                None
            }
        }
    }

    /// Replays the chosen histories and prints what happened.
    pub fn undo(&self, target: UndoTarget) {
        if matches!(target, UndoTarget::Sort | UndoTarget::All) {
            match &self.last_sort_dest {
                Some(dest) => {
                    let (report, pruned) = self.sorter.undo_and_prune(dest);
                    OutputFormatter::undo_summary("sort", &report);
                    if pruned > 0 {
                        info!(pruned, "removed empty destination folders");
                    }
                }
                None => OutputFormatter::undo_summary("sort", &self.sorter.undo()),
            }
        }
        if matches!(target, UndoTarget::Rename | UndoTarget::All) {
            OutputFormatter::undo_summary("rename", &self.renamer.undo());
        }
    }
}

/// Runs the CLI application.
///
/// History lives only in memory, so `undo` in a fresh process has nothing to
/// replay; library users keep a [`Session`] around instead.
///
/// # Examples
///
/// ```no_run
/// use clap::Parser;
/// use filetidy::cli::{run_cli, Cli};
///
/// let cli = Cli::parse_from(["filetidy", "sort", "--source", "Downloads", "--dest", "Sorted", "--dry-run"]);
/// if let Err(e) = run_cli(&cli) {
///     eprintln!("Error: {}", e);
/// }
/// ```
pub fn run_cli(cli: &Cli) -> Result<(), String> {
    let mut config = AppConfig::load(cli.config.as_deref())
        .map_err(|e| format!("Error loading configuration: {}", e))?;
    if let Command::Sort(args) = &cli.command
        && let Some(workers) = args.workers
    {
        config.sorter.workers = workers;
    }

    let mut session = Session::from_config(&config)?;
    if let Some(report) = session.execute(&cli.command, &config) {
        print_report(&report, cli.json)?;
    }
    Ok(())
}

fn print_report(report: &OperationReport, json: bool) -> Result<(), String> {
    if json {
        let text = serde_json::to_string_pretty(report)
            .map_err(|e| format!("Error serializing report: {}", e))?;
        println!("{}", text);
    } else {
        OutputFormatter::operation_summary(report);
    }
    Ok(())
}

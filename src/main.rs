use clap::Parser;
use filetidy::cli::{Cli, run_cli};
use filetidy::logging::init_logger;
use filetidy::output::OutputFormatter;

fn main() {
    let cli = Cli::parse();
    let _guard = init_logger(cli.verbose, cli.log_file.as_deref());

    if let Err(e) = run_cli(&cli) {
        OutputFormatter::error(&e);
        std::process::exit(1);
    }
}

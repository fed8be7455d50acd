//! filetidy - sort a messy folder into category folders and batch-rename files
//!
//! This library classifies files and folders by extension, groups items that
//! share a normalized title (episodes of one series, volumes of one set),
//! moves everything collision-safely into a destination tree, renames files
//! with sequential or scrambled numbers, and undoes both kinds of operation
//! from an in-memory history.

pub mod cli;
pub mod config;
pub mod file_category;
pub mod file_organizer;
pub mod grouping;
pub mod logging;
pub mod numbering;
pub mod output;
pub mod renamer;
pub mod report;
pub mod sorter;
pub mod title;
pub mod undo;

pub use config::{AppConfig, CompiledFilters, ConfigError, SorterSettings};
pub use file_category::{Category, CategoryRule, CategoryRules, Classifier};
pub use file_organizer::{FileOrganizer, OperationHistory, OperationRecord, OrganizeError};
pub use numbering::{NumberingError, NumberingMode};
pub use renamer::{MassRenameOptions, Renamer};
pub use report::{ItemOutcome, OperationReport};
pub use sorter::{FileSorter, SortOptions};
pub use title::extract_title;
pub use undo::{UndoManager, UndoReport};

pub use cli::{Cli, Command, Session, run_cli};

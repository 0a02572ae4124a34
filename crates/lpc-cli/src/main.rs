use std::path::PathBuf;

use clap::Parser;
use clap_verbosity_flag::{Verbosity, WarnLevel};

mod commands;
mod error;
mod utils;

use commands::check::handle_check;
use commands::complete::handle_complete;
use commands::definition::handle_definition;
use commands::folding::handle_folding;
use commands::symbols::handle_symbols;

#[derive(Parser, Debug)]
#[command(name = "lpcls")]
#[command(about = "Semantic checks and editor queries for LPC mudlibs", long_about = None)]
struct Args {
    /// Mudlib root (defaults to the nearest directory holding lpc.toml)
    #[arg(short, long, global = true, value_name = "DIR")]
    root: Option<PathBuf>,

    #[command(flatten)]
    verbose: Verbosity<WarnLevel>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Report diagnostics for source files
    Check {
        /// Files to check (every source file under the root when omitted)
        #[arg(value_name = "FILE")]
        files: Vec<PathBuf>,
        /// Also print warnings and hints
        #[arg(short, long)]
        warnings: bool,
    },

    /// List the top-level symbols of a file
    Symbols {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Include symbols reachable through includes and inherits
        #[arg(short, long)]
        deps: bool,
    },

    /// Completion candidates at a position
    Complete {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// 1-based line
        line: u32,
        /// 0-based column
        column: u32,
    },

    /// Declarations the identifier at a position refers to
    Definition {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// 1-based line
        line: u32,
        /// 0-based column
        column: u32,
        /// Only search the file's own symbols
        #[arg(short, long)]
        local: bool,
    },

    /// Foldable line ranges of a file
    Folding {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}

fn main() -> miette::Result<()> {
    let args = Args::parse();
    env_logger::Builder::new()
        .filter_level(args.verbose.log_level_filter())
        .init();

    let root = args.root;
    match args.command {
        Command::Check { files, warnings } => handle_check(root, files, warnings)?,
        Command::Symbols { file, deps } => handle_symbols(root, file, deps)?,
        Command::Complete { file, line, column } => handle_complete(root, file, line, column)?,
        Command::Definition {
            file,
            line,
            column,
            local,
        } => handle_definition(root, file, line, column, local)?,
        Command::Folding { file } => handle_folding(root, file)?,
    }
    Ok(())
}

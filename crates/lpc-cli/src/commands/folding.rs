use std::path::PathBuf;

use crate::error::CliError;
use crate::utils::open_unit;

pub fn handle_folding(root: Option<PathBuf>, file: PathBuf) -> Result<(), CliError> {
    let (ws, unit) = open_unit(root, &file)?;
    for range in ws.folding_ranges(unit) {
        println!("{}-{}\t{:?}", range.start_line, range.end_line, range.kind);
    }
    Ok(())
}

use std::path::PathBuf;

use futures::executor::block_on;
use lpc_source::Position;

use crate::error::CliError;
use crate::utils::{check_position, open_unit};

pub fn handle_complete(root: Option<PathBuf>, file: PathBuf, line: u32, column: u32) -> Result<(), CliError> {
    let (mut ws, unit) = open_unit(root, &file)?;
    let pos = check_position(&ws, unit, Position::new(line, column))?;
    // Arrow members are only known once the unit is analysed.
    ws.analyze(unit);
    for candidate in block_on(ws.completion_candidates(unit, pos)) {
        match candidate.detail {
            Some(detail) => println!("{}\t{:?}\t{}", candidate.label, candidate.kind, detail),
            None => println!("{}\t{:?}", candidate.label, candidate.kind),
        }
    }
    Ok(())
}

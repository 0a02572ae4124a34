use std::path::PathBuf;

use lpc_source::Position;

use crate::error::CliError;
use crate::utils::{check_position, open_unit};

pub fn handle_definition(
    root: Option<PathBuf>,
    file: PathBuf,
    line: u32,
    column: u32,
    local: bool,
) -> Result<(), CliError> {
    let (mut ws, unit) = open_unit(root, &file)?;
    let pos = check_position(&ws, unit, Position::new(line, column))?;
    let found = ws.symbol_at_position(unit, pos, local);
    if found.is_empty() {
        log::info!("nothing defined at {line}:{column}");
    }
    for definition in found {
        let location = match &definition.path {
            Some(path) => path.display().to_string(),
            None => "<builtin>".to_string(),
        };
        println!(
            "{}\t{:?}\t{}:{}:{}",
            definition.name,
            definition.kind,
            location,
            definition.range.start.line,
            definition.range.start.column
        );
    }
    Ok(())
}

use std::path::PathBuf;

use crate::error::CliError;
use crate::utils::open_unit;

pub fn handle_symbols(root: Option<PathBuf>, file: PathBuf, deps: bool) -> Result<(), CliError> {
    let (ws, unit) = open_unit(root, &file)?;
    for symbol_ref in ws.list_top_level_symbols(unit, deps) {
        let Some(symbol) = ws.symbol(symbol_ref) else {
            continue;
        };
        let origin = match ws.table_path(symbol_ref.table) {
            Some(path) => path.display().to_string(),
            None => "<builtin>".to_string(),
        };
        println!(
            "{}:{}\t{:?}\t{}\t{}",
            symbol.name_range.start.line,
            symbol.name_range.start.column,
            symbol.kind(),
            symbol.name,
            origin
        );
    }
    Ok(())
}

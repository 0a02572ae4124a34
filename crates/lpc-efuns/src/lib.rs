//! Builtin symbol tables shared by every source unit.
//!
//! Two tables are always attached as dependencies of a unit's table:
//! the efun table, collected from an embedded prototype header, and the
//! global table holding predefined macros, the `[defines]` of `lpc.toml`
//! and the functions of the configured simul-efun file.

use std::fs;

use lpc_source::WorkspaceConfig;
use lpc_symbols::{collect, CollectOptions, SymbolData, SymbolId, SymbolKind, SymbolTable, TableId};
use lpc_syntax::parse_source;

macro_rules! load_builtin_files {
    ($($name:ident),*) => {
        $(
            pub(super) const $name: (&str, &str) = (concat!(stringify!($name), ".h"), include_str!(concat!(stringify!($name), ".h")));
        )*
    };
}

#[allow(non_upper_case_globals)]
mod files {
    load_builtin_files!(efuns, predefined);
}

/// Table of driver efuns. Every function is tagged [`SymbolKind::Efun`].
pub fn efun_table() -> SymbolTable {
    let mut table = SymbolTable::new(TableId::EFUNS, false);
    let (name, text) = files::efuns;
    merge_source(&mut table, name, text, &CollectOptions::builtin(), |_| true);
    log::debug!("loaded {} efuns", table.top_level().len());
    table
}

/// Table of predefined macros, configured defines and simul-efuns.
///
/// Later sources never override earlier ones: a configured define that
/// repeats a predefined macro is logged and dropped.
pub fn global_table(config: &WorkspaceConfig) -> SymbolTable {
    let mut table = SymbolTable::new(TableId::GLOBAL, false);

    let (name, text) = files::predefined;
    merge_source(&mut table, name, text, &CollectOptions::default(), |_| true);

    if !config.defines.is_empty() {
        let defines: String = config
            .defines
            .iter()
            .map(|(name, value)| format!("#define {name} {value}\n"))
            .collect();
        merge_source(
            &mut table,
            WorkspaceConfig::FILE_NAME,
            &defines,
            &CollectOptions::default(),
            |_| true,
        );
    }

    if let Some(path) = &config.simul_efun {
        match fs::read_to_string(path) {
            Ok(text) => {
                let name = path.display().to_string();
                merge_source(&mut table, &name, &text, &CollectOptions::builtin(), |kind| {
                    kind == SymbolKind::Efun
                });
            }
            Err(err) => log::warn!("could not read simul-efun file {}: {err}", path.display()),
        }
    }

    table
}

/// Parse `text` into a scratch table and copy the accepted top-level
/// symbols (with their children) into `target`. Tree node ids are dropped
/// because the scratch tree does not outlive this call.
fn merge_source(
    target: &mut SymbolTable,
    name: &str,
    text: &str,
    options: &CollectOptions,
    accept: impl Fn(SymbolKind) -> bool,
) {
    let output = parse_source(text);
    for error in &output.errors {
        log::warn!("{name}: {error}");
    }
    let mut scratch = SymbolTable::new(target.id(), true);
    collect(&output.tree, &mut scratch, options);

    for &id in scratch.top_level() {
        let symbol = scratch.symbol(id);
        if !accept(symbol.kind()) || symbol.has_modifier("private") || symbol.has_modifier("static") {
            continue;
        }
        copy_symbol(&scratch, id, target, None, name);
    }
}

fn copy_symbol(
    source: &SymbolTable,
    id: SymbolId,
    target: &mut SymbolTable,
    parent: Option<SymbolId>,
    origin: &str,
) {
    let symbol = source.symbol(id);
    let mut data = SymbolData::new(symbol.name.clone(), symbol.kind(), symbol.range)
        .with_type(symbol.type_name.clone())
        .with_name_range(symbol.name_range)
        .with_modifiers(symbol.modifiers.clone());
    if let Some(value) = &symbol.value {
        data = data.with_value(value.clone());
    }
    match target.add_symbol(parent, data) {
        Ok(copied) => {
            for &child in source.children(id) {
                copy_symbol(source, child, target, Some(copied), origin);
            }
        }
        Err(err) => log::warn!("{origin}: {err}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_efuns_are_tagged_and_unique() {
        let table = efun_table();
        assert_eq!(table.id(), TableId::EFUNS);
        assert!(!table.allow_duplicates());
        assert!(table.top_level().len() > 100);
        for &id in table.top_level() {
            assert_eq!(table.symbol(id).kind(), SymbolKind::Efun);
        }
    }

    #[test]
    fn test_efun_parameters_are_kept() {
        let table = efun_table();
        let id = table.lookup_local("clone_object")[0];
        let params: Vec<&str> = table
            .children(id)
            .iter()
            .map(|c| table.symbol(*c))
            .filter(|s| s.kind() == SymbolKind::Parameter)
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(params, vec!["name", "args"]);
        assert_eq!(table.symbol(id).type_name.as_deref(), Some("object"));
    }

    #[test]
    fn test_predefined_macros() {
        let table = global_table(&WorkspaceConfig::new("/mud"));
        let id = table.lookup_local("__LPC__")[0];
        assert_eq!(table.symbol(id).kind(), SymbolKind::Define);
        assert_eq!(table.symbol(id).value.as_deref(), Some("1"));
        assert_eq!(table.lookup_local("MUDLIB").len(), 1);
    }

    #[test]
    fn test_configured_define_cannot_shadow_predefined() {
        let mut config = WorkspaceConfig::new("/mud");
        config.defines = vec![
            ("__LPC__".to_string(), "2".to_string()),
            ("__HOST_NAME__".to_string(), "\"localhost\"".to_string()),
        ];
        let table = global_table(&config);
        let lpc = table.lookup_local("__LPC__");
        assert_eq!(lpc.len(), 1);
        assert_eq!(table.symbol(lpc[0]).value.as_deref(), Some("1"));
        let host = table.lookup_local("__HOST_NAME__")[0];
        assert_eq!(table.symbol(host).value.as_deref(), Some("\"localhost\""));
    }
}

use std::fs;

use lpc_efuns::{efun_table, global_table};
use lpc_source::WorkspaceConfig;
use lpc_symbols::{SymbolKind, TableId};

#[test]
fn test_simul_efuns_join_global_table() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("secure")).unwrap();
    fs::write(
        dir.path().join("secure/simul_efun.c"),
        "#include <globals.h>\n\
         int secure_tell(object ob, string msg) { return 1; }\n\
         private void helper() { }\n\
         string *query_wizards();\n\
         int counter;\n",
    )
    .unwrap();
    fs::write(dir.path().join("lpc.toml"), "[workspace]\nsimul-efun = \"secure/simul_efun.c\"\n").unwrap();

    let config = WorkspaceConfig::load(dir.path()).unwrap();
    let table = global_table(&config);
    assert_eq!(table.id(), TableId::GLOBAL);

    let tell = table.lookup_local("secure_tell");
    assert_eq!(tell.len(), 1);
    assert_eq!(table.symbol(tell[0]).kind(), SymbolKind::Efun);
    assert_eq!(table.lookup_local("query_wizards").len(), 1);
    assert!(table.lookup_local("helper").is_empty());
    assert!(table.lookup_local("counter").is_empty());
    assert!(table.lookup_local("globals.h").is_empty());
}

#[test]
fn test_missing_simul_efun_file_is_not_fatal() {
    let mut config = WorkspaceConfig::new("/nonexistent-mudlib");
    config.simul_efun = Some("/nonexistent-mudlib/secure/simul_efun.c".into());
    let table = global_table(&config);
    assert!(!table.lookup_local("__LPC__").is_empty());
}

#[test]
fn test_builtin_tables_have_no_dependencies() {
    assert_eq!(efun_table().dependencies().count(), 0);
    assert_eq!(global_table(&WorkspaceConfig::new("/mud")).dependencies().count(), 0);
}

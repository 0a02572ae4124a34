mod common;

use common::{messages, warnings, Mudlib};
use lpc_analysis::UnitState;

#[test]
fn test_include_makes_symbols_mutually_visible() {
    let lib = Mudlib::new(&[
        ("room/common.h", "int shared_count;\nint helper() { return 1; }\n"),
        (
            "room/start.c",
            "#include \"common.h\"\nvoid create() { shared_count = helper(); }\n",
        ),
    ]);
    let mut ws = lib.workspace();
    let start = lib.open(&mut ws, "room/start.c");
    let common = ws.unit_id(&lib.path("room/common.h")).unwrap();

    assert!(messages(&mut ws, start).is_empty());
    let helper = ws.resolve_symbol(start, "helper").unwrap();
    assert_eq!(helper.table, common.table_id());
    // The included file sees its includer too.
    let create = ws.resolve_symbol(common, "create").unwrap();
    assert_eq!(create.table, start.table_id());
}

#[test]
fn test_reference_is_registered_once() {
    let lib = Mudlib::new(&[
        ("a.h", "int a_value;\n"),
        ("b.c", "#include \"a.h\"\n"),
    ]);
    let mut ws = lib.workspace();
    let b = lib.open(&mut ws, "b.c");
    let a = ws.unit_id(&lib.path("a.h")).unwrap();

    assert_eq!(ws.references(b), vec![a]);
    assert!(!ws.add_as_reference_to(a, b, true));
    assert_eq!(ws.references(b), vec![a]);
}

#[test]
fn test_reparse_is_idempotent_and_resets_analysis() {
    let lib = Mudlib::new(&[
        ("lib.h", "int helper() { return 1; }\n"),
        ("room.c", "#include \"lib.h\"\nvoid create() { helper(); }\n"),
    ]);
    let mut ws = lib.workspace();
    let room = lib.open(&mut ws, "room.c");
    assert!(messages(&mut ws, room).is_empty());
    assert_eq!(ws.unit(room).state(), UnitState::Analyzed);
    assert_eq!(ws.reference_count(room, "helper"), 1);

    ws.parse(room);
    assert_eq!(ws.unit(room).state(), UnitState::Parsed);
    assert!(messages(&mut ws, room).is_empty());
    assert_eq!(ws.unit(room).state(), UnitState::Analyzed);
    // Counts are recomputed, not accumulated.
    assert_eq!(ws.reference_count(room, "helper"), 1);
    assert_eq!(ws.references(room).len(), 1);
}

#[test]
fn test_new_text_is_only_seen_after_parse() {
    let lib = Mudlib::new(&[("room.c", "void create() { }\n")]);
    let mut ws = lib.workspace();
    let room = lib.open(&mut ws, "room.c");
    assert!(messages(&mut ws, room).is_empty());

    ws.set_text(room, "void create() { nope = 1; }\n");
    assert!(messages(&mut ws, room).is_empty());

    ws.parse(room);
    assert_eq!(messages(&mut ws, room), vec!["undefined variable `nope`"]);
}

#[test]
fn test_unresolved_include_is_a_warning() {
    let lib = Mudlib::new(&[("room.c", "#include \"nope.h\"\nvoid create() { }\n")]);
    let mut ws = lib.workspace();
    let room = lib.open(&mut ws, "room.c");
    assert_eq!(warnings(&mut ws, room), vec!["could not resolve include nope.h"]);
}

#[test]
fn test_quoted_and_bracketed_include_search_order() {
    let lib = Mudlib::new(&[
        ("lpc.toml", "[workspace]\ninclude = [\"include\"]\n"),
        ("include/room.h", "int global_marker;\n"),
        ("room/room.h", "int local_marker;\n"),
        ("room/quoted.c", "#include \"room.h\"\n"),
        ("room/bracketed.c", "#include <room.h>\n"),
    ]);
    let mut ws = lib.workspace();
    let quoted = lib.open(&mut ws, "room/quoted.c");
    let bracketed = lib.open(&mut ws, "room/bracketed.c");

    let local = ws.unit_id(&lib.path("room/room.h")).unwrap();
    let global = ws.unit_id(&lib.path("include/room.h")).unwrap();
    assert_eq!(ws.references(quoted), vec![local]);
    assert_eq!(ws.references(bracketed), vec![global]);
    assert!(ws.resolve_symbol(quoted, "local_marker").is_some());
    assert!(ws.resolve_symbol(bracketed, "global_marker").is_some());
}

#[test]
fn test_inherit_with_implied_extension() {
    let lib = Mudlib::new(&[
        ("std/base.c", "void create() { }\nint query_level() { return 1; }\n"),
        (
            "room/start.c",
            "inherit \"/std/base\";\nvoid create() { ::create(); query_level(); }\n",
        ),
    ]);
    let mut ws = lib.workspace();
    let start = lib.open(&mut ws, "room/start.c");
    let base = ws.unit_id(&lib.path("std/base.c")).unwrap();

    assert!(messages(&mut ws, start).is_empty(), "{:?}", messages(&mut ws, start));
    assert_eq!(ws.references(start), vec![base]);
}

#[test]
fn test_reference_count_is_transitive() {
    let lib = Mudlib::new(&[
        ("c.h", "int weight;\n"),
        ("b.h", "#include \"c.h\"\nint query_weight() { return weight; }\n"),
        ("a.c", "#include \"b.h\"\nvoid create() { weight = 3; }\n"),
    ]);
    let mut ws = lib.workspace();
    let a = lib.open(&mut ws, "a.c");
    let b = ws.unit_id(&lib.path("b.h")).unwrap();
    let c = ws.unit_id(&lib.path("c.h")).unwrap();

    assert_eq!(ws.reference_count(c, "weight"), 0);
    assert_eq!(ws.reference_count(b, "weight"), 1);
    assert_eq!(ws.reference_count(a, "weight"), 2);
}

#[test]
fn test_mutual_inclusion_is_tolerated() {
    let lib = Mudlib::new(&[
        ("a.h", "#include \"b.h\"\nint from_a;\n"),
        ("b.h", "#include \"a.h\"\nint from_b;\n"),
        ("room.c", "#include \"a.h\"\nvoid create() { from_a = from_b; }\n"),
    ]);
    let mut ws = lib.workspace();
    let room = lib.open(&mut ws, "room.c");
    let a = ws.unit_id(&lib.path("a.h")).unwrap();
    let b = ws.unit_id(&lib.path("b.h")).unwrap();

    assert!(messages(&mut ws, room).is_empty());
    assert_eq!(ws.references(a), vec![b]);
    assert_eq!(ws.references(b), vec![a]);
    assert_eq!(ws.reference_count(room, "from_b"), 1);
}

#[test]
fn test_redeclarations_are_errors() {
    let lib = Mudlib::new(&[(
        "room.c",
        "void reset();\nvoid reset() { }\nvoid reset() { }\nint level;\nint level;\n",
    )]);
    let mut ws = lib.workspace();
    let room = lib.open(&mut ws, "room.c");
    assert_eq!(
        messages(&mut ws, room),
        vec!["redeclaration of function `reset`", "redeclaration of variable `level`"]
    );
}

#[test]
fn test_catch_is_an_expression_not_a_call() {
    let lib = Mudlib::new(&[(
        "room.c",
        "void create() {\n  mixed e = catch(write(\"x\"));\n  e = catch { write(\"y\"); };\n}\n",
    )]);
    let mut ws = lib.workspace();
    let room = lib.open(&mut ws, "room.c");
    assert!(messages(&mut ws, room).is_empty(), "{:?}", messages(&mut ws, room));
    assert_eq!(ws.reference_count(room, "e"), 1);
}

#[test]
fn test_open_outside_root_is_refused() {
    let lib = Mudlib::new(&[("room.c", "void create() { }\n")]);
    let other = Mudlib::new(&[("elsewhere.c", "void create() { }\n")]);
    let mut ws = lib.workspace();
    assert!(ws.open(&other.path("elsewhere.c")).is_err());
}

mod common;

use common::{messages, warnings, Mudlib};
use lpc_analysis::{ArrowResolution, UnitId, Workspace};
use lpc_syntax::RuleKind;

/// Resolutions of every arrow expression in the unit, in source order.
fn arrows(ws: &mut Workspace, unit: UnitId) -> Vec<ArrowResolution> {
    ws.analyze(unit);
    let tree = ws.unit(unit).tree().unwrap();
    tree.descendants(tree.root())
        .into_iter()
        .filter(|node| tree.kind(*node) == RuleKind::ArrowExpr)
        .filter_map(|node| ws.unit(unit).arrow_resolution(node).cloned())
        .collect()
}

#[test]
fn test_call_other_into_defined_method() {
    let lib = Mudlib::new(&[
        ("obj.c", "int foo() { return 1; }\n"),
        ("room.c", "void create() { \"obj.c\"->foo(); }\n"),
    ]);
    let mut ws = lib.workspace();
    let room = lib.open(&mut ws, "room.c");

    assert!(messages(&mut ws, room).is_empty());
    let obj = ws.unit_id(&lib.path("obj.c")).unwrap();
    let resolved = arrows(&mut ws, room);
    let [ArrowResolution::RemoteCall { object, function: Some(function) }] = resolved.as_slice() else {
        panic!("unexpected resolution {resolved:?}");
    };
    assert_eq!(*object, obj);
    assert_eq!(ws.symbol(*function).map(|s| s.name.as_str()), Some("foo"));
    // Call-others do not merge symbol tables.
    assert_eq!(ws.references(room), vec![obj]);
    assert!(ws.resolve_symbol(room, "foo").is_none());
}

#[test]
fn test_call_other_into_missing_file() {
    let lib = Mudlib::new(&[("room.c", "void create() { \"missing.c\"->foo(); }\n")]);
    let mut ws = lib.workspace();
    let room = lib.open(&mut ws, "room.c");

    assert_eq!(messages(&mut ws, room), vec!["could not load source: missing.c"]);
    assert_eq!(warnings(&mut ws, room).len(), 1);
    assert_eq!(arrows(&mut ws, room), vec![ArrowResolution::Unresolved]);
}

#[test]
fn test_missing_method_name_is_reported_once() {
    let lib = Mudlib::new(&[("room.c", "void create() {\n  object ob;\n  ob->;\n}\n")]);
    let mut ws = lib.workspace();
    let room = lib.open(&mut ws, "room.c");

    let found = messages(&mut ws, room);
    let missing = found.iter().filter(|m| *m == "missing method name").count();
    assert_eq!(missing, 1, "{found:?}");
    assert!(!found.iter().any(|m| m.contains("parentheses")));
    assert!(ws.references(room).is_empty());
}

#[test]
fn test_undefined_remote_method_is_a_warning() {
    let lib = Mudlib::new(&[
        ("obj.c", "int foo() { return 1; }\n"),
        ("room.c", "void create() { \"/obj\"->bar(); }\n"),
    ]);
    let mut ws = lib.workspace();
    let room = lib.open(&mut ws, "room.c");
    assert_eq!(
        warnings(&mut ws, room),
        vec!["function `bar` may be undefined in /obj.c"]
    );
}

#[test]
fn test_object_flows_through_variables_and_calls() {
    let lib = Mudlib::new(&[
        ("std/torch.c", "void light() { }\n"),
        (
            "room.c",
            "#define TORCH \"/std/torch\"\n\
             object make() { return clone_object(TORCH); }\n\
             void create() {\n\
             \x20 object ob = make();\n\
             \x20 ob->light();\n\
             \x20 string path = \"/std/\" + \"torch\";\n\
             \x20 path->light();\n\
             }\n",
        ),
    ]);
    let mut ws = lib.workspace();
    let room = lib.open(&mut ws, "room.c");
    assert!(messages(&mut ws, room).is_empty(), "{:?}", messages(&mut ws, room));
    // Loaded by the analysis above.
    let torch = ws.unit_id(&lib.path("std/torch.c"));
    assert!(torch.is_some());
    let resolved = arrows(&mut ws, room);
    assert_eq!(resolved.len(), 2);
    for resolution in resolved {
        assert_eq!(resolution.object(), torch);
        assert!(resolution.function().is_some());
    }
}

#[test]
fn test_struct_member_access() {
    let lib = Mudlib::new(&[(
        "room.c",
        "struct point { int x; int y; };\n\
         void create() {\n\
         \x20 struct point p;\n\
         \x20 p->x;\n\
         \x20 p->y();\n\
         }\n",
    )]);
    let mut ws = lib.workspace();
    let room = lib.open(&mut ws, "room.c");

    assert_eq!(
        messages(&mut ws, room),
        vec!["cannot call methods on struct members"]
    );
    assert_eq!(
        arrows(&mut ws, room),
        vec![
            ArrowResolution::StructAccess { member: Some("x".into()) },
            ArrowResolution::StructAccess { member: Some("y".into()) },
        ]
    );
}

#[test]
fn test_computed_method_name() {
    let lib = Mudlib::new(&[
        ("obj.c", "int query_short() { return 1; }\n"),
        (
            "room.c",
            "void create() { \"/obj\"->(\"query_\" + \"short\")(); }\n",
        ),
    ]);
    let mut ws = lib.workspace();
    let room = lib.open(&mut ws, "room.c");

    assert!(messages(&mut ws, room).is_empty());
    let resolved = arrows(&mut ws, room);
    let function = resolved[0].function().unwrap();
    assert_eq!(ws.symbol(function).unwrap().name, "query_short");
}

#[test]
fn test_recursive_calls_terminate() {
    let lib = Mudlib::new(&[(
        "room.c",
        "object a() { return b(); }\n\
         object b() { return a(); }\n\
         void create() { a()->foo(); }\n",
    )]);
    let mut ws = lib.workspace();
    let room = lib.open(&mut ws, "room.c");
    assert!(messages(&mut ws, room).is_empty());
    assert_eq!(arrows(&mut ws, room), vec![ArrowResolution::Unresolved]);
}

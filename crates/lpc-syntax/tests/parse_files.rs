use lpc_source::Position;
use lpc_syntax::{collect_candidates, parse_source, PredictionMode, RuleKind, TokenKind};

const ROOM: &str = r#"#include <room.h>
#define LIGHT_SOURCE "/obj/torch"

inherit ROOM_BASE;

private mapping exits = ([ "north": "/d/town/square" ]);
object torch;

void create() {
    ::create();
    set_short("A dark cellar");
    torch = clone_object(LIGHT_SOURCE);
    torch->light(1);
    foreach (string dir, string dest in exits) {
        add_exit(dir, dest);
    }
}

int query_light() {
    return torch ? torch->query_light() : 0;
}
"#;

#[test]
fn test_room_file_parses_cleanly() {
    let output = parse_source(ROOM);
    assert!(output.errors.is_empty(), "{:?}", output.errors);
    assert_eq!(output.mode, PredictionMode::Fast);

    let tree = &output.tree;
    let top: Vec<RuleKind> = tree.child_nodes(tree.root()).map(|n| tree.kind(n)).collect();
    assert_eq!(
        top,
        vec![
            RuleKind::IncludeDirective,
            RuleKind::DefineDirective,
            RuleKind::InheritDecl,
            RuleKind::VariableDecl,
            RuleKind::VariableDecl,
            RuleKind::FunctionDef,
            RuleKind::FunctionDef,
        ]
    );

    let arrows = tree
        .descendants(tree.root())
        .into_iter()
        .filter(|n| tree.kind(*n) == RuleKind::ArrowExpr)
        .count();
    assert_eq!(arrows, 2);
}

#[test]
fn test_node_at_finds_innermost_rule() {
    let output = parse_source(ROOM);
    let tree = &output.tree;
    // `light` in `torch->light(1);` on line 13.
    let node = tree.node_at(Position::new(13, 13));
    assert_eq!(tree.kind(node), RuleKind::MemberName);
    assert_eq!(tree.kind(tree.parent(node).unwrap()), RuleKind::ArrowExpr);
}

#[test]
fn test_every_token_has_an_owner() {
    let output = parse_source("void f() { if (x { y = ; } }\nint z;\n");
    let tree = &output.tree;
    assert!(output.has_errors());
    for idx in 0..tree.tokens().len() {
        assert!(tree.token_parent(idx).is_some(), "token {idx} is orphaned");
    }
}

#[test]
fn test_candidates_inside_argument_list() {
    let output = parse_source("void f() { write(); }");
    let tokens = output.tree.tokens();
    let caret = tokens
        .iter()
        .position(|t| t.kind == TokenKind::RParen && t.range.start.column > 16)
        .unwrap();
    let candidates = collect_candidates(tokens, caret);
    assert!(candidates.has_rule(RuleKind::ArgList));
    assert!(candidates.tokens.contains(&TokenKind::ArrayOpen));
}

//! End-to-end tests through the public entry points

use cxxfront::frontend::ast::{BinOp, Decl, DirectiveKind, Expr, Literal, Stmt, TemplateArg, Type};
use cxxfront::frontend::lexer::Lexer;
use cxxfront::frontend::preprocessor::DiagnosticKind;
use cxxfront::frontend::symbols::ContainerKind;
use cxxfront::frontend::token::{NumericValue, TokenKind};
use cxxfront::{parse_source, parse_with_defines, Error, TranslationUnit};
use pretty_assertions::assert_eq;

fn parse_ok(source: &str) -> TranslationUnit {
    match parse_source(source) {
        Ok(unit) => unit,
        Err(err) => panic!("parse failed: {}", err),
    }
}

fn variable_names(decls: &[Decl]) -> Vec<String> {
    decls
        .iter()
        .filter_map(|decl| match decl {
            Decl::Variable(var) => Some(var.declarators[0].name.name.clone()),
            _ => None,
        })
        .collect()
}

#[test]
fn test_program_with_conditionals_and_containers() {
    let source = r#"
#include <map>
#define LIMIT 100
#ifndef SKIP_HELPERS
int helper(int n) { return n * 2; }
#else
int broken( {
#endif

map<string, int> counts;

int main() {
    vector<int> values = {1, 2, 3};
    int total = 0;
    for (auto& v : values) {
        total += helper(v);
    }
    counts["total"] = total;
    return total > LIMIT ? 1 : 0;
}
"#;
    let unit = parse_ok(source);
    assert!(unit.diagnostics.is_empty());

    let directive_kinds: Vec<DirectiveKind> = unit
        .program
        .decls
        .iter()
        .filter_map(|decl| match decl {
            Decl::Directive(d) => Some(d.kind),
            _ => None,
        })
        .collect();
    assert_eq!(
        directive_kinds,
        vec![
            DirectiveKind::Include,
            DirectiveKind::Define,
            DirectiveKind::Ifndef,
            DirectiveKind::Else,
            DirectiveKind::Endif,
        ]
    );

    let functions: Vec<&str> = unit
        .program
        .decls
        .iter()
        .filter_map(|decl| match decl {
            Decl::Function(f) => Some(f.name.name.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(functions, vec!["helper", "main"]);
    assert_eq!(variable_names(&unit.program.decls), vec!["counts"]);

    assert_eq!(unit.symbols.container_of("counts"), Some(ContainerKind::Map));
    assert!(unit.symbols.container_of("counts").map_or(false, |k| k.is_associative()));
    assert_eq!(unit.symbols.container_of("values"), Some(ContainerKind::Vector));
    assert_eq!(unit.symbols.container_of("total"), None);
}

#[test]
fn test_defines_select_branch() {
    let source = "#ifdef FAST\nint mode = 1;\n#else\nint mode = 2;\n#endif\nint level = LEVEL;";

    let unit = match parse_with_defines(source, [("FAST", "1"), ("LEVEL", "7")]) {
        Ok(unit) => unit,
        Err(err) => panic!("parse failed: {}", err),
    };
    let inits: Vec<String> = unit
        .program
        .decls
        .iter()
        .filter_map(|decl| match decl {
            Decl::Variable(var) => var.declarators[0].init.as_ref(),
            _ => None,
        })
        .map(|init| match init {
            Expr::Literal(Literal::Int(value, _)) => value.to_string(),
            Expr::Ident(ident) => ident.name.clone(),
            other => format!("{:?}", other),
        })
        .collect();
    assert_eq!(inits, vec!["1", "7"]);

    let unit = parse_ok(source);
    assert_eq!(variable_names(&unit.program.decls), vec!["mode", "level"]);
    let mode = unit.program.decls.iter().find_map(|decl| match decl {
        Decl::Variable(var) if var.declarators[0].name.name == "mode" => var.declarators[0].init.as_ref(),
        _ => None,
    });
    assert!(
        matches!(mode, Some(Expr::Literal(Literal::Int(2, _)))),
        "expected the #else branch, got {:?}",
        mode
    );
}

#[test]
fn test_ifdef_region_and_depth() {
    for defined in [false, true] {
        let mut source = String::new();
        if defined {
            source.push_str("#define NAME\n");
        }
        source.push_str("a\n#ifdef NAME\nb c\n#endif\nd");

        let mut lexer = Lexer::new(&source);
        let texts: Vec<String> = lexer
            .tokenize()
            .into_iter()
            .filter(|t| t.kind == TokenKind::Ident)
            .map(|t| t.text)
            .collect();
        let expected = if defined { vec!["a", "b", "c", "d"] } else { vec!["a", "d"] };
        assert_eq!(texts, expected);
        assert_eq!(lexer.preprocessor().depth(), 0);
    }
}

#[test]
fn test_macro_replacement_is_not_rescanned() {
    let tokens = Lexer::new("#define A B\n#define B 3\nA B").tokenize();
    let texts: Vec<&str> = tokens
        .iter()
        .filter(|t| t.kind == TokenKind::Ident)
        .map(|t| t.text.as_str())
        .collect();
    assert_eq!(texts, vec!["B", "3"]);
}

#[test]
fn test_numeric_literals_keep_their_text() {
    let tokens = Lexer::new("42 3.14").tokenize();
    assert_eq!(tokens[0].kind, TokenKind::IntLit);
    assert_eq!(tokens[0].text, "42");
    assert_eq!(tokens[0].value, Some(NumericValue::Int(42)));
    assert_eq!(tokens[1].kind, TokenKind::FloatLit);
    assert_eq!(tokens[1].text, "3.14");
    assert_eq!(tokens[1].value, Some(NumericValue::Float(3.14)));
    assert_eq!(tokens[2].kind, TokenKind::Eof);
}

#[test]
fn test_malformed_if_is_a_warning() {
    let unit = parse_ok("#if (1 +\nint hidden = 1;\n#endif\nint shown = 2;");
    assert_eq!(variable_names(&unit.program.decls), vec!["shown"]);
    assert_eq!(unit.diagnostics.len(), 1);
    assert_eq!(unit.diagnostics[0].kind, DiagnosticKind::MalformedCondition);
}

#[test]
fn test_unmatched_endif_is_a_warning() {
    let unit = parse_ok("#endif\nint x = 1;");
    assert_eq!(variable_names(&unit.program.decls), vec!["x"]);
    assert_eq!(unit.diagnostics[0].kind, DiagnosticKind::UnmatchedEndif);
}

#[test]
fn test_precedence_through_public_api() {
    let unit = parse_ok("int x = 1 + 2 * 3;");
    let Decl::Variable(var) = &unit.program.decls[0] else {
        panic!("expected variable");
    };
    match &var.declarators[0].init {
        Some(Expr::Binary { op: BinOp::Add, right, .. }) => {
            assert!(matches!(right.as_ref(), Expr::Binary { op: BinOp::Mul, .. }));
        }
        other => panic!("expected sum, got {:?}", other),
    }
}

#[test]
fn test_nested_template_argument() {
    let unit = parse_ok("map<string, vector<int>> m;");
    let Decl::Variable(var) = &unit.program.decls[0] else {
        panic!("expected variable");
    };
    match &var.declarators[0].ty {
        Type::Template { args, .. } => {
            assert!(matches!(&args[1], TemplateArg::Type(Type::Template { base, .. }) if base == "vector"));
        }
        other => panic!("expected template, got {:?}", other),
    }
}

#[test]
fn test_parse_error_reports_position() {
    let err = match parse_source("int main() {\n    return 0\n}") {
        Err(err) => err,
        Ok(_) => panic!("expected a parse error"),
    };
    match &err {
        Error::UnexpectedToken { expected, got, span } => {
            assert_eq!(expected, "`;`");
            assert_eq!(got, "`}`");
            assert_eq!((span.line, span.column), (3, 1));
        }
        other => panic!("expected unexpected-token error, got {:?}", other),
    }
    assert_eq!(err.to_string(), "3:1: expected `;`, found `}`");
    assert_eq!((err.span().line, err.span().column), (3, 1));
}

#[test]
fn test_deeply_nested_if_is_a_warning() {
    let depth = 100_000;
    let source = format!(
        "#if {}1{}\nint a;\n#endif\nint b;",
        "(".repeat(depth),
        ")".repeat(depth)
    );
    let unit = parse_ok(&source);
    assert_eq!(variable_names(&unit.program.decls), vec!["b"]);
    assert_eq!(unit.diagnostics.len(), 1);
    assert_eq!(unit.diagnostics[0].kind, DiagnosticKind::MalformedCondition);
}

#[test]
fn test_disabled_region_hides_lexical_errors() {
    let unit = parse_ok("#if 0\nchar c = 'unterminated\n@@@\n#endif\nint ok = 1;");
    assert_eq!(variable_names(&unit.program.decls), vec!["ok"]);
}

#[test]
fn test_independent_units() {
    let first = parse_ok("#define N 1\nint a = N;");
    let second = parse_ok("int b = N;");
    let init = |unit: &TranslationUnit| match &unit.program.decls.last() {
        Some(Decl::Variable(var)) => match &var.declarators[0].init {
            Some(Expr::Ident(ident)) => ident.name.clone(),
            other => format!("{:?}", other),
        },
        other => format!("{:?}", other),
    };
    assert_eq!(init(&first), "1");
    assert_eq!(init(&second), "N");
}

#[test]
fn test_tree_serializes_to_json() {
    let unit = parse_ok("int f() { return 1; }");
    let json = match serde_json::to_value(&unit) {
        Ok(json) => json,
        Err(err) => panic!("serialize failed: {}", err),
    };
    assert!(json["program"]["decls"][0]["Function"].is_object());
    assert!(matches!(
        &unit.program.decls[0],
        Decl::Function(f) if matches!(f.body.as_ref().map(|b| &b.stmts[..]), Some([Stmt::Return { .. }]))
    ));
}

//! Surface syntax

use sdl::interpreter::{Expr, Interpreter, Literal, Stmt, TypeTag, parse_program};
use sdl::outcome::Duration;
use sdl::runtime::InterpreterConfig;
use sdl::runtime::error::SdlError;
use sdl::runtime::registry::ComponentCatalog;

fn let_literal(src: &str) -> Literal {
    let program = parse_program(src).expect("parse");
    match program.statements().next() {
        Some(Stmt::Let(binding)) => binding
            .value
            .as_literal()
            .cloned()
            .expect("literal binding"),
        other => panic!("expected let, got {:?}", other),
    }
}

#[test]
fn comments_and_separators_are_optional() {
    let program = parse_program(
        "// storage tier\n\
         instance d: Disk { ProfileName = \"HDD\" } // trailing\n\
         d.Read()\n\
         d.Write();",
    )
    .unwrap();
    assert_eq!(program.statements().count(), 3);
    assert_eq!(program.components().count(), 0);
}

#[test]
fn literal_forms() {
    assert_eq!(let_literal("let x = -2.5;"), Literal::Float(-2.5));
    assert_eq!(let_literal("let x = 42"), Literal::Int(42));
    assert_eq!(let_literal("let x = false"), Literal::Bool(false));
    assert_eq!(
        let_literal(r#"let x = "say \"hi\"\n";"#),
        Literal::String("say \"hi\"\n".into())
    );
    assert_eq!(let_literal("let x = 100ns"), Literal::Duration(Duration::nanos(100.0)));
    assert_eq!(let_literal("let x = 5us"), Literal::Duration(Duration::micros(5.0)));
    assert_eq!(let_literal("let x = 2s"), Literal::Duration(Duration::seconds(2.0)));
}

#[test]
fn chained_calls_nest_receivers() {
    let program = parse_program("a.B().C(1)").unwrap();
    let Some(Stmt::Expr(Expr::Call(outer))) = program.statements().next() else {
        panic!("expected call");
    };
    assert_eq!(outer.method, "C");
    let Expr::Call(inner) = outer.receiver.as_ref() else {
        panic!("receiver should be a call");
    };
    assert_eq!(inner.method, "B");
    assert!(matches!(inner.receiver.as_ref(), Expr::Identifier { name, .. } if name == "a"));
}

#[test]
fn component_declarations_are_collected() {
    let program = parse_program(
        "instance s: Store {}\n\
         component Store {\n\
             param Shards: int = 4\n\
             param Ratio: float\n\
             method Get(key: string, ttl: duration) { }\n\
         }",
    )
    .unwrap();
    let decl = program.components().next().expect("component");
    assert_eq!(decl.params.len(), 2);
    assert_eq!(decl.param("Ratio").map(|p| p.ty), Some(TypeTag::Float));
    let method = decl.method("Get").expect("method");
    let types: Vec<TypeTag> = method.params.iter().map(|p| p.ty).collect();
    assert_eq!(types, vec![TypeTag::String, TypeTag::Duration]);
    assert!(method.body.is_empty());
}

#[test]
fn syntax_errors_name_the_problem() {
    let err = parse_program("component A { method M() { component B { } } }").unwrap_err();
    assert!(err.message.contains("must be top level"));

    let err = parse_program("component A { param P: number; }").unwrap_err();
    assert!(err.message.contains("unknown type: number"));

    let err = parse_program("let s = \"open").unwrap_err();
    assert!(err.message.contains("unterminated string literal"));
}

#[test]
fn driver_reports_syntax_errors() {
    let mut interpreter =
        Interpreter::with_registry(ComponentCatalog::new().snapshot(), InterpreterConfig::default());
    let env = sdl::Environment::new();
    let err = interpreter.run_source("d.Read(", &env).unwrap_err();
    assert!(matches!(err, SdlError::Syntax(_)));
    assert!(err.to_string().starts_with("syntax error at 1:"));
    assert!(env.is_empty());
}

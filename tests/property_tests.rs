//! Property-based tests: the front end never panics, parsing is
//! deterministic, and pretty-printed output reparses to the same tree.

use proptest::prelude::*;

use librac::pretty::pretty_print;

// Strategy: simple arithmetic over literals and a bound variable.
fn arb_expr() -> impl Strategy<Value = String> {
    let leaf = prop_oneof![
        (0..1000i32).prop_map(|n| n.to_string()),
        (0..100i32).prop_map(|n| format!("{n}.5")),
        Just("x".to_string()),
    ];
    leaf.prop_recursive(3, 16, 3, |inner| {
        (
            inner.clone(),
            prop_oneof![Just("+"), Just("-"), Just("*"), Just("/")],
            inner,
        )
            .prop_map(|(a, op, b)| format!("({a} {op} {b})"))
    })
}

fn arb_function() -> impl Strategy<Value = String> {
    (1..100u32, arb_expr()).prop_map(|(n, expr)| {
        format!("fn test{n}(x: f32): f32 {{ return {expr} }}")
    })
}

fn arb_struct() -> impl Strategy<Value = String> {
    (1..100u32, 1..4usize).prop_map(|(n, fields)| {
        let fields: Vec<String> = (0..fields).map(|i| format!("f{i}: i32")).collect();
        format!("struct Test{n} {{ {} }}", fields.join(", "))
    })
}

fn arb_program() -> impl Strategy<Value = String> {
    prop_oneof![
        arb_function(),
        arb_struct(),
        arb_expr().prop_map(|e| format!("let x = 1.0\nlet y = {e}")),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn lexer_never_panics(src in "\\PC*") {
        let mut diagnostics = librac::DiagnosticManager::new();
        diagnostics.add_file("fuzz.lb", &src);
        let _ = librac::lexer::lex(&src, 0, &mut diagnostics);
    }

    #[test]
    fn parser_never_panics(src in "\\PC*") {
        let _ = librac::parse_source("fuzz", &src);
    }

    #[test]
    fn front_end_never_panics_on_token_soup(src in "[a-z0-9+\\-*/(){}\\[\\],.:;|!?=<> \n\"]*") {
        let _ = librac::check_source("fuzz", &src);
    }

    #[test]
    fn parsing_is_deterministic(src in arb_program()) {
        let (first, first_diags) = librac::parse_source("gen", &src);
        let (second, second_diags) = librac::parse_source("gen", &src);
        prop_assert_eq!(first, second);
        prop_assert_eq!(first_diags.diagnostics.len(), second_diags.diagnostics.len());
    }

    #[test]
    fn pretty_output_reparses_to_same_tree(src in arb_program()) {
        let (program, diagnostics) = librac::parse_source("gen", &src);
        prop_assume!(!diagnostics.has_errors());

        let printed = pretty_print(&program);
        let (reparsed, rediags) = librac::parse_source("gen", &printed);
        prop_assert_eq!(rediags.error_count(), 0, "pretty output failed to parse: {}", printed);
        prop_assert_eq!(pretty_print(&reparsed), printed);
    }

    #[test]
    fn type_checking_is_idempotent(src in arb_program()) {
        let (first_ir, first) = librac::check_source("gen", &src);
        let (second_ir, second) = librac::check_source("gen", &src);
        let first_msgs: Vec<String> = first.diagnostics.iter().map(|d| d.message.clone()).collect();
        let second_msgs: Vec<String> = second.diagnostics.iter().map(|d| d.message.clone()).collect();
        prop_assert_eq!(first_msgs, second_msgs);
        prop_assert_eq!(first_ir, second_ir);
    }
}

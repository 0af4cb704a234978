//! Shared helpers for the integration tests.
#![allow(dead_code)]

use librac::diagnostics::DiagnosticManager;
use librac::modules::ModuleManager;
use librac::parser::ast;
use librac::typeck::{self, ir};

pub fn parse(src: &str) -> (ast::Program, DiagnosticManager) {
    librac::parse_source("test", src)
}

pub fn check(src: &str) -> (Option<ir::Program>, DiagnosticManager) {
    librac::check_source("test", src)
}

/// Type check a source expected to be clean, returning its IR.
pub fn check_ok(src: &str) -> ir::Program {
    let (program, diagnostics) = check(src);
    assert_eq!(
        diagnostics.error_count(),
        0,
        "expected no errors for {src:?}, got {:?}",
        diagnostics.diagnostics
    );
    program.expect("expected typed IR")
}

/// Type check a source expected to fail, asserting some error mentions the
/// given fragment.
pub fn check_fail_with(src: &str, fragment: &str) {
    let (_, diagnostics) = check(src);
    assert!(
        diagnostics.has_errors(),
        "expected errors containing {fragment:?} for {src:?}"
    );
    assert!(
        diagnostics
            .diagnostics
            .iter()
            .any(|d| d.message.contains(fragment)),
        "no diagnostic contains {fragment:?}: {:?}",
        diagnostics.diagnostics
    );
}

/// Build a two-module world: `lib` first, then `main` importing it. Returns
/// the diagnostics from checking the whole graph.
pub fn check_modules(lib: &str, main: &str) -> DiagnosticManager {
    let mut diagnostics = DiagnosticManager::new();
    let mut manager = ModuleManager::new();
    manager.add_source("lib", lib, &mut diagnostics);
    let main_id = manager.add_source("main", main, &mut diagnostics);
    manager.entry = main_id;
    typeck::type_check(&mut manager, &mut diagnostics);
    diagnostics
}

pub fn modules_ok(lib: &str, main: &str) {
    let diagnostics = check_modules(lib, main);
    assert_eq!(
        diagnostics.error_count(),
        0,
        "expected no errors, got {:?}",
        diagnostics.diagnostics
    );
}

pub fn modules_fail_with(lib: &str, main: &str, fragment: &str) {
    let diagnostics = check_modules(lib, main);
    assert!(
        diagnostics
            .diagnostics
            .iter()
            .any(|d| d.message.contains(fragment)),
        "no diagnostic contains {fragment:?}: {:?}",
        diagnostics.diagnostics
    );
}

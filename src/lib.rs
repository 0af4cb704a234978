pub mod diagnostics;
pub mod lexer;
pub mod modules;
pub mod parser;
pub mod pretty;
pub mod span;
pub mod typeck;

pub use diagnostics::{CompileError, Diagnostic, DiagnosticManager, Severity};

use modules::ModuleManager;
use std::path::Path;
use typeck::ir;

/// Lex and parse a single in-memory source.
pub fn parse_source(name: &str, source: &str) -> (parser::ast::Program, DiagnosticManager) {
    let mut diagnostics = DiagnosticManager::new();
    let file_id = diagnostics.add_file(format!("{name}.lb"), source);
    let tokens = lexer::lex(source, file_id, &mut diagnostics);
    let program = parser::parse(&tokens, &mut diagnostics);
    (program, diagnostics)
}

/// Run the full front end over a single in-memory source: lex, parse, type
/// check. Returns the module's typed IR and every diagnostic produced; the
/// caller decides what to do with a non-zero error count.
pub fn check_source(name: &str, source: &str) -> (Option<ir::Program>, DiagnosticManager) {
    let mut diagnostics = DiagnosticManager::new();
    let mut manager = ModuleManager::from_source(name, source, &mut diagnostics);
    let entry = manager.entry;
    let mut programs = typeck::type_check(&mut manager, &mut diagnostics);
    (programs.remove(&entry), diagnostics)
}

/// Run the full front end from a file path, resolving imports against
/// sibling files and directories.
pub fn check_file(path: &Path) -> Result<(Option<ir::Program>, DiagnosticManager), CompileError> {
    let mut diagnostics = DiagnosticManager::new();
    let mut manager = ModuleManager::load(path, &mut diagnostics)?;
    let entry = manager.entry;
    let mut programs = typeck::type_check(&mut manager, &mut diagnostics);
    Ok((programs.remove(&entry), diagnostics))
}

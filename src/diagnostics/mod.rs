use crate::lexer::token::{Token, TokenKind};
use crate::span::Span;
use std::path::PathBuf;
use thiserror::Error;

/// Error produced while driving the pipeline: anything that prevents us from
/// even producing diagnostics for a file. User-facing syntax and type
/// problems never take this path; they go through the [`DiagnosticManager`].
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("could not read '{path}': {message}")]
    Io { path: PathBuf, message: String },

    #[error("cannot find module '{name}': no '{name}.lb' file or '{name}/' directory")]
    ModuleNotFound { name: String, span: Span },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Info => write!(f, "info"),
        }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub span: Span,
}

/// Append-only store of diagnostics, shared by every compilation phase.
///
/// Also owns the registry of source files so spans can be rendered back to
/// file/line/column without threading source text through every phase.
#[derive(Debug, Default)]
pub struct DiagnosticManager {
    pub diagnostics: Vec<Diagnostic>,
    files: Vec<(String, String)>,
}

impl DiagnosticManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a source file, returning the file id to use in spans.
    pub fn add_file(&mut self, name: impl Into<String>, source: impl Into<String>) -> u32 {
        let id = self.files.len() as u32;
        self.files.push((name.into(), source.into()));
        id
    }

    pub fn file_name(&self, file_id: u32) -> &str {
        self.files
            .get(file_id as usize)
            .map(|(name, _)| name.as_str())
            .unwrap_or("<unknown>")
    }

    pub fn file_source(&self, file_id: u32) -> &str {
        self.files
            .get(file_id as usize)
            .map(|(_, source)| source.as_str())
            .unwrap_or("")
    }

    fn error(&mut self, message: String, span: Span) {
        self.diagnostics.push(Diagnostic { severity: Severity::Error, message, span });
    }

    fn info(&mut self, message: String, span: Span) {
        self.diagnostics.push(Diagnostic { severity: Severity::Info, message, span });
    }

    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.severity == Severity::Error).count()
    }

    // Lexer diagnostics

    pub fn report_invalid_character(&mut self, span: Span, char: char) {
        self.error(format!("Invalid character: {char:?}"), span);
    }

    pub fn report_unterminated_string(&mut self, span: Span) {
        self.error("Unterminated string".to_string(), span);
    }

    pub fn report_invalid_escape_sequence(&mut self, span: Span, char: char) {
        self.error(format!("Invalid escape sequence: '\\{char}'"), span);
    }

    pub fn report_number_ends_with_separator(&mut self, span: Span) {
        self.error("Numbers cannot end with numeric separators".to_string(), span);
    }

    // Parser diagnostics

    pub fn report_expected_expression(&mut self, found: &Token) {
        self.error(format!("Expected expression, found {}", describe(found)), found.span);
    }

    pub fn report_expected_type(&mut self, found: &Token) {
        self.error(format!("Expected type, found {}", describe(found)), found.span);
    }

    pub fn report_expected_newline(&mut self, found: &Token) {
        self.error(
            format!("Expected newline after statement, found {}", describe(found)),
            found.span,
        );
    }

    pub fn report_expected_token(&mut self, expected: TokenKind, found: &Token) {
        self.error(format!("Expected {expected}, found {}", describe(found)), found.span);
    }

    pub fn report_expected_keyword(&mut self, keyword: &str, found: &Token) {
        self.error(format!("Expected {keyword:?} keyword, found {}", describe(found)), found.span);
    }

    pub fn report_keyword_overwritten(&mut self, keyword: &str, span: Span, declared: Span) {
        self.error(
            format!("Expected {keyword:?} keyword, but it has been overwritten by a variable"),
            span,
        );
        self.info("Try removing or renaming this variable".to_string(), declared);
    }

    pub fn report_else_without_if(&mut self, span: Span) {
        self.error("Else statement not allowed without preceding if".to_string(), span);
    }

    pub fn report_double_export(&mut self, span: Span) {
        self.error("Cannot double-export a statement".to_string(), span);
    }

    pub fn report_cannot_export(&mut self, span: Span) {
        self.error("Cannot export this kind of statement".to_string(), span);
    }

    pub fn report_integer_out_of_range(&mut self, span: Span) {
        self.error("Integer literal out of range".to_string(), span);
    }

    /// Parser-specific messages that have no dedicated reporter.
    pub fn report_syntax(&mut self, message: impl Into<String>, span: Span) {
        self.error(message.into(), span);
    }

    // Type checker diagnostics

    pub fn report_type_error(&mut self, message: String, span: Span) {
        self.error(message, span);
    }

    /// Render one diagnostic as the plain single-line format:
    /// `file:line:column: severity: message`.
    pub fn render_line(&self, diagnostic: &Diagnostic) -> String {
        format!(
            "{}:{}:{}: {}: {}",
            self.file_name(diagnostic.span.file_id),
            diagnostic.span.line,
            diagnostic.span.column,
            diagnostic.severity,
            diagnostic.message,
        )
    }

    /// Print every diagnostic in the plain single-line format.
    pub fn print_all(&self, out: &mut impl std::io::Write) -> std::io::Result<()> {
        for diagnostic in &self.diagnostics {
            writeln!(out, "{}", self.render_line(diagnostic))?;
        }
        Ok(())
    }

    /// Render every diagnostic with ariadne for underlined terminal output.
    pub fn eprint_pretty(&self) {
        use ariadne::{Label, Report, ReportKind, Source};

        for diagnostic in &self.diagnostics {
            let kind = match diagnostic.severity {
                Severity::Error => ReportKind::Error,
                Severity::Info => ReportKind::Advice,
            };
            let source = self.file_source(diagnostic.span.file_id);
            let _ = Report::build(kind, (), diagnostic.span.start)
                .with_message(&diagnostic.message)
                .with_label(
                    Label::new(diagnostic.span.start..diagnostic.span.end.max(diagnostic.span.start + 1))
                        .with_message(&diagnostic.message),
                )
                .finish()
                .eprint(Source::from(source));
        }
    }
}

fn describe(token: &Token) -> String {
    match token.kind {
        TokenKind::Identifier => format!("{:?}", token.lexeme),
        TokenKind::Eof => "end of file".to_string(),
        _ if token.lexeme.is_empty() => token.kind.to_string(),
        _ => format!("{:?}", token.lexeme),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_line_format() {
        let mut manager = DiagnosticManager::new();
        manager.add_file("main.lb", "let x = @");
        manager.report_invalid_character(Span::with_file(8, 9, 1, 9, 0), '@');

        let line = manager.render_line(&manager.diagnostics[0]);
        assert_eq!(line, "main.lb:1:9: error: Invalid character: '@'");
    }

    #[test]
    fn error_count_ignores_infos() {
        let mut manager = DiagnosticManager::new();
        manager.add_file("main.lb", "");
        manager.report_keyword_overwritten("if", Span::dummy(), Span::dummy());
        assert_eq!(manager.diagnostics.len(), 2);
        assert_eq!(manager.error_count(), 1);
    }
}

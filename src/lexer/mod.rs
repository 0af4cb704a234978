pub mod token;
pub use token::is_keyword;

use logos::Logos;

use crate::diagnostics::DiagnosticManager;
use crate::span::Span;
use token::{Token, TokenKind};

/// Raw scanner output. Newlines and block comments survive to this level so
/// the fold pass below can turn them into `leading_newline` flags.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r]+")]
#[logos(skip r"//[^\n]*")]
enum RawToken {
    #[token("\n")]
    Newline,

    #[regex(r"/\*([^*]|\*+[^*/])*\*+/")]
    BlockComment,

    #[regex(r"[0-9][0-9_]*\.[0-9][0-9_]*")]
    Float,

    #[regex(r"[0-9][0-9_]*")]
    Integer,

    #[regex(r#""([^"\\\n]|\\[^\n])*""#)]
    String,

    #[regex(r#""([^"\\\n]|\\[^\n])*"#)]
    UnterminatedString,

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Identifier,

    #[token("(")]
    LeftParen,
    #[token(")")]
    RightParen,
    #[token("{")]
    LeftBrace,
    #[token("}")]
    RightBrace,
    #[token("[")]
    LeftSquare,
    #[token("]")]
    RightSquare,
    #[token(",")]
    Comma,
    #[token(";")]
    Semicolon,
    #[token(":")]
    Colon,
    #[token(".")]
    Dot,
    #[token("?")]
    Question,

    #[token("|")]
    Pipe,
    #[token("||")]
    #[token("&&")]
    Logical,

    #[token("*")]
    Star,
    #[token("**")]
    Exponential,

    #[token("!")]
    Bang,
    #[token("=")]
    Equals,

    #[token("==")]
    #[token("!=")]
    #[token("<")]
    #[token("<=")]
    #[token(">")]
    #[token(">=")]
    Comparison,

    #[token("+")]
    #[token("-")]
    Additive,
    #[token("++")]
    #[token("--")]
    Postfix,

    #[token("/")]
    #[token("%")]
    Multiplicative,

    #[token("+=")]
    #[token("-=")]
    #[token("*=")]
    #[token("/=")]
    #[token("%=")]
    Assignment,
}

/// Byte offsets of the first character of each line, for line/column lookup.
struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    fn new(source: &str) -> Self {
        let mut starts = vec![0];
        for (i, b) in source.bytes().enumerate() {
            if b == b'\n' {
                starts.push(i + 1);
            }
        }
        Self { starts }
    }

    fn position(&self, offset: usize) -> (u32, u32) {
        let line = match self.starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        let column = offset - self.starts[line] + 1;
        (line as u32 + 1, column as u32)
    }
}

/// Process escape sequences in a raw string body (quotes already stripped).
///
/// Unknown escapes are reported and dropped so lexing can continue.
fn process_escapes(
    raw: &str,
    string_span: Span,
    index: &LineIndex,
    file_id: u32,
    diagnostics: &mut DiagnosticManager,
) -> String {
    let mut result = String::with_capacity(raw.len());
    let mut chars = raw.char_indices();

    while let Some((i, c)) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }

        match chars.next() {
            Some((_, 'n')) => result.push('\n'),
            Some((_, 'r')) => result.push('\r'),
            Some((_, 't')) => result.push('\t'),
            Some((_, '\\')) => result.push('\\'),
            Some((_, '"')) => result.push('"'),
            Some((_, '0')) => result.push('\0'),
            Some((j, other)) => {
                let start = string_span.start + 1 + i;
                let end = string_span.start + 1 + j + other.len_utf8();
                let (line, column) = index.position(start);
                let span = Span::with_file(start, end, line, column, file_id);
                diagnostics.report_invalid_escape_sequence(span, other);
            }
            None => {}
        }
    }

    result
}

/// Lex a source file into the token stream the parser consumes.
///
/// Never fails: lexical problems are reported on the diagnostic manager and
/// the offending text is skipped. The returned stream always ends with an
/// `Eof` token.
pub fn lex(source: &str, file_id: u32, diagnostics: &mut DiagnosticManager) -> Vec<Token> {
    let index = LineIndex::new(source);
    let mut tokens = Vec::new();
    let mut pending_newline = false;

    let mut lexer = RawToken::lexer(source);
    while let Some(result) = lexer.next() {
        let range = lexer.span();
        let slice = lexer.slice();
        let (line, column) = index.position(range.start);
        let span = Span::with_file(range.start, range.end, line, column, file_id);

        let raw = match result {
            Ok(raw) => raw,
            Err(()) => {
                diagnostics.report_invalid_character(span, slice.chars().next().unwrap_or('\0'));
                continue;
            }
        };

        let (kind, lexeme) = match raw {
            RawToken::Newline => {
                pending_newline = true;
                continue;
            }
            RawToken::BlockComment => {
                if slice.contains('\n') {
                    pending_newline = true;
                }
                continue;
            }
            RawToken::Integer => {
                if slice.ends_with('_') {
                    diagnostics.report_number_ends_with_separator(span);
                }
                (TokenKind::Integer, slice.to_string())
            }
            RawToken::Float => {
                if slice.ends_with('_') || slice.contains("_.") {
                    diagnostics.report_number_ends_with_separator(span);
                }
                (TokenKind::Float, slice.to_string())
            }
            RawToken::String => {
                let body = &slice[1..slice.len() - 1];
                let value = process_escapes(body, span, &index, file_id, diagnostics);
                (TokenKind::String, value)
            }
            RawToken::UnterminatedString => {
                diagnostics.report_unterminated_string(span);
                let body = &slice[1..];
                let value = process_escapes(body, span, &index, file_id, diagnostics);
                (TokenKind::String, value)
            }
            RawToken::Identifier => (TokenKind::Identifier, slice.to_string()),
            RawToken::LeftParen => (TokenKind::LeftParen, slice.to_string()),
            RawToken::RightParen => (TokenKind::RightParen, slice.to_string()),
            RawToken::LeftBrace => (TokenKind::LeftBrace, slice.to_string()),
            RawToken::RightBrace => (TokenKind::RightBrace, slice.to_string()),
            RawToken::LeftSquare => (TokenKind::LeftSquare, slice.to_string()),
            RawToken::RightSquare => (TokenKind::RightSquare, slice.to_string()),
            RawToken::Comma => (TokenKind::Comma, slice.to_string()),
            RawToken::Semicolon => (TokenKind::Semicolon, slice.to_string()),
            RawToken::Colon => (TokenKind::Colon, slice.to_string()),
            RawToken::Dot => (TokenKind::Dot, slice.to_string()),
            RawToken::Question => (TokenKind::Question, slice.to_string()),
            RawToken::Pipe => (TokenKind::Pipe, slice.to_string()),
            RawToken::Logical => (TokenKind::Logical, slice.to_string()),
            RawToken::Star => (TokenKind::Star, slice.to_string()),
            RawToken::Exponential => (TokenKind::Exponential, slice.to_string()),
            RawToken::Bang => (TokenKind::Bang, slice.to_string()),
            RawToken::Equals => (TokenKind::Equals, slice.to_string()),
            RawToken::Comparison => (TokenKind::Comparison, slice.to_string()),
            RawToken::Additive => (TokenKind::Additive, slice.to_string()),
            RawToken::Postfix => (TokenKind::Postfix, slice.to_string()),
            RawToken::Multiplicative => (TokenKind::Multiplicative, slice.to_string()),
            RawToken::Assignment => (TokenKind::Assignment, slice.to_string()),
        };

        tokens.push(Token::new(kind, lexeme, span, pending_newline));
        pending_newline = false;
    }

    let (line, column) = index.position(source.len());
    let eof_span = Span::with_file(source.len(), source.len(), line, column, file_id);
    tokens.push(Token::eof(eof_span, pending_newline));

    tokens
}

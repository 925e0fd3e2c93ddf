//! Token types produced by the LG lexer

use lg_types::SourceLocation;
use serde::{Deserialize, Serialize};

/// Kinds of tokens in an LG source file
///
/// Comments and blanks outside template bodies are skipped by the lexer and
/// never appear in the token stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenKind {
    Newline,
    Hash,
    Dash,
    Identifier,
    Dot,
    OpenParen,
    CloseParen,
    Comma,
    /// Blanks kept inside a template body (after the first content token)
    Whitespace,
    Case,
    Default,
    /// `` ```…``` `` block, delimiters included
    MultiLineText,
    /// `{…}` span, delimiters included
    Expression,
    /// `[…]` span, delimiters included
    TemplateRef,
    /// A lone `}` `]` `(` `)` inside a body
    TextSeparator,
    Text,
    Eof,
}

impl TokenKind {
    /// Human-readable description used in parse errors
    pub fn describe(&self) -> &'static str {
        match self {
            TokenKind::Newline => "newline",
            TokenKind::Hash => "'#'",
            TokenKind::Dash => "'-'",
            TokenKind::Identifier => "identifier",
            TokenKind::Dot => "'.'",
            TokenKind::OpenParen => "'('",
            TokenKind::CloseParen => "')'",
            TokenKind::Comma => "','",
            TokenKind::Whitespace => "whitespace",
            TokenKind::Case => "'CASE:'",
            TokenKind::Default => "'DEFAULT:'",
            TokenKind::MultiLineText => "multi-line text",
            TokenKind::Expression => "expression",
            TokenKind::TemplateRef => "template reference",
            TokenKind::TextSeparator => "text separator",
            TokenKind::Text => "text",
            TokenKind::Eof => "end of input",
        }
    }

    /// Tokens that contribute literal text to a template string
    pub fn is_plain_text(&self) -> bool {
        matches!(
            self,
            TokenKind::Text | TokenKind::TextSeparator | TokenKind::Whitespace
        )
    }
}

/// A single lexed token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    /// Token text. For escapes this is the unescaped character.
    pub text: String,
    pub location: SourceLocation,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, location: SourceLocation) -> Self {
        Self {
            kind,
            text: text.into(),
            location,
        }
    }

    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }
}

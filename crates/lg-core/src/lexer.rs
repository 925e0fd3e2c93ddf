//! Mode-switching LG lexer
//!
//! The lexer runs in one of three modes:
//!
//! - **File**: between templates. Only `#`, `-`, comments (`>`), blanks and
//!   newlines are meaningful.
//! - **Name line**: after `#`, until the end of the line. Identifiers, `.`,
//!   `(`, `)` and `,` are recognised; blanks are skipped.
//! - **Body**: after `-`, until the end of the line. Raw text with embedded
//!   `{expr}`, `[ref]` and `` ```block``` `` islands. Blanks before the first
//!   content token (and after `CASE:` / `DEFAULT:`) are dropped; later blanks
//!   are kept as `Whitespace` tokens.
//!
//! Expression, template-ref and multi-line spans are opaque tokens; their
//! inner syntax is left to the evaluator.

use lg_types::{is_identifier_continue, ParseError, SourceLocation};
use nom::{
    branch::alt,
    bytes::complete::{tag, take, take_until, take_while, take_while1},
    character::complete::{char, one_of, satisfy},
    combinator::{opt, recognize},
    error::{Error, ErrorKind},
    sequence::{pair, preceded, tuple},
    IResult,
};
use nom_locate::LocatedSpan;

use crate::token::{Token, TokenKind};

/// Input type carrying line/column information
pub type Span<'a> = LocatedSpan<&'a str>;

type LexResult<'a, O = Span<'a>> = IResult<Span<'a>, O, Error<Span<'a>>>;

/// Multi-line block delimiter
pub const FENCE: &str = "```";

/// Characters that may follow a backslash in body text
const ESCAPABLE: &str = "{}[]\\`-#";

/// Characters that end a plain text run
const TEXT_STOP: &str = " \t\r\n{}[]()\\";

// ============================================================================
// Public API
// ============================================================================

/// Tokenize a complete LG source file
///
/// The returned stream always ends with a single `Eof` token.
pub fn tokenize(source: &str) -> Result<Vec<Token>, ParseError> {
    Lexer::new(source).run()
}

// ============================================================================
// Lexer state
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    File,
    NameLine,
    Body {
        ignore_blanks: bool,
        line_start: bool,
    },
}

struct Lexer<'a> {
    input: Span<'a>,
    mode: Mode,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            input: Span::new(source),
            mode: Mode::File,
            tokens: Vec::new(),
        }
    }

    fn run(mut self) -> Result<Vec<Token>, ParseError> {
        while !self.input.fragment().is_empty() {
            match self.mode {
                Mode::File => self.lex_file()?,
                Mode::NameLine => self.lex_name_line()?,
                Mode::Body {
                    ignore_blanks,
                    line_start,
                } => self.lex_body(ignore_blanks, line_start)?,
            }
        }

        let mut eof = location(&self.input);
        eof.length = 0;
        self.tokens.push(Token::new(TokenKind::Eof, "", eof));
        Ok(self.tokens)
    }

    fn emit(&mut self, kind: TokenKind, matched: Span<'a>, rest: Span<'a>) {
        self.tokens
            .push(Token::new(kind, *matched.fragment(), location(&matched)));
        self.input = rest;
    }

    fn lex_file(&mut self) -> Result<(), ParseError> {
        let input = self.input;

        if let Ok((rest, _)) = blanks(input) {
            self.input = rest;
        } else if let Ok((rest, _)) = comment(input) {
            self.input = rest;
        } else if let Ok((rest, matched)) = newline(input) {
            self.emit(TokenKind::Newline, matched, rest);
        } else if let Ok((rest, matched)) = punct(input, '#') {
            self.emit(TokenKind::Hash, matched, rest);
            self.mode = Mode::NameLine;
        } else if let Ok((rest, matched)) = punct(input, '-') {
            self.emit(TokenKind::Dash, matched, rest);
            self.mode = Mode::Body {
                ignore_blanks: true,
                line_start: true,
            };
        } else {
            return Err(unexpected(input, &["'#'", "'-'", "'>'", "newline"]));
        }
        Ok(())
    }

    fn lex_name_line(&mut self) -> Result<(), ParseError> {
        let input = self.input;

        if let Ok((rest, _)) = blanks(input) {
            self.input = rest;
        } else if let Ok((rest, matched)) = newline(input) {
            self.emit(TokenKind::Newline, matched, rest);
            self.mode = Mode::File;
        } else if let Ok((rest, matched)) = identifier(input) {
            self.emit(TokenKind::Identifier, matched, rest);
        } else if let Ok((rest, matched)) = punct(input, '.') {
            self.emit(TokenKind::Dot, matched, rest);
        } else if let Ok((rest, matched)) = punct(input, '(') {
            self.emit(TokenKind::OpenParen, matched, rest);
        } else if let Ok((rest, matched)) = punct(input, ')') {
            self.emit(TokenKind::CloseParen, matched, rest);
        } else if let Ok((rest, matched)) = punct(input, ',') {
            self.emit(TokenKind::Comma, matched, rest);
        } else {
            return Err(unexpected(
                input,
                &["identifier", "'.'", "'('", "')'", "','", "newline"],
            ));
        }
        Ok(())
    }

    fn lex_body(&mut self, ignore_blanks: bool, line_start: bool) -> Result<(), ParseError> {
        let input = self.input;

        if ignore_blanks {
            if let Ok((rest, _)) = blanks(input) {
                self.input = rest;
                return Ok(());
            }
        }

        if let Ok((rest, matched)) = newline(input) {
            self.emit(TokenKind::Newline, matched, rest);
            self.mode = Mode::File;
            return Ok(());
        }

        if line_start {
            let keyword = case_keyword(input)
                .map(|(rest, m)| (TokenKind::Case, rest, m))
                .or_else(|_| default_keyword(input).map(|(rest, m)| (TokenKind::Default, rest, m)));
            if let Ok((kind, rest, matched)) = keyword {
                self.emit(kind, matched, rest);
                self.mode = Mode::Body {
                    ignore_blanks: true,
                    line_start: false,
                };
                return Ok(());
            }
        }

        self.mode = Mode::Body {
            ignore_blanks: false,
            line_start: false,
        };

        let fragment = *input.fragment();
        if fragment.starts_with(FENCE) {
            let (rest, matched) = multi_line_text(input)
                .map_err(|_| unterminated(input, "multi-line text", FENCE))?;
            self.emit(TokenKind::MultiLineText, matched, rest);
        } else if fragment.starts_with('{') {
            let (rest, matched) =
                balanced_span(input, '{', '}').map_err(|_| unterminated(input, "expression", "}"))?;
            self.emit(TokenKind::Expression, matched, rest);
        } else if fragment.starts_with('[') {
            let (rest, matched) = balanced_span(input, '[', ']')
                .map_err(|_| unterminated(input, "template reference", "]"))?;
            self.emit(TokenKind::TemplateRef, matched, rest);
        } else if let Ok((rest, escaped)) = escape(input) {
            let matched_len = input.fragment().len() - rest.fragment().len();
            let mut loc = location(&input);
            loc.length = matched_len;
            self.tokens
                .push(Token::new(TokenKind::Text, escaped.to_string(), loc));
            self.input = rest;
        } else if let Ok((rest, matched)) = blanks(input) {
            self.emit(TokenKind::Whitespace, matched, rest);
        } else if let Ok((rest, matched)) = text_separator(input) {
            self.emit(TokenKind::TextSeparator, matched, rest);
        } else if let Ok((rest, matched)) = text_run(input) {
            self.emit(TokenKind::Text, matched, rest);
        } else {
            // A backslash that does not start a known escape is literal text
            let (rest, matched) = take_one(input)
                .map_err(|_| unexpected(input, &["text", "expression", "template reference"]))?;
            self.emit(TokenKind::Text, matched, rest);
        }
        Ok(())
    }
}

// ============================================================================
// Token recognisers
// ============================================================================

fn blanks(input: Span<'_>) -> LexResult<'_> {
    take_while1(|c| c == ' ' || c == '\t')(input)
}

fn newline(input: Span<'_>) -> LexResult<'_> {
    recognize(pair(opt(char('\r')), char('\n')))(input)
}

fn comment(input: Span<'_>) -> LexResult<'_> {
    recognize(pair(char('>'), take_while(|c| c != '\n' && c != '\r')))(input)
}

fn punct(input: Span<'_>, c: char) -> LexResult<'_> {
    recognize(char(c))(input)
}

fn identifier(input: Span<'_>) -> LexResult<'_> {
    recognize(pair(
        satisfy(|c| c.is_ascii_alphanumeric() || c == '_'),
        take_while(is_identifier_continue),
    ))(input)
}

fn case_keyword(input: Span<'_>) -> LexResult<'_> {
    alt((tag("CASE:"), tag("case:")))(input)
}

fn default_keyword(input: Span<'_>) -> LexResult<'_> {
    alt((tag("DEFAULT:"), tag("default:")))(input)
}

fn multi_line_text(input: Span<'_>) -> LexResult<'_> {
    recognize(tuple((tag(FENCE), take_until(FENCE), tag(FENCE))))(input)
}

fn escape(input: Span<'_>) -> LexResult<'_, char> {
    preceded(char('\\'), one_of(ESCAPABLE))(input)
}

fn text_separator(input: Span<'_>) -> LexResult<'_> {
    recognize(one_of("}])(\r"))(input)
}

fn take_one(input: Span<'_>) -> LexResult<'_> {
    take(1usize)(input)
}

/// Longest run of text characters, stopping before a fence
fn text_run(input: Span<'_>) -> LexResult<'_> {
    let fragment = *input.fragment();
    let mut count = 0usize;
    for (idx, c) in fragment.char_indices() {
        if TEXT_STOP.contains(c) || fragment[idx..].starts_with(FENCE) {
            break;
        }
        count += 1;
    }
    if count == 0 {
        return Err(nom::Err::Error(Error::new(input, ErrorKind::TakeWhile1)));
    }
    take(count)(input)
}

/// Recognise `open … close` with nesting, skipping quoted strings.
/// The span may not cross a line break.
fn balanced_span(input: Span<'_>, open: char, close: char) -> LexResult<'_> {
    match balanced_len(input.fragment(), open, close) {
        Some(chars) => take(chars)(input),
        None => Err(nom::Err::Error(Error::new(input, ErrorKind::TakeUntil))),
    }
}

/// Length in characters of the balanced span at the start of `text`
fn balanced_len(text: &str, open: char, close: char) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (count, c) in text.chars().enumerate() {
        if c == '\n' || c == '\r' {
            return None;
        }
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' if depth > 0 => quote = Some(c),
            c if c == open => depth += 1,
            c if c == close => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(count + 1);
                }
            }
            _ => {}
        }
    }
    None
}

// ============================================================================
// Errors and locations
// ============================================================================

fn location(span: &Span<'_>) -> SourceLocation {
    SourceLocation::new(
        span.location_line() as usize,
        span.get_utf8_column(),
        span.location_offset(),
        span.fragment().len(),
    )
}

fn unexpected(input: Span<'_>, expected: &[&str]) -> ParseError {
    let found = input.fragment().chars().next().unwrap_or_default();
    let mut loc = location(&input);
    loc.length = found.len_utf8();
    ParseError::new(format!("unexpected character {:?}", found), loc)
        .expecting(expected.iter().copied())
        .found(found.to_string())
}

fn unterminated(input: Span<'_>, what: &str, closer: &str) -> ParseError {
    let mut loc = location(&input);
    loc.length = 1;
    ParseError::new(format!("unterminated {}", what), loc).expecting([format!("'{}'", closer)])
}

//! LG parser - builds [`LgFile`] from the token stream
//!
//! ## Grammar
//!
//! ```text
//! file                    := paragraph+ EOF
//! paragraph               := newline | templateDefinition
//! newline                 := NEWLINE | EOF
//! templateDefinition      := templateNameLine newline templateBody
//! templateNameLine        := '#' templateName parameters?
//! templateName            := IDENTIFIER ('.' IDENTIFIER)*
//! parameters              := '(' IDENTIFIER (',' IDENTIFIER)* ')'
//! templateBody            := normalTemplateBody | conditionalTemplateBody
//! normalTemplateBody      := (normalTemplateString newline)+
//! normalTemplateString    := '-' (WS | MULTI_LINE_TEXT | EXPRESSION | TEMPLATE_REF | TEXT_SEPARATOR | TEXT)*
//! conditionalTemplateBody := caseRule+ defaultRule
//! caseRule                := '-' CASE EXPRESSION newline normalTemplateBody
//! defaultRule             := '-' DEFAULT newline normalTemplateBody
//! ```
//!
//! The grammar is LL(2): a body is conditional iff its first line is
//! `'-' CASE`. No backtracking is ever needed. Any mismatch is reported as a
//! [`ParseError`] and the whole file is rejected.

use lg_types::{ParseError, TemplateName};
use tracing::debug;

use crate::ast::*;
use crate::lexer::tokenize;
use crate::token::{Token, TokenKind};

// ============================================================================
// Public API
// ============================================================================

/// Parse a complete LG source file
pub fn parse_lg(source: &str) -> Result<LgFile, ParseError> {
    let tokens = tokenize(source)?;
    let file = Parser::new(tokens).parse_file()?;
    debug!(templates = file.templates.len(), "parsed LG source");
    Ok(file)
}

/// Parse an LG source file, tagging the file and every error location with
/// `source_name`
pub fn parse_lg_named(source: &str, source_name: &str) -> Result<LgFile, ParseError> {
    let mut file = parse_lg(source).map_err(|e| e.in_source(source_name))?;
    file.source_name = Some(source_name.to_string());
    for template in &mut file.templates {
        template.location.source_name = Some(source_name.to_string());
    }
    Ok(file)
}

// ============================================================================
// Parser state
// ============================================================================

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> &Token {
        self.peek_nth(0)
    }

    /// Token `n` positions ahead; the trailing `Eof` repeats forever
    fn peek_nth(&self, n: usize) -> &Token {
        let idx = (self.pos + n).min(self.tokens.len().saturating_sub(1));
        &self.tokens[idx]
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.peek().is(kind)
    }

    fn bump(&mut self) -> Token {
        let token = self.peek().clone();
        if !token.is(TokenKind::Eof) {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token, ParseError> {
        if self.at(kind) {
            Ok(self.bump())
        } else {
            Err(self.error_expected(&[kind]))
        }
    }

    /// `newline := NEWLINE | EOF`
    fn expect_newline(&mut self) -> Result<(), ParseError> {
        match self.peek().kind {
            TokenKind::Newline => {
                self.bump();
                Ok(())
            }
            TokenKind::Eof => Ok(()),
            _ => Err(self.error_expected(&[TokenKind::Newline])),
        }
    }

    fn error_expected(&self, expected: &[TokenKind]) -> ParseError {
        let token = self.peek();
        let found = if token.is(TokenKind::Eof) {
            token.kind.describe().to_string()
        } else {
            token.text.clone()
        };
        ParseError::new(
            format!("unexpected {}", token.kind.describe()),
            token.location.clone(),
        )
        .expecting(expected.iter().map(|k| k.describe()))
        .found(found)
    }

    /// Current line starts a `- CASE:` / `- DEFAULT:` clause
    fn at_clause(&self, keyword: TokenKind) -> bool {
        self.at(TokenKind::Dash) && self.peek_nth(1).is(keyword)
    }

    fn at_template_string(&self) -> bool {
        self.at(TokenKind::Dash) && !self.at_clause(TokenKind::Case) && !self.at_clause(TokenKind::Default)
    }

    // ========================================================================
    // Rules
    // ========================================================================

    fn parse_file(mut self) -> Result<LgFile, ParseError> {
        let mut templates = Vec::new();
        loop {
            match self.peek().kind {
                TokenKind::Newline => {
                    self.bump();
                }
                TokenKind::Eof => break,
                TokenKind::Hash => templates.push(self.template_definition()?),
                _ => return Err(self.error_expected(&[TokenKind::Hash, TokenKind::Newline])),
            }
        }
        Ok(LgFile {
            templates,
            source_name: None,
        })
    }

    fn template_definition(&mut self) -> Result<TemplateDefinition, ParseError> {
        let hash = self.expect(TokenKind::Hash)?;
        let name = self.template_name()?;
        let parameters = if self.at(TokenKind::OpenParen) {
            self.parameters()?
        } else {
            Vec::new()
        };
        self.expect_newline()?;
        let body = self.template_body()?;

        debug!(template = %name, params = parameters.len(), "parsed template definition");
        Ok(TemplateDefinition {
            name,
            parameters,
            body,
            location: hash.location,
        })
    }

    fn template_name(&mut self) -> Result<TemplateName, ParseError> {
        let mut name = self.expect(TokenKind::Identifier)?.text;
        while self.at(TokenKind::Dot) {
            self.bump();
            name.push('.');
            name.push_str(&self.expect(TokenKind::Identifier)?.text);
        }
        Ok(TemplateName::new(name))
    }

    fn parameters(&mut self) -> Result<Vec<String>, ParseError> {
        self.expect(TokenKind::OpenParen)?;
        let mut params = vec![self.expect(TokenKind::Identifier)?.text];
        while self.at(TokenKind::Comma) {
            self.bump();
            params.push(self.expect(TokenKind::Identifier)?.text);
        }
        self.expect(TokenKind::CloseParen)?;
        Ok(params)
    }

    fn template_body(&mut self) -> Result<TemplateBody, ParseError> {
        if self.at_clause(TokenKind::Case) {
            self.conditional_body().map(TemplateBody::Conditional)
        } else {
            self.normal_body().map(TemplateBody::Normal)
        }
    }

    fn normal_body(&mut self) -> Result<NormalBody, ParseError> {
        let mut alternatives = Vec::new();
        while self.at_template_string() {
            alternatives.push(self.template_string()?);
            self.expect_newline()?;
        }
        if alternatives.is_empty() {
            return Err(ParseError::new(
                "template body must contain at least one '-' line",
                self.peek().location.clone(),
            )
            .expecting([TokenKind::Dash.describe()])
            .found(self.peek().text.clone()));
        }
        Ok(NormalBody { alternatives })
    }

    fn template_string(&mut self) -> Result<TemplateString, ParseError> {
        let dash = self.expect(TokenKind::Dash)?;
        let mut segments = Vec::new();
        let mut text = String::new();

        loop {
            let token = self.peek();
            match token.kind {
                TokenKind::Newline | TokenKind::Eof => break,
                kind if kind.is_plain_text() => text.push_str(&token.text),
                TokenKind::Expression | TokenKind::TemplateRef | TokenKind::MultiLineText => {
                    if !text.is_empty() {
                        segments.push(Segment::PlainText(std::mem::take(&mut text)));
                    }
                    let raw = token.text.clone();
                    segments.push(match token.kind {
                        TokenKind::Expression => Segment::Expression(raw),
                        TokenKind::TemplateRef => Segment::TemplateRef(raw),
                        _ => Segment::MultiLineText(raw),
                    });
                }
                _ => {
                    return Err(self.error_expected(&[
                        TokenKind::Text,
                        TokenKind::Expression,
                        TokenKind::TemplateRef,
                        TokenKind::MultiLineText,
                        TokenKind::Newline,
                    ]))
                }
            }
            self.bump();
        }
        if !text.is_empty() {
            segments.push(Segment::PlainText(text));
        }

        Ok(TemplateString {
            segments,
            location: dash.location,
        })
    }

    fn conditional_body(&mut self) -> Result<ConditionalBody, ParseError> {
        let mut cases = Vec::new();
        while self.at_clause(TokenKind::Case) {
            let dash = self.expect(TokenKind::Dash)?;
            self.expect(TokenKind::Case)?;
            let condition = self.expect(TokenKind::Expression)?;
            self.skip_whitespace();
            self.expect_newline()?;
            let body = self.normal_body()?;
            cases.push(CaseClause {
                condition: Some(Segment::Expression(condition.text).inner().to_string()),
                body,
                location: dash.location,
            });
        }

        if !self.at_clause(TokenKind::Default) {
            return Err(ParseError::new(
                "conditional template requires a DEFAULT: clause",
                self.peek().location.clone(),
            )
            .expecting(["'- DEFAULT:'", "'- CASE:'"])
            .found(self.peek().text.clone()));
        }
        let dash = self.expect(TokenKind::Dash)?;
        self.expect(TokenKind::Default)?;
        self.skip_whitespace();
        self.expect_newline()?;
        let body = self.normal_body()?;

        Ok(ConditionalBody {
            cases,
            default: CaseClause {
                condition: None,
                body,
                location: dash.location,
            },
        })
    }

    fn skip_whitespace(&mut self) {
        while self.at(TokenKind::Whitespace) {
            self.bump();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn single(source: &str) -> TemplateDefinition {
        let file = parse_lg(source).unwrap();
        assert_eq!(file.templates.len(), 1);
        file.templates.into_iter().next().unwrap()
    }

    #[test]
    fn test_simple_template() {
        let t = single("# Greeting\n- Hello world\n- Hi there\n");
        assert_eq!(t.name.as_str(), "Greeting");
        assert!(t.parameters.is_empty());
        let TemplateBody::Normal(body) = &t.body else {
            panic!("expected normal body");
        };
        assert_eq!(body.alternatives.len(), 2);
        assert_eq!(
            body.alternatives[0].segments,
            vec![Segment::PlainText("Hello world".into())]
        );
    }

    #[test]
    fn test_dotted_name_and_parameters() {
        let t = single("# welcome.user(name, time)\n- Hi {name}\n");
        assert_eq!(t.name.as_str(), "welcome.user");
        assert_eq!(t.parameters, vec!["name", "time"]);
    }

    #[test]
    fn test_segments_in_order() {
        let t = single("# T\n- Hi {name}, see [Other(1)] ```a @{b}``` bye\n");
        let TemplateBody::Normal(body) = &t.body else {
            panic!("expected normal body");
        };
        assert_eq!(
            body.alternatives[0].segments,
            vec![
                Segment::PlainText("Hi ".into()),
                Segment::Expression("{name}".into()),
                Segment::PlainText(", see ".into()),
                Segment::TemplateRef("[Other(1)]".into()),
                Segment::PlainText(" ".into()),
                Segment::MultiLineText("```a @{b}```".into()),
                Segment::PlainText(" bye".into()),
            ]
        );
    }

    #[test]
    fn test_conditional_template() {
        let source = "# Weather\n- CASE: {temp > 30}\n  - Hot\n- CASE: {temp < 5}\n  - Cold\n  - Freezing\n- DEFAULT:\n  - Mild\n";
        let t = single(source);
        let TemplateBody::Conditional(body) = &t.body else {
            panic!("expected conditional body");
        };
        assert_eq!(body.cases.len(), 2);
        assert_eq!(body.cases[0].condition.as_deref(), Some("temp > 30"));
        assert_eq!(body.cases[1].body.alternatives.len(), 2);
        assert!(body.default.is_default());
        assert_eq!(
            body.default.body.alternatives[0].to_source(),
            "Mild".to_string()
        );
    }

    #[test]
    fn test_multiple_templates_and_comments() {
        let source = "> greetings\n# A\n- a\n\n> second\n# B\n- [A]\n";
        let file = parse_lg(source).unwrap();
        let names: Vec<_> = file.template_names().map(|n| n.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
    }

    #[test]
    fn test_no_trailing_newline() {
        let t = single("# T\n- last line");
        assert_eq!(t.template_strings()[0].to_source(), "last line");
    }

    #[test]
    fn test_empty_alternative_line() {
        let t = single("# T\n-\n");
        assert!(t.template_strings()[0].segments.is_empty());
    }

    #[test]
    fn test_named_source_locations() {
        let file = parse_lg_named("\n# T\n- x\n", "main.lg").unwrap();
        assert_eq!(file.source_name.as_deref(), Some("main.lg"));
        assert_eq!(file.templates[0].location.line, 2);
        assert_eq!(file.templates[0].location.description(), "main.lg:2:1");
    }

    #[test]
    fn test_empty_file() {
        assert!(parse_lg("").unwrap().templates.is_empty());
        assert!(parse_lg("\n\n> only comments\n").unwrap().templates.is_empty());
    }

    proptest::proptest! {
        #[test]
        fn prop_plain_text_line_is_one_segment(text in "[a-zA-Z0-9,.!?'][a-zA-Z0-9 ,.!?']{0,40}") {
            let source = format!("# T\n- {}\n", text);
            let t = single(&source);
            proptest::prop_assert_eq!(
                t.template_strings()[0].segments.clone(),
                vec![Segment::PlainText(text.clone())]
            );
        }
    }

    // =========================================================================
    // ERROR CASE TESTS
    // =========================================================================

    #[test]
    fn test_error_empty_body() {
        let err = parse_lg("# T\n\n# U\n- x\n").unwrap_err();
        assert_eq!(err.line(), 2);
        assert_eq!(err.expected, vec!["'-'".to_string()]);
    }

    #[test]
    fn test_error_missing_default() {
        let err = parse_lg("# T\n- CASE: {x}\n  - yes\n").unwrap_err();
        assert!(err.message.contains("DEFAULT"));
    }

    #[test]
    fn test_error_case_without_expression() {
        let err = parse_lg("# T\n- CASE: x\n  - yes\n- DEFAULT:\n  - no\n").unwrap_err();
        assert_eq!(err.line(), 2);
        assert_eq!(err.expected, vec!["expression".to_string()]);
    }

    #[test]
    fn test_error_missing_name() {
        let err = parse_lg("#\n- x\n").unwrap_err();
        assert_eq!(err.expected, vec!["identifier".to_string()]);
    }

    #[test]
    fn test_error_unclosed_parameters() {
        assert!(parse_lg("# T(a, b\n- x\n").is_err());
        assert!(parse_lg("# T()\n- x\n").is_err());
    }

    #[test]
    fn test_error_body_line_outside_template() {
        let err = parse_lg("- orphan\n").unwrap_err();
        assert_eq!(err.line(), 1);
        assert_eq!(err.found.as_deref(), Some("-"));
    }

    #[test]
    fn test_error_default_without_case() {
        assert!(parse_lg("# T\n- DEFAULT:\n  - x\n").is_err());
    }

    #[test]
    fn test_error_text_after_case_condition() {
        assert!(parse_lg("# T\n- CASE: {x} extra\n  - y\n- DEFAULT:\n  - z\n").is_err());
    }
}

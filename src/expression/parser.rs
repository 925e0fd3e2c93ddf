//! nom parser for expression text

use nom::{
    branch::alt,
    bytes::complete::{escaped_transform, tag},
    character::complete::{alpha1, alphanumeric1, char, digit1, multispace0, none_of},
    combinator::{all_consuming, cut, map, not, opt, recognize, value},
    error::{context, convert_error, ContextError, ParseError as NomParseError, VerboseError},
    multi::{many0, separated_list0},
    sequence::{delimited, pair, preceded, terminated, tuple},
    IResult,
};
use serde_json::Value;

use super::ExpressionError;

// ============================================================================
// Expression tree
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    List(Vec<Expr>),
    Identifier(String),
    Member(Box<Expr>, String),
    Index(Box<Expr>, Box<Expr>),
    Call(String, Vec<Expr>),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Negate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Mul,
    Div,
    Mod,
    Add,
    Sub,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    And,
    Or,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }
}

// ============================================================================
// Public API
// ============================================================================

/// Parse one complete expression
pub fn parse_expression(input: &str) -> Result<Expr, ExpressionError> {
    match all_consuming(delimited(
        multispace0::<_, VerboseError<&str>>,
        expression,
        multispace0,
    ))(input)
    {
        Ok((_, expr)) => Ok(expr),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(ExpressionError::Syntax {
            expression: input.to_string(),
            message: convert_error(input, e),
        }),
        Err(nom::Err::Incomplete(_)) => Err(ExpressionError::Syntax {
            expression: input.to_string(),
            message: "Incomplete input".to_string(),
        }),
    }
}

// ============================================================================
// Operator levels
// ============================================================================

fn expression<'a, E: NomParseError<&'a str> + ContextError<&'a str>>(
    input: &'a str,
) -> IResult<&'a str, Expr, E> {
    or_expr(input)
}

/// Left-associative fold of `operand (op operand)*`
fn fold_binary<'a, E>(
    input: &'a str,
    operand: fn(&'a str) -> IResult<&'a str, Expr, E>,
    operator: fn(&'a str) -> IResult<&'a str, BinaryOp, E>,
) -> IResult<&'a str, Expr, E>
where
    E: NomParseError<&'a str> + ContextError<&'a str>,
{
    let (input, first) = operand(input)?;
    let (input, rest) = many0(pair(ws(operator), cut(operand)))(input)?;
    let expr = rest.into_iter().fold(first, |lhs, (op, rhs)| {
        Expr::Binary(op, Box::new(lhs), Box::new(rhs))
    });
    Ok((input, expr))
}

fn or_expr<'a, E: NomParseError<&'a str> + ContextError<&'a str>>(
    input: &'a str,
) -> IResult<&'a str, Expr, E> {
    fold_binary(input, and_expr, |i| value(BinaryOp::Or, tag("||"))(i))
}

fn and_expr<'a, E: NomParseError<&'a str> + ContextError<&'a str>>(
    input: &'a str,
) -> IResult<&'a str, Expr, E> {
    fold_binary(input, equality, |i| value(BinaryOp::And, tag("&&"))(i))
}

fn equality<'a, E: NomParseError<&'a str> + ContextError<&'a str>>(
    input: &'a str,
) -> IResult<&'a str, Expr, E> {
    fold_binary(input, comparison, |i| {
        alt((value(BinaryOp::Eq, tag("==")), value(BinaryOp::Ne, tag("!="))))(i)
    })
}

fn comparison<'a, E: NomParseError<&'a str> + ContextError<&'a str>>(
    input: &'a str,
) -> IResult<&'a str, Expr, E> {
    fold_binary(input, additive, |i| {
        alt((
            value(BinaryOp::Le, tag("<=")),
            value(BinaryOp::Ge, tag(">=")),
            value(BinaryOp::Lt, tag("<")),
            value(BinaryOp::Gt, tag(">")),
        ))(i)
    })
}

fn additive<'a, E: NomParseError<&'a str> + ContextError<&'a str>>(
    input: &'a str,
) -> IResult<&'a str, Expr, E> {
    fold_binary(input, multiplicative, |i| {
        alt((value(BinaryOp::Add, char('+')), value(BinaryOp::Sub, char('-'))))(i)
    })
}

fn multiplicative<'a, E: NomParseError<&'a str> + ContextError<&'a str>>(
    input: &'a str,
) -> IResult<&'a str, Expr, E> {
    fold_binary(input, unary, |i| {
        alt((
            value(BinaryOp::Mul, char('*')),
            value(BinaryOp::Div, char('/')),
            value(BinaryOp::Mod, char('%')),
        ))(i)
    })
}

fn unary<'a, E: NomParseError<&'a str> + ContextError<&'a str>>(
    input: &'a str,
) -> IResult<&'a str, Expr, E> {
    let op = alt((
        value(UnaryOp::Not, terminated(char('!'), not(char('=')))),
        value(UnaryOp::Negate, char('-')),
    ));
    alt((
        map(pair(ws(op), unary), |(op, operand)| {
            Expr::Unary(op, Box::new(operand))
        }),
        postfix,
    ))(input)
}

// ============================================================================
// Postfix and primaries
// ============================================================================

enum Suffix {
    Member(String),
    Index(Expr),
}

fn postfix<'a, E: NomParseError<&'a str> + ContextError<&'a str>>(
    input: &'a str,
) -> IResult<&'a str, Expr, E> {
    let (input, base) = ws(primary)(input)?;
    let member = map(preceded(ws(char('.')), cut(identifier)), |name: &str| {
        Suffix::Member(name.to_string())
    });
    let index = map(
        delimited(ws(char('[')), cut(expression), cut(ws(char(']')))),
        Suffix::Index,
    );
    let (input, suffixes) = many0(alt((member, index)))(input)?;
    let expr = suffixes.into_iter().fold(base, |target, suffix| match suffix {
        Suffix::Member(name) => Expr::Member(Box::new(target), name),
        Suffix::Index(index) => Expr::Index(Box::new(target), Box::new(index)),
    });
    Ok((input, expr))
}

fn primary<'a, E: NomParseError<&'a str> + ContextError<&'a str>>(
    input: &'a str,
) -> IResult<&'a str, Expr, E> {
    context(
        "value",
        alt((
            number_literal,
            map(string_literal('\''), |s| Expr::Literal(Value::String(s))),
            map(string_literal('"'), |s| Expr::Literal(Value::String(s))),
            list_literal,
            delimited(char('('), ws(expression), cut(char(')'))),
            call,
            word,
        )),
    )(input)
}

fn call<'a, E: NomParseError<&'a str> + ContextError<&'a str>>(
    input: &'a str,
) -> IResult<&'a str, Expr, E> {
    let (input, name) = terminated(identifier, ws(char('(')))(input)?;
    let (input, args) = cut(terminated(
        separated_list0(ws(char(',')), ws(expression)),
        ws(char(')')),
    ))(input)?;
    Ok((input, Expr::Call(name.to_string(), args)))
}

/// Identifier or keyword literal
fn word<'a, E: NomParseError<&'a str>>(input: &'a str) -> IResult<&'a str, Expr, E> {
    map(identifier, |name| match name {
        "true" => Expr::Literal(Value::Bool(true)),
        "false" => Expr::Literal(Value::Bool(false)),
        "null" => Expr::Literal(Value::Null),
        _ => Expr::Identifier(name.to_string()),
    })(input)
}

fn identifier<'a, E: NomParseError<&'a str>>(input: &'a str) -> IResult<&'a str, &'a str, E> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        many0(alt((alphanumeric1, tag("_")))),
    ))(input)
}

fn number_literal<'a, E: NomParseError<&'a str>>(input: &'a str) -> IResult<&'a str, Expr, E> {
    let (remaining, num_str) = recognize(tuple((digit1, opt(pair(char('.'), digit1)))))(input)?;

    if num_str.contains('.') {
        match num_str.parse::<f64>() {
            Ok(f) => Ok((remaining, Expr::Literal(crate::value::from_f64(f)))),
            Err(_) => Err(nom::Err::Error(E::from_error_kind(
                input,
                nom::error::ErrorKind::Float,
            ))),
        }
    } else {
        match num_str.parse::<i64>() {
            Ok(i) => Ok((remaining, Expr::Literal(Value::from(i)))),
            Err(_) => Err(nom::Err::Error(E::from_error_kind(
                input,
                nom::error::ErrorKind::Digit,
            ))),
        }
    }
}

// String literals with escape sequences; empty literals are allowed
fn string_literal<'a, E: NomParseError<&'a str>>(
    quote: char,
) -> impl FnMut(&'a str) -> IResult<&'a str, String, E> {
    let stop: &'static str = if quote == '\'' { "'\\" } else { "\"\\" };
    move |input| {
        map(
            delimited(
                char(quote),
                opt(escaped_transform(
                    none_of(stop),
                    '\\',
                    alt((
                        value('\n', char('n')),
                        value('\r', char('r')),
                        value('\t', char('t')),
                        value('\\', char('\\')),
                        value('\'', char('\'')),
                        value('"', char('"')),
                    )),
                )),
                char(quote),
            ),
            Option::unwrap_or_default,
        )(input)
    }
}

fn list_literal<'a, E: NomParseError<&'a str> + ContextError<&'a str>>(
    input: &'a str,
) -> IResult<&'a str, Expr, E> {
    map(
        delimited(
            char('['),
            separated_list0(ws(char(',')), ws(expression)),
            cut(ws(char(']'))),
        ),
        Expr::List,
    )(input)
}

fn ws<'a, O, E: NomParseError<&'a str>>(
    inner: impl FnMut(&'a str) -> IResult<&'a str, O, E>,
) -> impl FnMut(&'a str) -> IResult<&'a str, O, E> {
    delimited(multispace0, inner, multispace0)
}

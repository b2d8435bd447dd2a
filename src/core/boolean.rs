//! Boolean tag expressions: variant tree, evaluator, printers and parser.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// An algebraic expression over tag predicates.
///
/// Every observer (the evaluator, both printers, the parser) is an
/// exhaustive match over the four variants.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum BooleanExpr {
    /// True when the tag is present.
    Tag(String),
    /// Conjunction; empty is true.
    And(Vec<BooleanExpr>),
    /// Disjunction; empty is false.
    Or(Vec<BooleanExpr>),
    /// Negation.
    Not(Box<BooleanExpr>),
}

impl BooleanExpr {
    pub fn tag(name: impl Into<String>) -> Self {
        BooleanExpr::Tag(name.into())
    }

    pub fn and(children: Vec<BooleanExpr>) -> Self {
        BooleanExpr::And(children)
    }

    pub fn or(children: Vec<BooleanExpr>) -> Self {
        BooleanExpr::Or(children)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(child: BooleanExpr) -> Self {
        BooleanExpr::Not(Box::new(child))
    }

    /// Evaluate the expression against a prompt's tag set.
    pub fn matches(&self, tags: &[String]) -> bool {
        match self {
            BooleanExpr::Tag(name) => tags.iter().any(|t| t == name),
            BooleanExpr::And(children) => children.iter().all(|c| c.matches(tags)),
            BooleanExpr::Or(children) => children.iter().any(|c| c.matches(tags)),
            BooleanExpr::Not(child) => !child.matches(tags),
        }
    }

    /// Unbracketed query form, e.g. `a AND (b OR c)`.
    ///
    /// Parsing the result yields a structurally equal tree.
    pub fn query_string(&self) -> String {
        fn operand(expr: &BooleanExpr) -> String {
            match expr {
                BooleanExpr::And(_) | BooleanExpr::Or(_) => {
                    format!("({})", expr.query_string())
                }
                _ => expr.query_string(),
            }
        }

        match self {
            BooleanExpr::Tag(name) => name.clone(),
            BooleanExpr::And(children) => children
                .iter()
                .map(operand)
                .collect::<Vec<_>>()
                .join(" AND "),
            BooleanExpr::Or(children) => children
                .iter()
                .map(operand)
                .collect::<Vec<_>>()
                .join(" OR "),
            BooleanExpr::Not(child) => format!("NOT {}", operand(child)),
        }
    }
}

/// Bracketed display form, e.g. `([a] AND [b])`.
impl fmt::Display for BooleanExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BooleanExpr::Tag(name) => write!(f, "[{}]", name),
            BooleanExpr::And(children) => {
                let parts: Vec<String> = children.iter().map(|c| c.to_string()).collect();
                write!(f, "({})", parts.join(" AND "))
            }
            BooleanExpr::Or(children) => {
                let parts: Vec<String> = children.iter().map(|c| c.to_string()).collect();
                write!(f, "({})", parts.join(" OR "))
            }
            BooleanExpr::Not(child) => write!(f, "(NOT {})", child),
        }
    }
}

/// A parse failure, reported at the byte offset of the offending token.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message} at offset {offset}")]
pub struct ParseError {
    pub offset: usize,
    pub message: String,
}

impl ParseError {
    fn new(offset: usize, message: impl Into<String>) -> Self {
        ParseError {
            offset,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    LParen,
    RParen,
    And,
    Or,
    Not,
    Tag(String),
}

/// Parse a single-line query-form expression.
///
/// Operators are the literal uppercase words `AND`, `OR` and `NOT`, with
/// precedence `NOT > AND > OR`; any other non-whitespace, non-paren token
/// is a tag literal.
pub fn parse(input: &str) -> Result<BooleanExpr, ParseError> {
    let mut parser = Parser {
        tokens: tokenize(input),
        pos: 0,
        end_offset: input.len(),
    };
    let expr = parser.parse_or()?;
    if let Some((offset, token)) = parser.peek() {
        return Err(ParseError::new(
            offset,
            format!("unexpected {}", describe(token)),
        ));
    }
    Ok(expr)
}

fn tokenize(input: &str) -> Vec<(usize, Token)> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(offset, ch)) = chars.peek() {
        match ch {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push((offset, Token::LParen));
            }
            ')' => {
                chars.next();
                tokens.push((offset, Token::RParen));
            }
            _ => {
                let mut word = String::new();
                while let Some(&(_, c)) = chars.peek() {
                    if c.is_whitespace() || c == '(' || c == ')' {
                        break;
                    }
                    word.push(c);
                    chars.next();
                }
                let token = match word.as_str() {
                    "AND" => Token::And,
                    "OR" => Token::Or,
                    "NOT" => Token::Not,
                    _ => Token::Tag(word),
                };
                tokens.push((offset, token));
            }
        }
    }
    tokens
}

struct Parser {
    tokens: Vec<(usize, Token)>,
    pos: usize,
    end_offset: usize,
}

impl Parser {
    fn peek(&self) -> Option<(usize, &Token)> {
        self.tokens.get(self.pos).map(|(o, t)| (*o, t))
    }

    fn advance(&mut self) -> Option<(usize, Token)> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn parse_or(&mut self) -> Result<BooleanExpr, ParseError> {
        let mut operands = vec![self.parse_and()?];
        while matches!(self.peek(), Some((_, Token::Or))) {
            self.advance();
            operands.push(self.parse_and()?);
        }
        Ok(if operands.len() == 1 {
            operands.pop().unwrap()
        } else {
            BooleanExpr::Or(operands)
        })
    }

    fn parse_and(&mut self) -> Result<BooleanExpr, ParseError> {
        let mut operands = vec![self.parse_unary()?];
        while matches!(self.peek(), Some((_, Token::And))) {
            self.advance();
            operands.push(self.parse_unary()?);
        }
        Ok(if operands.len() == 1 {
            operands.pop().unwrap()
        } else {
            BooleanExpr::And(operands)
        })
    }

    fn parse_unary(&mut self) -> Result<BooleanExpr, ParseError> {
        if matches!(self.peek(), Some((_, Token::Not))) {
            self.advance();
            return Ok(BooleanExpr::not(self.parse_unary()?));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<BooleanExpr, ParseError> {
        match self.advance() {
            Some((_, Token::Tag(name))) => Ok(BooleanExpr::Tag(name)),
            Some((offset, Token::LParen)) => {
                let inner = self.parse_or()?;
                match self.advance() {
                    Some((_, Token::RParen)) => Ok(inner),
                    Some((o, token)) => Err(ParseError::new(
                        o,
                        format!("expected ')', found {}", describe(&token)),
                    )),
                    None => Err(ParseError::new(
                        self.end_offset,
                        format!("unclosed '(' opened at offset {}", offset),
                    )),
                }
            }
            Some((offset, token)) => Err(ParseError::new(
                offset,
                format!("expected a tag or '(', found {}", describe(&token)),
            )),
            None => Err(ParseError::new(self.end_offset, "unexpected end of expression")),
        }
    }
}

fn describe(token: &Token) -> String {
    match token {
        Token::LParen => "'('".to_string(),
        Token::RParen => "')'".to_string(),
        Token::And => "'AND'".to_string(),
        Token::Or => "'OR'".to_string(),
        Token::Not => "'NOT'".to_string(),
        Token::Tag(name) => format!("'{}'", name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_single_tag() {
        assert_eq!(parse("ai").unwrap(), BooleanExpr::tag("ai"));
    }

    #[test]
    fn and_binds_tighter_than_or() {
        let expr = parse("a AND b OR c").unwrap();
        assert_eq!(
            expr,
            BooleanExpr::or(vec![
                BooleanExpr::and(vec![BooleanExpr::tag("a"), BooleanExpr::tag("b")]),
                BooleanExpr::tag("c"),
            ])
        );
    }

    #[test]
    fn not_binds_tighter_than_and() {
        let expr = parse("NOT a AND b").unwrap();
        assert_eq!(
            expr,
            BooleanExpr::and(vec![
                BooleanExpr::not(BooleanExpr::tag("a")),
                BooleanExpr::tag("b"),
            ])
        );
    }

    #[test]
    fn parens_override_precedence() {
        let expr = parse("(a OR b) AND c").unwrap();
        assert_eq!(
            expr,
            BooleanExpr::and(vec![
                BooleanExpr::or(vec![BooleanExpr::tag("a"), BooleanExpr::tag("b")]),
                BooleanExpr::tag("c"),
            ])
        );
    }

    #[test]
    fn rejects_trailing_operator() {
        let err = parse("a AND").unwrap_err();
        assert_eq!(err.offset, 5);
    }

    #[test]
    fn rejects_unclosed_paren() {
        let err = parse("(a OR b").unwrap_err();
        assert_eq!(err.offset, 7);
    }

    #[test]
    fn reports_offset_of_unexpected_token() {
        let err = parse("a b").unwrap_err();
        assert_eq!(err.offset, 2);
    }

    #[test]
    fn query_string_round_trips() {
        let cases = vec![
            BooleanExpr::tag("a"),
            BooleanExpr::not(BooleanExpr::tag("a")),
            BooleanExpr::and(vec![BooleanExpr::tag("a"), BooleanExpr::tag("b")]),
            BooleanExpr::or(vec![
                BooleanExpr::and(vec![BooleanExpr::tag("a"), BooleanExpr::tag("b")]),
                BooleanExpr::not(BooleanExpr::tag("c")),
            ]),
            BooleanExpr::not(BooleanExpr::or(vec![
                BooleanExpr::tag("a"),
                BooleanExpr::tag("b"),
            ])),
            BooleanExpr::and(vec![
                BooleanExpr::or(vec![BooleanExpr::tag("a"), BooleanExpr::tag("b")]),
                BooleanExpr::tag("c"),
            ]),
        ];
        for expr in cases {
            let reparsed = parse(&expr.query_string()).unwrap();
            assert_eq!(reparsed, expr, "round-trip of {}", expr.query_string());
        }
    }

    #[test]
    fn display_form_is_bracketed() {
        let expr = BooleanExpr::and(vec![BooleanExpr::tag("a"), BooleanExpr::tag("b")]);
        assert_eq!(expr.to_string(), "([a] AND [b])");
    }

    #[test]
    fn evaluator_truth_table() {
        let set = tags(&["x", "y"]);
        assert!(BooleanExpr::tag("x").matches(&set));
        assert!(!BooleanExpr::tag("z").matches(&set));
        assert!(BooleanExpr::and(vec![BooleanExpr::tag("x"), BooleanExpr::tag("y")]).matches(&set));
        assert!(!BooleanExpr::and(vec![BooleanExpr::tag("x"), BooleanExpr::tag("z")]).matches(&set));
        assert!(BooleanExpr::or(vec![BooleanExpr::tag("z"), BooleanExpr::tag("y")]).matches(&set));
        assert!(BooleanExpr::not(BooleanExpr::tag("z")).matches(&set));
    }

    #[test]
    fn empty_and_is_true_empty_or_is_false() {
        let set = tags(&["x"]);
        assert!(BooleanExpr::and(vec![]).matches(&set));
        assert!(!BooleanExpr::or(vec![]).matches(&set));
    }

    #[test]
    fn serde_round_trips() {
        let expr = BooleanExpr::or(vec![
            BooleanExpr::tag("a"),
            BooleanExpr::not(BooleanExpr::tag("b")),
        ]);
        let json = serde_json::to_string(&expr).unwrap();
        let back: BooleanExpr = serde_json::from_str(&json).unwrap();
        assert_eq!(back, expr);
    }
}

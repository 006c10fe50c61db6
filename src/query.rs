//! Wanted-save queries: boolean expressions over the pieces left over after a solve.
//!
//! ```text
//! Or    := And ("||" And)*
//! And   := Unary ("&&" Unary)*
//! Unary := ("!" | "^") Unary | Atom
//! Atom  := "(" Or ")" | "/regex/" | Pieces
//! ```
//!
//! `TI` asks for a save holding at least a T and an I, `/^O/` matches the save text against a
//! regex, `!` negates and `^` ("avoid") asks whether some alternative gets by without the inner
//! expression.

use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::sync::LazyLock;

use itertools::Itertools;
use regex::Regex;

use crate::error::ParseError;
use crate::piece::Queue;

const TOKEN_SPEC: [(&str, &str); 9] = [
    ("OR", r"\|\|"),
    ("AND", "&&"),
    ("NOT", "!"),
    ("AVOID", r"\^"),
    ("LPAREN", r"\("),
    ("RPAREN", r"\)"),
    ("REGEX", "/[^/]+/"),
    ("PIECES", "[TILJSZO]+"),
    ("WS", r"\s+"),
];

static TOKEN_GRAMMAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&TOKEN_SPEC.iter().map(|(name, pattern)| format!("(?P<{name}>{pattern})")).join("|")).unwrap()
});

/// A lexical unit of a query.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Token {
    /// `||`
    Or,
    /// `&&`
    And,
    /// `!`
    Not,
    /// `^`
    Avoid,
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// Regex source with the slashes stripped.
    Regex(String),
    /// A run of piece letters.
    Pieces(String),
}

impl Display for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Or => write!(f, "(OR, '||')"),
            Token::And => write!(f, "(AND, '&&')"),
            Token::Not => write!(f, "(NOT, '!')"),
            Token::Avoid => write!(f, "(AVOID, '^')"),
            Token::LParen => write!(f, "(LPAREN, '(')"),
            Token::RParen => write!(f, "(RPAREN, ')')"),
            Token::Regex(value) => write!(f, "(REGEX, '{value}')"),
            Token::Pieces(value) => write!(f, "(PIECES, '{value}')"),
        }
    }
}

/// Split `text` into tokens, discarding whitespace.
///
/// Fails on the first character no token matches, or when nothing but whitespace is given.
pub fn tokenize(text: &str) -> Result<Vec<Token>, ParseError> {
    let mut tokens = Vec::new();
    let mut position = 0;

    while position < text.len() {
        let unknown = || ParseError::UnknownToken { expression: text.to_string(), remainder: text[position..].to_string() };
        let captures = TOKEN_GRAMMAR.captures_at(text, position).ok_or_else(unknown)?;
        let whole = captures.get(0).filter(|m| m.start() == position).ok_or_else(unknown)?;
        let value = whole.as_str();

        let kind = TOKEN_SPEC.iter().map(|(name, _)| *name).find(|name| captures.name(name).is_some());
        match kind {
            Some("OR") => tokens.push(Token::Or),
            Some("AND") => tokens.push(Token::And),
            Some("NOT") => tokens.push(Token::Not),
            Some("AVOID") => tokens.push(Token::Avoid),
            Some("LPAREN") => tokens.push(Token::LParen),
            Some("RPAREN") => tokens.push(Token::RParen),
            Some("REGEX") => tokens.push(Token::Regex(value[1..value.len() - 1].to_string())),
            Some("PIECES") => tokens.push(Token::Pieces(value.to_string())),
            Some(_) => {}
            None => return Err(unknown()),
        }
        position = whole.end();
    }

    if tokens.is_empty() {
        return Err(ParseError::NoTokens(text.to_string()));
    }
    Ok(tokens)
}

/// Prefix operators.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum UnaryOp {
    /// The operand must not hold.
    Not,
    /// No save may contain the operand's pieces.
    Avoid,
}

/// Infix operators, `&&` binding tighter than `||`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BinaryOp {
    /// Both operands hold.
    And,
    /// Either operand holds.
    Or,
}

/// Parsed query. Built once and evaluated against many rows.
#[derive(Clone, Debug)]
pub enum Ast {
    /// Pieces that must all be present in a save, counting repeats.
    Pieces(Queue),
    /// Some save matches the regex.
    Regex(Regex),
    /// A prefix operator applied to its operand.
    Unary(UnaryOp, Box<Ast>),
    /// An infix operator applied to both operands.
    Binary(BinaryOp, Box<Ast>, Box<Ast>),
}

impl Display for Ast {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Ast::Pieces(pieces) => write!(f, "Pieces({pieces})"),
            Ast::Regex(regex) => write!(f, "Regex(`{}`)", regex.as_str()),
            Ast::Unary(op, expr) => write!(f, "({} {expr})", if *op == UnaryOp::Not { "NOT" } else { "AVOID" }),
            Ast::Binary(op, left, right) => write!(f, "({left} {} {right})", if *op == BinaryOp::And { "AND" } else { "OR" }),
        }
    }
}

/// Parse `expression` into an [`Ast`]. Every token must be consumed.
pub fn parse(expression: &str) -> Result<Ast, ParseError> {
    let tokens = tokenize(expression)?;
    let grammar = Grammar { expression };
    let (ast, rest) = grammar.or(&tokens)?;
    match rest.first() {
        None => Ok(ast),
        Some(token) => Err(ParseError::TrailingInput { expression: expression.to_string(), found: token.to_string() }),
    }
}

type Parsed<'t> = Result<(Ast, &'t [Token]), ParseError>;

/// Recursive descent over a token slice; each rule returns the unconsumed remainder.
struct Grammar<'e> {
    expression: &'e str,
}

impl Grammar<'_> {
    fn or<'t>(&self, tokens: &'t [Token]) -> Parsed<'t> {
        let (mut left, mut rest) = self.and(tokens)?;
        while let Some((Token::Or, after)) = rest.split_first() {
            let (right, remaining) = self.and(after)?;
            left = Ast::Binary(BinaryOp::Or, Box::new(left), Box::new(right));
            rest = remaining;
        }
        Ok((left, rest))
    }

    fn and<'t>(&self, tokens: &'t [Token]) -> Parsed<'t> {
        let (mut left, mut rest) = self.unary(tokens)?;
        while let Some((Token::And, after)) = rest.split_first() {
            let (right, remaining) = self.unary(after)?;
            left = Ast::Binary(BinaryOp::And, Box::new(left), Box::new(right));
            rest = remaining;
        }
        Ok((left, rest))
    }

    fn unary<'t>(&self, tokens: &'t [Token]) -> Parsed<'t> {
        let op = match tokens.first() {
            Some(Token::Not) => UnaryOp::Not,
            Some(Token::Avoid) => UnaryOp::Avoid,
            _ => return self.atom(tokens),
        };
        let (expr, rest) = self.unary(&tokens[1..])?;
        Ok((Ast::Unary(op, Box::new(expr)), rest))
    }

    fn atom<'t>(&self, tokens: &'t [Token]) -> Parsed<'t> {
        let Some((token, rest)) = tokens.split_first() else {
            return Err(ParseError::UnexpectedEnd(self.expression.to_string()));
        };

        match token {
            Token::LParen => {
                let (expr, after) = self.or(rest)?;
                match after.split_first() {
                    Some((Token::RParen, remaining)) => Ok((expr, remaining)),
                    _ => Err(ParseError::UnmatchedParenthesis(self.expression.to_string())),
                }
            }
            Token::Regex(pattern) => Regex::new(pattern)
                .map(|regex| (Ast::Regex(regex), rest))
                .map_err(|e| ParseError::InvalidRegex { pattern: pattern.clone(), reason: e.to_string() }),
            Token::Pieces(pieces) => Ok((Ast::Pieces(pieces.parse()?), rest)),
            other => Err(ParseError::UnexpectedToken { expression: self.expression.to_string(), found: other.to_string() }),
        }
    }
}

/// Result type of one evaluation mode.
///
/// Both modes share [`visit`]; they differ only in how literal matches are folded and how
/// negation works.
pub(crate) trait Outcome: Sized {
    fn from_matches(matches: impl Iterator<Item = bool>) -> Self;
    fn complement(self, len: usize) -> Self;
    fn holds(&self) -> bool;
}

impl Outcome for bool {
    fn from_matches(mut matches: impl Iterator<Item = bool>) -> Self {
        matches.any(|m| m)
    }

    fn complement(self, _len: usize) -> Self {
        !self
    }

    fn holds(&self) -> bool {
        *self
    }
}

/// Indices of the saves that satisfy an expression, ascending.
impl Outcome for Vec<usize> {
    fn from_matches(matches: impl Iterator<Item = bool>) -> Self {
        matches.positions(|m| m).collect()
    }

    fn complement(self, len: usize) -> Self {
        (0..len).filter(|index| self.binary_search(index).is_err()).collect()
    }

    fn holds(&self) -> bool {
        !self.is_empty()
    }
}

pub(crate) fn visit<O: Outcome>(ast: &Ast, saves: &[Queue]) -> O {
    match ast {
        Ast::Pieces(pieces) => O::from_matches(saves.iter().map(|save| pieces.is_multiset_subset_of(save))),
        Ast::Regex(regex) => O::from_matches(saves.iter().map(|save| regex.is_match(&save.to_string()))),
        Ast::Unary(UnaryOp::Not, expr) => visit::<O>(expr, saves).complement(saves.len()),
        Ast::Unary(UnaryOp::Avoid, expr) => O::from_matches(
            saves.iter().map(|save| !visit::<O>(expr, std::slice::from_ref(save)).holds())
        ),
        Ast::Binary(op, left, right) => {
            let left = visit::<O>(left, saves);
            match op {
                BinaryOp::And if !left.holds() => left,
                BinaryOp::Or if left.holds() => left,
                // AND with a satisfied left side yields the right side as is, not an intersection
                _ => visit(right, saves),
            }
        }
    }
}

/// Whether `ast` accepts the row whose save alternatives are `saves`.
pub fn evaluate(ast: &Ast, saves: &[Queue]) -> bool {
    visit(ast, saves)
}

/// Indices of the save alternatives `ast` accepts.
pub fn evaluate_all(ast: &Ast, saves: &[Queue]) -> Vec<usize> {
    visit(ast, saves)
}

/// A parsed wanted-save query together with its source text.
#[derive(Clone, Debug)]
pub struct WantedSave {
    expression: String,
    ast: Ast,
}

impl WantedSave {
    /// Parse `expression`, keeping its text.
    pub fn parse(expression: &str) -> Result<Self, ParseError> {
        Ok(Self { expression: expression.to_string(), ast: parse(expression)? })
    }

    /// The text the query was parsed from.
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// The parsed expression.
    pub fn ast(&self) -> &Ast {
        &self.ast
    }

    /// Whether any save satisfies the query.
    pub fn matches(&self, saves: &[Queue]) -> bool {
        evaluate(&self.ast, saves)
    }

    /// Positions of the saves satisfying the query.
    pub fn matching_indices(&self, saves: &[Queue]) -> Vec<usize> {
        evaluate_all(&self.ast, saves)
    }
}

impl FromStr for WantedSave {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Index of the first query accepting `saves`.
pub fn first_match(queries: &[WantedSave], saves: &[Queue]) -> Option<usize> {
    queries.iter().position(|query| query.matches(saves))
}

use std::sync::LazyLock;

use regex::Regex;

use crate::error::ParseError;
use crate::piece::{Piece, Queue, BAG};

static SLICE_PREFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(?:(\d*)-)?(\d+):").unwrap());
static COUNT_CLAUSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([\[\]TILJSZO*]+)([<>]|[<>=!]?=)(\d+)$").unwrap());
static BEFORE_CLAUSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([\[\]TILJSZO*]+)<([\[\]TILJSZO*]+)$").unwrap());
static REGEX_CLAUSE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^/(.+)/$").unwrap());

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum BoolOp {
    And,
    Or,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Relation {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

impl Relation {
    fn parse(text: &str) -> Option<Self> {
        match text {
            "=" | "==" => Some(Self::Eq),
            "!=" => Some(Self::Ne),
            "<" => Some(Self::Lt),
            ">" => Some(Self::Gt),
            "<=" => Some(Self::Le),
            ">=" => Some(Self::Ge),
            _ => None,
        }
    }

    fn holds(self, count: usize, number: usize) -> bool {
        match self {
            Self::Eq => count == number,
            Self::Ne => count != number,
            Self::Lt => count < number,
            Self::Gt => count > number,
            Self::Le => count <= number,
            Self::Ge => count >= number,
        }
    }
}

/// Pieces named in a count or before clause. `any` marks `[...]` set notation.
#[derive(Clone, Debug)]
struct PieceGroup {
    pieces: Vec<Piece>,
    any: bool,
}

#[derive(Copy, Clone, Debug, Default)]
struct Prefix {
    // start, end
    slice: Option<(usize, usize)>,
    negate: bool,
}

impl Prefix {
    fn apply(&self, queue: &Queue) -> Queue {
        match self.slice {
            None => queue.clone(),
            Some((start, end)) => queue.slice(start, end),
        }
    }
}

#[derive(Clone, Debug)]
enum Predicate {
    Group(Modifier),
    Count { groups: Vec<PieceGroup>, relation: Relation, number: usize },
    Before { before: Vec<PieceGroup>, after: Vec<PieceGroup> },
    Regex(Regex),
}

#[derive(Clone, Debug)]
struct Clause {
    prefix: Prefix,
    predicate: Predicate,
}

/// A compiled `{...}` modifier, evaluated left to right without precedence.
#[derive(Clone, Debug, Default)]
pub(crate) struct Modifier {
    clauses: Vec<(BoolOp, Clause)>,
    has_or: bool,
}

/// Raw structure of a modifier before clauses are classified.
enum Element {
    Term(String),
    Operator(BoolOp),
    Group { prefix: String, children: Vec<Element> },
}

impl Modifier {
    /// Parse the modifier whose body starts at `start`, just past the `{`.
    ///
    /// Returns the modifier and the index of the closing `}`.
    pub(crate) fn parse_braced(chars: &[char], start: usize) -> Result<(Self, usize), ParseError> {
        let source: String = chars[start.saturating_sub(1)..].iter().collect();
        let (elements, end) = read_elements(chars, start, 0, &source)?;
        Ok((compile(elements, &source)?, end))
    }

    /// Whether `queue` passes the modifier. An empty modifier passes everything.
    pub(crate) fn check(&self, queue: &Queue) -> bool {
        let mut value = true;
        for (op, clause) in &self.clauses {
            let holds = clause.holds(queue);
            value = match op {
                BoolOp::And => value && holds,
                BoolOp::Or => value || holds,
            };
            if !value && !self.has_or {
                return false;
            }
        }
        value
    }
}

impl Clause {
    fn holds(&self, queue: &Queue) -> bool {
        let sub_queue = self.prefix.apply(queue);
        let result = match &self.predicate {
            Predicate::Group(modifier) => modifier.check(&sub_queue),
            Predicate::Count { groups, relation, number } => groups.iter().all(|group| {
                let test = |piece: &Piece| relation.holds(sub_queue.count(*piece), *number);
                if group.any {
                    group.pieces.iter().any(test)
                } else {
                    group.pieces.iter().all(test)
                }
            }),
            Predicate::Before { before, after } => before
                .iter()
                .all(|b| after.iter().all(|a| before_holds(b, a, &sub_queue))),
            Predicate::Regex(regex) => regex.is_match(&sub_queue.to_string()),
        };
        result != self.prefix.negate
    }
}

/// Every piece of `before` shows up before any piece of `after`.
///
/// Set notation on `before` accepts the first of its pieces; set notation on `after` only fails
/// once every one of its pieces has been seen.
fn before_holds(before: &PieceGroup, after: &PieceGroup, queue: &Queue) -> bool {
    let mut remaining_before = before.pieces.clone();
    let mut remaining_after = after.pieces.clone();

    for piece in queue.iter() {
        if let Some(position) = remaining_after.iter().position(|p| *p == piece) {
            if !after.any {
                return false;
            }
            remaining_after.remove(position);
            if remaining_after.is_empty() {
                return false;
            }
        } else if let Some(position) = remaining_before.iter().position(|p| *p == piece) {
            if before.any {
                return true;
            }
            remaining_before.remove(position);
            if remaining_before.is_empty() {
                return true;
            }
        }
    }

    false
}

fn read_elements(chars: &[char], mut index: usize, depth: usize, source: &str) -> Result<(Vec<Element>, usize), ParseError> {
    let mut elements = Vec::new();
    let mut term = String::new();

    while index < chars.len() {
        let char = chars[index];
        match char {
            '/' => {
                let closing = chars[index + 1..].iter().position(|c| *c == '/')
                    .map(|offset| index + 1 + offset)
                    .ok_or_else(|| ParseError::UnclosedRegex(chars[index..].iter().collect()))?;
                term.extend(&chars[index..=closing]);
                index = closing;
            }
            '(' => {
                let (children, end) = read_elements(chars, index + 1, depth + 1, source)?;
                elements.push(Element::Group { prefix: std::mem::take(&mut term), children });
                index = end;
            }
            ')' => {
                if depth == 0 {
                    return Err(ParseError::UnmatchedParenthesis(source.to_string()));
                }
                if !term.is_empty() {
                    elements.push(Element::Term(term));
                }
                return Ok((elements, index));
            }
            '&' | '|' => {
                if !term.is_empty() {
                    elements.push(Element::Term(std::mem::take(&mut term)));
                }
                if chars.get(index + 1) != Some(&char) {
                    return Err(ParseError::LoneOperator(char));
                }
                elements.push(Element::Operator(if char == '&' { BoolOp::And } else { BoolOp::Or }));
                index += 1;
            }
            '}' => {
                if depth != 0 {
                    return Err(ParseError::UnmatchedParenthesis(source.to_string()));
                }
                if !term.is_empty() {
                    elements.push(Element::Term(term));
                }
                return Ok((elements, index));
            }
            c if c.is_whitespace() => {}
            c => term.push(c),
        }
        index += 1;
    }

    if depth != 0 {
        return Err(ParseError::UnmatchedParenthesis(source.to_string()));
    }
    Err(ParseError::UnclosedModifier(source.to_string()))
}

fn compile(elements: Vec<Element>, source: &str) -> Result<Modifier, ParseError> {
    let mut modifier = Modifier::default();
    let mut pending: Option<BoolOp> = None;

    for element in elements {
        let clause = match element {
            Element::Operator(op) => {
                if modifier.clauses.is_empty() || pending.is_some() {
                    return Err(ParseError::IncompleteModifier(source.to_string()));
                }
                modifier.has_or |= op == BoolOp::Or;
                pending = Some(op);
                continue;
            }
            Element::Term(text) => {
                let (prefix, rest) = split_prefix(&text);
                Clause { prefix, predicate: classify(rest)? }
            }
            Element::Group { prefix: text, children } => {
                let (prefix, rest) = split_prefix(&text);
                if !rest.is_empty() {
                    return Err(ParseError::UnrecognizedModifier(text));
                }
                Clause { prefix, predicate: Predicate::Group(compile(children, source)?) }
            }
        };

        let op = match pending.take() {
            Some(op) => op,
            None if modifier.clauses.is_empty() => BoolOp::And,
            None => return Err(ParseError::IncompleteModifier(source.to_string())),
        };
        modifier.clauses.push((op, clause));
    }

    if pending.is_some() {
        return Err(ParseError::IncompleteModifier(source.to_string()));
    }
    Ok(modifier)
}

/// Strip slice (`a-b:` or `n:`) and negation (`!`) prefixes; the last slice wins.
fn split_prefix(mut text: &str) -> (Prefix, &str) {
    let mut prefix = Prefix::default();

    loop {
        if let Some(captures) = SLICE_PREFIX.captures(text) {
            // digits only, already matched by the regex
            let end = captures[2].parse().unwrap_or(usize::MAX);
            let start = captures.get(1).map_or(0, |m| m.as_str().parse().unwrap_or(0));
            prefix.slice = Some((start, end));
            text = &text[captures[0].len()..];
        } else if let Some(rest) = text.strip_prefix('!') {
            prefix.negate = !prefix.negate;
            text = rest;
        } else {
            return (prefix, text);
        }
    }
}

fn classify(text: &str) -> Result<Predicate, ParseError> {
    if let Some(captures) = COUNT_CLAUSE.captures(text) {
        let relation = Relation::parse(&captures[2])
            .ok_or_else(|| ParseError::UnrecognizedModifier(text.to_string()))?;
        let number = captures[3].parse()
            .map_err(|_| ParseError::UnrecognizedModifier(text.to_string()))?;
        return Ok(Predicate::Count { groups: piece_groups(&captures[1])?, relation, number });
    }

    if let Some(captures) = BEFORE_CLAUSE.captures(text) {
        return Ok(Predicate::Before {
            before: piece_groups(&captures[1])?,
            after: piece_groups(&captures[2])?,
        });
    }

    if let Some(captures) = REGEX_CLAUSE.captures(text) {
        let pattern = &captures[1];
        return Regex::new(pattern)
            .map(Predicate::Regex)
            .map_err(|e| ParseError::InvalidRegex { pattern: pattern.to_string(), reason: e.to_string() });
    }

    Err(ParseError::UnrecognizedModifier(text.to_string()))
}

/// Split `TI[SZ]O` into plain runs and bracketed sets.
fn piece_groups(text: &str) -> Result<Vec<PieceGroup>, ParseError> {
    let mut groups = Vec::new();
    let mut rest = text;

    while !rest.is_empty() {
        let (body, any, remainder) = if let Some(inner) = rest.strip_prefix('[') {
            let close = inner.find(']').ok_or_else(|| ParseError::UnmatchedBracket(text.to_string()))?;
            (&inner[..close], true, &inner[close + 1..])
        } else {
            let end = rest.find('[').unwrap_or(rest.len());
            (&rest[..end], false, &rest[end..])
        };

        if body.is_empty() || body.contains(['[', ']']) {
            return Err(ParseError::UnmatchedBracket(text.to_string()));
        }

        let pieces = if body == "*" {
            BAG.to_vec()
        } else {
            body.chars().map(Piece::try_from).collect::<Result<Vec<_>, _>>()
                .map_err(|_| ParseError::UnrecognizedModifier(text.to_string()))?
        };
        groups.push(PieceGroup { pieces, any });
        rest = remainder;
    }

    Ok(groups)
}

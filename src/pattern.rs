//! Expansion of extended sfinder-style piece patterns into concrete queues.
//!
//! # Notation
//! A pattern is a sequence of piece specs, each one of
//! * a single piece such as `T`,
//! * the wildcard `*` standing for all seven pieces,
//! * a set `[TIL]` or an exclusion set `[^TIL]`,
//!
//! optionally followed by `!` (every permutation of the set's pieces) or `p<N>` (every ordered
//! selection of `N` distinct pieces). Consecutive specs multiply out: `T[IO]` is `TI` and `TO`.
//!
//! Parentheses group specs, commas separate spans, and a `{...}` modifier after a span filters
//! the queues of that span, e.g. `*p4{T<I && !/^O/}`. See the [`modifier`](crate::modifier)
//! grammar for what a modifier accepts. Several patterns may be given at once separated by `;`
//! or newlines; their queues are merged.
//!
//! Results are deduplicated and sorted with the [`Queue`] ordering, so expanding the same pattern
//! twice always yields the same list.

use std::collections::BTreeSet;

use itertools::Itertools;
use tracing::debug;

use crate::error::ParseError;
use crate::modifier::Modifier;
use crate::piece::{Piece, Queue, BAG};

/// Expand `input` into every queue it describes, sorted and without duplicates.
pub fn expand(input: &str) -> Result<Vec<Queue>, ParseError> {
    let mut queues = BTreeSet::new();
    for pattern in input.split(['\n', ';']).filter(|p| !p.trim().is_empty()) {
        queues.extend(Expander::new(pattern).expand()?);
    }
    debug!(pattern = input, queues = queues.len(), "expanded pattern");
    Ok(queues.into_iter().collect())
}

/// The sorted expansion of a pattern, kept around for repeated containment checks.
#[derive(Clone, Debug)]
pub struct ExpandedPattern {
    pattern: String,
    queues: Vec<Queue>,
}

impl ExpandedPattern {
    /// Expand `pattern` once for repeated lookups.
    pub fn new(pattern: &str) -> Result<Self, ParseError> {
        Ok(Self { pattern: pattern.to_string(), queues: expand(pattern)? })
    }

    /// The source pattern.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Queues in expansion order.
    pub fn queues(&self) -> &[Queue] {
        &self.queues
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.queues.len()
    }

    /// Whether there are no entries.
    pub fn is_empty(&self) -> bool {
        self.queues.is_empty()
    }

    /// Index of `queue` in the sorted expansion, found by binary search.
    pub fn position(&self, queue: &Queue) -> Option<usize> {
        self.queues.binary_search(queue).ok()
    }

    /// Whether `queue` is one of the expanded queues.
    pub fn contains(&self, queue: &Queue) -> bool {
        self.position(queue).is_some()
    }
}

/// Where `queue` sits in the expansion of `pattern`, if it is there at all.
///
/// Fails when `queue` holds anything but pieces or when `pattern` does not parse.
/// Expand once with [`ExpandedPattern`] when checking many queues against one pattern.
pub fn pieces_contains(queue: &str, pattern: &str) -> Result<Option<usize>, ParseError> {
    let queue: Queue = queue.parse()?;
    Ok(ExpandedPattern::new(pattern)?.position(&queue))
}

/// Mirror every run of piece letters in `pattern` (L and J swap, S and Z swap), writing each
/// mirrored run in rank order.
///
/// A letter directly followed by a lowercase character is left untouched.
pub fn mirror_pattern(pattern: &str) -> String {
    let chars = pattern.chars().collect_vec();
    let mut mirrored = String::with_capacity(pattern.len());
    let mut index = 0;

    while index < chars.len() {
        let run_length = chars[index..].iter().take_while(|c| Piece::try_from(**c).is_ok()).count();
        if run_length == 0 {
            mirrored.push(chars[index]);
            index += 1;
            continue;
        }

        let run = &chars[index..index + run_length];
        let followed_by_lowercase = chars.get(index + run_length).is_some_and(|c| c.is_ascii_lowercase());
        let (to_mirror, kept) = if followed_by_lowercase {
            run.split_at(run_length - 1)
        } else {
            (run, &[][..])
        };

        let queue: Queue = to_mirror.iter().filter_map(|c| Piece::try_from(*c).ok()).collect();
        mirrored.push_str(&queue.mirrored().sorted().to_string());
        mirrored.extend(kept);
        index += run_length;
    }

    mirrored
}

/// Cartesian product of queue sets, concatenating in order.
pub(crate) fn product(parts: &[Vec<Queue>]) -> Vec<Queue> {
    parts.iter().fold(vec![Queue::default()], |acc, part| {
        acc.iter()
            .cartesian_product(part.iter())
            .map(|(prefix, suffix)| prefix.concat(suffix))
            .collect()
    })
}

#[derive(Copy, Clone, Debug)]
enum Permutation {
    All,
    Choose(usize),
}

/// One primitive piece spec plus its permutation suffix.
struct PieceSpec {
    source: String,
    pieces: Vec<Piece>,
    permutation: Option<Permutation>,
}

impl PieceSpec {
    fn queues(&self, pattern: &str) -> Result<Vec<Queue>, ParseError> {
        let length = match self.permutation {
            None => return Ok(self.pieces.iter().unique().map(|piece| Queue::new(vec![*piece])).collect()),
            Some(Permutation::All) => self.pieces.len(),
            Some(Permutation::Choose(length)) => length,
        };

        if length > self.pieces.len() {
            return Err(ParseError::PermutationTooLong {
                pattern: pattern.to_string(),
                pieces: self.source.clone(),
                length,
                available: self.pieces.len(),
            });
        }

        Ok(self.pieces.iter()
            .copied()
            .permutations(length)
            .map(Queue::new)
            .unique()
            .collect())
    }
}

struct Expander<'p> {
    pattern: &'p str,
    chars: Vec<char>,
}

impl<'p> Expander<'p> {
    fn new(pattern: &'p str) -> Self {
        Self { pattern, chars: pattern.chars().collect() }
    }

    fn expand(&self) -> Result<Vec<Queue>, ParseError> {
        self.group(0, 0).map(|(queues, _)| queues)
    }

    /// Expand from `index` until the matching `)` (or the end at depth 0).
    ///
    /// Returns the queues and the index of the closing `)`.
    fn group(&self, mut index: usize, depth: usize) -> Result<(Vec<Queue>, usize), ParseError> {
        // products of finished comma-separated spans
        let mut spans: Vec<Vec<Queue>> = Vec::new();
        // pieces of the current span, multiplied out when the span ends
        let mut stack: Vec<Vec<Queue>> = Vec::new();
        let mut pieces = String::new();

        while index < self.chars.len() {
            match self.chars[index] {
                ',' => {
                    self.flush(&mut pieces, &mut stack)?;
                    spans.push(product(&stack));
                    stack.clear();
                }
                '(' => {
                    self.flush(&mut pieces, &mut stack)?;
                    let (sub_queues, end) = self.group(index + 1, depth + 1)?;
                    stack.push(sub_queues);
                    index = end;
                }
                ')' => {
                    if depth == 0 {
                        return Err(ParseError::UnmatchedParenthesis(self.chars[..=index].iter().collect()));
                    }
                    self.flush(&mut pieces, &mut stack)?;
                    spans.push(product(&stack));
                    return Ok((product(&spans), index));
                }
                '{' => {
                    self.flush(&mut pieces, &mut stack)?;
                    let (modifier, end) = Modifier::parse_braced(&self.chars, index + 1)?;
                    let filtered = product(&stack).into_iter().filter(|queue| modifier.check(queue)).collect();
                    stack.clear();
                    stack.push(filtered);
                    index = end;
                }
                c if c.is_whitespace() => {}
                c => pieces.push(c),
            }
            index += 1;
        }

        if depth != 0 {
            return Err(ParseError::UnmatchedParenthesis(self.pattern.to_string()));
        }

        self.flush(&mut pieces, &mut stack)?;
        spans.push(product(&stack));
        Ok((product(&spans), index))
    }

    fn flush(&self, pieces: &mut String, stack: &mut Vec<Vec<Queue>>) -> Result<(), ParseError> {
        if !pieces.is_empty() {
            let specs = self.piece_specs(pieces)?;
            let parts = specs.iter().map(|spec| spec.queues(self.pattern)).collect::<Result<Vec<_>, _>>()?;
            stack.push(product(&parts));
            pieces.clear();
        }
        Ok(())
    }

    /// Split plain sfinder notation such as `T*p3[^O]!` into its piece specs.
    fn piece_specs(&self, text: &str) -> Result<Vec<PieceSpec>, ParseError> {
        let chars = text.chars().collect_vec();
        let mut specs = Vec::new();
        let mut index = 0;

        while index < chars.len() {
            let (pieces, next) = match chars[index] {
                '*' => (BAG.to_vec(), index + 1),
                '[' => {
                    let close = chars[index..].iter().position(|c| *c == ']')
                        .map(|offset| index + offset)
                        .ok_or_else(|| ParseError::UnmatchedBracket(text.to_string()))?;
                    let inner = &chars[index + 1..close];
                    let (negated, letters) = match inner.split_first() {
                        Some((&'^', rest)) => (true, rest),
                        _ => (false, inner),
                    };
                    if letters.is_empty() {
                        return Err(ParseError::UnrecognizedPieces(chars[index..=close].iter().collect()));
                    }
                    let letters = letters.iter().map(|c| Piece::try_from(*c)).collect::<Result<Vec<_>, _>>()?;
                    let pieces = if negated {
                        BAG.iter().copied().filter(|piece| !letters.contains(piece)).collect_vec()
                    } else {
                        letters
                    };
                    if pieces.is_empty() {
                        return Err(ParseError::EmptyPieceSet(chars[index..=close].iter().collect()));
                    }
                    (pieces, close + 1)
                }
                ']' => return Err(ParseError::UnmatchedBracket(text.to_string())),
                '<' => return Err(ParseError::FileInclusion(chars[index..].iter().collect())),
                c => (vec![Piece::try_from(c)?], index + 1),
            };

            let (permutation, after) = match chars.get(next) {
                Some('!') => (Some(Permutation::All), next + 1),
                Some('p') => {
                    let digits = chars[next + 1..].iter().take_while(|c| c.is_ascii_digit()).count();
                    let length: usize = chars[next + 1..next + 1 + digits].iter().collect::<String>().parse()
                        .map_err(|_| ParseError::UnrecognizedPieces(text.to_string()))?;
                    if length == 0 {
                        return Err(ParseError::UnrecognizedPieces(text.to_string()));
                    }
                    (Some(Permutation::Choose(length)), next + 1 + digits)
                }
                _ => (None, next),
            };

            specs.push(PieceSpec { source: chars[index..next].iter().collect(), pieces, permutation });
            index = after;
        }

        Ok(specs)
    }
}

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::{Display, Formatter};
use tracing::{debug_span, error};

use crate::bound::Bound;
use crate::char_set::CharSet;
use crate::error::{Error, Result};
use crate::rng::Rng;

/// Budget used by [`Regex::generate`] when the tree has no finite upper length.
const UNBOUNDED_BUDGET: u32 = (1 << 31) - 2;

/// Attempt cap for reject-sampling an intersection. May be raised, never removed:
/// it is the only termination guard against unproductive intersections.
const MAX_SAMPLING_ATTEMPTS: u32 = 100;

// -------------------------------------------------------------------------------------------------
// QuantifierKind
// -------------------------------------------------------------------------------------------------
/// How a quantifier is written. Affects rendering only; generation and
/// matching are identical for all three.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Copy, Clone, Serialize, Deserialize)]
pub enum QuantifierKind {
    Greedy,
    Reluctant,
    Possessive,
}

// -------------------------------------------------------------------------------------------------
// Regex
// -------------------------------------------------------------------------------------------------
/// Data representation of a regex language, oriented towards *generating*
/// matching strings rather than recognising them.
///
/// A value of this type is an immutable expression tree. The three core
/// operations are kept mutually consistent:
///
/// - [`generate`](Regex::generate) samples a random string of the language,
///   threading a pure functional [`Rng`] and a length budget through the tree;
/// - [`test`](Regex::test) answers full-string membership;
/// - [`negate`](Regex::negate) produces an opposing generator whose `test`
///   inverts this one's (structurally, not as an exact Boolean complement; see
///   the method docs).
///
/// Trees are built with the constructors ([`literal`](Regex::literal),
/// [`class`](Regex::class), [`concat`](Regex::concat), …) and refined with
/// [`quantify`](Regex::quantify) and [`sized`](Regex::sized). Matching on the
/// variants is supported and exhaustive; the constructors additionally enforce
/// the non-empty-children conventions that the operations assume.
#[derive(PartialEq, Eq, Hash, Debug, Clone, Serialize, Deserialize)]
pub enum Regex {
    /// A fixed string, optionally matched case-insensitively (ASCII).
    Literal { text: String, case_insensitive: bool },

    /// A single character drawn from a class.
    Class(CharSet),

    /// Sequential composition.
    Concat(Vec<Regex>),

    /// Alternation: any child may match.
    Union(Vec<Regex>),

    /// Conjunction: every child must match.
    Intersection(Vec<Regex>),

    /// Repetition of a child between `min` and `max` times.
    Quantified {
        child: Box<Regex>,
        min: u32,
        max: Bound,
        kind: QuantifierKind,
    },

    /// An upper limit on generated length. Constrains generation only;
    /// matching is unaffected.
    Sized { child: Box<Regex>, size: u32 },
}

impl Regex {
    /// The empty regex: matches exactly the empty string.
    pub fn empty() -> Regex {
        Regex::Literal {
            text: String::new(),
            case_insensitive: false,
        }
    }

    /// A literal string, matched exactly.
    pub fn literal(text: impl Into<String>) -> Regex {
        Regex::Literal {
            text: text.into(),
            case_insensitive: false,
        }
    }

    /// A literal string, matched up to ASCII case.
    pub fn literal_case_insensitive(text: impl Into<String>) -> Regex {
        Regex::Literal {
            text: text.into(),
            case_insensitive: true,
        }
    }

    /// A single character from the given class.
    pub fn class(set: CharSet) -> Regex {
        Regex::Class(set)
    }

    /// `.` with no flags: any character except line terminators.
    pub fn any() -> Regex {
        Regex::Class(CharSet::all())
    }

    /// `.` under DOTALL: any BMP character.
    pub fn any_dotall() -> Regex {
        Regex::Class(CharSet::dotall())
    }

    /// `.` under UNIX_LINES: any character except `\n`.
    pub fn any_unix_lines() -> Regex {
        Regex::Class(CharSet::unix_lines())
    }

    /// Sequential concatenation of the given regexes.
    pub fn concat(children: Vec<Regex>) -> Result<Regex> {
        if children.is_empty() {
            return Err(Error::EmptyChildren("concat"));
        }
        Ok(Regex::Concat(children))
    }

    /// Alternation over the given regexes.
    pub fn union(children: Vec<Regex>) -> Result<Regex> {
        if children.is_empty() {
            return Err(Error::EmptyChildren("union"));
        }
        Ok(Regex::Union(children))
    }

    /// Conjunction over the given regexes.
    pub fn intersection(children: Vec<Regex>) -> Result<Regex> {
        if children.is_empty() {
            return Err(Error::EmptyChildren("intersection"));
        }
        Ok(Regex::Intersection(children))
    }

    /// Repeat this regex between `min` and `max` times.
    ///
    /// Returns the receiver unchanged when `min` and `max` are both 1.
    pub fn quantify(
        self,
        min: u32,
        max: impl Into<Bound>,
        kind: QuantifierKind,
    ) -> Result<Regex> {
        let max = max.into();
        if let Bound::Finite(m) = max {
            if min > m {
                return Err(Error::InvalidRange { min, max });
            }
        }
        if min == 1 && max == Bound::Finite(1) {
            return Ok(self);
        }
        Ok(Regex::Quantified {
            child: Box::new(self),
            min,
            max,
            kind,
        })
    }

    /// Limit generated strings to at most `size` characters.
    ///
    /// Returns the receiver unchanged when its maximum length already fits.
    pub fn sized(self, size: u32) -> Result<Regex> {
        let min_length = self.min_length();
        if size < min_length {
            return Err(Error::SizeTooSmall { size, min_length });
        }
        if let Bound::Finite(m) = self.max_length() {
            if m <= size {
                return Ok(self);
            }
        }
        Ok(Regex::Sized {
            child: Box::new(self),
            size,
        })
    }

    /// Minimal possible length, in characters, of strings of this language.
    pub fn min_length(&self) -> u32 {
        match self {
            Regex::Literal { text, .. } => text.chars().count() as u32,
            Regex::Class(_) => 1,
            Regex::Concat(children) => children
                .iter()
                .fold(0, |acc, child| acc.saturating_add(child.min_length())),
            Regex::Union(children) => {
                children.iter().map(Regex::min_length).min().unwrap_or(0)
            }
            Regex::Intersection(children) => {
                children.iter().map(Regex::min_length).max().unwrap_or(0)
            }
            Regex::Quantified { child, min, .. } => child.min_length().saturating_mul(*min),
            Regex::Sized { child, size } => child.min_length().min(*size),
        }
    }

    /// Maximal possible length, in characters, of strings of this language.
    pub fn max_length(&self) -> Bound {
        match self {
            Regex::Literal { text, .. } => Bound::Finite(text.chars().count() as u32),
            Regex::Class(_) => Bound::Finite(1),
            Regex::Concat(children) => children
                .iter()
                .fold(Bound::Finite(0), |acc, child| {
                    acc.saturating_add(child.max_length())
                }),
            Regex::Union(children) => children
                .iter()
                .map(Regex::max_length)
                .max()
                .unwrap_or(Bound::Finite(0)),
            Regex::Intersection(children) => children
                .iter()
                .map(Regex::max_length)
                .fold(Bound::Unbounded, Bound::tighten),
            Regex::Quantified { child, max, .. } => match *max {
                Bound::Finite(k) => child.max_length().saturating_mul(k),
                // an unbounded count of a zero-length child still yields nothing
                Bound::Unbounded => match child.max_length() {
                    Bound::Finite(0) => Bound::Finite(0),
                    _ => Bound::Unbounded,
                },
            },
            Regex::Sized { child, size } => match child.max_length() {
                Bound::Finite(m) => Bound::Finite(m.min(*size)),
                Bound::Unbounded => Bound::Finite(*size),
            },
        }
    }

    /// Does this regex match only the empty string?
    fn matches_empty_only(&self) -> bool {
        self.min_length() == 0 && self.max_length() == Bound::Finite(0)
    }

    /// Sample one random string of this language.
    ///
    /// The budget is the maximum length when finite, and a large sentinel
    /// otherwise. The only possible failure is
    /// [`Error::IntersectionExhausted`].
    pub fn generate<R: Rng>(&self, rng: R) -> Result<String> {
        let _span = debug_span!("Regex::generate").entered();
        let budget = match self.max_length() {
            Bound::Finite(n) => n,
            Bound::Unbounded => UNBOUNDED_BUDGET,
        };
        let (_, out) = self.apply(rng, budget)?;
        Ok(out)
    }

    /// Sample one random string of this language, at most `budget` characters
    /// long.
    pub fn generate_with_budget<R: Rng>(&self, rng: R, budget: u32) -> Result<String> {
        let _span = debug_span!("Regex::generate_with_budget").entered();
        let (_, out) = self.apply(rng, budget)?;
        Ok(out)
    }

    /// The generation walker: produces the successor RNG state and a string no
    /// longer than `budget`.
    fn apply<R: Rng>(&self, rng: R, budget: u32) -> Result<(R, String)> {
        let min_length = self.min_length();
        if budget < min_length {
            return Err(Error::BudgetTooSmall { budget, min_length });
        }
        match self {
            Regex::Literal {
                text,
                case_insensitive,
            } => {
                if *case_insensitive {
                    let mut rng = rng;
                    let mut out = String::with_capacity(text.len());
                    for ch in text.chars() {
                        if ch.is_ascii_lowercase() {
                            let (next, flip) = rng.gen_bool();
                            rng = next;
                            out.push(if flip { ch.to_ascii_uppercase() } else { ch });
                        } else if ch.is_ascii_uppercase() {
                            let (next, flip) = rng.gen_bool();
                            rng = next;
                            out.push(if flip { ch.to_ascii_lowercase() } else { ch });
                        } else {
                            out.push(ch);
                        }
                    }
                    Ok((rng, out))
                } else {
                    // burn one draw so RNG consumption does not depend on the flag
                    let (rng, _) = rng.gen_bool();
                    Ok((rng, text.clone()))
                }
            }

            Regex::Class(set) => {
                let (rng, seed) = rng.gen_u64();
                Ok((rng, set.sample(seed).to_string()))
            }

            Regex::Concat(children) => {
                let mut rng = rng;
                let mut slack = budget - min_length;
                let mut out = String::with_capacity(min_length as usize + 16);
                for child in children {
                    let child_min = child.min_length();
                    let (next, chunk) = child.apply(rng, slack + child_min)?;
                    rng = next;
                    slack = slack.saturating_sub(chunk.chars().count() as u32 - child_min);
                    out.push_str(&chunk);
                }
                Ok((rng, out))
            }

            Regex::Union(children) => {
                let fits: Vec<&Regex> = children
                    .iter()
                    .filter(|child| child.min_length() <= budget)
                    .collect();
                if fits.is_empty() {
                    return Err(Error::BudgetTooSmall { budget, min_length });
                }
                let (rng, index) = rng.gen_u32(fits.len() as u32);
                fits[index as usize].apply(rng, budget)
            }

            Regex::Intersection(children) => {
                let Some((first, rest)) = children.split_first() else {
                    return Ok((rng, String::new()));
                };
                let mut rng = rng;
                for _ in 0..MAX_SAMPLING_ATTEMPTS {
                    let (next, candidate) = first.apply(rng, budget)?;
                    rng = next;
                    if rest.iter().all(|child| child.test(&candidate)) {
                        return Ok((rng, candidate));
                    }
                }
                error!(
                    "intersection generation exhausted after {} attempts: {}",
                    MAX_SAMPLING_ATTEMPTS, self
                );
                Err(Error::IntersectionExhausted {
                    attempts: MAX_SAMPLING_ATTEMPTS,
                })
            }

            Regex::Quantified {
                child, min, max, ..
            } => {
                let child_min = child.min_length();
                let mut rng = rng;
                let mut remaining = budget - min_length;
                let mut out = String::with_capacity(min_length as usize + 16);
                for _ in 0..*min {
                    let (next, chunk) = child.apply(rng, remaining + child_min)?;
                    rng = next;
                    remaining =
                        remaining.saturating_sub(chunk.chars().count() as u32 - child_min);
                    out.push_str(&chunk);
                }
                let mut count = *min;
                while child_min <= remaining
                    && match max {
                        Bound::Finite(m) => count < *m,
                        Bound::Unbounded => true,
                    }
                {
                    let (next, more) = rng.gen_bool();
                    rng = next;
                    if !more {
                        break;
                    }
                    let (next, chunk) = child.apply(rng, remaining)?;
                    rng = next;
                    remaining = remaining.saturating_sub(chunk.chars().count() as u32);
                    out.push_str(&chunk);
                    count += 1;
                }
                Ok((rng, out))
            }

            Regex::Sized { child, size } => {
                let cap = match child.max_length() {
                    Bound::Finite(m) => m.min(*size),
                    Bound::Unbounded => *size,
                };
                child.apply(rng, cap)
            }
        }
    }

    /// Does `input`, as a whole, belong to this language?
    ///
    /// This is full-string containment; there is no substring search.
    pub fn test(&self, input: &str) -> bool {
        let chars: Vec<char> = input.chars().collect();
        self.test_chars(&chars)
    }

    fn test_chars(&self, input: &[char]) -> bool {
        match self {
            Regex::Literal {
                text,
                case_insensitive,
            } => {
                text.chars().count() == input.len()
                    && text.chars().zip(input).all(|(a, &b)| {
                        if *case_insensitive {
                            a.eq_ignore_ascii_case(&b)
                        } else {
                            a == b
                        }
                    })
            }

            Regex::Class(set) => input.len() == 1 && set.contains(input[0]),

            Regex::Concat(children) => {
                let mut positions: HashSet<usize> = HashSet::from([0]);
                for child in children {
                    let mut next = HashSet::new();
                    for &start in &positions {
                        child_match_ends(child, input, start, &mut next);
                    }
                    if next.is_empty() {
                        return false;
                    }
                    positions = next;
                }
                positions.contains(&input.len())
            }

            Regex::Union(children) => children.iter().any(|child| child.test_chars(input)),

            Regex::Intersection(children) => {
                children.iter().all(|child| child.test_chars(input))
            }

            Regex::Quantified {
                child, min, max, ..
            } => {
                let mut positions: HashSet<usize> = HashSet::from([0]);
                for _ in 0..*min {
                    let mut next = HashSet::new();
                    for &start in &positions {
                        child_match_ends(child, input, start, &mut next);
                    }
                    if next.is_empty() {
                        return false;
                    }
                    positions = next;
                }
                let mut count = *min;
                loop {
                    if positions.contains(&input.len()) {
                        return true;
                    }
                    if let Bound::Finite(m) = max {
                        if count >= *m {
                            break;
                        }
                    }
                    let mut next = HashSet::new();
                    for &start in &positions {
                        child_match_ends(child, input, start, &mut next);
                    }
                    let before = positions.len();
                    positions.extend(next);
                    if positions.len() == before {
                        // fixed point: no position is newly reachable
                        break;
                    }
                    count += 1;
                }
                positions.contains(&input.len())
            }

            Regex::Sized { child, .. } => child.test_chars(input),
        }
    }

    /// A regex whose [`test`](Regex::test) inverts this one's.
    ///
    /// ```text
    /// ¬''       = ''
    /// ¬[abc]    = [^abc]
    /// ¬'abc'    = [^a][^b][^c]
    /// ¬(a|b)    = ¬a&¬b
    /// ¬(a*)     = ¬a{1}
    /// ¬(a+)     = ''
    /// ¬(a{0,3}) = a{4,}
    /// ¬(a{4,})  = a{0,3}
    /// ¬(a{2,3}) = a{0,1}|a{4,}
    /// ```
    ///
    /// For `Concat`, `Intersection`, and multi-character literals this is a
    /// structural rewrite, *not* the Boolean language complement: it is
    /// designed to yield a useful opposing generator. In particular the
    /// inversion guarantee holds pointwise for every child but not for the
    /// composite language.
    pub fn negate(&self) -> Regex {
        match self {
            Regex::Literal { text, .. } if text.is_empty() => Regex::empty(),

            Regex::Literal {
                text,
                case_insensitive,
            } => {
                let negated = text
                    .chars()
                    .map(|ch| {
                        let set = if *case_insensitive && ch.is_ascii_alphabetic() {
                            // a case pair, so the complement rejects both spellings
                            CharSet::of(ch.to_ascii_lowercase(), [ch.to_ascii_uppercase()])
                        } else {
                            CharSet::single(ch)
                        };
                        Regex::Class(set.negate())
                    })
                    .collect();
                Regex::Concat(negated)
            }

            Regex::Class(set) => Regex::Class(set.clone().negate()),

            Regex::Concat(children) => {
                let mut negated: Vec<Regex> = children
                    .iter()
                    .filter(|child| !child.matches_empty_only())
                    .map(Regex::negate)
                    .collect();
                match negated.len() {
                    0 => Regex::empty(),
                    1 => negated.remove(0),
                    _ => Regex::Concat(negated),
                }
            }

            Regex::Union(children) => match children.split_first() {
                None => Regex::empty(),
                Some((first, [])) => first.negate(),
                Some(_) => {
                    Regex::Intersection(children.iter().map(Regex::negate).collect())
                }
            },

            Regex::Intersection(children) => match children.split_first() {
                None => Regex::empty(),
                Some((first, [])) => first.negate(),
                // NOTE: simplified first operand, negated rest. Intentional
                // asymmetry; not the Boolean complement.
                Some((first, rest)) => {
                    let mut negated = Vec::with_capacity(children.len());
                    negated.push(first.simplify());
                    negated.extend(rest.iter().map(Regex::negate));
                    Regex::Intersection(negated)
                }
            },

            Regex::Quantified {
                child, min, max, kind,
            } => {
                if child.matches_empty_only() {
                    return Regex::empty();
                }
                let rewrap = |min: u32, max: Bound| Regex::Quantified {
                    child: child.clone(),
                    min,
                    max,
                    kind: *kind,
                };
                match (*min, *max) {
                    (0, Bound::Unbounded) => child.negate(),
                    (1, Bound::Unbounded) => rewrap(0, Bound::Finite(0)),
                    (0, Bound::Finite(k)) => rewrap(k.saturating_add(1), Bound::Unbounded),
                    (m, Bound::Unbounded) => rewrap(0, Bound::Finite(m - 1)),
                    (m, Bound::Finite(k)) => Regex::Union(vec![
                        rewrap(0, Bound::Finite(m - 1)),
                        rewrap(k.saturating_add(1), Bound::Unbounded),
                    ]),
                }
            }

            Regex::Sized { child, size } => Regex::Sized {
                child: Box::new(child.negate()),
                size: *size,
            },
        }
    }

    /// A language- and bounds-preserving normal form: drops children that
    /// match only the empty string, flattens nested concatenations and unions,
    /// deduplicates union branches, unwraps trivial quantifiers, and collapses
    /// nested size limits.
    pub fn simplify(&self) -> Regex {
        match self {
            Regex::Literal { .. } | Regex::Class(_) => self.clone(),

            Regex::Concat(children) => {
                let mut out: Vec<Regex> = Vec::with_capacity(children.len());
                for child in children {
                    let simplified = child.simplify();
                    if simplified.matches_empty_only() {
                        continue;
                    }
                    match simplified {
                        Regex::Concat(inner) => out.extend(inner),
                        other => out.push(other),
                    }
                }
                match out.len() {
                    0 => Regex::empty(),
                    1 => out.remove(0),
                    _ => Regex::Concat(out),
                }
            }

            Regex::Union(children) => {
                let mut out: Vec<Regex> = Vec::with_capacity(children.len());
                for child in children {
                    let simplified = child.simplify();
                    match simplified {
                        Regex::Union(inner) => {
                            for branch in inner {
                                if !out.contains(&branch) {
                                    out.push(branch);
                                }
                            }
                        }
                        other => {
                            if !out.contains(&other) {
                                out.push(other);
                            }
                        }
                    }
                }
                match out.len() {
                    0 => Regex::empty(),
                    1 => out.remove(0),
                    _ => Regex::Union(out),
                }
            }

            Regex::Intersection(children) => match children.split_first() {
                None => Regex::empty(),
                Some((first, [])) => first.simplify(),
                Some(_) => {
                    Regex::Intersection(children.iter().map(Regex::simplify).collect())
                }
            },

            Regex::Quantified {
                child, min, max, kind,
            } => {
                let simplified = child.simplify();
                if simplified.matches_empty_only() {
                    Regex::empty()
                } else if *min == 1 && *max == Bound::Finite(1) {
                    simplified
                } else {
                    Regex::Quantified {
                        child: Box::new(simplified),
                        min: *min,
                        max: *max,
                        kind: *kind,
                    }
                }
            }

            Regex::Sized { child, size } => match child.simplify() {
                Regex::Sized {
                    child: inner,
                    size: inner_size,
                } => Regex::Sized {
                    child: inner,
                    size: (*size).min(inner_size),
                },
                other => Regex::Sized {
                    child: Box::new(other),
                    size: *size,
                },
            },
        }
    }
}

/// Collect into `out` every end position `j` such that `child` matches
/// `input[start..j]`, bounded by the child's length range.
fn child_match_ends(child: &Regex, input: &[char], start: usize, out: &mut HashSet<usize>) {
    let lo = start + child.min_length() as usize;
    let hi = match child.max_length() {
        Bound::Finite(m) => input.len().min(start.saturating_add(m as usize)),
        Bound::Unbounded => input.len(),
    };
    for end in lo..=hi {
        if child.test_chars(&input[start..end]) {
            out.insert(end);
        }
    }
}

// -------------------------------------------------------------------------------------------------
// rendering
// -------------------------------------------------------------------------------------------------
/// Renders a pattern string that a standard regex engine parses back to an
/// equivalent language. The `&` joiner of intersections is non-standard and
/// kept for symmetry with alternation.
impl Display for Regex {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Regex::Literal { text, .. } => {
                for ch in text.chars() {
                    write_literal_char(f, ch)?;
                }
                Ok(())
            }

            Regex::Class(set) => write!(f, "{set}"),

            Regex::Concat(children) => {
                for child in children {
                    write!(f, "{child}")?;
                }
                Ok(())
            }

            Regex::Union(children) => write_group(f, children, "|"),

            Regex::Intersection(children) => write_group(f, children, "&"),

            Regex::Quantified {
                child, min, max, kind,
            } => {
                if needs_group(child) {
                    write!(f, "(?:{child})")?;
                } else {
                    write!(f, "{child}")?;
                }
                match (*min, *max) {
                    (0, Bound::Unbounded) => write!(f, "*")?,
                    (1, Bound::Unbounded) => write!(f, "+")?,
                    (m, Bound::Unbounded) => write!(f, "{{{m},}}")?,
                    (0, Bound::Finite(1)) => write!(f, "?")?,
                    (m, Bound::Finite(k)) if m == k => write!(f, "{{{m}}}")?,
                    (m, Bound::Finite(k)) => write!(f, "{{{m},{k}}}")?,
                }
                match kind {
                    QuantifierKind::Greedy => Ok(()),
                    QuantifierKind::Reluctant => write!(f, "?"),
                    QuantifierKind::Possessive => write!(f, "+"),
                }
            }

            Regex::Sized { child, .. } => write!(f, "{child}"),
        }
    }
}

fn write_group(f: &mut Formatter<'_>, children: &[Regex], joiner: &str) -> std::fmt::Result {
    f.write_str("(?:")?;
    for (i, child) in children.iter().enumerate() {
        if i > 0 {
            f.write_str(joiner)?;
        }
        write!(f, "{child}")?;
    }
    f.write_str(")")
}

/// Does a quantifier applied to `child` need an enclosing group to bind the
/// whole expression rather than its last atom?
fn needs_group(child: &Regex) -> bool {
    match child {
        Regex::Class(_) => false,
        Regex::Literal { text, .. } => text.chars().count() != 1,
        // these already render as groups
        Regex::Union(_) | Regex::Intersection(_) => false,
        Regex::Concat(_) | Regex::Quantified { .. } => true,
        Regex::Sized { child, .. } => needs_group(child),
    }
}

fn write_literal_char(f: &mut Formatter<'_>, ch: char) -> std::fmt::Result {
    match ch {
        '\\' | '.' | '^' | '$' | '|' | '?' | '*' | '+' | '(' | ')' | '[' | ']' | '{' | '}' => {
            write!(f, "\\{ch}")
        }
        ch if ch.is_ascii_graphic() || ch == ' ' => write!(f, "{ch}"),
        ch => write!(f, "\\x{{{:X}}}", ch as u32),
    }
}

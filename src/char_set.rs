use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use smallvec::{smallvec, SmallVec};
use std::fmt::{Display, Formatter};

use crate::error::{Error, Result};

/// Size of the sampling universe: the BMP code units `[0x0000, 0xFFFF]`.
/// Sampling a complement probes at most one full sweep of it.
const UNIVERSE: u32 = 1 << 16;

const SURROGATE_LO: u32 = 0xD800;
const SURROGATE_LEN: u32 = 0x800;
const SURROGATE_HI: u32 = 0xDFFF;

lazy_static! {
    // `.` without flags: everything but the line terminators
    static ref ALL: CharSet =
        CharSet::of('\n', ['\r', '\u{000B}', '\u{000C}', '\u{0085}', '\u{2028}', '\u{2029}'])
            .negate();
    // `.` under DOTALL: every BMP code unit
    static ref DOTALL: CharSet =
        CharSet::range('\u{0000}', '\u{ffff}').expect("full range should be well-formed");
    // `.` under UNIX_LINES: everything but `\n`
    static ref UNIX_LINES: CharSet = CharSet::single('\n').negate();
}

// -------------------------------------------------------------------------------------------------
// CharSet
// -------------------------------------------------------------------------------------------------
/// A character class: the leaf alphabet of the regex algebra.
///
/// A class is a recursive expression over BMP code units built from inclusive
/// ranges, explicitly enumerated members, unions, and complements. Classes are
/// immutable values; the representation is private so that every reachable
/// class is well-formed (ordered ranges, non-empty enumerations and unions).
///
/// The two defining operations are [`contains`](CharSet::contains) and
/// [`sample`](CharSet::sample), related by the invariant that for every class
/// `c` and seed `s`, `c.contains(c.sample(s))` holds whenever the class is
/// non-empty.
#[derive(PartialEq, Eq, Hash, Debug, Clone, Serialize, Deserialize)]
pub struct CharSet(Item);

#[derive(PartialEq, Eq, Hash, Debug, Clone, Serialize, Deserialize)]
enum Item {
    Range { lo: char, hi: char },
    Enum(SmallVec<[char; 8]>),
    Union(Vec<Item>),
    Negated(Box<Item>),
}

impl CharSet {
    /// The class `.` matches with no flags set: every code unit except the
    /// line terminators.
    pub fn all() -> CharSet {
        ALL.clone()
    }

    /// The class `.` matches under DOTALL: every BMP code unit.
    pub fn dotall() -> CharSet {
        DOTALL.clone()
    }

    /// The class `.` matches under UNIX_LINES: every code unit except `\n`.
    pub fn unix_lines() -> CharSet {
        UNIX_LINES.clone()
    }

    /// An inclusive range of code units.
    pub fn range(lo: char, hi: char) -> Result<CharSet> {
        if lo > hi {
            return Err(Error::InvalidCharRange { lo, hi });
        }
        Ok(CharSet(Item::Range { lo, hi }))
    }

    /// The singleton class containing exactly `ch`.
    pub fn single(ch: char) -> CharSet {
        CharSet::of(ch, [])
    }

    /// An enumerated class; non-empty by construction.
    ///
    /// Members may repeat; repetition weights sampling but not membership.
    pub fn of(first: char, rest: impl IntoIterator<Item = char>) -> CharSet {
        let mut chars: SmallVec<[char; 8]> = smallvec![first];
        chars.extend(rest);
        CharSet(Item::Enum(chars))
    }

    /// An enumerated class from an arbitrary iterator.
    pub fn chars(chars: impl IntoIterator<Item = char>) -> Result<CharSet> {
        let chars: SmallVec<[char; 8]> = chars.into_iter().collect();
        if chars.is_empty() {
            return Err(Error::EmptyClass);
        }
        Ok(CharSet(Item::Enum(chars)))
    }

    /// The union of the given classes.
    pub fn union(children: Vec<CharSet>) -> Result<CharSet> {
        let mut items: Vec<Item> = children.into_iter().map(|c| c.0).collect();
        match items.len() {
            0 => Err(Error::EmptyClass),
            1 => Ok(CharSet(items.remove(0))),
            _ => Ok(CharSet(Item::Union(items))),
        }
    }

    /// A builder for classes assembled piecemeal, in the manner of a bracket
    /// expression read left to right.
    pub fn builder() -> CharSetBuilder {
        CharSetBuilder::default()
    }

    /// The complement of this class within the BMP universe.
    /// Double complements unwrap.
    pub fn negate(self) -> CharSet {
        CharSet(match self.0 {
            Item::Negated(inner) => *inner,
            item => Item::Negated(Box::new(item)),
        })
    }

    /// Is `ch` a member of this class?
    #[inline]
    pub fn contains(&self, ch: char) -> bool {
        self.0.contains(ch)
    }

    /// Sample a member of this class. Pure in `seed`: the same seed always
    /// yields the same character.
    pub fn sample(&self, seed: u64) -> char {
        self.0.sample(seed)
    }
}

impl Item {
    fn contains(&self, ch: char) -> bool {
        match self {
            Item::Range { lo, hi } => *lo <= ch && ch <= *hi,
            Item::Enum(chars) => chars.contains(&ch),
            Item::Union(children) => children.iter().any(|c| c.contains(ch)),
            Item::Negated(inner) => !inner.contains(ch),
        }
    }

    fn sample(&self, seed: u64) -> char {
        match self {
            Item::Range { lo, hi } => {
                let lo = *lo as u32;
                let hi = *hi as u32;
                // The endpoints are chars, so the surrogate block is either
                // entirely inside the range or entirely outside it.
                let gap = if lo < SURROGATE_LO && hi > SURROGATE_HI {
                    SURROGATE_LEN
                } else {
                    0
                };
                let count = hi - lo + 1 - gap;
                let mut cp = lo + (seed % u64::from(count)) as u32;
                if gap != 0 && cp >= SURROGATE_LO {
                    cp += SURROGATE_LEN;
                }
                char::from_u32(cp).expect("range sampling should step over the surrogate block")
            }
            Item::Enum(chars) => chars[(seed % chars.len() as u64) as usize],
            Item::Union(children) => {
                children[(seed % children.len() as u64) as usize].sample(seed)
            }
            Item::Negated(inner) => {
                // Probe code units from a seed-derived offset; the first
                // non-member of `inner` is the sample. One full sweep bounds
                // the probing and finds a member whenever the complement is
                // non-empty.
                let offset = (seed % u64::from(UNIVERSE)) as u32;
                for k in 0..UNIVERSE {
                    let cp = (offset + k) % UNIVERSE;
                    if let Some(ch) = char::from_u32(cp) {
                        if !inner.contains(ch) {
                            return ch;
                        }
                    }
                }
                // The complement is empty within the universe; no in-class
                // answer exists.
                char::REPLACEMENT_CHARACTER
            }
        }
    }

    fn fmt_items(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Item::Range { lo, hi } => {
                write_class_char(f, *lo)?;
                f.write_str("-")?;
                write_class_char(f, *hi)
            }
            Item::Enum(chars) => {
                for ch in chars {
                    write_class_char(f, *ch)?;
                }
                Ok(())
            }
            Item::Union(children) => {
                for child in children {
                    child.fmt_items(f)?;
                }
                Ok(())
            }
            // A complement nested under another item has no bracket syntax;
            // render it as its own class for readability.
            Item::Negated(inner) => {
                f.write_str("[^")?;
                inner.fmt_items(f)?;
                f.write_str("]")
            }
        }
    }
}

impl Display for CharSet {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.0 {
            Item::Negated(inner) => {
                f.write_str("[^")?;
                inner.fmt_items(f)?;
                f.write_str("]")
            }
            item => {
                f.write_str("[")?;
                item.fmt_items(f)?;
                f.write_str("]")
            }
        }
    }
}

fn write_class_char(f: &mut Formatter<'_>, ch: char) -> std::fmt::Result {
    match ch {
        '\\' | '[' | ']' | '^' | '-' | '&' => write!(f, "\\{ch}"),
        ch if ch.is_ascii_graphic() || ch == ' ' => write!(f, "{ch}"),
        ch => write!(f, "\\x{{{:X}}}", ch as u32),
    }
}

// -------------------------------------------------------------------------------------------------
// CharSetBuilder
// -------------------------------------------------------------------------------------------------
/// Assembles a [`CharSet`] from ranges, characters, and existing classes.
///
/// Validation happens in [`build`](CharSetBuilder::build): ranges with
/// endpoints out of order and classes with no members are rejected there.
#[derive(Clone, Debug, Default)]
pub struct CharSetBuilder {
    items: Vec<BuilderItem>,
    negated: bool,
}

#[derive(Clone, Debug)]
enum BuilderItem {
    Range(char, char),
    Chars(SmallVec<[char; 8]>),
    Set(CharSet),
}

impl CharSetBuilder {
    /// Add an inclusive range of code units.
    pub fn range(mut self, lo: char, hi: char) -> Self {
        self.items.push(BuilderItem::Range(lo, hi));
        self
    }

    /// Add a single character.
    pub fn single(mut self, ch: char) -> Self {
        self.items.push(BuilderItem::Chars(smallvec![ch]));
        self
    }

    /// Add every character of the iterator.
    pub fn chars(mut self, chars: impl IntoIterator<Item = char>) -> Self {
        self.items.push(BuilderItem::Chars(chars.into_iter().collect()));
        self
    }

    /// Add an existing class.
    pub fn set(mut self, set: CharSet) -> Self {
        self.items.push(BuilderItem::Set(set));
        self
    }

    /// Complement the finished class. Applying twice cancels out.
    pub fn negate(mut self) -> Self {
        self.negated = !self.negated;
        self
    }

    pub fn build(self) -> Result<CharSet> {
        let mut items = Vec::with_capacity(self.items.len());
        for item in self.items {
            match item {
                BuilderItem::Range(lo, hi) => {
                    if lo > hi {
                        return Err(Error::InvalidCharRange { lo, hi });
                    }
                    items.push(Item::Range { lo, hi });
                }
                BuilderItem::Chars(chars) => {
                    if !chars.is_empty() {
                        items.push(Item::Enum(chars));
                    }
                }
                BuilderItem::Set(set) => items.push(set.0),
            }
        }
        let item = match items.len() {
            0 => return Err(Error::EmptyClass),
            1 => items.remove(0),
            _ => Item::Union(items),
        };
        let set = CharSet(item);
        Ok(if self.negated { set.negate() } else { set })
    }
}

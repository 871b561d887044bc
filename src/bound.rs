use serde::{Deserialize, Serialize};

// -------------------------------------------------------------------------------------------------
// Bound
// -------------------------------------------------------------------------------------------------
/// An upper bound on a length or a repetition count.
///
/// The derived `Ord` places every `Finite` value below `Unbounded`, so
/// `std::cmp::min` and `std::cmp::max` behave the way length arithmetic needs them to:
/// `Unbounded` is ignored by `min` against a finite value and absorbs in `max`.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Copy, Clone, Serialize, Deserialize)]
pub enum Bound {
    Finite(u32),
    Unbounded,
}

impl Bound {
    #[inline]
    pub fn is_unbounded(&self) -> bool {
        matches!(self, Bound::Unbounded)
    }

    /// Return the finite value, if there is one.
    #[inline]
    pub fn finite(&self) -> Option<u32> {
        match self {
            Bound::Finite(n) => Some(*n),
            Bound::Unbounded => None,
        }
    }

    /// Addition where `Unbounded` absorbs and finite sums saturate instead of overflowing.
    pub fn saturating_add(self, rhs: Bound) -> Bound {
        match (self, rhs) {
            (Bound::Finite(a), Bound::Finite(b)) => Bound::Finite(a.saturating_add(b)),
            _ => Bound::Unbounded,
        }
    }

    /// Multiplication by a repetition count: `Unbounded · 0 = 0`, otherwise `Unbounded` absorbs.
    pub fn saturating_mul(self, k: u32) -> Bound {
        match self {
            Bound::Finite(n) => Bound::Finite(n.saturating_mul(k)),
            Bound::Unbounded if k == 0 => Bound::Finite(0),
            Bound::Unbounded => Bound::Unbounded,
        }
    }

    /// The tighter of two upper bounds, ignoring `Unbounded`.
    ///
    /// This is the upper-bound combination for intersections: a missing bound on one
    /// side must not loosen the other side's bound.
    pub fn tighten(self, rhs: Bound) -> Bound {
        match (self, rhs) {
            (Bound::Finite(a), Bound::Finite(b)) => Bound::Finite(a.min(b)),
            (Bound::Finite(a), Bound::Unbounded) => Bound::Finite(a),
            (Bound::Unbounded, rhs) => rhs,
        }
    }
}

impl From<u32> for Bound {
    fn from(n: u32) -> Self {
        Bound::Finite(n)
    }
}

impl std::fmt::Display for Bound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Bound::Finite(n) => write!(f, "{n}"),
            Bound::Unbounded => write!(f, "∞"),
        }
    }
}

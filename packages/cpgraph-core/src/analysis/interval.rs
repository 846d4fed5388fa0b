//! Interval lattice for collection-size analysis
//!
//! Intervals track how many elements a collection may hold, so bounds are
//! either concrete non-negative counts or unbounded above. Bottom is the
//! empty state (no information yet); join is the lattice union with
//! Bottom as identity, meet the intersection with Bottom absorbing.
//! Widening jumps straight to the extremes (0 below, unbounded above) so
//! loop iteration terminates; narrowing pulls the extremes back in from
//! a later, more precise operand.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One end of an interval. `Top` is unbounded (compares greater than
/// every concrete value).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Bound {
    Value(i64),
    Top,
}

impl Bound {
    pub fn min(self, other: Bound) -> Bound {
        match (self, other) {
            (Bound::Value(a), Bound::Value(b)) => Bound::Value(a.min(b)),
            (Bound::Value(a), Bound::Top) | (Bound::Top, Bound::Value(a)) => Bound::Value(a),
            (Bound::Top, Bound::Top) => Bound::Top,
        }
    }

    pub fn max(self, other: Bound) -> Bound {
        match (self, other) {
            (Bound::Value(a), Bound::Value(b)) => Bound::Value(a.max(b)),
            _ => Bound::Top,
        }
    }

    pub fn add(self, other: Bound) -> Bound {
        match (self, other) {
            (Bound::Value(a), Bound::Value(b)) => Bound::Value(a.saturating_add(b)),
            _ => Bound::Top,
        }
    }

    pub fn sub(self, other: Bound) -> Bound {
        match (self, other) {
            (Bound::Value(a), Bound::Value(b)) => Bound::Value(a.saturating_sub(b)),
            _ => Bound::Top,
        }
    }
}

impl PartialOrd for Bound {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Bound {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        match (self, other) {
            (Bound::Value(a), Bound::Value(b)) => a.cmp(b),
            (Bound::Value(_), Bound::Top) => std::cmp::Ordering::Less,
            (Bound::Top, Bound::Value(_)) => std::cmp::Ordering::Greater,
            (Bound::Top, Bound::Top) => std::cmp::Ordering::Equal,
        }
    }
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bound::Value(v) => write!(f, "{v}"),
            Bound::Top => write!(f, "∞"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LatticeInterval {
    /// No information (unreached state)
    Bottom,
    Bounded { lower: Bound, upper: Bound },
}

impl LatticeInterval {
    pub fn bounded(lower: Bound, upper: Bound) -> Self {
        Self::Bounded { lower, upper }
    }

    /// The single-point interval [n, n].
    pub fn degenerate(n: i64) -> Self {
        Self::Bounded {
            lower: Bound::Value(n),
            upper: Bound::Value(n),
        }
    }

    pub fn join(self, other: Self) -> Self {
        match (self, other) {
            (LatticeInterval::Bottom, x) | (x, LatticeInterval::Bottom) => x,
            (
                LatticeInterval::Bounded { lower: l1, upper: u1 },
                LatticeInterval::Bounded { lower: l2, upper: u2 },
            ) => LatticeInterval::Bounded {
                lower: l1.min(l2),
                upper: u1.max(u2),
            },
        }
    }

    pub fn meet(self, other: Self) -> Self {
        match (self, other) {
            (LatticeInterval::Bottom, _) | (_, LatticeInterval::Bottom) => LatticeInterval::Bottom,
            (
                LatticeInterval::Bounded { lower: l1, upper: u1 },
                LatticeInterval::Bounded { lower: l2, upper: u2 },
            ) => {
                let lower = l1.max(l2);
                let upper = u1.min(u2);
                if lower > upper {
                    LatticeInterval::Bottom
                } else {
                    LatticeInterval::Bounded { lower, upper }
                }
            }
        }
    }

    /// Widening: bounds that grew are forced to the extremes so repeated
    /// application reaches a fixed point in at most two steps.
    pub fn widen(self, other: Self) -> Self {
        match (self, other) {
            (LatticeInterval::Bottom, x) | (x, LatticeInterval::Bottom) => x,
            (
                LatticeInterval::Bounded { lower: l1, upper: u1 },
                LatticeInterval::Bounded { lower: l2, upper: u2 },
            ) => LatticeInterval::Bounded {
                lower: if l2 >= l1 { l1 } else { Bound::Value(0) },
                upper: if u2 <= u1 { u1 } else { Bound::Top },
            },
        }
    }

    /// Narrowing: bounds previously widened to an extreme are replaced by
    /// the other operand's bound; settled bounds stay.
    pub fn narrow(self, other: Self) -> Self {
        match (self, other) {
            (LatticeInterval::Bottom, _) => LatticeInterval::Bottom,
            (x, LatticeInterval::Bottom) => x,
            (
                LatticeInterval::Bounded { lower: l1, upper: u1 },
                LatticeInterval::Bounded { lower: l2, upper: u2 },
            ) => LatticeInterval::Bounded {
                lower: if l1 == Bound::Value(0) { l2 } else { l1 },
                upper: if u1 == Bound::Top { u2 } else { u1 },
            },
        }
    }

    /// Element-wise addition; Bottom propagates.
    pub fn add(self, other: Self) -> Self {
        match (self, other) {
            (LatticeInterval::Bottom, _) | (_, LatticeInterval::Bottom) => LatticeInterval::Bottom,
            (
                LatticeInterval::Bounded { lower: l1, upper: u1 },
                LatticeInterval::Bounded { lower: l2, upper: u2 },
            ) => LatticeInterval::Bounded {
                lower: l1.add(l2),
                upper: u1.add(u2),
            },
        }
    }

    /// Element-wise subtraction ([l1 - u2, u1 - l2]); Bottom propagates.
    pub fn sub(self, other: Self) -> Self {
        match (self, other) {
            (LatticeInterval::Bottom, _) | (_, LatticeInterval::Bottom) => LatticeInterval::Bottom,
            (
                LatticeInterval::Bounded { lower: l1, upper: u1 },
                LatticeInterval::Bounded { lower: l2, upper: u2 },
            ) => LatticeInterval::Bounded {
                lower: l1.sub(u2),
                upper: u1.sub(l2),
            },
        }
    }

    /// Clamp both bounds to be at least zero (collection sizes cannot go
    /// negative).
    pub fn clamp_non_negative(self) -> Self {
        match self {
            LatticeInterval::Bottom => LatticeInterval::Bottom,
            LatticeInterval::Bounded { lower, upper } => LatticeInterval::Bounded {
                lower: lower.max(Bound::Value(0)),
                upper: upper.max(Bound::Value(0)),
            },
        }
    }

    pub fn contains(self, value: i64) -> bool {
        match self {
            LatticeInterval::Bottom => false,
            LatticeInterval::Bounded { lower, upper } => {
                lower <= Bound::Value(value) && Bound::Value(value) <= upper
            }
        }
    }
}

impl fmt::Display for LatticeInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LatticeInterval::Bottom => write!(f, "⊥"),
            LatticeInterval::Bounded { lower, upper } => write!(f, "[{lower}, {upper}]"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn bounded(l: i64, u: i64) -> LatticeInterval {
        LatticeInterval::bounded(Bound::Value(l), Bound::Value(u))
    }

    #[test]
    fn test_join_bottom_is_identity() {
        let x = bounded(1, 3);
        assert_eq!(LatticeInterval::Bottom.join(x), x);
        assert_eq!(x.join(LatticeInterval::Bottom), x);
    }

    #[test]
    fn test_meet_bottom_is_absorbing() {
        let x = bounded(1, 3);
        assert_eq!(LatticeInterval::Bottom.meet(x), LatticeInterval::Bottom);
        assert_eq!(x.meet(LatticeInterval::Bottom), LatticeInterval::Bottom);
    }

    #[test]
    fn test_meet_disjoint_is_bottom() {
        assert_eq!(bounded(0, 1).meet(bounded(5, 9)), LatticeInterval::Bottom);
        assert_eq!(bounded(0, 5).meet(bounded(3, 9)), bounded(3, 5));
    }

    #[test]
    fn test_widen_resets_grown_bounds() {
        // upper grew: forced to Top; lower stable: kept
        assert_eq!(
            bounded(2, 2).widen(bounded(2, 3)),
            LatticeInterval::bounded(Bound::Value(2), Bound::Top)
        );
        // lower shrank: forced to 0
        assert_eq!(
            bounded(2, 4).widen(bounded(1, 4)),
            LatticeInterval::bounded(Bound::Value(0), Bound::Value(4))
        );
    }

    #[test]
    fn test_narrow_recovers_extremes_only() {
        let widened = LatticeInterval::bounded(Bound::Value(0), Bound::Top);
        assert_eq!(widened.narrow(bounded(1, 7)), bounded(1, 7));
        // settled bounds are kept
        assert_eq!(bounded(2, 5).narrow(bounded(1, 7)), bounded(2, 5));
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(bounded(1, 2).add(bounded(1, 1)), bounded(2, 3));
        assert_eq!(bounded(1, 2).sub(bounded(1, 1)), bounded(0, 1));
        assert_eq!(
            bounded(0, 0).sub(bounded(1, 1)).clamp_non_negative(),
            bounded(0, 0)
        );
        assert_eq!(
            LatticeInterval::bounded(Bound::Value(1), Bound::Top).add(bounded(1, 1)),
            LatticeInterval::bounded(Bound::Value(2), Bound::Top)
        );
    }

    fn interval_strategy() -> impl Strategy<Value = LatticeInterval> {
        prop_oneof![
            Just(LatticeInterval::Bottom),
            (0i64..100, 0i64..100).prop_map(|(a, b)| bounded(a.min(b), a.max(b))),
            (0i64..100).prop_map(|a| LatticeInterval::bounded(Bound::Value(a), Bound::Top)),
        ]
    }

    proptest! {
        #[test]
        fn prop_join_commutative(a in interval_strategy(), b in interval_strategy()) {
            prop_assert_eq!(a.join(b), b.join(a));
        }

        #[test]
        fn prop_join_associative(
            a in interval_strategy(),
            b in interval_strategy(),
            c in interval_strategy(),
        ) {
            prop_assert_eq!(a.join(b).join(c), a.join(b.join(c)));
        }

        #[test]
        fn prop_join_idempotent(a in interval_strategy()) {
            prop_assert_eq!(a.join(a), a);
        }

        #[test]
        fn prop_meet_commutative(a in interval_strategy(), b in interval_strategy()) {
            prop_assert_eq!(a.meet(b), b.meet(a));
        }

        #[test]
        fn prop_meet_associative(
            a in interval_strategy(),
            b in interval_strategy(),
            c in interval_strategy(),
        ) {
            prop_assert_eq!(a.meet(b).meet(c), a.meet(b.meet(c)));
        }

        #[test]
        fn prop_widen_idempotent(a in interval_strategy()) {
            prop_assert_eq!(a.widen(a), a);
        }

        #[test]
        fn prop_widen_reaches_fixed_point(a in interval_strategy(), b in interval_strategy()) {
            let w = a.widen(b);
            prop_assert_eq!(w.widen(b), w);
        }

        #[test]
        fn prop_join_is_upper_bound(a in interval_strategy(), b in interval_strategy()) {
            let j = a.join(b);
            prop_assert_eq!(j.join(a), j);
            prop_assert_eq!(j.join(b), j);
        }
    }
}

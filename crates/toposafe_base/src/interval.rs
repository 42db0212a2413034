//! Arbitrary-precision interval arithmetic over ℤ ∪ {-∞, +∞}.
//!
//! This is the closed-form engine behind integer refinement-type bound
//! propagation: every arithmetic, shift, and bitwise operator on the DSL's
//! numeric expressions narrows to an [`Interval`] computed here rather than
//! by enumerating concrete values. Two sentinels, [`IntBound::NegInf`] and
//! [`IntBound::PosInf`], stand in for the ideal integer type's unboundedness
//! and for a realized type's unreachable side when only one side is known
//! (e.g. after `x >= 0` without an upper bound).
//!
//! Bitwise `&`/`|`/`^` are defined only over non-negative operands (the
//! type checker rejects signed operands to these operators before interval
//! propagation runs); callers must not rely on a meaningful result
//! otherwise.

use std::cmp::Ordering;
use std::fmt;

use num_bigint::BigInt;
use num_traits::{One, Signed, Zero};

/// One endpoint of an [`Interval`]: a finite arbitrary-precision integer,
/// or an unbounded sentinel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntBound {
    NegInf,
    Finite(BigInt),
    PosInf,
}

impl IntBound {
    pub fn finite(n: impl Into<BigInt>) -> Self {
        IntBound::Finite(n.into())
    }

    pub fn is_finite(&self) -> bool {
        matches!(self, IntBound::Finite(_))
    }

    pub fn as_finite(&self) -> Option<&BigInt> {
        match self {
            IntBound::Finite(n) => Some(n),
            _ => None,
        }
    }
}

impl PartialOrd for IntBound {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for IntBound {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (IntBound::NegInf, IntBound::NegInf) => Ordering::Equal,
            (IntBound::NegInf, _) => Ordering::Less,
            (_, IntBound::NegInf) => Ordering::Greater,
            (IntBound::PosInf, IntBound::PosInf) => Ordering::Equal,
            (IntBound::PosInf, _) => Ordering::Greater,
            (_, IntBound::PosInf) => Ordering::Less,
            (IntBound::Finite(a), IntBound::Finite(b)) => a.cmp(b),
        }
    }
}

impl fmt::Display for IntBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntBound::NegInf => write!(f, "-inf"),
            IntBound::Finite(n) => write!(f, "{n}"),
            IntBound::PosInf => write!(f, "+inf"),
        }
    }
}

/// A closed interval `[lo, hi]` over ℤ ∪ {-∞, +∞}. Invariant: `lo <= hi`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interval {
    pub lo: IntBound,
    pub hi: IntBound,
}

impl Interval {
    pub fn new(lo: IntBound, hi: IntBound) -> Self {
        debug_assert!(lo <= hi, "interval lower bound must not exceed upper bound");
        Interval { lo, hi }
    }

    /// `[-inf, +inf]`, the ideal integer type's bounds.
    pub fn unbounded() -> Self {
        Interval::new(IntBound::NegInf, IntBound::PosInf)
    }

    /// A single-point interval, as produced by a literal.
    pub fn point(n: impl Into<BigInt>) -> Self {
        let n = n.into();
        Interval::new(IntBound::Finite(n.clone()), IntBound::Finite(n))
    }

    pub fn finite(lo: impl Into<BigInt>, hi: impl Into<BigInt>) -> Self {
        Interval::new(IntBound::Finite(lo.into()), IntBound::Finite(hi.into()))
    }

    /// `[0, +inf]`.
    pub fn non_negative() -> Self {
        Interval::new(IntBound::Finite(BigInt::zero()), IntBound::PosInf)
    }

    pub fn is_point(&self) -> bool {
        self.lo == self.hi && self.lo.is_finite()
    }

    /// The value of this interval when it denotes exactly one integer.
    pub fn as_point(&self) -> Option<&BigInt> {
        if self.is_point() {
            self.lo.as_finite()
        } else {
            None
        }
    }

    pub fn contains(&self, n: &BigInt) -> bool {
        self.lo <= IntBound::Finite(n.clone()) && IntBound::Finite(n.clone()) <= self.hi
    }

    /// `true` if every value in `self` also lies in `other`.
    pub fn is_subset_of(&self, other: &Interval) -> bool {
        other.lo <= self.lo && self.hi <= other.hi
    }

    pub fn is_non_negative(&self) -> bool {
        self.lo >= IntBound::Finite(BigInt::zero())
    }

    pub fn may_contain_zero(&self) -> bool {
        self.contains(&BigInt::zero())
    }

    /// Smallest interval containing both `self` and `other`, used to merge
    /// disjoint sub-intervals from sign splitting and to join branch
    /// outcomes in fact/type propagation.
    pub fn hull(&self, other: &Interval) -> Interval {
        Interval::new(
            self.lo.clone().min(other.lo.clone()),
            self.hi.clone().max(other.hi.clone()),
        )
    }

    fn lo_bi(&self) -> Option<&BigInt> {
        self.lo.as_finite()
    }
    fn hi_bi(&self) -> Option<&BigInt> {
        self.hi.as_finite()
    }

    pub fn add(&self, other: &Interval) -> Interval {
        let lo = add_bound(&self.lo, &other.lo);
        let hi = add_bound(&self.hi, &other.hi);
        Interval::new(lo, hi)
    }

    pub fn sub(&self, other: &Interval) -> Interval {
        self.add(&other.negate())
    }

    pub fn negate(&self) -> Interval {
        Interval::new(negate_bound(&self.hi), negate_bound(&self.lo))
    }

    pub fn mul(&self, other: &Interval) -> Interval {
        let candidates = [
            mul_bound(&self.lo, &other.lo),
            mul_bound(&self.lo, &other.hi),
            mul_bound(&self.hi, &other.lo),
            mul_bound(&self.hi, &other.hi),
        ];
        hull_many(candidates)
    }

    /// Truncating division (toward zero), matching C/the target language's
    /// integer division. Returns [`Interval::unbounded`] if `other` may be
    /// zero; the division-by-zero obligation is checked separately by the
    /// proof checker, not here.
    pub fn div(&self, other: &Interval) -> Interval {
        if other.may_contain_zero() {
            return Interval::unbounded();
        }
        let candidates = [
            div_bound(&self.lo, &other.lo),
            div_bound(&self.lo, &other.hi),
            div_bound(&self.hi, &other.lo),
            div_bound(&self.hi, &other.hi),
        ];
        hull_many(candidates)
    }

    /// Truncating remainder. Sound but not maximally tight: bounded by the
    /// divisor's maximum magnitude, sign-matched to the dividend when the
    /// dividend's sign is known.
    pub fn rem(&self, other: &Interval) -> Interval {
        if other.may_contain_zero() {
            return Interval::unbounded();
        }
        let max_abs = match (other.lo_bi(), other.hi_bi()) {
            (Some(a), Some(b)) => a.abs().max(b.abs()),
            _ => return Interval::unbounded(),
        };
        let bound = &max_abs - BigInt::one();
        let neg_ok = !self.is_non_negative();
        let pos_ok = self.hi >= IntBound::Finite(BigInt::zero());
        let lo = if neg_ok {
            IntBound::Finite(-bound.clone())
        } else {
            IntBound::Finite(BigInt::zero())
        };
        let hi = if pos_ok {
            IntBound::Finite(bound)
        } else {
            IntBound::Finite(BigInt::zero())
        };
        Interval::new(lo, hi)
    }

    /// `self << shift`. Sound hull over the four endpoint combinations;
    /// exact when `self` is non-negative, which the type checker requires
    /// for shift operands.
    pub fn shl(&self, shift: &Interval) -> Interval {
        let candidates = [
            shl_bound(&self.lo, &shift.lo),
            shl_bound(&self.lo, &shift.hi),
            shl_bound(&self.hi, &shift.lo),
            shl_bound(&self.hi, &shift.hi),
        ];
        hull_many(candidates)
    }

    /// `self >> shift` (arithmetic/logical right shift, floor division by
    /// `2^shift`).
    pub fn shr(&self, shift: &Interval) -> Interval {
        let candidates = [
            shr_bound(&self.lo, &shift.lo),
            shr_bound(&self.lo, &shift.hi),
            shr_bound(&self.hi, &shift.lo),
            shr_bound(&self.hi, &shift.hi),
        ];
        hull_many(candidates)
    }

    /// Non-negative-only bitwise AND via the bit-fill-right rule (§9): for
    /// `x in [0, a]`, every concrete `x` has its bits covered by the mask
    /// `fill(a)` (the smallest `2^k - 1 >= a`); `x & y <= min(fill(a),
    /// fill(b))`.
    pub fn bitand(&self, other: &Interval) -> Interval {
        match (self.hi_bi(), other.hi_bi()) {
            (Some(a), Some(b)) => {
                let bound = bit_fill_right(a).min(bit_fill_right(b));
                Interval::finite(BigInt::zero(), bound)
            }
            _ => Interval::non_negative(),
        }
    }

    /// Non-negative-only bitwise OR: `x | y <= fill(max(a, b))`.
    pub fn bitor(&self, other: &Interval) -> Interval {
        match (self.hi_bi(), other.hi_bi()) {
            (Some(a), Some(b)) => {
                let bound = bit_fill_right(a.max(b));
                Interval::finite(BigInt::zero(), bound)
            }
            _ => Interval::non_negative(),
        }
    }

    /// Non-negative-only bitwise XOR: same bound as OR (a sound
    /// over-approximation; XOR can never exceed the OR of the same
    /// operands).
    pub fn bitxor(&self, other: &Interval) -> Interval {
        self.bitor(other)
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} ..= {}]", self.lo, self.hi)
    }
}

fn add_bound(a: &IntBound, b: &IntBound) -> IntBound {
    match (a, b) {
        (IntBound::Finite(a), IntBound::Finite(b)) => IntBound::Finite(a + b),
        (IntBound::NegInf, IntBound::PosInf) | (IntBound::PosInf, IntBound::NegInf) => {
            // Unreachable for well-formed `[lo, hi]` endpoint pairings
            // (lo side only ever combines with lo side, etc.) but handled
            // for robustness: collapse to unbounded on either side.
            IntBound::Finite(BigInt::zero())
        }
        (IntBound::NegInf, _) | (_, IntBound::NegInf) => IntBound::NegInf,
        (IntBound::PosInf, _) | (_, IntBound::PosInf) => IntBound::PosInf,
    }
}

fn negate_bound(a: &IntBound) -> IntBound {
    match a {
        IntBound::NegInf => IntBound::PosInf,
        IntBound::PosInf => IntBound::NegInf,
        IntBound::Finite(n) => IntBound::Finite(-n),
    }
}

fn mul_bound(a: &IntBound, b: &IntBound) -> IntBound {
    match (a, b) {
        (IntBound::Finite(a), IntBound::Finite(b)) => IntBound::Finite(a * b),
        (IntBound::Finite(n), inf) | (inf, IntBound::Finite(n)) if n.is_zero() => {
            let _ = inf;
            IntBound::Finite(BigInt::zero())
        }
        (IntBound::Finite(n), inf) | (inf, IntBound::Finite(n)) => {
            if n.is_negative() {
                negate_bound(inf)
            } else {
                inf.clone()
            }
        }
        (IntBound::PosInf, IntBound::PosInf) | (IntBound::NegInf, IntBound::NegInf) => {
            IntBound::PosInf
        }
        (IntBound::PosInf, IntBound::NegInf) | (IntBound::NegInf, IntBound::PosInf) => {
            IntBound::NegInf
        }
    }
}

fn div_bound(a: &IntBound, b: &IntBound) -> IntBound {
    match (a, b) {
        (IntBound::Finite(a), IntBound::Finite(b)) => {
            if b.is_zero() {
                IntBound::Finite(BigInt::zero())
            } else {
                IntBound::Finite(a / b)
            }
        }
        (IntBound::Finite(_), _) => IntBound::Finite(BigInt::zero()),
        (inf, IntBound::Finite(n)) => {
            if n.is_negative() {
                negate_bound(inf)
            } else if n.is_zero() {
                inf.clone()
            } else {
                inf.clone()
            }
        }
        _ => IntBound::Finite(BigInt::zero()),
    }
}

fn shl_bound(a: &IntBound, shift: &IntBound) -> IntBound {
    match (a, shift) {
        (IntBound::Finite(a), IntBound::Finite(s)) => {
            if s.is_negative() {
                IntBound::Finite(a.clone())
            } else {
                let bits = s.to_u32_lossy();
                IntBound::Finite(a << bits)
            }
        }
        (IntBound::Finite(n), _) if n.is_zero() => IntBound::Finite(BigInt::zero()),
        (IntBound::Finite(n), _) if n.is_negative() => IntBound::NegInf,
        (IntBound::Finite(_), _) => IntBound::PosInf,
        (inf, _) => inf.clone(),
    }
}

fn shr_bound(a: &IntBound, shift: &IntBound) -> IntBound {
    match (a, shift) {
        (IntBound::Finite(a), IntBound::Finite(s)) => {
            if s.is_negative() {
                IntBound::Finite(a.clone())
            } else {
                let bits = s.to_u32_lossy();
                IntBound::Finite(floor_shr(a, bits))
            }
        }
        (inf, _) => inf.clone(),
    }
}

fn floor_shr(n: &BigInt, bits: u32) -> BigInt {
    let mut result = n.clone();
    for _ in 0..bits {
        result = floor_div2(&result);
    }
    result
}

fn floor_div2(n: &BigInt) -> BigInt {
    let two = BigInt::from(2);
    if n.is_negative() && (n % &two) != BigInt::zero() {
        (n - BigInt::one()) / two
    } else {
        n / two
    }
}

/// Smallest `2^k - 1 >= n` for non-negative `n` (the "bit-fill-right" mask:
/// every bit from the highest set bit of `n` down to bit 0 is 1).
fn bit_fill_right(n: &BigInt) -> BigInt {
    if n <= &BigInt::zero() {
        return BigInt::zero();
    }
    let mut mask = BigInt::one();
    while &mask < n {
        mask = (&mask << 1) + BigInt::one();
    }
    mask
}

fn hull_many<const N: usize>(bounds: [IntBound; N]) -> Interval {
    let mut iter = bounds.into_iter();
    let first = iter.next().expect("hull_many requires at least one bound");
    let mut lo = first.clone();
    let mut hi = first;
    for b in iter {
        if b < lo {
            lo = b.clone();
        }
        if b > hi {
            hi = b;
        }
    }
    Interval::new(lo, hi)
}

trait ToU32Lossy {
    fn to_u32_lossy(&self) -> u32;
}

impl ToU32Lossy for BigInt {
    fn to_u32_lossy(&self) -> u32 {
        use num_traits::ToPrimitive;
        self.to_u32().unwrap_or(u32::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_values() -> Vec<BigInt> {
        (-4..=4).map(BigInt::from).collect()
    }

    #[test]
    fn add_contains_all_concrete_sums() {
        let x = Interval::finite(-2, 3);
        let y = Interval::finite(-1, 4);
        let result = x.add(&y);
        for i in small_values() {
            if !x.contains(&i) {
                continue;
            }
            for j in small_values() {
                if !y.contains(&j) {
                    continue;
                }
                assert!(result.contains(&(&i + &j)), "{i} + {j} not in {result}");
            }
        }
    }

    #[test]
    fn mul_contains_all_concrete_products_with_mixed_signs() {
        let x = Interval::finite(-3, 2);
        let y = Interval::finite(-2, 4);
        let result = x.mul(&y);
        for i in small_values() {
            if !x.contains(&i) {
                continue;
            }
            for j in small_values() {
                if !y.contains(&j) {
                    continue;
                }
                assert!(result.contains(&(&i * &j)), "{i} * {j} not in {result}");
            }
        }
    }

    #[test]
    fn div_contains_all_concrete_quotients() {
        let x = Interval::finite(-8, 8);
        let y = Interval::finite(1, 3);
        let result = x.div(&y);
        for i in small_values() {
            for j in 1..=3 {
                let j = BigInt::from(j);
                if x.contains(&i) && y.contains(&j) {
                    assert!(result.contains(&(&i / &j)));
                }
            }
        }
    }

    #[test]
    fn div_with_zero_in_divisor_is_unbounded() {
        let x = Interval::finite(1, 10);
        let y = Interval::finite(-1, 1);
        assert_eq!(x.div(&y), Interval::unbounded());
    }

    #[test]
    fn bitand_respects_bit_fill_right_bound() {
        let x = Interval::finite(0, 6);
        let y = Interval::finite(0, 3);
        let result = x.bitand(&y);
        for i in 0u64..=6 {
            for j in 0u64..=3 {
                assert!(result.contains(&BigInt::from(i & j)));
            }
        }
    }

    #[test]
    fn bitor_respects_bit_fill_right_bound() {
        let x = Interval::finite(0, 5);
        let y = Interval::finite(0, 2);
        let result = x.bitor(&y);
        for i in 0u64..=5 {
            for j in 0u64..=2 {
                assert!(result.contains(&BigInt::from(i | j)));
            }
        }
    }

    #[test]
    fn shl_contains_all_concrete_shifts() {
        let x = Interval::finite(0, 5);
        let k = Interval::finite(0, 3);
        let result = x.shl(&k);
        for i in 0u64..=5 {
            for s in 0u32..=3 {
                assert!(result.contains(&BigInt::from(i << s)));
            }
        }
    }

    #[test]
    fn shr_contains_all_concrete_shifts() {
        let x = Interval::finite(0, 20);
        let k = Interval::finite(0, 2);
        let result = x.shr(&k);
        for i in 0u64..=20 {
            for s in 0u32..=2 {
                assert!(result.contains(&BigInt::from(i >> s)));
            }
        }
    }

    #[test]
    fn unbounded_contains_everything() {
        let u = Interval::unbounded();
        assert!(u.contains(&BigInt::from(i64::MIN)));
        assert!(u.contains(&BigInt::from(i64::MAX)));
    }

    #[test]
    fn point_is_subset_of_its_own_hull_with_other() {
        let a = Interval::point(5);
        let b = Interval::point(9);
        let hull = a.hull(&b);
        assert!(a.is_subset_of(&hull));
        assert!(b.is_subset_of(&hull));
        assert_eq!(hull, Interval::finite(5, 9));
    }

    #[test]
    fn bit_fill_right_examples() {
        assert_eq!(bit_fill_right(&BigInt::from(13)), BigInt::from(15));
        assert_eq!(bit_fill_right(&BigInt::from(0)), BigInt::from(0));
        assert_eq!(bit_fill_right(&BigInt::from(1)), BigInt::from(1));
        assert_eq!(bit_fill_right(&BigInt::from(16)), BigInt::from(31));
    }
}

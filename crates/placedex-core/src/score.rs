// crates/placedex-core/src/score.rs

//! # Score Model
//!
//! A place's rank is a base-37 fixed-point number: the category baseline is
//! the most significant digit, followed by the first 30 characters of the
//! folded name. Ascending order therefore sorts by administrative level first
//! and lexicographically second. Lower is better.
//!
//! The number needs about 165 bits, so [`Score`] is a small fixed-width
//! unsigned integer rather than a float (a float would collapse names that
//! only differ after the tenth character).

use crate::text::MAX_PREFIX_LEN;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::Add;

const RADIX: u64 = 37;
const LIMBS: usize = 3;

/// 192-bit unsigned score. Limbs are stored most significant first, so the
/// derived `Ord` is numeric order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Score([u64; LIMBS]);

impl Score {
    pub const ZERO: Score = Score([0; LIMBS]);

    pub fn from_u64(v: u64) -> Self {
        Score([0, 0, v])
    }

    /// `self * m + a`, saturating at the maximum value.
    fn mul_add_small(self, m: u64, a: u64) -> Self {
        let mut out = [0u64; LIMBS];
        let mut carry = a as u128;
        for i in (0..LIMBS).rev() {
            let v = self.0[i] as u128 * m as u128 + carry;
            out[i] = v as u64;
            carry = v >> 64;
        }
        if carry != 0 {
            return Score([u64::MAX; LIMBS]);
        }
        Score(out)
    }

    pub fn saturating_add(self, other: Score) -> Score {
        let mut out = [0u64; LIMBS];
        let mut carry = 0u128;
        for i in (0..LIMBS).rev() {
            let v = self.0[i] as u128 + other.0[i] as u128 + carry;
            out[i] = v as u64;
            carry = v >> 64;
        }
        if carry != 0 {
            return Score([u64::MAX; LIMBS]);
        }
        Score(out)
    }

    fn div_rem_small(self, d: u64) -> (Score, u64) {
        let mut out = [0u64; LIMBS];
        let mut rem = 0u128;
        for i in 0..LIMBS {
            let cur = (rem << 64) | self.0[i] as u128;
            out[i] = (cur / d as u128) as u64;
            rem = cur % d as u128;
        }
        (Score(out), rem as u64)
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&l| l == 0)
    }
}

impl Add for Score {
    type Output = Score;

    fn add(self, rhs: Score) -> Score {
        self.saturating_add(rhs)
    }
}

impl Sum for Score {
    fn sum<I: Iterator<Item = Score>>(iter: I) -> Score {
        iter.fold(Score::ZERO, Score::add)
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const CHUNK: u64 = 10_000_000_000_000_000_000;
        if self.is_zero() {
            return f.write_str("0");
        }
        let mut chunks = Vec::new();
        let mut n = *self;
        while !n.is_zero() {
            let (q, r) = n.div_rem_small(CHUNK);
            chunks.push(r);
            n = q;
        }
        let mut iter = chunks.iter().rev();
        if let Some(first) = iter.next() {
            write!(f, "{first}")?;
        }
        for chunk in iter {
            write!(f, "{chunk:019}")?;
        }
        Ok(())
    }
}

/// Digits first, then letters: `'0'` is 1 and `'z'` is 36. Everything else
/// is 1 so punctuation never dominates but never weighs zero either.
#[inline]
pub fn char_ordinal(c: char) -> u64 {
    match c {
        '0'..='9' => c as u64 - '0' as u64 + 1,
        'a'..='z' => c as u64 - 'a' as u64 + 11,
        _ => 1,
    }
}

/// Rank value for an already lowercased `name` in a category with `baseline`.
///
/// `baseline * 37^31 + Σ ordinal(name[i]) * 37^(30 - i)` over the first 30
/// characters; shorter names are padded with zero digits.
pub fn score(name: &str, baseline: u64) -> Score {
    let mut chars = name.chars();
    let mut acc = Score::from_u64(baseline);
    for _ in 0..MAX_PREFIX_LEN {
        let digit = chars.next().map(char_ordinal).unwrap_or(0);
        acc = acc.mul_add_small(RADIX, digit);
    }
    acc.mul_add_small(RADIX, 0)
}

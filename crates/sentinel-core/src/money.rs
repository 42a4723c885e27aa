//! Fixed-point EUR amounts.
//!
//! All monetary values at the planner boundary are EUR (spec: conversion
//! happens upstream). Fixed-point cents avoid the float-drift that would
//! otherwise leak into the portfolio hash and into cash-conservation checks.

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

/// An amount of EUR, stored as integer cents.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EurCents(pub i64);

impl EurCents {
    pub const ZERO: EurCents = EurCents(0);

    /// Build from a floating-point euro amount, rounding to the nearest cent.
    pub fn from_eur(eur: f64) -> Self {
        Self((eur * 100.0).round() as i64)
    }

    /// Render as a floating-point euro amount (for scoring math, display).
    pub fn as_eur(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn abs(&self) -> EurCents {
        EurCents(self.0.abs())
    }
}

impl fmt::Display for EurCents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "€{:.2}", self.as_eur())
    }
}

impl Add for EurCents {
    type Output = EurCents;
    fn add(self, rhs: Self) -> Self {
        EurCents(self.0 + rhs.0)
    }
}

impl Sub for EurCents {
    type Output = EurCents;
    fn sub(self, rhs: Self) -> Self {
        EurCents(self.0 - rhs.0)
    }
}

impl Neg for EurCents {
    type Output = EurCents;
    fn neg(self) -> Self {
        EurCents(-self.0)
    }
}

impl AddAssign for EurCents {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl SubAssign for EurCents {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

impl Mul<i64> for EurCents {
    type Output = EurCents;
    fn mul(self, rhs: i64) -> Self {
        EurCents(self.0 * rhs)
    }
}

impl Sum for EurCents {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(EurCents::ZERO, Add::add)
    }
}

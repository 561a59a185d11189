// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Numeric backends for the escape-time kernel.
//!
//! The kernel and the plane mapper never touch a float directly.
//! Instead they ask a `Precision` to add, subtract, multiply, compare,
//! and convert for them.  That way the same algorithm runs on plain
//! machine doubles for ordinary renders, and on `rug` floats with as
//! many significant digits as a deep zoom needs, once the pixel
//! spacing falls below what an `f64` can tell apart.

use error::Error;
use rug::float::{prec_max, prec_min};
use rug::Float;
use std::fmt::Debug;

/// The arithmetic capability the kernel is written against.  A
/// `Precision` is a small context object (the arbitrary backend needs
/// to know how many bits to carry); the numbers themselves are its
/// associated `Real`.
pub trait Precision: Clone + Debug + Send + Sync {
    /// The scalar this backend computes with.
    type Real: Clone + Debug + Send + Sync;

    /// Read a decimal number at this backend's full precision.
    fn parse(&self, field: &'static str, text: &str) -> Result<Self::Real, Error>;

    /// Convert a machine double.
    fn from_f64(&self, value: f64) -> Self::Real;

    /// Convert a pixel count or index.
    fn from_count(&self, value: usize) -> Self::Real;

    /// `a + b`
    fn add(&self, a: &Self::Real, b: &Self::Real) -> Self::Real;

    /// `a - b`
    fn sub(&self, a: &Self::Real, b: &Self::Real) -> Self::Real;

    /// `a * b`
    fn mul(&self, a: &Self::Real, b: &Self::Real) -> Self::Real;

    /// `a / n`, used to turn a plane extent into a per-pixel gap.
    fn div_count(&self, a: &Self::Real, n: usize) -> Self::Real;

    /// True when `a >= bound`.
    fn at_least(&self, a: &Self::Real, bound: f64) -> bool;

    /// The nearest machine double, for reporting and inverse mapping.
    fn to_f64(&self, a: &Self::Real) -> f64;
}

/// Plain `f64` arithmetic.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Fixed;

impl Precision for Fixed {
    type Real = f64;

    fn parse(&self, field: &'static str, text: &str) -> Result<f64, Error> {
        text.trim().parse::<f64>().map_err(|_| Error::Parse {
            field,
            value: text.trim().to_string(),
        })
    }

    #[inline]
    fn from_f64(&self, value: f64) -> f64 {
        value
    }

    #[inline]
    fn from_count(&self, value: usize) -> f64 {
        value as f64
    }

    #[inline]
    fn add(&self, a: &f64, b: &f64) -> f64 {
        a + b
    }

    #[inline]
    fn sub(&self, a: &f64, b: &f64) -> f64 {
        a - b
    }

    #[inline]
    fn mul(&self, a: &f64, b: &f64) -> f64 {
        a * b
    }

    #[inline]
    fn div_count(&self, a: &f64, n: usize) -> f64 {
        a / (n as f64)
    }

    #[inline]
    fn at_least(&self, a: &f64, bound: f64) -> bool {
        *a >= bound
    }

    #[inline]
    fn to_f64(&self, a: &f64) -> f64 {
        *a
    }
}

// log2(10): bits per significant decimal digit.
const BITS_PER_DIGIT: f64 = 3.321_928_094_887_362;

/// Arbitrary-precision arithmetic over MPFR floats.  Every result is
/// rounded to the same mantissa width.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Arbitrary {
    bits: u32,
}

impl Arbitrary {
    /// A backend carrying at least `digits` significant decimal digits.
    pub fn with_digits(digits: u32) -> Self {
        let bits = (f64::from(digits) * BITS_PER_DIGIT).ceil() as u32;
        Arbitrary::with_bits(bits)
    }

    /// A backend with an explicit mantissa width, clamped to what MPFR
    /// accepts.
    pub fn with_bits(bits: u32) -> Self {
        let bits = bits.max(prec_min()).min(prec_max());
        Arbitrary { bits }
    }

    /// The mantissa width in bits.
    pub fn bits(&self) -> u32 {
        self.bits
    }
}

impl Precision for Arbitrary {
    type Real = Float;

    fn parse(&self, field: &'static str, text: &str) -> Result<Float, Error> {
        match Float::parse(text.trim()) {
            Ok(incomplete) => Ok(Float::with_val(self.bits, incomplete)),
            Err(_) => Err(Error::Parse {
                field,
                value: text.trim().to_string(),
            }),
        }
    }

    fn from_f64(&self, value: f64) -> Float {
        Float::with_val(self.bits, value)
    }

    fn from_count(&self, value: usize) -> Float {
        Float::with_val(self.bits, value as u64)
    }

    fn add(&self, a: &Float, b: &Float) -> Float {
        Float::with_val(self.bits, a + b)
    }

    fn sub(&self, a: &Float, b: &Float) -> Float {
        Float::with_val(self.bits, a - b)
    }

    fn mul(&self, a: &Float, b: &Float) -> Float {
        Float::with_val(self.bits, a * b)
    }

    fn div_count(&self, a: &Float, n: usize) -> Float {
        let n = self.from_count(n);
        Float::with_val(self.bits, a / &n)
    }

    fn at_least(&self, a: &Float, bound: f64) -> bool {
        *a >= bound
    }

    fn to_f64(&self, a: &Float) -> f64 {
        a.to_f64()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_does_plain_arithmetic() {
        let p = Fixed;
        assert_eq!(p.add(&1.5, &2.0), 3.5);
        assert_eq!(p.sub(&1.5, &2.0), -0.5);
        assert_eq!(p.mul(&1.5, &2.0), 3.0);
        assert_eq!(p.div_count(&3.0, 4), 0.75);
        assert!(p.at_least(&4.0, 4.0));
        assert!(!p.at_least(&3.999, 4.0));
    }

    #[test]
    fn fixed_parse_reports_the_field() {
        match Fixed.parse("center x", " nope ") {
            Err(Error::Parse { field, value }) => {
                assert_eq!(field, "center x");
                assert_eq!(value, "nope");
            }
            other => panic!("expected a parse error, got {:?}", other),
        }
        assert_eq!(Fixed.parse("c real", "-0.75\n").unwrap(), -0.75);
    }

    #[test]
    fn digits_become_bits() {
        assert_eq!(Arbitrary::with_digits(16).bits(), 54);
        assert_eq!(Arbitrary::with_digits(100).bits(), 333);
        assert!(Arbitrary::with_digits(0).bits() >= prec_min());
    }

    #[test]
    fn arbitrary_matches_fixed_on_exact_values() {
        let a = Arbitrary::with_digits(50);
        let x = a.from_f64(-2.0);
        let y = a.from_f64(0.75);
        assert_eq!(a.to_f64(&a.add(&x, &y)), Fixed.add(&-2.0, &0.75));
        assert_eq!(a.to_f64(&a.sub(&x, &y)), Fixed.sub(&-2.0, &0.75));
        assert_eq!(a.to_f64(&a.mul(&x, &y)), Fixed.mul(&-2.0, &0.75));
        assert_eq!(a.to_f64(&a.div_count(&x, 8)), -0.25);
        assert!(a.at_least(&a.from_count(4), 4.0));
    }

    #[test]
    fn arbitrary_parse_keeps_digits_a_double_would_lose() {
        let a = Arbitrary::with_digits(40);
        let near = a.parse("x", "1.000000000000000000001").unwrap();
        let one = a.from_count(1);
        let diff = a.sub(&near, &one);
        assert!(a.to_f64(&diff) > 0.0);
        assert_eq!(Fixed.parse("x", "1.000000000000000000001").unwrap(), 1.0);
    }

    #[test]
    fn arbitrary_parse_rejects_garbage() {
        assert!(Arbitrary::with_digits(20).parse("x", "1.2.3").is_err());
    }
}

//! Arithmetic over GF(2^8) with the AES reduction polynomial
//! x^8 + x^4 + x^3 + x + 1 (0x11B).
//!
//! Every key byte is shared independently, so this byte field is all the
//! share engine needs. Multiplication runs a fixed eight rounds with masks
//! instead of branching on operand bits.

use std::ops::{Add, Div, Mul};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Gf256(u8);

impl Gf256 {
    pub(crate) const ZERO: Self = Gf256(0);
    pub(crate) const ONE: Self = Gf256(1);

    #[inline]
    pub(crate) fn new(value: u8) -> Self {
        Self(value)
    }

    #[inline]
    pub(crate) fn value(self) -> u8 {
        self.0
    }

    /// a^254 == a^-1 for every non-zero a. Zero maps to zero; callers never
    /// divide by zero because share indices are distinct and non-zero.
    pub(crate) fn invert(self) -> Self {
        // Square-and-multiply over the fixed exponent 0b1111_1110.
        let mut result = Gf256::ONE;
        let mut base = self;
        let mut exponent: u8 = 254;
        for _ in 0..8 {
            let bit = exponent & 1;
            let product = result * base;
            result = Gf256::select(bit, product, result);
            base = base * base;
            exponent >>= 1;
        }
        result
    }

    /// Horner evaluation of `coefficients[0] + coefficients[1]·x + ...`.
    pub(crate) fn evaluate(coefficients: &[Self], x: Self) -> Self {
        coefficients
            .iter()
            .rev()
            .fold(Gf256::ZERO, |acc, &c| acc * x + c)
    }

    /// Lagrange interpolation of f(0) from distinct, non-zero x coordinates.
    pub(crate) fn interpolate_at_zero(points: &[(Self, Self)]) -> Self {
        let mut acc = Gf256::ZERO;
        for (i, &(xi, yi)) in points.iter().enumerate() {
            let mut numerator = Gf256::ONE;
            let mut denominator = Gf256::ONE;
            for (j, &(xj, _)) in points.iter().enumerate() {
                if i != j {
                    // (0 - xj) / (xi - xj); subtraction is XOR in characteristic 2.
                    numerator = numerator * xj;
                    denominator = denominator * (xi + xj);
                }
            }
            acc = acc + yi * (numerator / denominator);
        }
        acc
    }

    #[inline]
    fn select(bit: u8, if_one: Self, if_zero: Self) -> Self {
        let mask = 0u8.wrapping_sub(bit & 1);
        Gf256((if_one.0 & mask) | (if_zero.0 & !mask))
    }
}

impl Add for Gf256 {
    type Output = Self;

    #[allow(clippy::suspicious_arithmetic_impl)]
    fn add(self, rhs: Self) -> Self {
        Gf256(self.0 ^ rhs.0)
    }
}

impl Mul for Gf256 {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        let mut a = self.0;
        let mut b = rhs.0;
        let mut product = 0u8;
        for _ in 0..8 {
            product ^= a & 0u8.wrapping_sub(b & 1);
            let carry = 0u8.wrapping_sub(a >> 7);
            a = (a << 1) ^ (0x1B & carry);
            b >>= 1;
        }
        Gf256(product)
    }
}

impl Div for Gf256 {
    type Output = Self;

    #[allow(clippy::suspicious_arithmetic_impl)]
    fn div(self, rhs: Self) -> Self {
        self * rhs.invert()
    }
}

//! Arc capacity / cost scalar abstraction
//!
//! The network and solver are generic over the capacity type. Integer types
//! give exact totals; float types accept real-valued costs directly.

use std::fmt::Debug;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

/// Scalar usable as a cost value and as an arc capacity
pub trait Capacity:
    Copy
    + Debug
    + Default
    + PartialOrd
    + Add<Output = Self>
    + Sub<Output = Self>
    + Neg<Output = Self>
    + AddAssign
    + SubAssign
    + Send
    + Sync
    + 'static
{
    const ZERO: Self;

    /// Overflow-checked addition (floats only fail on non-finite results)
    fn checked_add(self, other: Self) -> Option<Self>;

    fn checked_sub(self, other: Self) -> Option<Self>;

    fn to_f64(self) -> f64;

    /// Round-to-nearest conversion used by linear sampling
    fn from_f64(v: f64) -> Self;

    #[inline(always)]
    fn is_positive(self) -> bool {
        self > Self::ZERO
    }

    #[inline(always)]
    fn min_of(self, other: Self) -> Self {
        if other < self {
            other
        } else {
            self
        }
    }

    #[inline(always)]
    fn abs_of(self) -> Self {
        if self < Self::ZERO {
            -self
        } else {
            self
        }
    }
}

macro_rules! impl_int_capacity {
    ($($t:ty),*) => {$(
        impl Capacity for $t {
            const ZERO: Self = 0;

            #[inline(always)]
            fn checked_add(self, other: Self) -> Option<Self> {
                <$t>::checked_add(self, other)
            }

            #[inline(always)]
            fn checked_sub(self, other: Self) -> Option<Self> {
                <$t>::checked_sub(self, other)
            }

            #[inline(always)]
            fn to_f64(self) -> f64 {
                self as f64
            }

            #[inline(always)]
            fn from_f64(v: f64) -> Self {
                v.round() as $t
            }
        }
    )*};
}

macro_rules! impl_float_capacity {
    ($($t:ty),*) => {$(
        impl Capacity for $t {
            const ZERO: Self = 0.0;

            #[inline(always)]
            fn checked_add(self, other: Self) -> Option<Self> {
                let sum = self + other;
                sum.is_finite().then_some(sum)
            }

            #[inline(always)]
            fn checked_sub(self, other: Self) -> Option<Self> {
                let diff = self - other;
                diff.is_finite().then_some(diff)
            }

            #[inline(always)]
            fn to_f64(self) -> f64 {
                self as f64
            }

            #[inline(always)]
            fn from_f64(v: f64) -> Self {
                v as $t
            }
        }
    )*};
}

impl_int_capacity!(i32, i64);
impl_float_capacity!(f32, f64);

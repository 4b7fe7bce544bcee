use crate::error::CoreError;
use core::fmt::Debug;
use core::ops::{Add, Div, Mul, Neg, Sub};
use num_dual::{Dual64, DualNum};

/// Floating point type used throughout system
pub type Real = f64;

/// Arithmetic capability set shared by every operator and residual.
///
/// Plain `f64` is used for evaluation, `Dual64` when the solver asks for
/// derivatives. Code generic over `Scalar` never branches on the concrete type.
pub trait Scalar:
    Copy
    + Debug
    + Send
    + Sync
    + 'static
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
{
    /// Lift a plain value into this scalar type (zero derivative part).
    fn from_real(value: Real) -> Self;

    /// Real (value) part.
    fn re(&self) -> Real;

    fn abs(self) -> Self;

    fn powf(self, exponent: Real) -> Self;

    fn zero() -> Self {
        Self::from_real(0.0)
    }

    fn one() -> Self {
        Self::from_real(1.0)
    }

    /// Multiply by a plain coefficient.
    fn scale(self, factor: Real) -> Self {
        self * Self::from_real(factor)
    }
}

impl Scalar for f64 {
    #[inline]
    fn from_real(value: Real) -> Self {
        value
    }

    #[inline]
    fn re(&self) -> Real {
        *self
    }

    #[inline]
    fn abs(self) -> Self {
        f64::abs(self)
    }

    #[inline]
    fn powf(self, exponent: Real) -> Self {
        f64::powf(self, exponent)
    }

    #[inline]
    fn scale(self, factor: Real) -> Self {
        self * factor
    }
}

impl Scalar for Dual64 {
    #[inline]
    fn from_real(value: Real) -> Self {
        Dual64::from(value)
    }

    #[inline]
    fn re(&self) -> Real {
        self.re
    }

    #[inline]
    fn abs(self) -> Self {
        // d|x|/dx = sign(x); the kink at zero takes the positive branch
        if self.re < 0.0 { -self } else { self }
    }

    #[inline]
    fn powf(self, exponent: Real) -> Self {
        DualNum::<f64>::powf(&self, exponent)
    }
}

pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, CoreError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(CoreError::NonFinite { what, value: v })
    }
}

/// Require a finite, strictly positive value.
pub fn ensure_positive(v: Real, what: &'static str) -> Result<Real, CoreError> {
    let v = ensure_finite(v, what)?;
    if v > 0.0 {
        Ok(v)
    } else {
        Err(CoreError::InvalidArg { what })
    }
}

/// Lift a slice of plain values into any scalar type.
pub fn lift<T: Scalar>(values: &[Real]) -> Vec<T> {
    values.iter().map(|&v| T::from_real(v)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_finite_detects_nan() {
        let err = ensure_finite(Real::NAN, "test").unwrap_err();
        let msg = format!("{err}");
        assert!(msg.contains("Non-finite"));
    }

    #[test]
    fn ensure_positive_rejects_zero() {
        assert!(ensure_positive(0.0, "diameter").is_err());
        assert!(ensure_positive(-1.0, "diameter").is_err());
        assert_eq!(ensure_positive(0.5, "diameter").unwrap(), 0.5);
    }

    #[test]
    fn dual_abs_carries_sign_of_derivative() {
        let x = Dual64::from(-2.0).derivative();
        let y = Scalar::abs(x);
        assert_eq!(y.re, 2.0);
        assert_eq!(y.eps, -1.0);
    }

    #[test]
    fn dual_powf_matches_analytic_derivative() {
        let x = Dual64::from(4.0).derivative();
        let y = Scalar::powf(x, 0.5);
        assert!((y.re - 2.0).abs() < 1e-14);
        assert!((y.eps - 0.25).abs() < 1e-14);
    }

    #[test]
    fn plain_and_dual_agree_on_value() {
        let a = 3.5_f64;
        let b = Dual64::from_real(a);
        let plain = (Scalar::abs(-a) * 2.0) / 7.0;
        let dual = (Scalar::abs(-b) * Dual64::from_real(2.0)) / Dual64::from_real(7.0);
        assert_eq!(plain, dual.re);
        assert_eq!(dual.eps, 0.0);
    }

    proptest::proptest! {
        #[test]
        fn dual_powf_derivative_for_any_base(x in 0.1f64..1.0e7, p in 0.1f64..2.0) {
            let y = Scalar::powf(Dual64::from(x).derivative(), p);
            let expected = p * x.powf(p - 1.0);
            proptest::prop_assert!((y.eps - expected).abs() <= 1e-12 * expected.abs().max(1.0));
            proptest::prop_assert!((y.re - x.powf(p)).abs() <= 1e-12 * x.powf(p));
        }
    }
}

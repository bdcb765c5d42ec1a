//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Clamp a value into the range `[min, max]`.
///
/// A NaN value is returned unchanged, callers that can produce one must
/// handle it themselves.
pub fn clamp<T>(value: &T, min: &T, max: &T) -> T 
where
    T: Float
{
    let mut ret = *value;

    if ret > *max {
        ret = *max
    }
    if ret < *min {
        ret = *min
    }

    ret
}

/// Arc cosine with the argument clamped into `[-1, 1]`.
///
/// Dot products of normalised vectors regularly land a few ULP outside the
/// domain of `acos`, this keeps them from becoming NaN.
pub fn clamped_acos<T>(value: T) -> T
where
    T: Float
{
    clamp(&value, &-T::one(), &T::one()).acos()
}

/// Arc sine with the argument clamped into `[-1, 1]`.
pub fn clamped_asin<T>(value: T) -> T
where
    T: Float
{
    clamp(&value, &-T::one(), &T::one()).asin()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_clamp() {
        assert_eq!(clamp(&2f64, &-1f64, &1f64), 1f64);
        assert_eq!(clamp(&-2f64, &-1f64, &1f64), -1f64);
        assert_eq!(clamp(&0.5f64, &-1f64, &1f64), 0.5f64);
    }

    #[test]
    fn test_clamped_trig() {
        const PI: f64 = std::f64::consts::PI;

        assert_eq!(clamped_acos(1.0 + 1e-12), 0f64);
        assert_eq!(clamped_acos(-1.0 - 1e-12), PI);
        assert_eq!(clamped_asin(1.0 + 1e-12), PI / 2.0);
        assert_eq!(clamped_asin(-1.0 - 1e-12), -PI / 2.0);
        assert!(!clamped_acos(1.0000001f64).is_nan());
    }
}

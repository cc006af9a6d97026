//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Return the euclidian norm (distance between) of two points.
///
/// If the points do not have the same number of dimentions then `None` is
/// returned.
pub fn norm<T>(point_0: &[T], point_1: &[T]) -> Option<T>
where
    T: Float + std::ops::AddAssign
{
    // Check that the dimentions match
    if point_0.len() != point_1.len() {
        return None;
    }

    // Sum all elements of the points
    let mut sum = T::from(0).unwrap();

    for i in 0..point_0.len() {
        sum += (point_0[i] - point_1[i]).powi(2);
    }

    // Return the squareroot of the sum
    Some(sum.sqrt())
}

/// Get the signed angular distance between two angles in the range of [0, 2pi].
///
/// This function will return the shortest signed distance between a and b accounting for wrapping
/// between 0 and 2pi.
pub fn get_ang_dist_2pi<T>(a: T, b: T) -> T
where
    T: Float + std::ops::Mul + std::ops::Add + std::ops::Sub
{
    let tau_t: T = T::from(std::f64::consts::TAU).unwrap();

    let c = rem_euclid(a - b, tau_t);
    let d = rem_euclid(b - a, tau_t);

    if c < d {
        return -c
    }
    else {
        return d
    }
}

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
///
/// This function is taken from the std library as num is missing it.
///
/// In particular, the return value `r` satisfies `0.0 <= r < rhs.abs()` in
/// most cases. However, due to a floating point round-off error it can
/// result in `r == rhs.abs()`, violating the mathematical definition, if
/// `self` is much smaller than `rhs.abs()` in magnitude and `self < 0.0`.
/// This result is not an element of the function's codomain, but it is the
/// closest floating point number in the real numbers and thus fulfills the
/// property `self == self.div_euclid(rhs) * rhs + self.rem_euclid(rhs)`
/// approximatively.
pub fn rem_euclid<T>(lhs: T, rhs: T) -> T
where
    T: Float + std::ops::Mul + std::ops::Add + std::ops::Sub + std::ops::Rem
{
    let r = lhs % rhs;
    if r < T::from(0.0).unwrap() { r + rhs.abs() } else { r }
}

/// Map a value in the range [-pi, pi] to [0, 2pi]
pub fn map_pi_to_2pi<T>(value: T) -> T
where
    T: Float
{
    let tau_t: T = T::from(std::f64::consts::TAU).unwrap();

    if value < T::from(0).unwrap() {
        return tau_t + value;
    }
    else {
        return value;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_get_ang_dist_2pi() {
        const TAU: f64 = std::f64::consts::TAU;

        assert_eq!(get_ang_dist_2pi(1f64, 2f64), 1f64);
        assert_eq!(get_ang_dist_2pi(2f64, 1f64), -1f64);
        assert_eq!(get_ang_dist_2pi(0f64, TAU), 0f64);
        assert_eq!(get_ang_dist_2pi(TAU, 0f64), 0f64);
        assert_eq!(get_ang_dist_2pi(1f64, TAU), -1f64);
        assert_eq!(get_ang_dist_2pi(0f64, TAU - 1f64), -1f64);
        assert_eq!(get_ang_dist_2pi(TAU - 1f64, 1f64), 2f64);
    }

    #[test]
    fn test_norm() {
        assert_eq!(norm(&[0f64, 0f64], &[3f64, 4f64]), Some(5f64));
        assert_eq!(norm(&[1f64, 1f64], &[1f64, 1f64]), Some(0f64));
        assert_eq!(norm(&[0f64], &[1f64, 2f64]), None);
    }

    #[test]
    fn test_map_pi_to_2pi() {
        const PI: f64 = std::f64::consts::PI;
        const TAU: f64 = std::f64::consts::TAU;

        assert_eq!(map_pi_to_2pi(0f64), 0f64);
        assert_eq!(map_pi_to_2pi(1f64), 1f64);
        assert_eq!(map_pi_to_2pi(-PI), PI);
        assert_eq!(map_pi_to_2pi(-1f64), TAU - 1f64);
    }
}

use num_bigint::BigInt;
use num_integer::Integer;
use num_rational::BigRational;
use num_traits::{One, Signed, Zero};

/// Converts a float duration to an exact rational, then snaps it to the
/// closest rational whose denominator stays within `max_denominator`. Floats
/// that came from decimal input ("0.001") land back on the decimal fraction
/// (1/1000) instead of the exact binary expansion.
pub(crate) fn from_float_limited(value: f64, max_denominator: u64) -> Option<BigRational> {
    let exact = BigRational::from_float(value)?;
    Some(limit_denominator(&exact, &BigInt::from(max_denominator)))
}

/// `gcd(a/b, c/d) = gcd(a, c) / lcm(b, d)` for fractions in lowest terms.
pub(crate) fn rational_gcd(a: &BigRational, b: &BigRational) -> BigRational {
    BigRational::new(a.numer().gcd(b.numer()), a.denom().lcm(b.denom()))
}

// Stern-Brocot walk, same scheme as CPython's Fraction.limit_denominator: run
// the continued fraction expansion until the convergent's denominator would
// exceed the bound, then pick the closer of the two candidate bounds.
fn limit_denominator(value: &BigRational, max_denominator: &BigInt) -> BigRational {
    if value.denom() <= max_denominator {
        return value.clone();
    }

    let mut p0 = BigInt::zero();
    let mut q0 = BigInt::one();
    let mut p1 = BigInt::one();
    let mut q1 = BigInt::zero();

    let mut n = value.numer().abs();
    let mut d = value.denom().clone();

    loop {
        let a = n.div_floor(&d);
        let q2 = &q0 + &a * &q1;
        if &q2 > max_denominator {
            break;
        }

        let p2 = &p0 + &a * &p1;
        p0 = std::mem::replace(&mut p1, p2);
        q0 = std::mem::replace(&mut q1, q2);

        let r = &n - &a * &d;
        n = std::mem::replace(&mut d, r);
    }

    let k = (max_denominator - &q0).div_floor(&q1);
    let first = BigRational::new(&p0 + &k * &p1, &q0 + &k * &q1);
    let second = BigRational::new(p1, q1);

    let magnitude = value.abs();
    let closer = if (&second - &magnitude).abs() <= (&first - &magnitude).abs() {
        second
    } else {
        first
    };

    if value.is_negative() {
        -closer
    } else {
        closer
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn rational(numer: i64, denom: i64) -> BigRational {
        BigRational::new(BigInt::from(numer), BigInt::from(denom))
    }

    #[test]
    fn decimal_durations_snap_to_decimal_fractions() {
        assert_eq!(
            from_float_limited(0.001, 1_000_000).unwrap(),
            rational(1, 1000)
        );
        assert_eq!(
            from_float_limited(0.5e-3, 1_000_000).unwrap(),
            rational(1, 2000)
        );
        assert_eq!(from_float_limited(2.0, 1_000_000).unwrap(), rational(2, 1));
    }

    #[test]
    fn sub_resolution_durations_collapse_to_zero() {
        // 1e-7 is closer to 0 than to any fraction with denominator <= 1e6
        assert!(from_float_limited(1e-7, 1_000_000).unwrap().is_zero());
    }

    #[test]
    fn out_of_bound_denominators_snap_to_the_nearest_convergent() {
        // 3/2000000 is out of range, the nearest admissible fraction is
        // 1/666667
        assert_eq!(
            from_float_limited(1.5e-6, 1_000_000).unwrap(),
            rational(1, 666_667)
        );
    }

    #[test]
    fn non_finite_input_is_rejected() {
        assert!(from_float_limited(f64::NAN, 1_000_000).is_none());
        assert!(from_float_limited(f64::INFINITY, 1_000_000).is_none());
    }

    #[test]
    fn gcd_of_unit_fractions() {
        assert_eq!(
            rational_gcd(&rational(1, 1000), &rational(1, 4000)),
            rational(1, 4000)
        );
        assert_eq!(
            rational_gcd(&rational(3, 1000), &rational(1, 1000)),
            rational(1, 1000)
        );
        assert_eq!(rational_gcd(&rational(2, 1), &rational(3, 1)), rational(1, 1));
    }
}

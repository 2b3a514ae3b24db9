use crate::Monomial;
use crate::Parameter;
use crate::Polynomial;

/// Returns the monic greatest common divisor of two multivariate polynomials.
///
/// The polynomials are treated as univariate polynomials in their most
/// significant parameter with coefficients in the remaining parameters, and
/// the gcd is computed by a primitive polynomial remainder sequence, recursing
/// on the contents. The gcd of zero and zero is zero.
pub fn gcd(left: &Polynomial, right: &Polynomial) -> Polynomial {
    if left.is_zero() {
        return right.monic();
    }

    if right.is_zero() {
        return left.monic();
    }

    if left.is_constant() || right.is_constant() {
        return Polynomial::one();
    }

    if left == right {
        return left.monic();
    }

    let x = match (left.main_parameter(), right.main_parameter()) {
        (Some(l), Some(r)) => l.min(r).clone(),
        _ => unreachable!("Non-constant polynomials have a main parameter"),
    };

    if left.degree_in(&x) == 0 {
        return gcd(left, &content(right, &x));
    }

    if right.degree_in(&x) == 0 {
        return gcd(&content(left, &x), right);
    }

    let (left_content, left_primitive) = content_and_primitive_part(left, &x);
    let (right_content, right_primitive) = content_and_primitive_part(right, &x);
    let common_content = gcd(&left_content, &right_content);

    let (mut a, mut b) = if left_primitive.degree_in(&x) >= right_primitive.degree_in(&x) {
        (left_primitive, right_primitive)
    } else {
        (right_primitive, left_primitive)
    };

    loop {
        let remainder = pseudo_remainder(&a, &b, &x);
        if remainder.is_zero() {
            break;
        }

        if remainder.degree_in(&x) == 0 {
            // The primitive parts are coprime.
            return common_content;
        }

        a = b;
        b = content_and_primitive_part(&remainder, &x).1;
    }

    (&common_content * &b).monic()
}

/// Returns the monic gcd of the coefficients of the polynomial viewed as a
/// univariate polynomial in the given parameter.
pub fn content(polynomial: &Polynomial, parameter: &Parameter) -> Polynomial {
    let mut result = Polynomial::zero();
    for coefficient in polynomial.coefficients_in(parameter).values() {
        result = gcd(&result, coefficient);
        if result.is_one() {
            break;
        }
    }

    result
}

/// Splits the polynomial into its content and primitive part with respect to
/// the given parameter, the product of both is the polynomial up to a constant.
pub fn content_and_primitive_part(polynomial: &Polynomial, parameter: &Parameter) -> (Polynomial, Polynomial) {
    let content = content(polynomial, parameter);
    let primitive = polynomial
        .div_exact(&content)
        .expect("The content divides every coefficient")
        .monic();

    (content, primitive)
}

/// Computes a pseudo remainder of `a` divided by `b` in the given parameter,
/// which is `lc(b)^k * a mod b` for some `k`. The divisor must have a positive
/// degree in the parameter.
pub fn pseudo_remainder(a: &Polynomial, b: &Polynomial, parameter: &Parameter) -> Polynomial {
    let divisor_degree = b.degree_in(parameter);
    debug_assert!(divisor_degree > 0, "The divisor {b} must depend on {parameter}");

    let divisor_leading = b.leading_coefficient_in(parameter);
    let mut remainder = a.clone();
    while !remainder.is_zero() {
        let degree = remainder.degree_in(parameter);
        if degree < divisor_degree {
            break;
        }

        let remainder_leading = remainder.leading_coefficient_in(parameter);
        let shift = Monomial::parameter(parameter.clone(), degree - divisor_degree);
        remainder = &(&divisor_leading * &remainder) - &(&remainder_leading * b).mul_monomial(&shift);
    }

    remainder
}

#[cfg(test)]
mod tests {
    use super::*;

    use pmc_utilities::random_test;
    use rand::Rng;
    use rand::rngs::StdRng;

    use crate::rational;

    fn p(name: &str) -> Polynomial {
        Polynomial::parameter(Parameter::new(name))
    }

    fn c(value: i64) -> Polynomial {
        Polynomial::from_integer(value)
    }

    /// Returns a random polynomial of low degree in the parameters a and b.
    fn random_polynomial(rng: &mut StdRng) -> Polynomial {
        let mut result = Polynomial::zero();
        for _ in 0..rng.random_range(1..4) {
            let monomial = Monomial::parameter(Parameter::new("a"), rng.random_range(0..3))
                .mul(&Monomial::parameter(Parameter::new("b"), rng.random_range(0..2)));
            result = &result + &Polynomial::term(monomial, rational(rng.random_range(-3..4), 1));
        }

        result
    }

    #[test]
    fn test_gcd_univariate() {
        // gcd((a - 1)(a + 2), 3(a - 1)(a - 3)) = a - 1
        let left = &(&p("a") - &c(1)) * &(&p("a") + &c(2));
        let right = &(&c(3) * &(&p("a") - &c(1))) * &(&p("a") - &c(3));

        assert_eq!(gcd(&left, &right), &p("a") - &c(1));
        assert_eq!(gcd(&left, &c(5)), c(1));
        assert_eq!(gcd(&Polynomial::zero(), &(&c(2) * &p("a"))), p("a"));
    }

    #[test]
    fn test_gcd_multivariate() {
        // gcd((a + b)(a - b), (a + b)^2 b) = a + b
        let sum = &p("a") + &p("b");
        let left = &sum * &(&p("a") - &p("b"));
        let right = &(&sum * &sum) * &p("b");

        assert_eq!(gcd(&left, &right), sum);
        assert_eq!(gcd(&(&p("b") * &p("a")), &(&p("b") * &c(2))), p("b"));
        assert_eq!(gcd(&(&c(1) - &p("b")), &(&p("b") - &c(1))), &p("b") - &c(1));
    }

    #[test]
    fn test_random_gcd_divides() {
        random_test(100, |rng| {
            let common = random_polynomial(rng);
            let left = &common * &random_polynomial(rng);
            let right = &common * &random_polynomial(rng);

            let divisor = gcd(&left, &right);
            if left.is_zero() && right.is_zero() {
                assert!(divisor.is_zero());
                return;
            }

            assert!(left.div_exact(&divisor).is_some(), "{divisor} must divide {left}");
            assert!(right.div_exact(&divisor).is_some(), "{divisor} must divide {right}");
            if !common.is_zero() {
                assert!(
                    divisor.div_exact(&common).is_some(),
                    "{common} must divide the gcd {divisor} of {left} and {right}"
                );
            }
        })
    }
}

//!
//! Log-space probability
//!
//! Used by the generic profile builder (match occupancy, wing retraction) and
//! as the value type of the slow reference DP, where sums of many small
//! probabilities must stay exact over long sequences.
//!
use approx::AbsDiffEq;

///
/// Wrapper of f64 that represents probability `0 <= p` stored as `log p`
///
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub struct Prob(f64);

///
/// short-hand of `Prob::from_prob`
///
pub fn p(p: f64) -> Prob {
    Prob::from_prob(p)
}

///
/// short-hand of `Prob::from_log_prob`
///
pub fn lp(lp: f64) -> Prob {
    Prob::from_log_prob(lp)
}

impl Prob {
    pub fn from_prob(value: f64) -> Prob {
        Prob(value.ln())
    }
    pub fn from_log_prob(log_value: f64) -> Prob {
        Prob(log_value)
    }
    ///
    /// Get the probability
    pub fn to_value(self) -> f64 {
        self.0.exp()
    }
    ///
    /// Get the log probability
    pub fn to_log_value(self) -> f64 {
        self.0
    }
    ///
    /// Is `p == 0` or not? (log p = -inf)
    ///
    pub fn is_zero(self) -> bool {
        self.0.is_infinite() && self.0.is_sign_negative()
    }
    pub fn zero() -> Prob {
        Prob(f64::NEG_INFINITY)
    }
    pub fn one() -> Prob {
        Prob(0.0)
    }
    ///
    /// `1 - p` for a probability `p <= 1`
    ///
    pub fn complement(self) -> Prob {
        if self.is_zero() {
            Prob::one()
        } else {
            Prob((-self.0.exp()).ln_1p())
        }
    }
}

/// p=0 (Prob(-inf)) as a default value
impl Default for Prob {
    fn default() -> Self {
        Prob::zero()
    }
}

impl num_traits::One for Prob {
    fn one() -> Self {
        Prob::one()
    }
}

impl num_traits::Zero for Prob {
    fn zero() -> Self {
        Prob::zero()
    }
    fn is_zero(&self) -> bool {
        Prob::is_zero(*self)
    }
}

impl std::fmt::Display for Prob {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}({:.4})", self.0, self.to_value())
    }
}

/// Addition of two probabilities `px + py` in log space
///
/// If `px > py`:
///
/// ```text
/// log(exp(x) + exp(y)) = x + log(1 + exp(y-x))
/// ```
impl std::ops::Add for Prob {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        let (x, y) = if self.0 >= other.0 {
            (self.0, other.0)
        } else {
            (other.0, self.0)
        };
        if y == f64::NEG_INFINITY {
            Prob(x)
        } else {
            Prob(x + (y - x).exp().ln_1p())
        }
    }
}

/// Multiplication `log(px * py) = log(px) + log(py)`
impl std::ops::Mul for Prob {
    type Output = Self;
    fn mul(self, other: Self) -> Self {
        Prob(self.0 + other.0)
    }
}

/// Division `log(px / py) = log(px) - log(py)`
impl std::ops::Div for Prob {
    type Output = Self;
    fn div(self, other: Self) -> Self {
        Prob(self.0 - other.0)
    }
}

impl std::ops::AddAssign for Prob {
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}
impl std::ops::MulAssign for Prob {
    fn mul_assign(&mut self, other: Self) {
        *self = *self * other;
    }
}
impl std::iter::Sum for Prob {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Prob::zero(), |a, b| a + b)
    }
}
impl<'a> std::iter::Sum<&'a Self> for Prob {
    fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.fold(Prob::zero(), |a, b| a + *b)
    }
}
impl std::iter::Product for Prob {
    fn product<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Prob::one(), |a, b| a * b)
    }
}

/// Multiplication of Prob and usize `p * c`
impl std::ops::Mul<usize> for Prob {
    type Output = Self;
    fn mul(self, rhs: usize) -> Self {
        Prob(self.0 + (rhs as f64).ln())
    }
}

/// for approx `assert_abs_diff_eq`
impl AbsDiffEq for Prob {
    type Epsilon = f64;

    fn default_epsilon() -> Self::Epsilon {
        f64::default_epsilon()
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: Self::Epsilon) -> bool {
        f64::abs_diff_eq(&self.0, &other.0, epsilon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prob_add_mul() {
        assert_eq!(p(0.0) + p(1.0), p(1.0));
        assert_eq!(p(0.0) * p(1.0), p(0.0));
        assert_abs_diff_eq!((p(0.3) + p(0.3)).0, p(0.6).0, epsilon = 1e-12);
        assert_abs_diff_eq!((p(0.3) * p(0.3)).0, p(0.09).0, epsilon = 1e-12);
        assert_abs_diff_eq!((p(0.5) + p(0.00001)).0, p(0.50001).0, epsilon = 1e-12);
        assert_abs_diff_eq!((p(0.5) / p(0.25)).to_value(), 2.0, epsilon = 1e-12);
    }
    #[test]
    fn prob_sum_prod() {
        let xs: Vec<Prob> = vec![];
        let sum: Prob = xs.iter().sum();
        let product: Prob = xs.into_iter().product();
        assert_eq!(sum, p(0.0));
        assert_eq!(product, p(1.0));

        let xs = vec![p(0.1), p(0.1), p(0.1)];
        let sum: Prob = xs.iter().sum();
        assert_relative_eq!(sum.to_value(), 0.3, max_relative = 1e-12);
        let product: Prob = xs.into_iter().product();
        assert_relative_eq!(product.to_value(), 0.001, max_relative = 1e-12);
    }
    #[test]
    fn prob_complement() {
        assert_abs_diff_eq!(p(0.3).complement().to_value(), 0.7, epsilon = 1e-12);
        assert_eq!(p(0.0).complement(), p(1.0));
        assert!(p(1.0).complement().is_zero());
    }
    #[test]
    fn prob_zero_one() {
        assert_eq!(Prob::one(), Prob::from_prob(1.0));
        assert_eq!(Prob::zero(), Prob::from_prob(0.0));
        assert!(Prob::zero().is_zero());
        assert!(!p(0.00001).is_zero());
        assert_eq!(lp(0.0), Prob::one());
        assert_abs_diff_eq!(p(0.5) * 2, p(1.0), epsilon = 1e-12);
    }
}

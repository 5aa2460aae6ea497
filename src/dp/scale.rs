//!
//! Scale factors of a Forward or Backward run
//!
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

///
/// Immutable record of the sparse rescaling of one DP run.
///
/// `factors[i]` is the divisor applied to row `i` (1.0 if the row was not
/// rescaled) and `totscale` is the sum of their natural logs. The score of
/// the run is `totscale + ln(final special value)`.
///
/// `has_own_scales` is false only for a Backward run that reused the factors
/// of Forward on every row. Backward switches to its own factors when the
/// Forward ones are insufficient; from that row on, the Forward and Backward
/// rows are no longer on the same scale.
///
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaleTrace {
    factors: Vec<f32>,
    totscale: f64,
    has_own_scales: bool,
}

impl ScaleTrace {
    ///
    /// Trace of rows `0..factors.len()`. `InvalidArgument` if there is not
    /// even row 0.
    ///
    pub fn new(factors: Vec<f32>, totscale: f64, has_own_scales: bool) -> Result<ScaleTrace> {
        if factors.is_empty() {
            return Err(Error::invalid("a scale trace has at least row 0"));
        }
        Ok(ScaleTrace::from_rows(factors, totscale, has_own_scales))
    }
    /// rows of a DP matrix, which always include row 0
    pub(crate) fn from_rows(factors: Vec<f32>, totscale: f64, has_own_scales: bool) -> ScaleTrace {
        ScaleTrace {
            factors,
            totscale,
            has_own_scales,
        }
    }
    /// sequence length L (the trace has L+1 rows)
    pub fn l(&self) -> usize {
        self.factors.len().saturating_sub(1)
    }
    pub fn factor(&self, i: usize) -> f32 {
        self.factors[i]
    }
    pub fn factors(&self) -> &[f32] {
        &self.factors
    }
    pub fn totscale(&self) -> f64 {
        self.totscale
    }
    pub fn has_own_scales(&self) -> bool {
        self.has_own_scales
    }
    /// number of rows that were rescaled
    pub fn n_rescaled(&self) -> usize {
        self.factors.iter().filter(|&&f| f > 1.0).count()
    }
    ///
    /// Log score from the final special value, summing the log factors row
    /// by row instead of using `totscale`.
    ///
    pub fn reconstruct(&self, last: f32) -> f64 {
        let sum: f64 = self.factors.iter().map(|&f| (f as f64).ln()).sum();
        sum + (last as f64).ln()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reconstruct_from_factors() {
        let t = ScaleTrace::new(vec![1.0, 2.0, 1.0, 4.0], 8f64.ln(), false).unwrap();
        assert_eq!(t.l(), 3);
        assert_eq!(t.n_rescaled(), 2);
        assert_abs_diff_eq!(t.reconstruct(0.5), 4f64.ln(), epsilon = 1e-12);
        assert_abs_diff_eq!(t.reconstruct(1.0), t.totscale(), epsilon = 1e-12);
    }

    #[test]
    fn empty_trace_is_rejected() {
        let e = ScaleTrace::new(Vec::new(), 0.0, false).unwrap_err();
        assert!(matches!(e, Error::InvalidArgument(_)));
        let t = ScaleTrace::new(vec![1.0], 0.0, false).unwrap();
        assert_eq!(t.l(), 0);
    }

    #[test]
    fn json_round() {
        let t = ScaleTrace::new(vec![1.0, 1.0e5], 1.0e5f64.ln(), true).unwrap();
        let s = serde_json::to_string(&t).unwrap();
        let u: ScaleTrace = serde_json::from_str(&s).unwrap();
        assert_eq!(t, u);
        assert!(u.has_own_scales());
    }
}

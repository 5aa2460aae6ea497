//!
//! HmmParams: error model used to derive a CoreHmm from a consensus sequence
//!
use super::model::NodeTrans;
use serde::{Deserialize, Serialize};

///
/// Parameters of a consensus-derived profile HMM
///
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HmmParams {
    /// probability of emitting a non-consensus residue in a match state
    pub p_mismatch: f64,
    /// M->I and M->D
    pub p_gap_open: f64,
    /// I->I and D->D
    pub p_gap_ext: f64,
}

impl HmmParams {
    pub fn new(p_mismatch: f64, p_gap_open: f64, p_gap_ext: f64) -> HmmParams {
        assert!((0.0..=1.0).contains(&p_mismatch));
        assert!((0.0..0.5).contains(&p_gap_open));
        assert!((0.0..1.0).contains(&p_gap_ext));
        HmmParams {
            p_mismatch,
            p_gap_open,
            p_gap_ext,
        }
    }
    /// uniform error rate profile
    /// `p_mut = p_ins = p_del = p`
    pub fn uniform(p: f64) -> HmmParams {
        HmmParams::new(p, p, p)
    }
    pub fn default() -> HmmParams {
        HmmParams::uniform(0.01)
    }
    /// Param for medium-error sequence
    /// `p_mismatch = 5%`
    pub fn mid_error() -> HmmParams {
        HmmParams::uniform(0.05)
    }
    /// Param for highly-error sequence
    /// `p_mismatch = 10%`
    pub fn high_error() -> HmmParams {
        HmmParams::uniform(0.1)
    }
    /// Param for no-error sequence
    /// `p_mismatch = 0%`
    pub fn zero_error() -> HmmParams {
        HmmParams::uniform(0.0)
    }
    ///
    /// Transitions of an internal node
    ///
    pub fn node_trans(&self) -> NodeTrans {
        NodeTrans {
            mm: 1.0 - 2.0 * self.p_gap_open,
            mi: self.p_gap_open,
            md: self.p_gap_open,
            im: 1.0 - self.p_gap_ext,
            ii: self.p_gap_ext,
            dm: 1.0 - self.p_gap_ext,
            dd: self.p_gap_ext,
        }
    }
    ///
    /// Transitions of the begin node 0 (B->M1, B->I0, B->D1). D0 does not exist.
    ///
    pub fn begin_trans(&self) -> NodeTrans {
        NodeTrans {
            dm: 1.0,
            dd: 0.0,
            ..self.node_trans()
        }
    }
    /// probability of the consensus residue in a match state
    pub fn p_match(&self) -> f64 {
        1.0 - self.p_mismatch
    }
}

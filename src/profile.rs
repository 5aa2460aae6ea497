//!
//! Generic profile: log-odds scores of a configured profile HMM
//!
//! The generic profile is the input of quantization (`oprofile`). Scores are
//! natural-log odds ratios in single precision.
//!
//! Transition scores `tsc[k][t]` for k = 0..M:
//!
//! * `MM`, `IM`, `DM` at k are the transitions from node k into node k+1
//! * `BM` at k is the entry B->M(k+1)
//! * `MD`, `DD`, `MI`, `II` at k stay inside node k / k->k+1 delete path
//!
use crate::alphabet::Alphabet;
use crate::common::{Specials, XState, XTrans};
use crate::error::{Error, Result};
use crate::hmm::{Background, CoreHmm};
use crate::prob::{p, Prob};
use log::debug;
use serde::{Deserialize, Serialize};

///
/// Alignment mode: local/glocal entry and exit, multi/uni hit
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlignMode {
    /// local, multihit
    Local,
    /// local, unihit
    UniLocal,
    /// glocal, multihit
    Glocal,
    /// glocal, unihit
    UniGlocal,
}

impl AlignMode {
    pub fn is_local(self) -> bool {
        matches!(self, AlignMode::Local | AlignMode::UniLocal)
    }
    pub fn is_multihit(self) -> bool {
        matches!(self, AlignMode::Local | AlignMode::Glocal)
    }
}

impl Default for AlignMode {
    fn default() -> Self {
        AlignMode::Local
    }
}

///
/// Transition kinds of a profile node, in table order
///
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PTrans {
    MM = 0,
    IM = 1,
    DM = 2,
    BM = 3,
    MD = 4,
    DD = 5,
    MI = 6,
    II = 7,
}

/// number of transition kinds
pub const N_PTRANS: usize = 8;

#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    name: String,
    abc: Alphabet,
    m: usize,
    /// `tsc[k][t]` for k = 0..=M
    tsc: Vec<[f32; N_PTRANS]>,
    /// `msc[k][x]` for k = 0..=M and all codes x < Kp
    msc: Vec<Vec<f32>>,
    xsc: Specials<f32>,
    mode: AlignMode,
    /// target length of the length model
    l: usize,
    /// expected number of J segments (0 unihit, 1 multihit)
    nj: f32,
}

impl Profile {
    ///
    /// Configure the core model into a profile of target length `l`
    ///
    pub fn configure(hmm: &CoreHmm, bg: &Background, l: usize, mode: AlignMode) -> Result<Profile> {
        let abc = hmm.alphabet();
        if abc != bg.alphabet() {
            return Err(Error::invalid("alphabets of model and background differ"));
        }
        let m = hmm.m();
        let kp = abc.kp();
        let mut tsc = vec![[f32::NEG_INFINITY; N_PTRANS]; m + 1];

        // entry
        if mode.is_local() {
            // uniform fragment length over the match occupancy
            let occ = hmm.match_occupancy();
            let z: Prob = (1..=m).map(|k| p(occ[k]) * (m - k + 1)).sum();
            for k in 1..=m {
                tsc[k - 1][PTrans::BM as usize] = (p(occ[k]) / z).to_log_value() as f32;
            }
        } else {
            // wing retraction: B->D1->...->Dk->M(k+1)
            let t0 = hmm.t(0);
            tsc[0][PTrans::BM as usize] = p(1.0 - t0.md).to_log_value() as f32;
            let mut z = p(t0.md);
            for k in 1..m {
                tsc[k][PTrans::BM as usize] = (z * p(hmm.t(k).dm)).to_log_value() as f32;
                z *= p(hmm.t(k).dd);
            }
        }

        // node transitions
        for k in 1..m {
            let t = hmm.t(k);
            let row = &mut tsc[k];
            row[PTrans::MM as usize] = ln(t.mm);
            row[PTrans::MI as usize] = ln(t.mi);
            row[PTrans::MD as usize] = ln(t.md);
            row[PTrans::IM as usize] = ln(t.im);
            row[PTrans::II as usize] = ln(t.ii);
            row[PTrans::DM as usize] = ln(t.dm);
            row[PTrans::DD as usize] = ln(t.dd);
        }

        // match emissions
        let mut msc = vec![vec![f32::NEG_INFINITY; kp]; m + 1];
        for k in 1..=m {
            let e = hmm.mat(k);
            for x in 0..abc.k() {
                msc[k][x] = ln(e[x] / bg.freq(x as u8));
            }
            for code in 0..kp as u8 {
                if abc.is_degenerate(code) {
                    let sc = expected_score(abc, bg, &msc[k], code);
                    msc[k][code as usize] = sc;
                }
            }
        }

        // E state by hit mode. N, C, J are set by the length model.
        let mut xsc = Specials::new(f32::NEG_INFINITY);
        let nj = if mode.is_multihit() {
            xsc[(XState::E, XTrans::Move)] = -std::f32::consts::LN_2;
            xsc[(XState::E, XTrans::Loop)] = -std::f32::consts::LN_2;
            1.0
        } else {
            xsc[(XState::E, XTrans::Move)] = 0.0;
            xsc[(XState::E, XTrans::Loop)] = f32::NEG_INFINITY;
            0.0
        };

        let mut gm = Profile {
            name: hmm.name().to_string(),
            abc: abc.clone(),
            m,
            tsc,
            msc,
            xsc,
            mode,
            l,
            nj,
        };
        gm.reconfig_length(l);
        debug!("configured profile {} M={} L={} mode={:?}", gm.name, m, l, mode);
        Ok(gm)
    }
    ///
    /// Set the N, C, J loop/move scores for the target length `l`
    ///
    /// ```text
    /// pmove = (2 + nj) / (L + 2 + nj)
    /// ploop = 1 - pmove
    /// ```
    ///
    pub fn reconfig_length(&mut self, l: usize) {
        let pmove = (2.0 + self.nj) / (l as f32 + 2.0 + self.nj);
        let ploop = 1.0 - pmove;
        self.xsc.set_ncj(XTrans::Loop, ploop.ln());
        self.xsc.set_ncj(XTrans::Move, pmove.ln());
        self.l = l;
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn alphabet(&self) -> &Alphabet {
        &self.abc
    }
    /// number of nodes
    pub fn m(&self) -> usize {
        self.m
    }
    /// target length
    pub fn l(&self) -> usize {
        self.l
    }
    pub fn nj(&self) -> f32 {
        self.nj
    }
    pub fn mode(&self) -> AlignMode {
        self.mode
    }
    pub fn is_local(&self) -> bool {
        self.mode.is_local()
    }
    /// transition score of kind `t` stored at node `k`
    pub fn tsc(&self, k: usize, t: PTrans) -> f32 {
        self.tsc[k][t as usize]
    }
    /// match emission score of code `x` at node `k`
    pub fn msc(&self, k: usize, x: u8) -> f32 {
        self.msc[k][x as usize]
    }
    /// special state transition score
    pub fn xsc(&self, s: XState, t: XTrans) -> f32 {
        self.xsc[(s, t)]
    }
    pub fn specials(&self) -> &Specials<f32> {
        &self.xsc
    }
}

fn ln(value: f64) -> f32 {
    value.ln() as f32
}

///
/// Background-weighted expectation of the canonical scores over the members
/// of a degenerate code
///
fn expected_score(abc: &Alphabet, bg: &Background, sc: &[f32], code: u8) -> f32 {
    let (num, denom) = abc
        .degeneracy(code)
        .fold((0.0, 0.0), |(num, denom), x| {
            let f = bg.freq(x) as f32;
            (num + sc[x as usize] * f, denom + f)
        });
    num / denom
}

//
// tests
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hmm::mocks::*;
    use crate::hmm::HmmParams;

    #[test]
    fn profile_local_entry() {
        let hmm = mock_linear_random_hmm(30, 0, HmmParams::high_error());
        let bg = Background::new(hmm.alphabet());
        let gm = Profile::configure(&hmm, &bg, 100, AlignMode::Local).unwrap();
        // entry distribution is normalized over all fragments
        let total: f64 = (1..=gm.m())
            .map(|k| (gm.tsc(k - 1, PTrans::BM) as f64).exp() * (gm.m() - k + 1) as f64)
            .sum();
        assert_abs_diff_eq!(total, 1.0, epsilon = 1e-4);
        assert_eq!(gm.tsc(0, PTrans::MM), f32::NEG_INFINITY);
        assert_eq!(gm.tsc(gm.m(), PTrans::BM), f32::NEG_INFINITY);
        assert_abs_diff_eq!(gm.tsc(1, PTrans::MM), (0.8f32).ln(), epsilon = 1e-6);
    }
    #[test]
    fn profile_glocal_entry() {
        let hmm = mock_linear_hmm(HmmParams::default());
        let bg = Background::new(hmm.alphabet());
        let gm = Profile::configure(&hmm, &bg, 100, AlignMode::UniGlocal).unwrap();
        assert!(!gm.is_local());
        assert_abs_diff_eq!(gm.tsc(0, PTrans::BM), (0.99f32).ln(), epsilon = 1e-6);
        // B->D1->M2
        assert_abs_diff_eq!(
            gm.tsc(1, PTrans::BM),
            (0.01f32).ln() + (0.99f32).ln(),
            epsilon = 1e-5
        );
        assert_eq!(gm.xsc(XState::E, XTrans::Loop), f32::NEG_INFINITY);
        assert_eq!(gm.nj(), 0.0);
    }
    #[test]
    fn profile_emissions() {
        let hmm = mock_linear_hmm(HmmParams::uniform(0.1));
        let abc = hmm.alphabet().clone();
        let bg = Background::new(&abc);
        let gm = Profile::configure(&hmm, &bg, 100, AlignMode::Local).unwrap();
        // node 1 consensus is A
        let a = abc.code(b'A').unwrap();
        let c = abc.code(b'C').unwrap();
        assert_abs_diff_eq!(gm.msc(1, a), (0.9f32 / 0.25).ln(), epsilon = 1e-6);
        assert_abs_diff_eq!(gm.msc(1, c), (0.1f32 / 3.0 / 0.25).ln(), epsilon = 1e-6);
        // N is the mean of the four scores
        let n = abc.code(b'N').unwrap();
        let mean: f32 = (0..4u8).map(|x| gm.msc(1, x)).sum::<f32>() / 4.0;
        assert_abs_diff_eq!(gm.msc(1, n), mean, epsilon = 1e-6);
        assert_eq!(gm.msc(1, abc.gap()), f32::NEG_INFINITY);
        assert_eq!(gm.msc(1, abc.missing()), f32::NEG_INFINITY);
        assert_eq!(gm.msc(0, a), f32::NEG_INFINITY);
    }
    #[test]
    fn profile_length_model() {
        let hmm = mock_linear_hmm(HmmParams::default());
        let bg = Background::new(hmm.alphabet());
        let mut gm = Profile::configure(&hmm, &bg, 100, AlignMode::Local).unwrap();
        assert_abs_diff_eq!(
            gm.xsc(XState::N, XTrans::Move),
            (3.0f32 / 103.0).ln(),
            epsilon = 1e-6
        );
        assert_abs_diff_eq!(
            gm.xsc(XState::J, XTrans::Loop),
            (100.0f32 / 103.0).ln(),
            epsilon = 1e-6
        );
        gm.reconfig_length(400);
        assert_eq!(gm.l(), 400);
        assert_abs_diff_eq!(
            gm.xsc(XState::C, XTrans::Move),
            (3.0f32 / 403.0).ln(),
            epsilon = 1e-6
        );
        assert_abs_diff_eq!(gm.xsc(XState::E, XTrans::Move), -(2.0f32).ln(), epsilon = 1e-6);
    }
    #[test]
    fn profile_alphabet_mismatch() {
        let hmm = mock_linear_hmm(HmmParams::default());
        let bg = Background::new(&Alphabet::amino());
        assert!(Profile::configure(&hmm, &bg, 100, AlignMode::Local).is_err());
    }
}

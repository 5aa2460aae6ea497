//!
//! Reconfiguration of the length model and the hit mode
//!
//! Only the per-clone parameters are touched; the shared tables are never
//! written, so a clone can be reconfigured while others are scoring.
//!
use super::convert::{unbiased_byteify, wordify, SCALE_B, SCALE_W};
use super::OptimizedProfile;
use crate::common::{XState, XTrans};
use crate::profile::AlignMode;

impl OptimizedProfile {
    ///
    /// Set the target length of the whole model: MSV part for `whole_len`,
    /// the rest for `l` (with `whole_len` as the length of the N/C/J model).
    ///
    pub fn reconfig_length(&mut self, l: usize, whole_len: usize) {
        self.reconfig_msv_length(whole_len);
        self.reconfig_rest_length(l, whole_len);
    }
    ///
    /// Set the target length of the MSV filter part only
    ///
    pub fn reconfig_msv_length(&mut self, l: usize) {
        self.tjb_b = unbiased_byteify(SCALE_B, (3.0 / (l as f32 + 3.0)).ln());
    }
    ///
    /// Set the target length of the Viterbi and Forward/Backward parts.
    ///
    /// ```text
    /// pmove = (2 + nj) / (whole_len + 2 + nj)
    /// ploop = 1 - pmove
    /// ```
    ///
    /// N, C, J loops of the word track stay 0 (3 nat approximation).
    ///
    pub fn reconfig_rest_length(&mut self, l: usize, whole_len: usize) {
        let pmove = (2.0 + self.nj) / (whole_len as f32 + 2.0 + self.nj);
        let ploop = 1.0 - pmove;
        self.xf.set_ncj(XTrans::Loop, ploop);
        self.xf.set_ncj(XTrans::Move, pmove);
        self.xw.set_ncj(XTrans::Move, wordify(SCALE_W, pmove.ln()));
        self.l = l;
    }
    ///
    /// Switch into multihit mode and reset the length model
    ///
    pub fn reconfig_multihit(&mut self, l: usize, whole_len: usize) {
        self.xf[(XState::E, XTrans::Move)] = 0.5;
        self.xf[(XState::E, XTrans::Loop)] = 0.5;
        self.nj = 1.0;
        let w = wordify(SCALE_W, -std::f32::consts::LN_2);
        self.xw[(XState::E, XTrans::Move)] = w;
        self.xw[(XState::E, XTrans::Loop)] = w;
        self.mode = self.mode.map(|mode| match mode {
            AlignMode::UniLocal => AlignMode::Local,
            AlignMode::UniGlocal => AlignMode::Glocal,
            mode => mode,
        });
        self.reconfig_length(l, whole_len);
    }
    ///
    /// Switch into unihit mode and reset the length model
    ///
    pub fn reconfig_unihit(&mut self, l: usize, whole_len: usize) {
        self.xf[(XState::E, XTrans::Move)] = 1.0;
        self.xf[(XState::E, XTrans::Loop)] = 0.0;
        self.nj = 0.0;
        self.xw[(XState::E, XTrans::Move)] = 0;
        self.xw[(XState::E, XTrans::Loop)] = -32768;
        self.mode = self.mode.map(|mode| match mode {
            AlignMode::Local => AlignMode::UniLocal,
            AlignMode::Glocal => AlignMode::UniGlocal,
            mode => mode,
        });
        self.reconfig_length(l, whole_len);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alphabet::Alphabet;
    use crate::hmm::mocks::*;
    use crate::hmm::Background;
    use crate::profile::Profile;

    fn profile(l: usize, mode: AlignMode) -> Profile {
        let hmm = mock_sampled_hmm(&Alphabet::amino(), 40, 5);
        let bg = Background::new(hmm.alphabet());
        Profile::configure(&hmm, &bg, l, mode).unwrap()
    }

    #[test]
    fn reconfig_matches_fresh_conversion() {
        // quantizing a profile of length 250 is the same as reconfiguring
        // a profile of length 100 into 250
        let fresh = OptimizedProfile::quantize(&profile(250, AlignMode::Local)).unwrap();
        let mut om = OptimizedProfile::quantize(&profile(100, AlignMode::Local)).unwrap();
        assert_ne!(om, fresh);
        om.reconfig_length(250, 250);
        assert_eq!(om.l(), 250);
        assert_eq!(om.tjb_b(), fresh.tjb_b());
        assert_eq!(om.xw(), fresh.xw());
        let (a, b) = (om.xf(), fresh.xf());
        for s in crate::common::XSTATES {
            for t in crate::common::XTRANS {
                assert_relative_eq!(a[(s, t)], b[(s, t)], max_relative = 1e-5);
            }
        }
        assert!(om.compare(&fresh, 1e-5).is_ok());
    }

    #[test]
    fn reconfig_split() {
        let mut om = OptimizedProfile::quantize(&profile(100, AlignMode::Local)).unwrap();
        let xf = *om.xf();
        om.reconfig_msv_length(1000);
        // only the MSV part changed
        assert_eq!(om.xf(), &xf);
        assert_eq!(om.l(), 100);
        assert_eq!(om.tjb_b(), unbiased_byteify(SCALE_B, (3.0f32 / 1003.0).ln()));
        om.reconfig_rest_length(30, 1000);
        assert_eq!(om.l(), 30);
        assert_abs_diff_eq!(
            om.xf()[(XState::N, XTrans::Move)],
            3.0 / 1003.0,
            epsilon = 1e-7
        );
    }

    #[test]
    fn reconfig_hit_modes() {
        let mut om = OptimizedProfile::quantize(&profile(100, AlignMode::Local)).unwrap();
        let multi = om.clone();
        om.reconfig_unihit(100, 100);
        assert_eq!(om.mode(), Some(AlignMode::UniLocal));
        assert!(om.is_local());
        assert_eq!(om.nj(), 0.0);
        assert_eq!(om.xw()[(XState::E, XTrans::Loop)], -32768);
        assert_eq!(om.xf()[(XState::E, XTrans::Move)], 1.0);
        assert_abs_diff_eq!(
            om.xf()[(XState::C, XTrans::Move)],
            2.0 / 102.0,
            epsilon = 1e-7
        );
        // the clone still shares the tables and keeps its own specials
        assert!(om.shares_tables(&multi));
        assert_eq!(multi.nj(), 1.0);

        om.reconfig_multihit(100, 100);
        assert_eq!(om.mode(), Some(AlignMode::Local));
        assert!(om.compare(&multi, 1e-5).is_ok());
    }
}

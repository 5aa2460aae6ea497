//!
//! Quantization of a generic profile into the three striped tracks
//!
use super::lanes::{F32x4, I16x8, Lanes, U8x16};
use super::striped::{node_of, nq_for, Striped};
use super::{
    ByteTrack, FloatTrack, OTrans, OptimizedProfile, Tables, WordTrack, N_OTRANS, OTRANS, W_B,
    W_F, W_W,
};
use crate::alphabet::Alphabet;
use crate::common::{Specials, XState, XTrans, XSTATES, XTRANS};
use crate::error::{Error, Result};
use crate::profile::{PTrans, Profile};
use log::info;
use std::sync::Arc;

/// scale of the byte track: third bits
pub const SCALE_B: f32 = 3.0 / std::f32::consts::LN_2;
/// offset of the byte track costs
pub const BASE_B: u8 = 190;
/// scale of the word track: 1/500 bits
pub const SCALE_W: f32 = 500.0 / std::f32::consts::LN_2;
/// offset of the word track scores
pub const BASE_W: i16 = 12000;

///
/// Cost of a log-odds score in the byte track, without bias.
/// Costs above 255 saturate to 255.
///
pub fn unbiased_byteify(scale: f32, sc: f32) -> u8 {
    let c = -(scale * sc).round();
    if c > 255.0 {
        255
    } else {
        c as u8
    }
}

///
/// Cost of a match score in the byte track: `-round(scale * sc) + bias`,
/// saturated to 255 (impossible event).
///
pub fn biased_byteify(scale: f32, bias: u8, sc: f32) -> u8 {
    // a positive score is a cost below the bias
    let c = -(scale * sc).round() + bias as f32;
    if c > 255.0 {
        255
    } else {
        c.max(0.0) as u8
    }
}

///
/// Score in the word track: `round(scale * sc)` clamped to the i16 range
///
pub fn wordify(scale: f32, sc: f32) -> i16 {
    let w = (scale * sc).round();
    if w >= 32767.0 {
        32767
    } else if w <= -32768.0 {
        -32768
    } else {
        w as i16
    }
}

impl OTrans {
    /// the corresponding transition of the generic profile
    fn generic(self) -> PTrans {
        match self {
            OTrans::BM => PTrans::BM,
            OTrans::MM => PTrans::MM,
            OTrans::IM => PTrans::IM,
            OTrans::DM => PTrans::DM,
            OTrans::MD => PTrans::MD,
            OTrans::MI => PTrans::MI,
            OTrans::II => PTrans::II,
        }
    }
    ///
    /// BM, MM, IM, DM are stored at k-1 in the generic profile
    ///
    fn is_rotated(self) -> bool {
        matches!(self, OTrans::BM | OTrans::MM | OTrans::IM | OTrans::DM)
    }
}

///
/// Fill `s` with the match emissions of code `x`. Lanes past M get `pad`.
///
fn stripe_emissions<V: Lanes, F: Fn(f32) -> V::Elem>(
    gm: &Profile,
    x: u8,
    s: &mut Striped<V>,
    nq: usize,
    pad: V::Elem,
    f: F,
) {
    s.reset(nq, pad);
    for q in 0..nq {
        let v = s.block_mut(q);
        for z in 0..V::W {
            let k = node_of(q, z, nq);
            if k <= gm.m() {
                v.set_lane(z, f(gm.msc(k, x)));
            }
        }
    }
}

///
/// Transition blocks: `7 * nq` blocks in `OTrans` order followed by `nq` DD
/// blocks. Lanes without a transition get `pad`. `f` receives `None` for DD.
///
fn stripe_transitions<V: Lanes, F: Fn(Option<OTrans>, f32) -> V::Elem>(
    gm: &Profile,
    tv: &mut Vec<V>,
    nq: usize,
    pad: V::Elem,
    f: F,
) {
    let m = gm.m();
    tv.clear();
    for q in 0..nq {
        let k = q + 1;
        for t in OTRANS {
            let kb = if t.is_rotated() { k - 1 } else { k };
            let mut v = V::splat(pad);
            for z in 0..V::W {
                if kb + z * nq < m {
                    v.set_lane(z, f(Some(t), gm.tsc(kb + z * nq, t.generic())));
                }
            }
            tv.push(v);
        }
    }
    for q in 0..nq {
        let k = q + 1;
        let mut v = V::splat(pad);
        for z in 0..V::W {
            if k + z * nq < m {
                v.set_lane(z, f(None, gm.tsc(k + z * nq, PTrans::DD)));
            }
        }
        tv.push(v);
    }
}

impl OptimizedProfile {
    ///
    /// Allocate an optimized profile for up to `alloc_m` nodes.
    /// The profile is empty (M = 0, no mode) until `convert`.
    ///
    pub fn new(alloc_m: usize, abc: &Alphabet) -> OptimizedProfile {
        let kp = abc.kp();
        let (qb, qw, qf) = (
            nq_for(alloc_m, W_B),
            nq_for(alloc_m, W_W),
            nq_for(alloc_m, W_F),
        );
        let tables = Tables {
            byte: ByteTrack {
                rbv: (0..kp).map(|_| Striped::with_capacity(qb)).collect(),
                tbm: 0,
                tec: 0,
                scale: 0.0,
                base: 0,
                bias: 0,
                nq: 0,
            },
            word: WordTrack {
                rwv: (0..kp).map(|_| Striped::with_capacity(qw)).collect(),
                twv: Vec::with_capacity((N_OTRANS + 1) * qw),
                scale: 0.0,
                base: 0,
                ddbound: 0,
                ncj_roundoff: 0.0,
                nq: 0,
            },
            float: FloatTrack {
                rfv: (0..kp).map(|_| Striped::with_capacity(qf)).collect(),
                tfv: Vec::with_capacity((N_OTRANS + 1) * qf),
                nq: 0,
            },
        };
        OptimizedProfile {
            abc: abc.clone(),
            alloc_m,
            tables: Arc::new(tables),
            tjb_b: 0,
            xw: Specials::new(0),
            xf: Specials::new(0.0),
            mode: None,
            m: 0,
            l: 0,
            nj: 0.0,
            name: String::new(),
        }
    }
    ///
    /// Allocate exactly for the generic profile and convert it.
    ///
    pub fn quantize(gm: &Profile) -> Result<OptimizedProfile> {
        let mut om = OptimizedProfile::new(gm.m(), gm.alphabet());
        om.convert(gm)?;
        Ok(om)
    }
    ///
    /// Convert the generic profile into the three tracks of this profile.
    ///
    /// Fails with `InvalidArgument` if the alphabets differ or the profile
    /// is larger than the allocation; `self` is untouched in that case.
    /// If the tables are shared with a clone, they are copied before writing.
    ///
    pub fn convert(&mut self, gm: &Profile) -> Result<()> {
        if gm.alphabet() != &self.abc {
            return Err(Error::invalid("alphabets of the two profiles don't match"));
        }
        if gm.m() > self.alloc_m {
            return Err(Error::invalid(format!(
                "optimized profile is too small (M={} allocM={})",
                gm.m(),
                self.alloc_m
            )));
        }
        for (w, name) in [(W_B, "byte"), (W_W, "word"), (W_F, "float")] {
            if nq_for(gm.m(), w) > nq_for(self.alloc_m, w) {
                return Err(Error::invalid(format!(
                    "{} track is too small to hold the conversion",
                    name
                )));
            }
        }

        let tables = Arc::make_mut(&mut self.tables);
        self.tjb_b = byte_conversion(gm, &mut tables.byte);
        word_conversion(gm, &mut tables.word, &mut self.xw);
        float_conversion(gm, &mut tables.float, &mut self.xf);

        self.mode = Some(gm.mode());
        self.l = gm.l();
        self.m = gm.m();
        self.nj = gm.nj();
        self.name = gm.name().to_string();
        info!(
            "quantized {} M={} nq=({},{},{}) bias_b={} ddbound_w={}",
            self.name,
            self.m,
            tables.byte.nq,
            tables.word.nq,
            tables.float.nq,
            tables.byte.bias,
            tables.word.ddbound
        );
        Ok(())
    }
}

///
/// MSV filter part. Returns `tjb_b`, the length-dependent B->J cost.
///
fn byte_conversion(gm: &Profile, track: &mut ByteTrack) -> u8 {
    let m = gm.m();
    let nq = nq_for(m, W_B);
    let abc = gm.alphabet();

    // best match score determines the bias
    let mut max = 0.0f32;
    for x in 0..abc.k() as u8 {
        for k in 0..=m {
            max = max.max(gm.msc(k, x));
        }
    }
    track.scale = SCALE_B;
    track.base = BASE_B;
    track.bias = unbiased_byteify(SCALE_B, -max);
    track.nq = nq;

    let bias = track.bias;
    for x in 0..abc.kp() {
        stripe_emissions::<U8x16, _>(gm, x as u8, &mut track.rbv[x], nq, 255, |sc| {
            biased_byteify(SCALE_B, bias, sc)
        });
    }

    let mf = m as f32;
    track.tbm = unbiased_byteify(SCALE_B, (2.0 / (mf * (mf + 1.0))).ln());
    track.tec = unbiased_byteify(SCALE_B, 0.5f32.ln());
    unbiased_byteify(SCALE_B, (3.0 / (gm.l() as f32 + 3.0)).ln())
}

///
/// Viterbi filter part
///
fn word_conversion(gm: &Profile, track: &mut WordTrack, xw: &mut Specials<i16>) {
    let m = gm.m();
    let nq = nq_for(m, W_W);
    track.scale = SCALE_W;
    track.base = BASE_W;
    track.nq = nq;

    for x in 0..gm.alphabet().kp() {
        stripe_emissions::<I16x8, _>(gm, x as u8, &mut track.rwv[x], nq, -32768, |sc| {
            wordify(SCALE_W, sc)
        });
    }
    // an II cost of 0 would make an infinite insert loop free
    stripe_transitions::<I16x8, _>(gm, &mut track.twv, nq, -32768, |t, sc| {
        let maxval = if t == Some(OTrans::II) { -1 } else { 0 };
        wordify(SCALE_W, sc).min(maxval)
    });

    // 3 nat approximation: N, C, J loops are free
    xw[(XState::E, XTrans::Loop)] = wordify(SCALE_W, gm.xsc(XState::E, XTrans::Loop));
    xw[(XState::E, XTrans::Move)] = wordify(SCALE_W, gm.xsc(XState::E, XTrans::Move));
    for s in [XState::N, XState::C, XState::J] {
        xw[(s, XTrans::Move)] = wordify(SCALE_W, gm.xsc(s, XTrans::Move));
        xw[(s, XTrans::Loop)] = 0;
    }
    track.ncj_roundoff = 0.0;

    // bound of a D->D path for the lazy F evaluation
    let w = |k: usize, t: PTrans| wordify(SCALE_W, gm.tsc(k, t)) as i32;
    let mut ddbound = -32768i32;
    for k in 2..m.saturating_sub(1) {
        ddbound = ddbound.max(w(k, PTrans::DD) + w(k + 1, PTrans::DM) - w(k + 1, PTrans::BM));
    }
    track.ddbound = ddbound.clamp(-32768, 32767) as i16;
}

///
/// Forward/Backward part: odds ratios
///
fn float_conversion(gm: &Profile, track: &mut FloatTrack, xf: &mut Specials<f32>) {
    let nq = nq_for(gm.m(), W_F);
    track.nq = nq;
    for x in 0..gm.alphabet().kp() {
        stripe_emissions::<F32x4, _>(gm, x as u8, &mut track.rfv[x], nq, 0.0, f32::exp);
    }
    stripe_transitions::<F32x4, _>(gm, &mut track.tfv, nq, 0.0, |_, sc| sc.exp());
    for s in XSTATES {
        for t in XTRANS {
            xf[(s, t)] = gm.xsc(s, t).exp();
        }
    }
}

//
// tests
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hmm::mocks::*;
    use crate::hmm::{Background, HmmParams};
    use crate::profile::AlignMode;
    use test_case::test_case;

    fn profile(m: usize, seed: u64, mode: AlignMode) -> Profile {
        let hmm = mock_sampled_hmm(&Alphabet::amino(), m, seed);
        let bg = Background::new(hmm.alphabet());
        Profile::configure(&hmm, &bg, 400, mode).unwrap()
    }

    #[test]
    fn score_rounding() {
        assert_eq!(unbiased_byteify(SCALE_B, f32::NEG_INFINITY), 255);
        assert_eq!(unbiased_byteify(SCALE_B, 0.0), 0);
        // ln(0.5) is exactly -3 third-bits
        assert_eq!(unbiased_byteify(SCALE_B, 0.5f32.ln()), 3);
        assert_eq!(biased_byteify(SCALE_B, 10, 0.5f32.ln()), 13);
        assert_eq!(biased_byteify(SCALE_B, 10, -1000.0), 255);
        assert_eq!(biased_byteify(SCALE_B, 10, f32::NEG_INFINITY), 255);
        // favourable scores cost less than the bias
        assert_eq!(biased_byteify(SCALE_B, 10, 1.0), 6);
        assert_eq!(biased_byteify(SCALE_B, 10, 2.0f32.ln()), 7);
        assert_eq!(biased_byteify(SCALE_B, 10, 0.0), 10);
        assert_eq!(biased_byteify(SCALE_B, 3, 10.0), 0);
        assert_eq!(wordify(SCALE_W, 0.5f32.ln()), -500);
        assert_eq!(wordify(SCALE_W, f32::NEG_INFINITY), -32768);
        assert_eq!(wordify(SCALE_W, 1000.0), 32767);
    }

    #[test_case(1 ; "single node")]
    #[test_case(10 ; "small")]
    #[test_case(37 ; "not multiple of lanes")]
    #[test_case(130 ; "large")]
    fn striped_tracks_match_generic(m: usize) {
        let gm = profile(m, 7, AlignMode::Local);
        let om = OptimizedProfile::quantize(&gm).unwrap();
        assert_eq!(om.m(), m);
        assert!(om.is_local());
        let abc = gm.alphabet();
        let (fl, wo, by) = (om.float(), om.word(), om.byte());
        assert_eq!(fl.nq, nq_for(m, 4));
        assert_eq!(fl.tfv.len(), 8 * fl.nq);
        assert_eq!(wo.twv.len(), 8 * wo.nq);
        for x in 0..abc.kp() as u8 {
            for k in 1..=m {
                assert_relative_eq!(
                    fl.rfv[x as usize].get(k),
                    gm.msc(k, x).exp(),
                    max_relative = 1e-6
                );
                assert_eq!(wo.rwv[x as usize].get(k), wordify(SCALE_W, gm.msc(k, x)));
                assert_eq!(
                    by.rbv[x as usize].get(k),
                    biased_byteify(SCALE_B, by.bias, gm.msc(k, x))
                );
            }
            // padding
            for k in m + 1..=fl.nq * 4 {
                assert_eq!(fl.rfv[x as usize].get(k), 0.0);
            }
            for k in m + 1..=wo.nq * 8 {
                assert_eq!(wo.rwv[x as usize].get(k), -32768);
            }
        }
        // transitions into node k are stored at node k
        for k in 1..=m {
            let (q, z) = crate::oprofile::position_of(k, fl.nq);
            let bm = fl.t(q, OTrans::BM).lane(z);
            assert_relative_eq!(bm, gm.tsc(k - 1, PTrans::BM).exp(), max_relative = 1e-6);
            if k < m {
                let md = fl.t(q, OTrans::MD).lane(z);
                assert_relative_eq!(md, gm.tsc(k, PTrans::MD).exp(), max_relative = 1e-6);
                assert_relative_eq!(fl.dd(q).lane(z), gm.tsc(k, PTrans::DD).exp(), max_relative = 1e-6);
                let (qw, zw) = crate::oprofile::position_of(k, wo.nq);
                assert!(wo.t(qw, OTrans::II).lane(zw) <= -1);
            } else {
                assert_eq!(fl.t(q, OTrans::MD).lane(z), 0.0);
                assert_eq!(fl.dd(q).lane(z), 0.0);
            }
        }
    }

    #[test]
    fn quantize_is_idempotent() {
        let gm = profile(50, 3, AlignMode::Local);
        let om1 = OptimizedProfile::quantize(&gm).unwrap();
        let om2 = OptimizedProfile::quantize(&gm).unwrap();
        assert_eq!(om1, om2);
        assert!(om1.compare(&om2, 0.0).is_ok());

        // converting into a larger allocation gives the same data
        let mut om3 = OptimizedProfile::new(200, gm.alphabet());
        om3.convert(&gm).unwrap();
        assert_eq!(om1, om3);
    }

    #[test]
    fn convert_errors() {
        let gm = profile(50, 3, AlignMode::Local);
        let mut small = OptimizedProfile::new(49, gm.alphabet());
        let e = small.convert(&gm).unwrap_err();
        assert!(matches!(e, Error::InvalidArgument(_)));
        assert_eq!(small.m(), 0);
        assert_eq!(small.mode(), None);

        let mut dna = OptimizedProfile::new(100, &Alphabet::dna());
        assert!(dna.convert(&gm).is_err());
    }

    #[test]
    fn convert_copies_shared_tables() {
        let gm = profile(20, 1, AlignMode::Local);
        let mut om = OptimizedProfile::new(40, gm.alphabet());
        om.convert(&gm).unwrap();
        let clone = om.clone();
        assert!(om.shares_tables(&clone));
        let gm2 = profile(30, 2, AlignMode::Local);
        om.convert(&gm2).unwrap();
        assert!(!om.shares_tables(&clone));
        assert_eq!(clone.m(), 20);
        assert_eq!(clone.float().nq, nq_for(20, 4));
        assert_eq!(om.m(), 30);
    }

    #[test]
    fn word_specials_and_ddbound() {
        let hmm = mock_linear_random_hmm(60, 0, HmmParams::default());
        let bg = Background::new(hmm.alphabet());
        let gm = Profile::configure(&hmm, &bg, 100, AlignMode::Local).unwrap();
        let om = OptimizedProfile::quantize(&gm).unwrap();
        let xw = om.xw();
        assert_eq!(xw[(XState::N, XTrans::Loop)], 0);
        assert_eq!(xw[(XState::C, XTrans::Loop)], 0);
        assert_eq!(xw[(XState::J, XTrans::Loop)], 0);
        assert_eq!(xw[(XState::E, XTrans::Move)], -500);
        assert_eq!(
            xw[(XState::N, XTrans::Move)],
            wordify(SCALE_W, (3.0f32 / 103.0).ln())
        );
        // identical internal nodes: every term of the bound is the same
        let w = |k: usize, t: PTrans| wordify(SCALE_W, gm.tsc(k, t)) as i32;
        let expected = (2..59)
            .map(|k| w(k, PTrans::DD) + w(k + 1, PTrans::DM) - w(k + 1, PTrans::BM))
            .max()
            .unwrap();
        assert_eq!(om.word().ddbound as i32, expected);
        assert_abs_diff_eq!(om.xf()[(XState::E, XTrans::Loop)], 0.5, epsilon = 1e-6);
    }
}

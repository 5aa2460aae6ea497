//!
//! Viterbi filter: best path score over the word track
//!
//! Scores are signed 16-bit with saturating arithmetic, -32768 is -infinity.
//! D->D chains are evaluated lazily: a row skips them when the model's
//! `ddbound` proves that B->M paths dominate every M->D->...->D->M path of
//! the next row.
//!
use super::check_inputs;
use super::status::TaskStatus;
use crate::alphabet::DigitalSequence;
use crate::common::{XState, XTrans};
use crate::error::{Engine, Error, RangeError, RangeKind, Result};
use crate::oprofile::{I16x8, Lanes, OTrans, OptimizedProfile, Striped};

const NEG_INF: i16 = -32768;

///
/// Score `dsq` with the Viterbi filter. Returns nats, or `-inf` if no path
/// reaches C.
///
/// `Range(Overflow)` if E saturates the word range.
///
pub fn viterbi(dsq: &DigitalSequence, om: &OptimizedProfile, status: &TaskStatus) -> Result<f32> {
    check_inputs(dsq, om)?;
    let wo = om.word();
    let xw = om.xw();
    let nq = wo.nq;

    let mut mmx: Striped<I16x8> = Striped::new(nq, NEG_INF);
    let mut imx: Striped<I16x8> = Striped::new(nq, NEG_INF);
    let mut dmx: Striped<I16x8> = Striped::new(nq, NEG_INF);
    let mut xn = wo.base;
    let mut xb = xn.saturating_add(xw[(XState::N, XTrans::Move)]);
    let mut xj = NEG_INF;
    let mut xc = NEG_INF;

    for i in 1..=dsq.len() {
        if status.is_canceled() {
            return Err(Error::Canceled);
        }
        let rwv = &wo.rwv[dsq[i] as usize];
        let xbv = I16x8::splat(xb);
        let mut xev = I16x8::splat(NEG_INF);
        let mut dmaxv = I16x8::splat(NEG_INF);
        let mut dcv = I16x8::splat(NEG_INF);
        let mut mpv = mmx.block(nq - 1).rightshift(NEG_INF);
        let mut dpv = dmx.block(nq - 1).rightshift(NEG_INF);
        let mut ipv = imx.block(nq - 1).rightshift(NEG_INF);

        for q in 0..nq {
            let mut sv = xbv.adds(wo.t(q, OTrans::BM));
            sv = sv.max(mpv.adds(wo.t(q, OTrans::MM)));
            sv = sv.max(ipv.adds(wo.t(q, OTrans::IM)));
            sv = sv.max(dpv.adds(wo.t(q, OTrans::DM)));
            sv = sv.adds(rwv.block(q));
            xev = xev.max(sv);

            mpv = mmx.block(q);
            dpv = dmx.block(q);
            ipv = imx.block(q);

            mmx.set_block(q, sv);
            dmx.set_block(q, dcv);

            dcv = sv.adds(wo.t(q, OTrans::MD));
            dmaxv = dmaxv.max(dcv);

            let iv = mpv
                .adds(wo.t(q, OTrans::MI))
                .max(ipv.adds(wo.t(q, OTrans::II)));
            imx.set_block(q, iv);
        }

        let xe = xev.hmax();
        if xe >= i16::MAX {
            return Err(RangeError {
                engine: Engine::Viterbi,
                kind: RangeKind::Overflow,
            }
            .into());
        }
        xn = xn.saturating_add(xw[(XState::N, XTrans::Loop)]);
        xc = std::cmp::max(
            xc.saturating_add(xw[(XState::C, XTrans::Loop)]),
            xe.saturating_add(xw[(XState::E, XTrans::Move)]),
        );
        xj = std::cmp::max(
            xj.saturating_add(xw[(XState::J, XTrans::Loop)]),
            xe.saturating_add(xw[(XState::E, XTrans::Loop)]),
        );
        xb = std::cmp::max(
            xj.saturating_add(xw[(XState::J, XTrans::Move)]),
            xn.saturating_add(xw[(XState::N, XTrans::Move)]),
        );

        // lazy F: max_k D(i,k) + max_k (DD(k-2) + DM(k-1) - BM(k)) < B(i)
        let dmax = dmaxv.hmax() as i32;
        if dmax + wo.ddbound as i32 > xb as i32 {
            dcv = dcv.rightshift(NEG_INF);
            for q in 0..nq {
                let dv = dcv.max(dmx.block(q));
                dmx.set_block(q, dv);
                dcv = dv.adds(wo.dd(q));
            }
            // crossing a block boundary may still improve D
            loop {
                dcv = dcv.rightshift(NEG_INF);
                let mut completed = true;
                for q in 0..nq {
                    let dv = dmx.block(q);
                    if !dcv.any_gt(dv) {
                        completed = false;
                        break;
                    }
                    dmx.set_block(q, dcv.max(dv));
                    dcv = dcv.adds(wo.dd(q));
                }
                if !completed {
                    break;
                }
            }
        } else {
            dmx.set_block(0, dcv.rightshift(NEG_INF));
        }
    }

    if xc > NEG_INF {
        let sc = (xc as f32 + xw[(XState::C, XTrans::Move)] as f32 - wo.base as f32) / wo.scale;
        Ok(sc - 3.0)
    } else {
        Ok(f32::NEG_INFINITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alphabet::Alphabet;
    use crate::hmm::mocks::*;
    use crate::hmm::{Background, HmmParams};
    use crate::profile::{AlignMode, Profile};

    fn om_of(hmm: &crate::hmm::CoreHmm, l: usize, mode: AlignMode) -> OptimizedProfile {
        let bg = Background::new(hmm.alphabet());
        let gm = Profile::configure(hmm, &bg, l, mode).unwrap();
        OptimizedProfile::quantize(&gm).unwrap()
    }

    #[test]
    fn viterbi_consensus_hit() {
        let hmm = mock_linear_random_hmm(15, 5, HmmParams::default());
        let om = om_of(&hmm, 100, AlignMode::Local);
        let abc = hmm.alphabet();
        let status = TaskStatus::new();
        let hit = viterbi(&abc.digitize(hmm.consensus().as_bytes()).unwrap(), &om, &status).unwrap();
        let random = viterbi(&abc.digitize(&generate(abc, 15, 1)).unwrap(), &om, &status).unwrap();
        assert!(hit.is_finite());
        assert!(random.is_finite());
        // 15 matches of ln(0.99/0.25) minus the entry and the N, E, C costs
        assert!(hit > 2.0);
        assert!(hit > random);
    }

    #[test]
    fn viterbi_overflow() {
        // 60 consensus matches exceed the word range
        let hmm = mock_linear_random_hmm(60, 5, HmmParams::default());
        let om = om_of(&hmm, 100, AlignMode::Local);
        let abc = hmm.alphabet();
        let dsq = abc.digitize(hmm.consensus().as_bytes()).unwrap();
        let e = viterbi(&dsq, &om, &TaskStatus::new()).unwrap_err();
        assert!(e.is_retriable());
    }

    #[test]
    fn viterbi_handles_deletions() {
        // cheap gaps: a single hit over a deletion of 5 nodes beats either half
        let hmm = mock_linear_random_hmm(30, 8, HmmParams::new(0.01, 0.2, 0.5));
        let om = om_of(&hmm, 100, AlignMode::Local);
        let abc = hmm.alphabet();
        let consensus = hmm.consensus();
        let mut seq = consensus.as_bytes()[..12].to_vec();
        seq.extend_from_slice(&consensus.as_bytes()[17..]);
        let status = TaskStatus::new();
        let gapped = viterbi(&abc.digitize(&seq).unwrap(), &om, &status).unwrap();
        let half = viterbi(&abc.digitize(&consensus.as_bytes()[17..]).unwrap(), &om, &status).unwrap();
        assert!(gapped > half + 2.0);
    }

    #[test]
    fn viterbi_empty_and_cancel() {
        let hmm = mock_sampled_hmm(&Alphabet::amino(), 10, 0);
        let om = om_of(&hmm, 10, AlignMode::Local);
        let status = TaskStatus::new();
        let empty = DigitalSequence::from_codes(&[]);
        assert_eq!(viterbi(&empty, &om, &status).unwrap(), f32::NEG_INFINITY);
        status.cancel();
        let dsq = Alphabet::amino().digitize(b"ACDE").unwrap();
        assert!(viterbi(&dsq, &om, &status).unwrap_err().is_canceled());
    }
}

//!
//! MSV filter: ungapped multi-segment local score over the byte track
//!
//! Costs are unsigned with saturating arithmetic; 0 is -infinity and
//! `base_b` is a score of 0.
//!
use super::check_inputs;
use super::status::TaskStatus;
use crate::alphabet::DigitalSequence;
use crate::error::{Engine, Error, RangeError, RangeKind, Result};
use crate::oprofile::{Lanes, OptimizedProfile, Striped, U8x16};

///
/// Score `dsq` with the MSV filter. Returns nats.
///
/// `Range(Overflow)` if a match score saturates the byte range; the caller
/// is expected to fall back to a wider path.
///
pub fn msv(dsq: &DigitalSequence, om: &OptimizedProfile, status: &TaskStatus) -> Result<f32> {
    check_inputs(dsq, om)?;
    let by = om.byte();
    let nq = by.nq;

    let mut dp: Striped<U8x16> = Striped::new(nq, 0);
    let biasv = U8x16::splat(by.bias);
    let tjbm = om.tjb_b().saturating_add(by.tbm);
    let tjbmv = U8x16::splat(tjbm);
    let mut xj: u8 = 0;
    let mut xbv = U8x16::splat(by.base).subs(tjbmv);

    for i in 1..=dsq.len() {
        if status.is_canceled() {
            return Err(Error::Canceled);
        }
        let rbv = &by.rbv[dsq[i] as usize];
        let mut xev = U8x16::splat(0);
        let mut mpv = dp.block(nq - 1).rightshift(0);
        for q in 0..nq {
            let sv = mpv.max(xbv).adds(biasv).subs(rbv.block(q));
            xev = xev.max(sv);
            mpv = dp.block(q);
            dp.set_block(q, sv);
        }

        let xe = xev.hmax();
        if xe >= 255 - by.bias {
            return Err(RangeError {
                engine: Engine::Msv,
                kind: RangeKind::Overflow,
            }
            .into());
        }
        xj = xj.max(xe.saturating_sub(by.tec));
        xbv = U8x16::splat(by.base.max(xj)).subs(tjbmv);
    }

    // C->T, and the ~3 nats of the NN, CC, JJ loops
    let sc = (xj as f32 - om.tjb_b() as f32 - by.base as f32) / by.scale - 3.0;
    Ok(sc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alphabet::Alphabet;
    use crate::hmm::mocks::*;
    use crate::hmm::{Background, HmmParams};
    use crate::profile::{AlignMode, Profile};

    fn om_of(hmm: &crate::hmm::CoreHmm, l: usize) -> OptimizedProfile {
        let bg = Background::new(hmm.alphabet());
        let gm = Profile::configure(hmm, &bg, l, AlignMode::Local).unwrap();
        OptimizedProfile::quantize(&gm).unwrap()
    }

    #[test]
    fn msv_prefers_homologs() {
        let hmm = mock_linear_hmm(HmmParams::default());
        let om = om_of(&hmm, 100);
        let abc = hmm.alphabet();
        let status = TaskStatus::new();

        let hit = msv(&abc.digitize(b"ATTCGATCGT").unwrap(), &om, &status).unwrap();
        let random = msv(&abc.digitize(&generate(abc, 10, 99)).unwrap(), &om, &status).unwrap();
        assert!(hit.is_finite());
        assert!(random.is_finite());
        assert!(hit > random);
    }

    #[test]
    fn msv_overflows_on_long_hits() {
        // 50 consensus matches exceed the byte range
        let hmm = mock_linear_random_hmm(50, 3, HmmParams::default());
        let om = om_of(&hmm, 100);
        let abc = hmm.alphabet();
        let dsq = abc.digitize(hmm.consensus().as_bytes()).unwrap();
        let e = msv(&dsq, &om, &TaskStatus::new()).unwrap_err();
        assert!(e.is_retriable());
        assert_eq!(
            e,
            Error::Range(RangeError {
                engine: Engine::Msv,
                kind: RangeKind::Overflow
            })
        );
    }

    #[test]
    fn msv_empty_and_cancel() {
        let hmm = mock_sampled_hmm(&Alphabet::dna(), 10, 0);
        let om = om_of(&hmm, 10);
        let status = TaskStatus::new();
        let empty = DigitalSequence::from_codes(&[]);
        let sc = msv(&empty, &om, &status).unwrap();
        let by = om.byte();
        assert_abs_diff_eq!(
            sc,
            (0.0 - om.tjb_b() as f32 - by.base as f32) / by.scale - 3.0,
            epsilon = 1e-6
        );
        status.cancel();
        let dsq = Alphabet::dna().digitize(b"ACGT").unwrap();
        assert!(msv(&dsq, &om, &status).unwrap_err().is_canceled());
    }
}

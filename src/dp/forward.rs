//!
//! Forward algorithm over the float track
//!
//! ```text
//! M(i,k) = e(x_i, k) * ( B(i-1) t(B,k) + M(i-1,k-1) t(MM) + I(i-1,k-1) t(IM) + D(i-1,k-1) t(DM) )
//! I(i,k) = M(i-1,k) t(MI) + I(i-1,k) t(II)
//! D(i,k) = M(i,k-1) t(MD) + D(i,k-1) t(DD)
//! E(i)   = sum_k M(i,k) + D(i,k)
//! ```
//!
//! Values are odds ratios. A row whose E exceeds `RESCALE_THRESHOLD` is
//! divided by E and the factor is recorded in the SCALE cell.
//!
use super::matrix::{DpMatrix, DpRow, XCell, N_XCELLS};
use super::status::TaskStatus;
use super::{check_inputs, check_local};
use crate::alphabet::DigitalSequence;
use crate::common::{XState, XTrans};
use crate::error::{Engine, Error, RangeError, Result};
use crate::oprofile::{F32x4, FloatTrack, Lanes, OTrans, OptimizedProfile, Striped};
use log::debug;

/// E above this triggers a rescale of the row (a little less than e^10)
pub const RESCALE_THRESHOLD: f32 = 1.0e4;

/// models with fewer nodes always run the four DD passes
pub const DD_SERIAL_MAX_M: usize = 100;

///
/// Run Forward of `dsq` against `om`, filling `ox`.
///
/// Returns the log-odds score in nats. With `L = 0` the score is `-inf`.
///
/// * `InvalidArgument` if `om` is not local or `ox` is too small
/// * `Range` if the final C value is NaN, zero or infinite
/// * `Canceled` if `status` is canceled; `ox` is then discard-only
///
/// Progress is advanced from its current value by `border` in total.
///
pub fn forward(
    dsq: &DigitalSequence,
    om: &OptimizedProfile,
    ox: &mut DpMatrix,
    status: &TaskStatus,
    border: usize,
) -> Result<f32> {
    check_inputs(dsq, om)?;
    check_local(om)?;
    let (m, l) = (om.m(), dsq.len());
    if !ox.fits(m, l) {
        return Err(Error::invalid(format!(
            "DP matrix allocated too small (allocM={} allocL={}, M={} L={})",
            ox.alloc_m(),
            ox.alloc_l(),
            m,
            l
        )));
    }
    let fl = om.float();
    let xf = om.xf();
    let nq = fl.nq;

    ox.start(m, l, true);
    ox.row_mut(0).reset(nq);
    let mut xe = 0.0;
    let mut xn = 1.0;
    let mut xj = 0.0;
    let mut xb = xf[(XState::N, XTrans::Move)];
    let mut xc = 0.0;
    ox.set_xmx(0, [xe, xn, xj, xb, xc, 1.0]);

    let start = status.progress();
    for i in 1..=l {
        if status.checkpoint(start, border, i, l) {
            return Err(Error::Canceled);
        }
        {
            let rfv = &fl.rfv[dsq[i] as usize];
            let (prev, cur) = ox.row_pair(i - 1, i);
            xe = forward_row(fl, rfv, xb, m, prev, cur);
        }

        xn *= xf[(XState::N, XTrans::Loop)];
        xc = (xc * xf[(XState::C, XTrans::Loop)]) + (xe * xf[(XState::E, XTrans::Move)]);
        xj = (xj * xf[(XState::J, XTrans::Loop)]) + (xe * xf[(XState::E, XTrans::Loop)]);
        xb = (xj * xf[(XState::J, XTrans::Move)]) + (xn * xf[(XState::N, XTrans::Move)]);

        let mut scale = 1.0;
        if xe > RESCALE_THRESHOLD {
            debug!("forward: rescale row {} by {}", i, xe);
            xn /= xe;
            xc /= xe;
            xj /= xe;
            xb /= xe;
            ox.row_mut(i).scale(1.0 / xe);
            ox.add_scale(xe);
            scale = xe;
            xe = 1.0;
        }
        let mut cells = [0.0; N_XCELLS];
        cells[XCell::E as usize] = xe;
        cells[XCell::N as usize] = xn;
        cells[XCell::J as usize] = xj;
        cells[XCell::B as usize] = xb;
        cells[XCell::C as usize] = xc;
        cells[XCell::Scale as usize] = scale;
        ox.set_xmx(i, cells);
    }

    RangeError::check(Engine::Forward, xc, l)?;
    let last = xc * xf[(XState::C, XTrans::Move)];
    Ok((ox.totscale() + (last as f64).ln()) as f32)
}

///
/// Main cells of row i from row i-1. Returns E(i) before rescaling.
///
fn forward_row(
    fl: &FloatTrack,
    rfv: &Striped<F32x4>,
    xb: f32,
    m: usize,
    prev: &DpRow,
    cur: &mut DpRow,
) -> f32 {
    let nq = fl.nq;
    cur.reset(nq);
    let xbv = F32x4::splat(xb);
    let mut xev = F32x4::zero();
    // D(i,q) waits in dcv until M(i,q-1) is known
    let mut dcv = F32x4::zero();
    // predecessors of block 0 are the last block shifted by one lane
    let mut mpv = prev.m.block(nq - 1).rightshift(0.0);
    let mut dpv = prev.d.block(nq - 1).rightshift(0.0);
    let mut ipv = prev.i.block(nq - 1).rightshift(0.0);

    for q in 0..nq {
        let mut sv = xbv * fl.t(q, OTrans::BM);
        sv = sv + mpv * fl.t(q, OTrans::MM);
        sv = sv + ipv * fl.t(q, OTrans::IM);
        sv = sv + dpv * fl.t(q, OTrans::DM);
        sv = sv * rfv.block(q);
        xev = xev + sv;

        mpv = prev.m.block(q);
        dpv = prev.d.block(q);
        ipv = prev.i.block(q);

        cur.m.set_block(q, sv);
        cur.d.set_block(q, dcv);
        dcv = sv * fl.t(q, OTrans::MD);

        // insert emissions are odds ratio 1
        let iv = mpv * fl.t(q, OTrans::MI) + ipv * fl.t(q, OTrans::II);
        cur.i.set_block(q, iv);
    }

    // D->D chains; one full pass includes M->D of the last block
    dcv = dcv.rightshift(0.0);
    cur.d.set_block(0, F32x4::zero());
    for q in 0..nq {
        let dv = dcv + cur.d.block(q);
        cur.d.set_block(q, dv);
        dcv = dv * fl.dd(q);
    }
    if m < DD_SERIAL_MAX_M {
        for _ in 1..F32x4::W {
            dcv = dcv.rightshift(0.0);
            for q in 0..nq {
                cur.d.set_block(q, dcv + cur.d.block(q));
                dcv = dcv * fl.dd(q);
            }
        }
    } else {
        for _ in 1..F32x4::W {
            dcv = dcv.rightshift(0.0);
            let mut changed = false;
            for q in 0..nq {
                let old = cur.d.block(q);
                let sv = dcv + old;
                changed |= sv.any_gt(old);
                cur.d.set_block(q, sv);
                dcv = dcv * fl.dd(q);
            }
            if !changed {
                break;
            }
        }
    }

    for q in 0..nq {
        xev = cur.d.block(q) + xev;
    }
    xev.hsum()
}

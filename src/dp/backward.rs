//!
//! Backward algorithm over the float track
//!
//! ```text
//! M(i,k) = M(i+1,k+1) e(x_{i+1},k+1) t(MM) + I(i+1,k) t(MI) + D(i,k+1) t(MD) + E(i)
//! I(i,k) = M(i+1,k+1) e(x_{i+1},k+1) t(IM) + I(i+1,k) t(II)
//! D(i,k) = M(i+1,k+1) e(x_{i+1},k+1) t(DM) + D(i,k+1) t(DD) + E(i)
//! B(i)   = sum_k M(i+1,k) e(x_{i+1},k) t(B,k)
//! ```
//!
//! Rows are rescaled with the factors of the Forward run, so that Forward
//! and Backward cells of a row are on the same scale. If B exceeds
//! `OWN_SCALE_THRESHOLD` the Forward factors are not enough, and from that
//! row on the matrix derives its own factors from B (`has_own_scales`).
//!
use super::forward::RESCALE_THRESHOLD;
use super::matrix::{DpMatrix, DpRow, XCell, N_XCELLS};
use super::scale::ScaleTrace;
use super::status::TaskStatus;
use super::{check_inputs, check_local};
use crate::alphabet::DigitalSequence;
use crate::common::{XState, XTrans};
use crate::error::{Engine, Error, RangeError, Result};
use crate::oprofile::{F32x4, FloatTrack, Lanes, OTrans, OptimizedProfile, Striped};
use log::{debug, warn};

/// B above this switches Backward to its own scale factors
pub const OWN_SCALE_THRESHOLD: f32 = 1.0e16;

fn cells(xe: f32, xn: f32, xj: f32, xb: f32, xc: f32, scale: f32) -> [f32; N_XCELLS] {
    let mut c = [0.0; N_XCELLS];
    c[XCell::E as usize] = xe;
    c[XCell::N as usize] = xn;
    c[XCell::J as usize] = xj;
    c[XCell::B as usize] = xb;
    c[XCell::C as usize] = xc;
    c[XCell::Scale as usize] = scale;
    c
}

///
/// Run Backward of `dsq` against `om` into `bck`, rescaling with the
/// factors `fwd` of the Forward run of the same sequence.
///
/// Returns the log-odds score in nats, which agrees with the Forward score.
/// Errors as `forward`; additionally `InvalidArgument` if `fwd` has a
/// different length than `dsq`.
///
pub fn backward(
    dsq: &DigitalSequence,
    om: &OptimizedProfile,
    fwd: &ScaleTrace,
    bck: &mut DpMatrix,
    status: &TaskStatus,
    border: usize,
) -> Result<f32> {
    check_inputs(dsq, om)?;
    check_local(om)?;
    let (m, l) = (om.m(), dsq.len());
    if !bck.fits(m, l) {
        return Err(Error::invalid(format!(
            "DP matrix allocated too small (allocM={} allocL={}, M={} L={})",
            bck.alloc_m(),
            bck.alloc_l(),
            m,
            l
        )));
    }
    if fwd.l() != l {
        return Err(Error::invalid(format!(
            "fwd matrix size doesn't agree with length L ({} != {})",
            fwd.l(),
            l
        )));
    }
    let fl = om.float();
    let xf = om.xf();
    let nq = fl.nq;

    bck.start(m, l, false);
    if l == 0 {
        // no path emits nothing
        bck.row_mut(0).reset(nq);
        bck.set_xmx(0, cells(0.0, 0.0, 0.0, 0.0, 0.0, 1.0));
        return Ok(f32::NEG_INFINITY);
    }

    //
    // row L: everything ends through E
    //
    let mut xj = 0.0;
    let mut xb = 0.0;
    let mut xn = 0.0;
    let mut xc = xf[(XState::C, XTrans::Move)];
    let mut xe = xc * xf[(XState::E, XTrans::Move)];
    {
        let row = bck.row_mut(l);
        row.reset(nq);
        let xev = F32x4::splat(xe);
        for q in 0..nq {
            row.m.set_block(q, xev);
            row.d.set_block(q, xev);
        }
        let mut dcv = F32x4::zero();
        let mut dpv = row.d.block(0).leftshift(0.0);
        for q in (0..nq).rev() {
            dcv = dpv * fl.dd(q);
            let dv = row.d.block(q) + dcv;
            row.d.set_block(q, dv);
            dpv = dv;
        }
        extend_dd(fl, row, dcv);
        add_md(fl, row);
    }
    let scale = fwd.factor(l);
    if scale > 1.0 {
        xe /= scale;
        xn /= scale;
        xc /= scale;
        xj /= scale;
        xb /= scale;
        bck.row_mut(l).scale(1.0 / scale);
    }
    bck.set_totscale((scale as f64).ln());
    bck.set_xmx(l, cells(xe, xn, xj, xb, xc, scale));

    //
    // rows L-1..1
    //
    let start = status.progress();
    for i in (1..l).rev() {
        if status.checkpoint(start, border, l - i, l) {
            return Err(Error::Canceled);
        }
        {
            let rfv = &fl.rfv[dsq[i + 1] as usize];
            let (next, cur) = bck.row_pair(i + 1, i);
            xb = backward_row(fl, rfv, next, cur);
        }

        xc *= xf[(XState::C, XTrans::Loop)];
        xj = (xb * xf[(XState::J, XTrans::Move)]) + (xj * xf[(XState::J, XTrans::Loop)]);
        xn = (xb * xf[(XState::N, XTrans::Move)]) + (xn * xf[(XState::N, XTrans::Loop)]);
        xe = (xc * xf[(XState::E, XTrans::Move)]) + (xj * xf[(XState::E, XTrans::Loop)]);
        {
            let row = bck.row_mut(i);
            inject_end(fl, row, xe);
        }

        if xb > OWN_SCALE_THRESHOLD && !bck.has_own_scales() {
            warn!(
                "backward: forward scale factors are insufficient at row {}, switching to own scale factors",
                i
            );
            bck.set_own_scales();
        }
        let scale = if bck.has_own_scales() {
            if xb > RESCALE_THRESHOLD {
                xb
            } else {
                1.0
            }
        } else {
            fwd.factor(i)
        };
        if scale > 1.0 {
            debug!("backward: rescale row {} by {}", i, scale);
            xe /= scale;
            xn /= scale;
            xj /= scale;
            xb /= scale;
            xc /= scale;
            bck.row_mut(i).scale(1.0 / scale);
            bck.add_scale(scale);
        }
        bck.set_xmx(i, cells(xe, xn, xj, xb, xc, scale));
    }

    //
    // row 0: only N and B
    //
    let rfv = &fl.rfv[dsq[1] as usize];
    let row = bck.row(1);
    let mut xbv = F32x4::zero();
    for q in 0..nq {
        let mpv = row.m.block(q) * rfv.block(q);
        let mpv = mpv * fl.t(q, OTrans::BM);
        xbv = xbv + mpv;
    }
    xb = xbv.hsum();
    xn = (xb * xf[(XState::N, XTrans::Move)]) + (xn * xf[(XState::N, XTrans::Loop)]);
    bck.set_xmx(0, cells(0.0, xn, 0.0, xb, 0.0, 1.0));
    if status.checkpoint(start, border, l, l) {
        return Err(Error::Canceled);
    }

    RangeError::check(Engine::Backward, xn, l)?;
    Ok((bck.totscale() + (xn as f64).ln()) as f32)
}

///
/// Main cells of row i from row i+1, except the paths through E, D->D
/// and M->D. Returns B(i).
///
fn backward_row(fl: &FloatTrack, rfv: &Striped<F32x4>, next: &DpRow, cur: &mut DpRow) -> f32 {
    let nq = fl.nq;
    cur.reset(nq);
    // successors of the last block are block 0 shifted by one lane
    let mut tmmv = fl.t(0, OTrans::MM).leftshift(0.0);
    let mut timv = fl.t(0, OTrans::IM).leftshift(0.0);
    let mut tdmv = fl.t(0, OTrans::DM).leftshift(0.0);
    let mut mpv = (next.m.block(0) * rfv.block(0)).leftshift(0.0);
    let mut xbv = F32x4::zero();

    for q in (0..nq).rev() {
        let ipv = next.i.block(q);
        cur.i.set_block(q, ipv * fl.t(q, OTrans::II) + mpv * timv);
        cur.d.set_block(q, mpv * tdmv);
        let mcv = ipv * fl.t(q, OTrans::MI) + mpv * tmmv;

        mpv = next.m.block(q) * rfv.block(q);
        cur.m.set_block(q, mcv);

        tdmv = fl.t(q, OTrans::DM);
        timv = fl.t(q, OTrans::IM);
        tmmv = fl.t(q, OTrans::MM);

        xbv = xbv + mpv * fl.t(q, OTrans::BM);
    }
    xbv.hsum()
}

///
/// {M,D}->E paths, one D->D pass, the rest of the D->D passes and M->D
///
fn inject_end(fl: &FloatTrack, row: &mut DpRow, xe: f32) {
    let nq = fl.nq;
    let xev = F32x4::splat(xe);
    let mut dcv = F32x4::zero();
    let mut dpv = (row.d.block(0) + xev).leftshift(0.0);
    for q in (0..nq).rev() {
        dcv = dpv * fl.dd(q);
        let dv = row.d.block(q) + (dcv + xev);
        row.d.set_block(q, dv);
        dpv = dv;
        row.m.set_block(q, row.m.block(q) + xev);
    }
    extend_dd(fl, row, dcv);
    add_md(fl, row);
}

///
/// Three more D->D passes extending `dcv` only
///
fn extend_dd(fl: &FloatTrack, row: &mut DpRow, mut dcv: F32x4) {
    for _ in 1..F32x4::W {
        dcv = dcv.leftshift(0.0);
        for q in (0..fl.nq).rev() {
            dcv = dcv * fl.dd(q);
            row.d.set_block(q, row.d.block(q) + dcv);
        }
    }
}

///
/// M(i,k) += D(i,k+1) t(MD)
///
fn add_md(fl: &FloatTrack, row: &mut DpRow) {
    let mut dcv = row.d.block(0).leftshift(0.0);
    for q in (0..fl.nq).rev() {
        row.m.set_block(q, row.m.block(q) + dcv * fl.t(q, OTrans::MD));
        dcv = row.d.block(q);
    }
}

//!
//! Dynamic programming over the optimized profile
//!
//! * `forward` / `backward`: float track, odds ratios with sparse rescaling
//! * `msv`: byte track, ungapped local score
//! * `viterbi`: word track, best path score
//!
//! Every engine checks the `TaskStatus` once per sequence position.
//!
pub mod backward;
pub mod forward;
pub mod matrix;
pub mod msv;
pub mod scale;
pub mod status;
pub mod viterbi;

pub use backward::backward;
pub use forward::forward;
pub use matrix::{DpMatrix, DpMode, XCell};
pub use msv::msv;
pub use scale::ScaleTrace;
pub use status::TaskStatus;
pub use viterbi::viterbi;

use crate::alphabet::DigitalSequence;
use crate::error::{Error, Result};
use crate::oprofile::OptimizedProfile;

///
/// Preconditions shared by the engines: the model is converted and every
/// residue has an emission row.
///
pub(crate) fn check_inputs(dsq: &DigitalSequence, om: &OptimizedProfile) -> Result<()> {
    if om.mode().is_none() {
        return Err(Error::invalid("optimized profile is not converted yet"));
    }
    let kp = om.alphabet().kp();
    if let Some(x) = dsq.residues().iter().find(|&&x| x as usize >= kp) {
        return Err(Error::invalid(format!(
            "residue code {} is out of the alphabet (Kp={})",
            x, kp
        )));
    }
    Ok(())
}

///
/// Local mode is required by the sparse rescaling of Forward and Backward
///
pub(crate) fn check_local(om: &OptimizedProfile) -> Result<()> {
    if om.is_local() {
        Ok(())
    } else {
        Err(Error::invalid(
            "Forward/Backward implementation makes assumptions that only work for local alignment",
        ))
    }
}

//!
//! Scoring many sequences against one model in parallel
//!
//! Every task clones the optimized profile (the score tables are shared),
//! sets the length model of its own clone, and owns its DP matrices.
//!
use crate::common::{progress_common_style, NamedSequence};
use crate::config::SearchConfig;
use crate::dp::{backward, forward, msv, viterbi, DpMatrix, TaskStatus};
use crate::error::{Error, Result};
use crate::hmm::{Background, CoreHmm};
use crate::oprofile::OptimizedProfile;
use crate::profile::Profile;
use indicatif::ParallelProgressIterator;
use log::{debug, info};
use rayon::prelude::*;
use serde::Serialize;

/// Target length used to configure a model when no length is given
pub const DEFAULT_TARGET_LEN: usize = 400;

///
/// Scores of one sequence, in nats.
///
/// A filter score is `None` if the filter was not run or its integer range
/// overflowed (a strong hit).
///
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Hit {
    pub name: String,
    pub len: usize,
    pub msv: Option<f32>,
    pub viterbi: Option<f32>,
    pub forward: f32,
    pub backward: f32,
    /// rows rescaled by Forward
    pub n_rescaled: usize,
    /// Backward switched to its own scale factors
    pub own_scales: bool,
}

impl Hit {
    pub fn tsv_header() -> &'static str {
        "name\tlen\tmsv\tviterbi\tforward\tbackward\tn_rescaled\town_scales"
    }
}

fn show(sc: Option<f32>) -> String {
    match sc {
        Some(sc) => format!("{:.4}", sc),
        None => "NA".to_string(),
    }
}

impl std::fmt::Display for Hit {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}\t{:.4}\t{:.4}\t{}\t{}",
            self.name,
            self.len,
            show(self.msv),
            show(self.viterbi),
            self.forward,
            self.backward,
            self.n_rescaled,
            self.own_scales
        )
    }
}

///
/// Configure and quantize `hmm` for the mode and target length of `config`
///
pub fn build_model(hmm: &CoreHmm, config: &SearchConfig) -> Result<OptimizedProfile> {
    let bg = Background::new(hmm.alphabet());
    let l = config.target_len.unwrap_or(DEFAULT_TARGET_LEN);
    let gm = Profile::configure(hmm, &bg, l, config.mode)?;
    OptimizedProfile::quantize(&gm)
}

/// `Some(score)`, `None` on a range error, or the other errors
fn filter_score(name: &str, r: Result<f32>) -> Result<Option<f32>> {
    match r {
        Ok(sc) => Ok(Some(sc)),
        Err(e) if e.is_retriable() => {
            debug!("{}: {}", name, e);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

///
/// Filters, Forward and Backward of one sequence.
///
/// `om` is cloned and its length model is set to `config.target_len` or to
/// the length of `seq`.
///
pub fn score_one(
    om: &OptimizedProfile,
    seq: &NamedSequence,
    config: &SearchConfig,
    status: &TaskStatus,
) -> Result<Hit> {
    let dsq = om.alphabet().digitize(&seq.seq)?;
    let l = dsq.len();
    let mut om = om.clone();
    let target_len = config.target_len.unwrap_or(l);
    om.reconfig_length(target_len, target_len);

    let (msv_sc, viterbi_sc) = if config.run_filters {
        (
            filter_score(&seq.name, msv(&dsq, &om, status))?,
            filter_score(&seq.name, viterbi(&dsq, &om, status))?,
        )
    } else {
        (None, None)
    };

    let mut fwd = DpMatrix::new(om.m(), l, config.dp_mode);
    let mut bck = DpMatrix::new(om.m(), l, config.dp_mode);
    let border = config.progress_border;
    let fsc = forward(&dsq, &om, &mut fwd, status, border)?;
    let trace = fwd.scale_trace();
    let bsc = backward(&dsq, &om, &trace, &mut bck, status, border)?;

    Ok(Hit {
        name: seq.name.clone(),
        len: l,
        msv: msv_sc,
        viterbi: viterbi_sc,
        forward: fsc,
        backward: bsc,
        n_rescaled: trace.n_rescaled(),
        own_scales: bck.has_own_scales(),
    })
}

///
/// Score every sequence of `seqs` in parallel. The results are in the order
/// of `seqs`; a failure of one sequence does not stop the others.
///
/// Canceling `status` makes every remaining task return `Error::Canceled`.
///
pub fn score_all(
    om: &OptimizedProfile,
    seqs: &[NamedSequence],
    config: &SearchConfig,
    status: &TaskStatus,
) -> Result<Vec<Result<Hit>>> {
    info!(
        "scoring {} sequences against {} (M={})",
        seqs.len(),
        om.name(),
        om.m()
    );
    let run = || -> Vec<Result<Hit>> {
        seqs.par_iter()
            .progress_with_style(progress_common_style())
            .map(|seq| score_one(om, seq, config, &status.subtask()))
            .collect()
    };
    match config.threads {
        Some(n) => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(n)
                .build()
                .map_err(|e| Error::invalid(e.to_string()))?;
            Ok(pool.install(run))
        }
        None => Ok(run()),
    }
}

//!
//! Search configuration, loadable from a JSON file
//!
use crate::dp::DpMode;
use crate::profile::AlignMode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot open config: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed config: {0}")]
    Json(#[from] serde_json::Error),
}

///
/// Parameters of `search::score_all`
///
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// alignment mode the profile is configured with
    pub mode: AlignMode,
    /// mean target length of the length model; `None` uses each sequence's own length
    pub target_len: Option<usize>,
    /// progress units added by each Forward and each Backward call
    pub progress_border: usize,
    /// run the MSV and Viterbi filters before Forward/Backward
    pub run_filters: bool,
    /// number of rayon worker threads; `None` uses the global pool
    pub threads: Option<usize>,
    /// rows retained by the Forward/Backward matrices
    pub dp_mode: DpMode,
}

impl Default for SearchConfig {
    fn default() -> SearchConfig {
        SearchConfig {
            mode: AlignMode::Local,
            target_len: None,
            progress_border: 0,
            run_filters: true,
            threads: None,
            dp_mode: DpMode::Parsing,
        }
    }
}

impl SearchConfig {
    pub fn to_json_file<P: AsRef<std::path::Path>>(&self, path: P) -> Result<(), ConfigError> {
        let mut file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(&mut file, self)?;
        Ok(())
    }
    pub fn from_json_file<P: AsRef<std::path::Path>>(path: P) -> Result<SearchConfig, ConfigError> {
        let mut file = std::fs::File::open(path)?;
        let config: SearchConfig = serde_json::from_reader(&mut file)?;
        Ok(config)
    }
}

impl std::fmt::Display for SearchConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "mode={:?},target_len={:?},run_filters={},threads={:?},dp_mode={:?}",
            self.mode, self.target_len, self.run_filters, self.threads, self.dp_mode
        )
    }
}

//!
//! Core profile HMM: probability parameters of a sequence family before
//! conversion into log-odds scores.
//!
//! * `model`: `CoreHmm` node transitions and match emissions
//! * `background`: null model residue composition
//! * `params`: `HmmParams` presets for consensus-derived models
//! * `mocks`: models and sequences for tests
//!
pub mod background;
pub mod mocks;
pub mod model;
pub mod params;

pub use background::Background;
pub use model::{CoreHmm, NodeTrans};
pub use params::HmmParams;

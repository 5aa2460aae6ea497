//!
//! Profile HMM Forward/Backward engine over a quantized (byte, word, float)
//! striped model.
//!
pub mod alphabet;
pub mod common;
pub mod config;
pub mod dp;
pub mod error;
pub mod hmm;
pub mod oprofile;
pub mod prob;
pub mod profile;
pub mod search;

#[macro_use]
extern crate approx;

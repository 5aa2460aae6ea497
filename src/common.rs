//!
//! Common types shared by the profile, the optimized profile and the DP engines.
//!
use std::ops::{Index, IndexMut};

/// Type of raw (text) sequence, before digitization
pub type Sequence = Vec<u8>;

/// Convert Sequence(Vec<u8>) into &str
/// useful in displaying
pub fn sequence_to_string(seq: &[u8]) -> &str {
    std::str::from_utf8(seq).unwrap_or("<non-utf8>")
}

///
/// Progress bar style used by the parallel drivers
///
pub fn progress_common_style() -> indicatif::ProgressStyle {
    indicatif::ProgressStyle::with_template(
        "[{elapsed_precise}/{duration_precise}] {wide_bar} {pos}/{len} {per_sec}",
    )
    .unwrap_or_else(|_| indicatif::ProgressStyle::default_bar())
}

/// A sequence with its identifier, e.g. a record of a FASTA file.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedSequence {
    pub name: String,
    pub seq: Sequence,
}

impl NamedSequence {
    pub fn new<S: Into<String>>(name: S, seq: Sequence) -> Self {
        NamedSequence {
            name: name.into(),
            seq,
        }
    }
    /// length of the raw sequence
    pub fn len(&self) -> usize {
        self.seq.len()
    }
    pub fn is_empty(&self) -> bool {
        self.seq.is_empty()
    }
}

impl std::fmt::Display for NamedSequence {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}:{}", self.name, sequence_to_string(&self.seq))
    }
}

///
/// Special states having length-dependent or hit-mode-dependent transitions.
///
/// * `E` end of a homologous region
/// * `N` N-terminal unaligned flank
/// * `J` joining segment between two hits
/// * `C` C-terminal unaligned flank
///
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum XState {
    E = 0,
    N = 1,
    J = 2,
    C = 3,
}

/// All special states in table order
pub const XSTATES: [XState; 4] = [XState::E, XState::N, XState::J, XState::C];

/// The two transitions out of a special state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum XTrans {
    /// leave the state (N->B, E->C, C->T, J->B)
    Move = 0,
    /// stay in the state (N->N, E->J, C->C, J->J)
    Loop = 1,
}

/// All special transitions in table order
pub const XTRANS: [XTrans; 2] = [XTrans::Move, XTrans::Loop];

///
/// Table of special state transitions `x[state][move/loop]`
///
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Specials<T: Copy> {
    table: [[T; 2]; 4],
}

impl<T: Copy> Specials<T> {
    /// Create a new table filled with `value`
    pub fn new(value: T) -> Self {
        Specials {
            table: [[value; 2]; 4],
        }
    }
    /// Set the same value to the given transition of N, C and J states.
    pub fn set_ncj(&mut self, t: XTrans, value: T) {
        self[(XState::N, t)] = value;
        self[(XState::C, t)] = value;
        self[(XState::J, t)] = value;
    }
}

impl<T: Copy> Index<(XState, XTrans)> for Specials<T> {
    type Output = T;
    fn index(&self, (s, t): (XState, XTrans)) -> &T {
        &self.table[s as usize][t as usize]
    }
}

impl<T: Copy> IndexMut<(XState, XTrans)> for Specials<T> {
    fn index_mut(&mut self, (s, t): (XState, XTrans)) -> &mut T {
        &mut self.table[s as usize][t as usize]
    }
}

impl<T: Copy + std::fmt::Display> std::fmt::Display for Specials<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        writeln!(f, "\tmove\tloop")?;
        for (s, name) in XSTATES.iter().zip(["E", "N", "J", "C"]) {
            writeln!(
                f,
                "{}\t{}\t{}",
                name,
                self[(*s, XTrans::Move)],
                self[(*s, XTrans::Loop)]
            )?;
        }
        Ok(())
    }
}

//
// tests
//

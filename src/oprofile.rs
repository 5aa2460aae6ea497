//!
//! Optimized profile: the generic profile quantized into three striped tracks
//!
//! * byte track (`U8x16`): MSV filter costs, 1/3 bit units with a bias
//! * word track (`I16x8`): Viterbi filter scores, 1/500 bit units
//! * float track (`F32x4`): Forward/Backward odds ratios
//!
//! The emission and transition tables live behind an `Arc`. `Clone` is cheap
//! and shares them between threads; only the length and hit-mode dependent
//! parameters (`xf`, `xw`, `tjb_b`, `L`, `nj`, mode) are owned per clone.
//! Writing the tables through a shared clone (`convert`) copies them first.
//!
use crate::alphabet::Alphabet;
use crate::common::Specials;
use crate::profile::AlignMode;
use std::sync::Arc;

pub mod compare;
pub mod convert;
pub mod lanes;
pub mod reconfig;
pub mod striped;

pub use compare::Mismatch;
pub use convert::{biased_byteify, unbiased_byteify, wordify};
pub use lanes::{F32x4, I16x8, Lanes, U8x16};
pub use striped::{node_of, nq_for, position_of, Striped};

/// number of lanes of the byte track
pub const W_B: usize = 16;
/// number of lanes of the word track
pub const W_W: usize = 8;
/// number of lanes of the float track
pub const W_F: usize = 4;

///
/// Transitions stored per block of the word and float tracks, in table order.
/// `DD` is stored in a separate run of blocks after the `7 * nq` others.
///
/// `BM`, `MM`, `IM`, `DM` of block q are the transitions *into* the nodes of q
/// (stored at `k-1` in the generic profile), the others leave the nodes of q.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OTrans {
    BM = 0,
    MM = 1,
    IM = 2,
    DM = 3,
    MD = 4,
    MI = 5,
    II = 6,
}

/// number of transitions per block, excluding DD
pub const N_OTRANS: usize = 7;

/// All transitions in table order
pub const OTRANS: [OTrans; N_OTRANS] = [
    OTrans::BM,
    OTrans::MM,
    OTrans::IM,
    OTrans::DM,
    OTrans::MD,
    OTrans::MI,
    OTrans::II,
];

impl OTrans {
    pub fn name(self) -> &'static str {
        match self {
            OTrans::BM => "BM",
            OTrans::MM => "MM",
            OTrans::IM => "IM",
            OTrans::DM => "DM",
            OTrans::MD => "MD",
            OTrans::MI => "MI",
            OTrans::II => "II",
        }
    }
}

///
/// Byte track used by the MSV filter
///
#[derive(Debug, Clone, PartialEq)]
pub struct ByteTrack {
    /// biased match costs `rbv[x]` for every code x
    pub rbv: Vec<Striped<U8x16>>,
    /// constant B->Mk cost
    pub tbm: u8,
    /// constant E->C and E->J cost
    pub tec: u8,
    /// scale: 3/ln2 (third bits)
    pub scale: f32,
    /// offset of the costs
    pub base: u8,
    /// cost of the best match emission
    pub bias: u8,
    pub nq: usize,
}

///
/// Word track used by the Viterbi filter
///
#[derive(Debug, Clone, PartialEq)]
pub struct WordTrack {
    /// match scores `rwv[x]` for every code x
    pub rwv: Vec<Striped<I16x8>>,
    /// transitions, `7 * nq` blocks in `OTrans` order followed by `nq` DD blocks
    pub twv: Vec<I16x8>,
    /// scale: 500/ln2
    pub scale: f32,
    /// offset of the scores
    pub base: i16,
    /// upper bound of a D->D path contribution, for the lazy DD evaluation
    pub ddbound: i16,
    pub ncj_roundoff: f32,
    pub nq: usize,
}

///
/// Float track used by Forward and Backward
///
#[derive(Debug, Clone, PartialEq)]
pub struct FloatTrack {
    /// match odds ratios `rfv[x]` for every code x
    pub rfv: Vec<Striped<F32x4>>,
    /// transitions, `7 * nq` blocks in `OTrans` order followed by `nq` DD blocks
    pub tfv: Vec<F32x4>,
    pub nq: usize,
}

impl WordTrack {
    #[inline]
    pub fn t(&self, q: usize, t: OTrans) -> I16x8 {
        self.twv[N_OTRANS * q + t as usize]
    }
    #[inline]
    pub fn dd(&self, q: usize) -> I16x8 {
        self.twv[N_OTRANS * self.nq + q]
    }
}

impl FloatTrack {
    #[inline]
    pub fn t(&self, q: usize, t: OTrans) -> F32x4 {
        self.tfv[N_OTRANS * q + t as usize]
    }
    #[inline]
    pub fn dd(&self, q: usize) -> F32x4 {
        self.tfv[N_OTRANS * self.nq + q]
    }
}

///
/// The length-independent tables shared by clones
///
#[derive(Debug, Clone, PartialEq)]
pub struct Tables {
    pub byte: ByteTrack,
    pub word: WordTrack,
    pub float: FloatTrack,
}

#[derive(Debug, Clone)]
pub struct OptimizedProfile {
    abc: Alphabet,
    /// maximum number of nodes the tables are allocated for
    alloc_m: usize,
    tables: Arc<Tables>,
    /// B->J cost of the MSV filter (length dependent)
    tjb_b: u8,
    /// Viterbi filter special scores
    xw: Specials<i16>,
    /// Forward/Backward special probabilities
    xf: Specials<f32>,
    mode: Option<AlignMode>,
    /// number of nodes
    m: usize,
    /// target length
    l: usize,
    nj: f32,
    name: String,
}

impl OptimizedProfile {
    pub fn alphabet(&self) -> &Alphabet {
        &self.abc
    }
    /// capacity in number of nodes
    pub fn alloc_m(&self) -> usize {
        self.alloc_m
    }
    /// number of nodes
    pub fn m(&self) -> usize {
        self.m
    }
    /// target length
    pub fn l(&self) -> usize {
        self.l
    }
    pub fn nj(&self) -> f32 {
        self.nj
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    ///
    /// Alignment mode of the converted profile. `None` before the first `convert`.
    ///
    pub fn mode(&self) -> Option<AlignMode> {
        self.mode
    }
    pub fn is_local(&self) -> bool {
        self.mode.map_or(false, |mode| mode.is_local())
    }
    pub fn byte(&self) -> &ByteTrack {
        &self.tables.byte
    }
    pub fn word(&self) -> &WordTrack {
        &self.tables.word
    }
    pub fn float(&self) -> &FloatTrack {
        &self.tables.float
    }
    pub fn tjb_b(&self) -> u8 {
        self.tjb_b
    }
    pub fn xw(&self) -> &Specials<i16> {
        &self.xw
    }
    pub fn xf(&self) -> &Specials<f32> {
        &self.xf
    }
    ///
    /// True if both profiles read the same table allocation
    ///
    pub fn shares_tables(&self, other: &OptimizedProfile) -> bool {
        Arc::ptr_eq(&self.tables, &other.tables)
    }
}

///
/// Bit-identical comparison, used for the idempotence of quantization.
/// See `compare` for a tolerant comparison with a message.
///
impl PartialEq for OptimizedProfile {
    fn eq(&self, other: &Self) -> bool {
        self.abc == other.abc
            && self.m == other.m
            && self.l == other.l
            && self.nj == other.nj
            && self.mode == other.mode
            && self.name == other.name
            && self.tjb_b == other.tjb_b
            && self.xw == other.xw
            && self.xf == other.xf
            && self.tables == other.tables
    }
}

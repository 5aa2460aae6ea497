//!
//! DP matrix of the Forward/Backward engines
//!
//! Main cells are rows of striped float blocks (M, D, I per node) and
//! special cells are one `[E, N, J, B, C, SCALE]` record per row.
//!
use super::scale::ScaleTrace;
use crate::oprofile::{nq_for, F32x4, Striped, W_F};
use itertools::Itertools;
use serde::{Deserialize, Serialize};

///
/// How many main rows are retained
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DpMode {
    /// every row `0..=L`, O(ML) memory
    Full,
    /// only the current row; the special cells of every row are kept.
    /// O(M+L) memory.
    Parsing,
}

///
/// Special cells of a row
///
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XCell {
    E = 0,
    N = 1,
    J = 2,
    B = 3,
    C = 4,
    Scale = 5,
}

pub const N_XCELLS: usize = 6;

///
/// Main cells of one row
///
#[derive(Debug, Clone, PartialEq)]
pub struct DpRow {
    pub m: Striped<F32x4>,
    pub d: Striped<F32x4>,
    pub i: Striped<F32x4>,
}

impl DpRow {
    fn with_capacity(alloc_nq: usize) -> DpRow {
        DpRow {
            m: Striped::with_capacity(alloc_nq),
            d: Striped::with_capacity(alloc_nq),
            i: Striped::with_capacity(alloc_nq),
        }
    }
    pub(crate) fn reset(&mut self, nq: usize) {
        self.m.reset(nq, 0.0);
        self.d.reset(nq, 0.0);
        self.i.reset(nq, 0.0);
    }
    /// multiply every cell of the row by `c`
    pub(crate) fn scale(&mut self, c: f32) {
        for q in 0..self.m.nq() {
            *self.m.block_mut(q) *= c;
            *self.d.block_mut(q) *= c;
            *self.i.block_mut(q) *= c;
        }
    }
}

///
/// DP matrix allocated for up to `alloc_m` nodes and `alloc_l` residues.
/// It is reused across sequences with `grow_to`.
///
/// In `Parsing` mode two physical rows alternate so that an engine can
/// read the previous row while writing the current one; only the last
/// computed row is meaningful after a run.
///
#[derive(Debug, Clone)]
pub struct DpMatrix {
    mode: DpMode,
    alloc_m: usize,
    alloc_l: usize,
    rows: Vec<DpRow>,
    xmx: Vec<[f32; N_XCELLS]>,
    m: usize,
    l: usize,
    nq: usize,
    totscale: f64,
    has_own_scales: bool,
}

impl DpMatrix {
    pub fn new(alloc_m: usize, alloc_l: usize, mode: DpMode) -> DpMatrix {
        let n_rows = match mode {
            DpMode::Full => alloc_l + 1,
            DpMode::Parsing => 2,
        };
        let alloc_nq = nq_for(alloc_m, W_F);
        DpMatrix {
            mode,
            alloc_m,
            alloc_l,
            rows: (0..n_rows).map(|_| DpRow::with_capacity(alloc_nq)).collect(),
            xmx: vec![[0.0; N_XCELLS]; alloc_l + 1],
            m: 0,
            l: 0,
            nq: 0,
            totscale: 0.0,
            has_own_scales: true,
        }
    }
    ///
    /// Make room for a model of `m` nodes and a sequence of `l` residues.
    /// Never shrinks the allocation.
    ///
    pub fn grow_to(&mut self, m: usize, l: usize) {
        if m > self.alloc_m {
            let alloc_nq = nq_for(m, W_F);
            for row in self.rows.iter_mut() {
                *row = DpRow::with_capacity(alloc_nq);
            }
            self.alloc_m = m;
        }
        if l > self.alloc_l {
            if self.mode == DpMode::Full {
                let alloc_nq = nq_for(self.alloc_m, W_F);
                self.rows.resize_with(l + 1, || DpRow::with_capacity(alloc_nq));
            }
            self.xmx.resize(l + 1, [0.0; N_XCELLS]);
            self.alloc_l = l;
        }
    }
    /// true if a run with `m` nodes and `l` residues fits without growing
    pub fn fits(&self, m: usize, l: usize) -> bool {
        m <= self.alloc_m && l <= self.alloc_l
    }
    ///
    /// Start a run: set the dimensions and clear the scale bookkeeping.
    /// The caller has checked `fits(m, l)`.
    ///
    pub(crate) fn start(&mut self, m: usize, l: usize, has_own_scales: bool) {
        self.m = m;
        self.l = l;
        self.nq = nq_for(m, W_F);
        self.totscale = 0.0;
        self.has_own_scales = has_own_scales;
    }
    pub fn mode(&self) -> DpMode {
        self.mode
    }
    pub fn alloc_m(&self) -> usize {
        self.alloc_m
    }
    pub fn alloc_l(&self) -> usize {
        self.alloc_l
    }
    /// number of nodes of the last run
    pub fn m(&self) -> usize {
        self.m
    }
    /// sequence length of the last run
    pub fn l(&self) -> usize {
        self.l
    }
    pub fn nq(&self) -> usize {
        self.nq
    }
    /// sum of the natural log of the scale factors
    pub fn totscale(&self) -> f64 {
        self.totscale
    }
    pub(crate) fn add_scale(&mut self, factor: f32) {
        self.totscale += (factor as f64).ln();
    }
    pub(crate) fn set_totscale(&mut self, totscale: f64) {
        self.totscale = totscale;
    }
    ///
    /// True if the scale factors were derived by this matrix itself (always
    /// for Forward; for Backward only after the switch from the Forward
    /// factors).
    ///
    pub fn has_own_scales(&self) -> bool {
        self.has_own_scales
    }
    pub(crate) fn set_own_scales(&mut self) {
        self.has_own_scales = true;
    }
    /// physical row of sequence position `i`
    fn slot(&self, i: usize) -> usize {
        match self.mode {
            DpMode::Full => i,
            DpMode::Parsing => i % 2,
        }
    }
    ///
    /// Main cells of row `i`. In `Parsing` mode only the last computed row
    /// is valid.
    ///
    pub fn row(&self, i: usize) -> &DpRow {
        &self.rows[self.slot(i)]
    }
    pub(crate) fn row_mut(&mut self, i: usize) -> &mut DpRow {
        let s = self.slot(i);
        &mut self.rows[s]
    }
    ///
    /// `(row prev, row cur)` with `prev != cur` (adjacent positions)
    ///
    pub(crate) fn row_pair(&mut self, prev: usize, cur: usize) -> (&DpRow, &mut DpRow) {
        let (p, c) = (self.slot(prev), self.slot(cur));
        assert_ne!(p, c);
        if p < c {
            let (lo, hi) = self.rows.split_at_mut(c);
            (&lo[p], &mut hi[0])
        } else {
            let (lo, hi) = self.rows.split_at_mut(p);
            (&hi[0], &mut lo[c])
        }
    }
    /// match cell of node `k` (1-based) at row `i`
    pub fn mmx(&self, i: usize, k: usize) -> f32 {
        self.row(i).m.get(k)
    }
    /// delete cell of node `k` (1-based) at row `i`
    pub fn dmx(&self, i: usize, k: usize) -> f32 {
        self.row(i).d.get(k)
    }
    /// insert cell of node `k` (1-based) at row `i`
    pub fn imx(&self, i: usize, k: usize) -> f32 {
        self.row(i).i.get(k)
    }
    /// special cell of row `i`
    pub fn xmx(&self, i: usize, cell: XCell) -> f32 {
        self.xmx[i][cell as usize]
    }
    pub(crate) fn set_xmx(&mut self, i: usize, cells: [f32; N_XCELLS]) {
        self.xmx[i] = cells;
    }
    ///
    /// Scale factors of rows `0..=L` of the last run
    ///
    pub fn scale_trace(&self) -> ScaleTrace {
        let factors = self.xmx[..=self.l]
            .iter()
            .map(|x| x[XCell::Scale as usize])
            .collect();
        ScaleTrace::from_rows(factors, self.totscale, self.has_own_scales)
    }
}

impl std::fmt::Display for DpMatrix {
    ///
    /// Special cells of every row, in log space
    ///
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        writeln!(
            f,
            "# M={} L={} totscale={} own_scales={}",
            self.m, self.l, self.totscale, self.has_own_scales
        )?;
        writeln!(f, "i\tE\tN\tJ\tB\tC\tSCALE")?;
        for (i, x) in self.xmx[..=self.l].iter().enumerate() {
            let logs = x[..N_XCELLS - 1]
                .iter()
                .map(|v| format!("{:.4}", v.ln()))
                .join("\t");
            writeln!(f, "{}\t{}\t{}", i, logs, x[XCell::Scale as usize])?;
        }
        Ok(())
    }
}

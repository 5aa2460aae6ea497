//!
//! Comparison and text dump of optimized profiles
//!
use super::lanes::Lanes;
use super::striped::{node_of, Striped};
use super::{OptimizedProfile, N_OTRANS, OTRANS};
use crate::common::{XSTATES, XTRANS};
use thiserror::Error;

///
/// The first difference found by `OptimizedProfile::compare`
///
#[derive(Debug, Clone, PartialEq, Error)]
#[error("comparison failed: {0}")]
pub struct Mismatch(pub String);

///
/// Relative float comparison. Equal values (including infinities) always match.
///
fn fcompare(a: f32, b: f32, tol: f32) -> bool {
    if a == b {
        return true;
    }
    if !a.is_finite() || !b.is_finite() {
        return false;
    }
    2.0 * (a - b).abs() / (a.abs() + b.abs()) <= tol
}

fn check(ok: bool, what: &str) -> Result<(), Mismatch> {
    if ok {
        Ok(())
    } else {
        Err(Mismatch(what.to_string()))
    }
}

///
/// Compare lanes of two block sequences with `eq`, reporting the first
/// differing (block, lane).
///
fn compare_blocks<V: Lanes, F: Fn(V::Elem, V::Elem) -> bool>(
    a: &[V],
    b: &[V],
    what: &str,
    eq: F,
) -> Result<(), Mismatch> {
    if a.len() != b.len() {
        return Err(Mismatch(format!(
            "{}: different number of blocks ({} != {})",
            what,
            a.len(),
            b.len()
        )));
    }
    for (q, (va, vb)) in a.iter().zip(b.iter()).enumerate() {
        for z in 0..V::W {
            if !eq(va.lane(z), vb.lane(z)) {
                return Err(Mismatch(format!(
                    "{} differs at q={} z={} ({} != {})",
                    what,
                    q,
                    z,
                    va.lane(z),
                    vb.lane(z)
                )));
            }
        }
    }
    Ok(())
}

fn compare_striped<V: Lanes, F: Fn(V::Elem, V::Elem) -> bool + Copy>(
    a: &[Striped<V>],
    b: &[Striped<V>],
    what: &str,
    eq: F,
) -> Result<(), Mismatch> {
    for (x, (sa, sb)) in a.iter().zip(b.iter()).enumerate() {
        compare_blocks(sa.blocks(), sb.blocks(), &format!("{}[{}]", what, x), eq)?;
    }
    Ok(())
}

impl OptimizedProfile {
    ///
    /// Compare two optimized profiles.
    ///
    /// Integer tracks must be identical. Float values are compared with the
    /// relative tolerance `tol` (`2|a-b|/(|a|+|b|) <= tol`); `tol = 0.0`
    /// requires identical floats.
    ///
    pub fn compare(&self, other: &OptimizedProfile, tol: f32) -> Result<(), Mismatch> {
        check(self.mode == other.mode, "different modes")?;
        check(self.l == other.l, "different target lengths L")?;
        check(self.m == other.m, "different profile lengths M")?;
        check(self.nj == other.nj, "different nj")?;
        check(self.abc.kind() == other.abc.kind(), "different alphabets")?;
        check(self.abc.kp() == other.abc.kp(), "different alphabet sizes")?;

        // byte track
        let (a, b) = (self.byte(), other.byte());
        compare_striped(&a.rbv, &b.rbv, "rbv", |x, y| x == y)?;
        check(a.tbm == b.tbm, "tbm_b")?;
        check(a.tec == b.tec, "tec_b")?;
        check(self.tjb_b == other.tjb_b, "tjb_b")?;
        check(a.scale == b.scale, "scale_b")?;
        check(a.base == b.base, "base_b")?;
        check(a.bias == b.bias, "bias_b")?;

        // word track
        let (a, b) = (self.word(), other.word());
        compare_striped(&a.rwv, &b.rwv, "rwv", |x, y| x == y)?;
        compare_blocks(&a.twv, &b.twv, "twv", |x, y| x == y)?;
        for s in XSTATES {
            for t in XTRANS {
                check(self.xw[(s, t)] == other.xw[(s, t)], "xw")?;
            }
        }
        check(a.scale == b.scale, "scale_w")?;
        check(a.base == b.base, "base_w")?;
        check(a.ddbound == b.ddbound, "ddbound_w")?;

        // float track
        let (a, b) = (self.float(), other.float());
        compare_striped(&a.rfv, &b.rfv, "rfv", |x, y| fcompare(x, y, tol))?;
        compare_blocks(&a.tfv, &b.tfv, "tfv", |x, y| fcompare(x, y, tol))?;
        for s in XSTATES {
            for t in XTRANS {
                check(fcompare(self.xf[(s, t)], other.xf[(s, t)], tol), "xf")?;
            }
        }

        check(self.name == other.name, "different names")?;
        Ok(())
    }
}

//
// Display
//

fn write_node_header(
    f: &mut std::fmt::Formatter,
    nq: usize,
    w: usize,
    m: usize,
) -> std::fmt::Result {
    write!(f, "     ")?;
    for q in 0..nq {
        write!(f, "[ ")?;
        for z in 0..w {
            let k = node_of(q, z, nq);
            if k <= m {
                write!(f, "{:>6} ", k)?;
            } else {
                write!(f, "{:>6} ", "xx")?;
            }
        }
        write!(f, "]")?;
    }
    writeln!(f)
}

fn write_blocks<V: Lanes, F: Fn(V::Elem) -> String>(
    f: &mut std::fmt::Formatter,
    label: &str,
    blocks: &[V],
    show: F,
) -> std::fmt::Result {
    write!(f, "{:>4} ", label)?;
    for v in blocks {
        write!(f, "[ ")?;
        for z in 0..V::W {
            write!(f, "{:>6} ", show(v.lane(z)))?;
        }
        write!(f, "]")?;
    }
    writeln!(f)
}

impl OptimizedProfile {
    fn fmt_track<V: Lanes, F: Fn(V::Elem) -> String + Copy>(
        &self,
        f: &mut std::fmt::Formatter,
        title: &str,
        emissions: &[Striped<V>],
        transitions: Option<&[V]>,
        show: F,
    ) -> std::fmt::Result {
        let nq = emissions.first().map_or(0, |s| s.nq());
        writeln!(f, "# {} track (nq={})", title, nq)?;
        writeln!(f, "## match emissions")?;
        write_node_header(f, nq, V::W, self.m)?;
        for (x, s) in emissions.iter().enumerate() {
            let sym = self.abc.symbol(x as u8) as char;
            write_blocks(f, &sym.to_string(), s.blocks(), show)?;
        }
        if let Some(tv) = transitions {
            writeln!(f, "## transitions")?;
            write_node_header(f, nq, V::W, self.m)?;
            for (i, t) in OTRANS.iter().enumerate() {
                let blocks: Vec<V> = (0..nq).map(|q| tv[q * N_OTRANS + i]).collect();
                write_blocks(f, t.name(), &blocks, show)?;
            }
            write_blocks(f, "DD", &tv[N_OTRANS * nq..], show)?;
        }
        Ok(())
    }
}

impl std::fmt::Display for OptimizedProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        writeln!(
            f,
            "# optimized profile {} M={} L={} nj={} mode={:?}",
            self.name, self.m, self.l, self.nj, self.mode
        )?;
        let (by, wo, fl) = (self.byte(), self.word(), self.float());
        self.fmt_track(f, "float", &fl.rfv, Some(fl.tfv.as_slice()), |v: f32| format!("{:.4}", v))?;
        writeln!(f, "## specials")?;
        write!(f, "{}", self.xf)?;

        self.fmt_track(f, "word", &wo.rwv, Some(wo.twv.as_slice()), |v: i16| v.to_string())?;
        writeln!(f, "## specials")?;
        write!(f, "{}", self.xw)?;
        writeln!(
            f,
            "scale={} base={} ddbound={} ncj_roundoff={}",
            wo.scale, wo.base, wo.ddbound, wo.ncj_roundoff
        )?;

        self.fmt_track(f, "byte", &by.rbv, None, |v: u8| v.to_string())?;
        writeln!(
            f,
            "tbm={} tec={} tjb={} scale={} base={} bias={}",
            by.tbm, by.tec, self.tjb_b, by.scale, by.base, by.bias
        )
    }
}

//
// tests
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alphabet::Alphabet;
    use crate::common::{XState, XTrans};
    use crate::hmm::mocks::*;
    use crate::hmm::Background;
    use crate::profile::{AlignMode, Profile};

    fn om(m: usize, seed: u64) -> OptimizedProfile {
        let hmm = mock_sampled_hmm(&Alphabet::dna(), m, seed);
        let bg = Background::new(hmm.alphabet());
        let gm = Profile::configure(&hmm, &bg, 100, AlignMode::Local).unwrap();
        OptimizedProfile::quantize(&gm).unwrap()
    }

    #[test]
    fn float_tolerance() {
        assert!(fcompare(1.0, 1.0, 0.0));
        assert!(fcompare(f32::INFINITY, f32::INFINITY, 0.0));
        assert!(!fcompare(1.0, 1.0001, 0.0));
        assert!(fcompare(1.0, 1.0001, 1e-3));
        assert!(!fcompare(0.0, 1e-10, 1e-3));
    }

    #[test]
    fn compare_reports_first_difference() {
        let a = om(12, 0);
        let b = om(12, 0);
        assert!(a.compare(&b, 0.0).is_ok());

        let c = om(12, 1);
        let e = a.compare(&c, 1e-3).unwrap_err();
        assert!(e.0.contains("rbv") || e.0.contains("bias") || e.0.contains("tbm"));

        let mut d = b.clone();
        d.reconfig_length(500, 500);
        let e = a.compare(&d, 1e-3).unwrap_err();
        assert_eq!(e.0, "different target lengths L");

        let mut u = b.clone();
        u.reconfig_unihit(100, 100);
        let e = a.compare(&u, 1e-3).unwrap_err();
        assert_eq!(e.0, "different modes");
        assert_eq!(format!("{}", e), "comparison failed: different modes");
    }

    #[test]
    fn compare_float_specials_with_tolerance() {
        let a = om(12, 0);
        let mut b = a.clone();
        b.xf[(XState::N, XTrans::Loop)] *= 1.0 + 1e-6;
        assert!(a.compare(&b, 1e-4).is_ok());
        assert_eq!(a.compare(&b, 0.0).unwrap_err().0, "xf");
    }

    #[test]
    fn dump() {
        let a = om(5, 3);
        let s = format!("{}", a);
        println!("{}", s);
        assert!(s.contains("# float track (nq=2)"));
        assert!(s.contains("# word track (nq=2)"));
        assert!(s.contains("# byte track (nq=2)"));
        // M=5, W=4, nq=2: lanes past node 5 are padding
        assert!(s.contains("xx"));
        assert!(s.contains("DD"));
        assert!(s.contains("ddbound="));
    }
}

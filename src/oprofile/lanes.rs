//!
//! Fixed-width lane vectors used by the striped tracks
//!
//! * `U8x16`: 16 unsigned byte lanes (MSV costs, saturating arithmetic)
//! * `I16x8`: 8 signed word lanes (Viterbi scores, saturating arithmetic)
//! * `F32x4`: 4 float lanes (Forward/Backward odds ratios)
//!
//! Lane `z` of block `q` holds node `k = q + 1 + z * nq` (see `striped`).
//! A right shift moves lane z to lane z+1, so that each node sees the value
//! of its predecessor.
//!
use std::ops::{Add, AddAssign, Index, Mul, MulAssign};

///
/// Lane vector of fixed width `W`
///
/// * `splat`
///     all lanes set to the value
/// * `lane`/`set_lane`
///     read/write one lane
/// * `rightshift`
///     `[a, b, c, d] -> [fill, a, b, c]`
/// * `leftshift`
///     `[a, b, c, d] -> [b, c, d, fill]`
///
pub trait Lanes: Copy + PartialEq + std::fmt::Debug {
    /// element type of a lane
    type Elem: Copy + PartialEq + std::fmt::Debug + std::fmt::Display;
    /// number of lanes
    const W: usize;
    fn splat(x: Self::Elem) -> Self;
    fn lane(&self, z: usize) -> Self::Elem;
    fn set_lane(&mut self, z: usize, x: Self::Elem);
    fn rightshift(self, fill: Self::Elem) -> Self;
    fn leftshift(self, fill: Self::Elem) -> Self;
}

macro_rules! impl_lanes {
    ($name:ident, $elem:ty, $w:expr) => {
        #[derive(Clone, Copy, Debug, PartialEq)]
        pub struct $name(pub [$elem; $w]);

        impl Lanes for $name {
            type Elem = $elem;
            const W: usize = $w;
            #[inline]
            fn splat(x: $elem) -> Self {
                $name([x; $w])
            }
            #[inline]
            fn lane(&self, z: usize) -> $elem {
                self.0[z]
            }
            #[inline]
            fn set_lane(&mut self, z: usize, x: $elem) {
                self.0[z] = x;
            }
            #[inline]
            fn rightshift(self, fill: $elem) -> Self {
                let mut r = [fill; $w];
                r[1..].copy_from_slice(&self.0[..$w - 1]);
                $name(r)
            }
            #[inline]
            fn leftshift(self, fill: $elem) -> Self {
                let mut r = [fill; $w];
                r[..$w - 1].copy_from_slice(&self.0[1..]);
                $name(r)
            }
        }

        impl Index<usize> for $name {
            type Output = $elem;
            fn index(&self, z: usize) -> &$elem {
                &self.0[z]
            }
        }
    };
}

impl_lanes!(U8x16, u8, 16);
impl_lanes!(I16x8, i16, 8);
impl_lanes!(F32x4, f32, 4);

//
// F32x4
//

impl F32x4 {
    pub fn zero() -> F32x4 {
        F32x4([0.0; 4])
    }
    ///
    /// Horizontal sum `(v0 + v1) + (v2 + v3)`
    ///
    #[inline]
    pub fn hsum(self) -> f32 {
        (self.0[0] + self.0[1]) + (self.0[2] + self.0[3])
    }
    ///
    /// True if any lane of self is greater than the lane of other
    ///
    #[inline]
    pub fn any_gt(self, other: F32x4) -> bool {
        self.0.iter().zip(other.0.iter()).any(|(a, b)| a > b)
    }
}

impl Add for F32x4 {
    type Output = F32x4;
    #[inline]
    fn add(self, other: F32x4) -> F32x4 {
        let mut r = self.0;
        for z in 0..4 {
            r[z] += other.0[z];
        }
        F32x4(r)
    }
}

impl Mul for F32x4 {
    type Output = F32x4;
    #[inline]
    fn mul(self, other: F32x4) -> F32x4 {
        let mut r = self.0;
        for z in 0..4 {
            r[z] *= other.0[z];
        }
        F32x4(r)
    }
}

impl Mul<f32> for F32x4 {
    type Output = F32x4;
    #[inline]
    fn mul(self, c: f32) -> F32x4 {
        F32x4(self.0.map(|v| v * c))
    }
}

impl AddAssign for F32x4 {
    #[inline]
    fn add_assign(&mut self, other: F32x4) {
        *self = *self + other;
    }
}

impl MulAssign for F32x4 {
    #[inline]
    fn mul_assign(&mut self, other: F32x4) {
        *self = *self * other;
    }
}

impl MulAssign<f32> for F32x4 {
    #[inline]
    fn mul_assign(&mut self, c: f32) {
        *self = *self * c;
    }
}

//
// U8x16
//

impl U8x16 {
    /// lane-wise saturating add
    #[inline]
    pub fn adds(self, other: U8x16) -> U8x16 {
        let mut r = self.0;
        for z in 0..16 {
            r[z] = r[z].saturating_add(other.0[z]);
        }
        U8x16(r)
    }
    /// lane-wise saturating subtract (floor 0)
    #[inline]
    pub fn subs(self, other: U8x16) -> U8x16 {
        let mut r = self.0;
        for z in 0..16 {
            r[z] = r[z].saturating_sub(other.0[z]);
        }
        U8x16(r)
    }
    #[inline]
    pub fn max(self, other: U8x16) -> U8x16 {
        let mut r = self.0;
        for z in 0..16 {
            r[z] = r[z].max(other.0[z]);
        }
        U8x16(r)
    }
    /// horizontal max
    #[inline]
    pub fn hmax(self) -> u8 {
        self.0.iter().copied().fold(0, u8::max)
    }
}

//
// I16x8
//

impl I16x8 {
    /// lane-wise saturating add
    #[inline]
    pub fn adds(self, other: I16x8) -> I16x8 {
        let mut r = self.0;
        for z in 0..8 {
            r[z] = r[z].saturating_add(other.0[z]);
        }
        I16x8(r)
    }
    #[inline]
    pub fn max(self, other: I16x8) -> I16x8 {
        let mut r = self.0;
        for z in 0..8 {
            r[z] = r[z].max(other.0[z]);
        }
        I16x8(r)
    }
    /// horizontal max
    #[inline]
    pub fn hmax(self) -> i16 {
        self.0.iter().copied().fold(i16::MIN, i16::max)
    }
    #[inline]
    pub fn any_gt(self, other: I16x8) -> bool {
        self.0.iter().zip(other.0.iter()).any(|(a, b)| a > b)
    }
}

use std::fmt;

use alphabet::Alphabet;
use log::debug;

use crate::gp::GenericProfile;
use crate::ProfileError;

pub mod stripe;
pub use stripe::Stripe;

pub mod byte;
pub use byte::{ByteLayer, BASE_B, EXTRA_SB, SCALE_B};

pub mod word;
pub use word::{wordify, WordLayer, BASE_W, NEG_INF_W, SCALE_W};

pub mod float;
pub use float::FloatLayer;

// The SSV wrap region must cover a full diagonal sweep at the baseline
// vector width.
const _: () = assert!(EXTRA_SB >= 16 - 1);

/// Vector width an optimized profile is striped for, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimdWidth {
    W16,
    W32,
    W64,
}

impl SimdWidth {
    pub const fn bytes(self) -> usize {
        match self {
            Self::W16 => 16,
            Self::W32 => 32,
            Self::W64 => 64,
        }
    }

    pub const fn lanes_u8(self) -> usize {
        self.bytes()
    }

    pub const fn lanes_i16(self) -> usize {
        self.bytes() / 2
    }

    pub const fn lanes_f32(self) -> usize {
        self.bytes() / 4
    }
}

impl fmt::Display for SimdWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bytes())
    }
}

impl std::str::FromStr for SimdWidth {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "16" => Ok(Self::W16),
            "32" => Ok(Self::W32),
            "64" => Ok(Self::W64),
            other => Err(format!("unsupported vector width '{other}' (expected 16, 32 or 64)")),
        }
    }
}

/// The striped, quantized rendition of a [`GenericProfile`]: one layer per
/// precision, all derived deterministically at build time. Shared read-only
/// between workers; only [`Self::reconfig_length`] mutates it, and only the
/// length-dependent specials.
#[derive(Debug, Clone)]
pub struct OptimizedProfile {
    pub alphabet: Alphabet,
    pub m       : usize,
    pub l       : usize,
    pub width   : SimdWidth,
    pub byte    : ByteLayer,
    pub word    : WordLayer,
    pub float   : FloatLayer,
}

impl OptimizedProfile {
    /// Build all three layers. There is no partial publication: any failure
    /// yields no profile at all.
    pub fn build(gp: &GenericProfile, width: SimdWidth) -> Result<OptimizedProfile, ProfileError> {
        if gp.m == 0 {
            return Err(ProfileError::InvalidProfile("cannot stripe an empty model".to_string()));
        }
        let byte = ByteLayer::build(gp, width.lanes_u8());
        let word = WordLayer::build(gp, width.lanes_i16());
        let float = FloatLayer::build(gp, width.lanes_f32());
        debug!(
            "striped M={} over W={width}: Qb={}, Qw={}, Qf={}",
            gp.m, byte.stripe.q, word.stripe.q, float.stripe.q
        );
        Ok(OptimizedProfile {
            alphabet: gp.alphabet,
            m: gp.m,
            l: gp.l,
            width,
            byte,
            word,
            float,
        })
    }

    /// Rewrite the length-dependent special scores of every layer. The
    /// striped arrays are untouched.
    pub fn reconfig_length(&mut self, l: usize) {
        self.byte.set_length(l);
        self.word.set_length(l);
        self.float.set_length(l);
        self.l = l;
    }

    /// Compare against another optimized profile: bit-exact on the integer
    /// layers, `|Δ| ≤ tol` on the float layer.
    pub fn compare(&self, other: &OptimizedProfile, tol: f32) -> Result<(), ProfileError> {
        let fail = |what: &str| Err(ProfileError::CompareMismatch(what.to_string()));
        if self.m != other.m || self.width != other.width || self.alphabet != other.alphabet {
            return fail("shape (M, width or alphabet)");
        }
        if self.byte != other.byte {
            return fail("byte layer");
        }
        if self.word != other.word {
            return fail("word layer");
        }
        let kp = self.alphabet.kp() as u8;
        for x in 0..kp {
            let (a, b) = (self.float.rfv_row(x), other.float.rfv_row(x));
            if a.iter().zip(b).any(|(l, r)| (l - r).abs() > tol) {
                return fail("float emission odds");
            }
        }
        for q in 0..self.float.stripe.q {
            let pairs = self.float.tf7(q).iter().zip(other.float.tf7(q));
            let dds = self.float.dd(q).iter().zip(other.float.dd(q));
            if pairs.chain(dds).any(|(l, r)| (l - r).abs() > tol) {
                return fail("float transition odds");
            }
        }
        for s in 0..self.float.xf.len() {
            for d in 0..2 {
                if (self.float.xf[s][d] - other.float.xf[s][d]).abs() > tol {
                    return fail("float specials");
                }
            }
        }
        Ok(())
    }
}

use crate::gp::{GenericProfile, Transition};
use super::stripe::Stripe;

/// Byte quantization: third-bit units.
pub const SCALE_B: f32 = 3.0 / std::f32::consts::LN_2;
/// Offset the MSV accumulator floats around.
pub const BASE_B: u8 = 190;
/// Trailing wrap vectors appended to the SSV view.
pub const EXTRA_SB: usize = 17;

/// The 8-bit precision layer: biased unsigned MSV costs (`rbv`) and the
/// signed SSV view (`sbv`) derived from them, plus the scalar entry/exit
/// byte costs the MSV recursion needs.
///
/// # Fields
/// - `bias`: unbiased byte cost of the most extreme match score; added to
///   every `rbv` entry so the stored bytes stay unsigned.
/// - `tbm` : B→Mk entry cost (uniform local entry).
/// - `tec` : E→C/E→J exit cost (`ln ½`).
/// - `tjb` : N/J/C move cost (`ln(3/(L+3))`), rewritten per target length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ByteLayer {
    pub stripe: Stripe,
    pub bias  : u8,
    pub tbm   : u8,
    pub tec   : u8,
    pub tjb   : u8,
    rbv       : Vec<u8>,
    sbv       : Vec<u8>,
    extra     : usize,
    kp        : usize,
}

/// Round a score to a biased unsigned byte cost, saturating at 255.
#[inline]
fn biased_byteify(bias: u8, sc: f32) -> u8 {
    let cost = -(SCALE_B * sc).round();
    if cost > f32::from(255 - bias) {
        255
    } else {
        (cost + f32::from(bias)).max(0.0) as u8
    }
}

/// Round a (non-negative) cost to an unsigned byte, saturating at 255.
#[inline]
fn unbiased_byteify(sc: f32) -> u8 {
    (-(SCALE_B * sc).round()).clamp(0.0, 255.0) as u8
}

impl ByteLayer {
    pub fn build(gp: &GenericProfile, lanes: usize) -> ByteLayer {
        let kp = gp.alphabet.kp();
        let stripe = Stripe::new(gp.m, lanes);

        // Bias: byte cost of the largest-magnitude emission score.
        let max = (1..=gp.m)
            .flat_map(|k| (0..kp as u8).map(move |x| (k, x)))
            .map(|(k, x)| gp.msc(k, x).abs())
            .fold(0.0_f32, f32::max);
        let bias = (SCALE_B * max).round().min(255.0) as u8;

        let mut rbv = vec![0_u8; kp * stripe.row_len()];
        for x in 0..kp {
            let row = &mut rbv[x * stripe.row_len()..(x + 1) * stripe.row_len()];
            for q in 0..stripe.q {
                for z in 0..lanes {
                    let k = stripe.node(q, z);
                    row[stripe.at(q, z)] = if k <= gp.m {
                        biased_byteify(bias, gp.msc(k, x as u8))
                    } else {
                        255 // padding lane: fully saturated cost
                    };
                }
            }
        }

        let extra = EXTRA_SB.max(lanes - 1);
        let mut layer = ByteLayer {
            stripe,
            bias,
            tbm: unbiased_byteify(gp.tsc(1, Transition::LM)),
            tec: unbiased_byteify(0.5_f32.ln()),
            tjb: 0,
            rbv,
            sbv: vec![0_u8; kp * (stripe.q + extra) * lanes],
            extra,
            kp,
        };
        layer.set_length(gp.l);
        layer.derive_ssv();
        layer
    }

    /// Derive the signed SSV view:
    /// `sbv = ((127 + bias) ⊖ᵤ rbv) XOR 127`, then mirror the leading
    /// vectors into the trailing wrap region.
    fn derive_ssv(&mut self) {
        let vlen = self.stripe.lanes;
        let q = self.stripe.q;
        let head = 127_u8.saturating_add(self.bias);
        for x in 0..self.kp {
            let rrow = &self.rbv[x * q * vlen..(x + 1) * q * vlen];
            let srow = &mut self.sbv[x * (q + self.extra) * vlen..(x + 1) * (q + self.extra) * vlen];
            for (s, &r) in srow[..q * vlen].iter_mut().zip(rrow) {
                *s = head.saturating_sub(r) ^ 127;
            }
            for j in 0..self.extra {
                let src = (j % q) * vlen;
                let dst = (q + j) * vlen;
                for z in 0..vlen {
                    srow[dst + z] = srow[src + z];
                }
            }
        }
    }

    /// Rewrite the length-dependent move cost.
    pub fn set_length(&mut self, l: usize) {
        self.tjb = unbiased_byteify((3.0 / (l as f32 + 3.0)).ln());
    }

    /// Striped biased match costs for residue `x` (Q vectors).
    #[inline]
    pub fn rbv_row(&self, x: u8) -> &[u8] {
        let len = self.stripe.row_len();
        &self.rbv[x as usize * len..(x as usize + 1) * len]
    }

    /// Striped SSV scores for residue `x` (Q + extra wrap vectors).
    #[inline]
    pub fn sbv_row(&self, x: u8) -> &[u8] {
        let len = (self.stripe.q + self.extra) * self.stripe.lanes;
        &self.sbv[x as usize * len..(x as usize + 1) * len]
    }

    pub fn extra(&self) -> usize {
        self.extra
    }
}

use crate::gp::{GenericProfile, Special, Transition, N_SPECIALS, XSC_LOOP, XSC_MOVE};
use super::stripe::Stripe;
use super::word::{N_TW, TW_BM, TW_DM, TW_II, TW_IM, TW_MD, TW_MI, TW_MM};

/// The single-precision layer of an optimized profile, in odds-ratio space:
/// every stored value is `exp` of the corresponding log score, so the
/// Forward/Backward kernels multiply and add instead of calling `logsum`.
/// Padding lanes and impossible transitions hold 0 (the image of −inf).
///
/// Unlike the integer layers, `xf` carries the *true* length-dependent
/// N/J/C values; single precision has the range for them.
#[derive(Debug, Clone, PartialEq)]
pub struct FloatLayer {
    pub stripe: Stripe,
    pub xf    : [[f32; 2]; N_SPECIALS],
    rfv       : Vec<f32>,
    tfv       : Vec<f32>,
    kp        : usize,
}

impl FloatLayer {
    pub fn build(gp: &GenericProfile, lanes: usize) -> FloatLayer {
        let kp = gp.alphabet.kp();
        let stripe = Stripe::new(gp.m, lanes);
        let vlen = stripe.lanes;
        let rl = stripe.row_len();

        let mut rfv = vec![0.0_f32; kp * rl];
        for x in 0..kp {
            for q in 0..stripe.q {
                for z in 0..vlen {
                    let k = stripe.node(q, z);
                    if k <= gp.m {
                        rfv[x * rl + stripe.at(q, z)] = gp.msc(k, x as u8).exp();
                    }
                }
            }
        }

        // Same interleave as the word layer: 7 vectors per stripe + Q DD.
        let mut tfv = vec![0.0_f32; (N_TW + 1) * rl];
        for q in 0..stripe.q {
            for z in 0..vlen {
                let k = stripe.node(q, z);
                if k > gp.m {
                    continue;
                }
                let base = q * N_TW * vlen;
                tfv[base + TW_BM * vlen + z] = gp.tsc(k, Transition::LM).exp();
                tfv[base + TW_MM * vlen + z] = gp.tsc(k, Transition::MM).exp();
                tfv[base + TW_IM * vlen + z] = gp.tsc(k, Transition::IM).exp();
                tfv[base + TW_DM * vlen + z] = gp.tsc(k, Transition::DM).exp();
                tfv[base + TW_MD * vlen + z] = gp.tsc(k + 1, Transition::MD).exp();
                tfv[base + TW_MI * vlen + z] = gp.tsc(k, Transition::MI).exp();
                tfv[base + TW_II * vlen + z] = gp.tsc(k, Transition::II).exp();
                tfv[N_TW * rl + q * vlen + z] = gp.tsc(k + 1, Transition::DD).exp();
            }
        }

        let mut layer = FloatLayer {
            stripe,
            xf: [[0.0; 2]; N_SPECIALS],
            rfv,
            tfv,
            kp,
        };
        layer.xf[Special::E as usize] = [
            gp.xsc(Special::E, XSC_MOVE).exp(),
            gp.xsc(Special::E, XSC_LOOP).exp(),
        ];
        layer.xf[Special::B as usize] = [1.0, 0.0];
        layer.set_length(gp.l);
        layer
    }

    /// True length model, as odds ratios.
    pub fn set_length(&mut self, l: usize) {
        let lf = l as f32;
        let pmove = 3.0 / (lf + 3.0);
        let ploop = lf / (lf + 3.0);
        for s in [Special::N, Special::J, Special::C] {
            self.xf[s as usize] = [pmove, ploop];
        }
    }

    /// Striped emission odds for residue `x` (Q vectors).
    #[inline]
    pub fn rfv_row(&self, x: u8) -> &[f32] {
        let len = self.stripe.row_len();
        &self.rfv[x as usize * len..(x as usize + 1) * len]
    }

    /// The seven interleaved transition vectors of stripe `q`.
    #[inline]
    pub fn tf7(&self, q: usize) -> &[f32] {
        let vlen = self.stripe.lanes;
        &self.tfv[q * N_TW * vlen..(q + 1) * N_TW * vlen]
    }

    /// DD transition vector of stripe `q`.
    #[inline]
    pub fn dd(&self, q: usize) -> &[f32] {
        let vlen = self.stripe.lanes;
        let base = N_TW * self.stripe.row_len();
        &self.tfv[base + q * vlen..base + (q + 1) * vlen]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alphabet::{Alphabet, Background};
    use crate::gp::Mode;
    use crate::sample::sample_model;
    use float_cmp::assert_approx_eq;

    fn layer(m: usize) -> (GenericProfile, FloatLayer) {
        let mut rng = fastrand::Rng::with_seed(44);
        let hmm = sample_model(Alphabet::Dna, m, &mut rng);
        let bg = Background::new(Alphabet::Dna);
        let gp = GenericProfile::config(&hmm, &bg, Mode::Dual, 120).unwrap();
        let layer = FloatLayer::build(&gp, 4);
        (gp, layer)
    }

    #[test]
    fn odds_ratios_roundtrip() {
        let (gp, layer) = layer(19);
        for k in 1..=gp.m {
            let (q, z) = layer.stripe.pos(k);
            assert_approx_eq!(
                f32,
                layer.rfv_row(2)[layer.stripe.at(q, z)],
                gp.msc(k, 2).exp(),
                epsilon = 1e-6
            );
        }
    }

    #[test]
    fn padding_and_impossible_transitions_are_zero() {
        let (gp, layer) = layer(5);
        let vlen = layer.stripe.lanes;
        for q in 0..layer.stripe.q {
            for z in 0..vlen {
                if layer.stripe.node(q, z) > gp.m {
                    assert_eq!(layer.rfv_row(0)[layer.stripe.at(q, z)], 0.0);
                    assert_eq!(layer.tf7(q)[TW_MM * vlen + z], 0.0);
                    assert_eq!(layer.dd(q)[z], 0.0);
                }
            }
        }
    }

    #[test]
    fn true_length_model_in_floats() {
        let (_, mut layer) = layer(10);
        layer.set_length(200);
        let n = layer.xf[Special::N as usize];
        assert_approx_eq!(f32, n[XSC_MOVE], 3.0 / 203.0, epsilon = 1e-6);
        assert_approx_eq!(f32, n[XSC_LOOP], 200.0 / 203.0, epsilon = 1e-6);
    }
}

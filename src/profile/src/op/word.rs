use crate::gp::{GenericProfile, Special, Transition, N_SPECIALS, XSC_LOOP, XSC_MOVE};
use super::stripe::Stripe;

/// Word quantization: 1/500-bit units.
pub const SCALE_W: f32 = 500.0 / std::f32::consts::LN_2;
/// Offset the Viterbi-filter accumulator floats around.
pub const BASE_W: i16 = 12000;
/// −inf sentinel of the word layer. Saturating adds keep it absorbing.
pub const NEG_INF_W: i16 = i16::MIN;

/// Order of the seven interleaved transition vectors per stripe; the Q DD
/// vectors follow at the tail of `twv`.
pub const TW_BM: usize = 0;
pub const TW_MM: usize = 1;
pub const TW_IM: usize = 2;
pub const TW_DM: usize = 3;
pub const TW_MD: usize = 4;
pub const TW_MI: usize = 5;
pub const TW_II: usize = 6;
pub const N_TW: usize = 7;

#[inline]
pub fn wordify(sc: f32) -> i16 {
    if sc == f32::NEG_INFINITY {
        return NEG_INF_W;
    }
    (SCALE_W * sc).round().clamp(-32767.0, 32767.0) as i16
}

/// The 16-bit precision layer of an optimized profile: striped match
/// scores, interleaved transition vectors, special-state words and the
/// lazy-F exit bound.
///
/// `xw` holds `[Special][MOVE|LOOP]`; the N/J/C loops are hard-wired to 0
/// (the caller applies the −3 nat correction), keeping the accumulator
/// length-independent within word range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordLayer {
    pub stripe : Stripe,
    pub ddbound: i16,
    pub xw     : [[i16; 2]; N_SPECIALS],
    rwv        : Vec<i16>,
    twv        : Vec<i16>,
    kp         : usize,
}

impl WordLayer {
    pub fn build(gp: &GenericProfile, lanes: usize) -> WordLayer {
        let kp = gp.alphabet.kp();
        let stripe = Stripe::new(gp.m, lanes);
        let vlen = stripe.lanes;
        let rl = stripe.row_len();

        // ---- Striped match scores.
        let mut rwv = vec![NEG_INF_W; kp * rl];
        for x in 0..kp {
            for q in 0..stripe.q {
                for z in 0..vlen {
                    let k = stripe.node(q, z);
                    if k <= gp.m {
                        rwv[x * rl + stripe.at(q, z)] = wordify(gp.msc(k, x as u8));
                    }
                }
            }
        }

        // ---- Interleaved transitions: 7 vectors per stripe, then Q DD vectors.
        let mut twv = vec![NEG_INF_W; (N_TW + 1) * rl];
        for q in 0..stripe.q {
            for z in 0..vlen {
                let k = stripe.node(q, z);
                if k > gp.m {
                    continue;
                }
                let base = q * N_TW * vlen;
                twv[base + TW_BM * vlen + z] = wordify(gp.tsc(k, Transition::LM));
                twv[base + TW_MM * vlen + z] = wordify(gp.tsc(k, Transition::MM));
                twv[base + TW_IM * vlen + z] = wordify(gp.tsc(k, Transition::IM));
                twv[base + TW_DM * vlen + z] = wordify(gp.tsc(k, Transition::DM));
                twv[base + TW_MD * vlen + z] = wordify(gp.tsc(k + 1, Transition::MD));
                twv[base + TW_MI * vlen + z] = wordify(gp.tsc(k, Transition::MI));
                // A zero-cost insert loop would never terminate the DP; clamp.
                twv[base + TW_II * vlen + z] = wordify(gp.tsc(k, Transition::II)).min(-1);
                twv[N_TW * rl + q * vlen + z] = wordify(gp.tsc(k + 1, Transition::DD));
            }
        }

        // ---- Lazy-F exit bound over the interior nodes.
        let mut ddbound = NEG_INF_W;
        for k in 2..=gp.m.saturating_sub(2) {
            let b = gp.tsc(k, Transition::DD) + gp.tsc(k + 1, Transition::DM)
                - gp.tsc(k + 1, Transition::LM);
            ddbound = ddbound.max(wordify(b));
        }

        let mut layer = WordLayer {
            stripe,
            ddbound,
            xw: [[NEG_INF_W; 2]; N_SPECIALS],
            rwv,
            twv,
            kp,
        };
        layer.xw[Special::E as usize] = [
            wordify(gp.xsc(Special::E, XSC_MOVE)),
            wordify(gp.xsc(Special::E, XSC_LOOP)),
        ];
        layer.xw[Special::B as usize] = [0, NEG_INF_W];
        layer.set_length(gp.l);
        layer
    }

    /// Rewrite the length-dependent specials. The N/J/C loops stay pinned
    /// at 0 (see the type-level docs); only the moves change.
    pub fn set_length(&mut self, l: usize) {
        let pmove = wordify((3.0 / (l as f32 + 3.0)).ln());
        for s in [Special::N, Special::J, Special::C] {
            self.xw[s as usize] = [pmove, 0];
        }
    }

    /// Striped match scores for residue `x` (Q vectors).
    #[inline]
    pub fn rwv_row(&self, x: u8) -> &[i16] {
        let len = self.stripe.row_len();
        &self.rwv[x as usize * len..(x as usize + 1) * len]
    }

    /// The seven interleaved transition vectors of stripe `q`.
    #[inline]
    pub fn tw7(&self, q: usize) -> &[i16] {
        let vlen = self.stripe.lanes;
        &self.twv[q * N_TW * vlen..(q + 1) * N_TW * vlen]
    }

    /// DD transition vector of stripe `q` (from the tail block).
    #[inline]
    pub fn dd(&self, q: usize) -> &[i16] {
        let vlen = self.stripe.lanes;
        let base = N_TW * self.stripe.row_len();
        &self.twv[base + q * vlen..base + (q + 1) * vlen]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alphabet::{Alphabet, Background};
    use crate::gp::Mode;
    use crate::sample::sample_model;

    fn layer(m: usize, lanes: usize) -> (GenericProfile, WordLayer) {
        let mut rng = fastrand::Rng::with_seed(33);
        let hmm = sample_model(Alphabet::Amino, m, &mut rng);
        let bg = Background::new(Alphabet::Amino);
        let gp = GenericProfile::config(&hmm, &bg, Mode::Dual, 350).unwrap();
        let layer = WordLayer::build(&gp, lanes);
        (gp, layer)
    }

    #[test]
    fn match_scores_roundtrip() {
        let (gp, layer) = layer(23, 8);
        for k in 1..=gp.m {
            let (q, z) = layer.stripe.pos(k);
            assert_eq!(
                layer.rwv_row(5)[layer.stripe.at(q, z)],
                wordify(gp.msc(k, 5))
            );
        }
    }

    #[test]
    fn transition_interleave_matches_generic_profile() {
        let (gp, layer) = layer(23, 8);
        for k in 1..=gp.m {
            let (q, z) = layer.stripe.pos(k);
            let tw = layer.tw7(q);
            let vlen = layer.stripe.lanes;
            assert_eq!(tw[TW_BM * vlen + z], wordify(gp.tsc(k, Transition::LM)));
            assert_eq!(tw[TW_MM * vlen + z], wordify(gp.tsc(k, Transition::MM)));
            assert_eq!(tw[TW_MD * vlen + z], wordify(gp.tsc(k + 1, Transition::MD)));
            assert_eq!(layer.dd(q)[z], wordify(gp.tsc(k + 1, Transition::DD)));
        }
    }

    #[test]
    fn insert_loops_never_come_free() {
        let (gp, layer) = layer(40, 8);
        let vlen = layer.stripe.lanes;
        for q in 0..layer.stripe.q {
            let tw = layer.tw7(q);
            for z in 0..vlen {
                if layer.stripe.node(q, z) <= gp.m {
                    assert!(tw[TW_II * vlen + z] <= -1);
                }
            }
        }
    }

    #[test]
    fn special_loops_are_hardwired_to_zero() {
        let (_, layer) = layer(23, 8);
        for s in [Special::N, Special::J, Special::C] {
            assert_eq!(layer.xw[s as usize][XSC_LOOP], 0);
        }
    }

    #[test]
    fn ddbound_sentinel_for_tiny_models() {
        let (_, layer1) = layer(1, 8);
        assert_eq!(layer1.ddbound, NEG_INF_W);
        let (_, layer3) = layer(3, 8);
        assert_eq!(layer3.ddbound, NEG_INF_W);
        let (_, layer20) = layer(20, 8);
        assert!(layer20.ddbound > NEG_INF_W);
    }
}

use alphabet::DigitalSeq;
use profile::gp::Special;
use profile::op::word::{BASE_W, NEG_INF_W, SCALE_W, TW_BM, TW_DM, TW_II, TW_IM, TW_MD, TW_MI, TW_MM};
use profile::{FilterMatrix, OptimizedProfile, XSC_LOOP, XSC_MOVE};

use crate::simdvec::*;

/// Striped 16-bit Viterbi filter, local multihit, insert emissions zero.
///
/// The delete row is resolved lazily: the main loop seeds D(k) from
/// M(k−1)+MD only, one mandatory DD pass follows, and up to `lanes − 1`
/// further passes run only while a lane still improves. The whole tail is
/// skipped when `ddbound_w` proves no DD continuation can beat a fresh
/// B→M entry.
///
/// Returns raw nats with the −3 nat NN/CC/JJ compensation applied; `+inf`
/// on word-range saturation (the sequence passes outright).
pub fn viterbi_filter(dsq: &DigitalSeq, om: &OptimizedProfile, fx: &mut FilterMatrix) -> f32 {
    let word = &om.word;
    let nq = word.stripe.q;
    let lanes = word.stripe.lanes;
    let l = dsq.len();

    fx.resize_word(word.stripe.row_len());
    let (dpm, dpi, dpd) = fx.word_rows();
    dpm.fill(NEG_INF_W);
    dpi.fill(NEG_INF_W);
    dpd.fill(NEG_INF_W);

    let mut mpv = vec![NEG_INF_W; lanes];
    let mut ipv = vec![NEG_INF_W; lanes];
    let mut dvv = vec![NEG_INF_W; lanes];
    let mut sv = vec![NEG_INF_W; lanes];
    let mut xev = vec![NEG_INF_W; lanes];
    let mut dcv = vec![NEG_INF_W; lanes];
    let mut tmp = vec![NEG_INF_W; lanes];

    let xw = &word.xw;
    let xn: i16 = BASE_W; // the hard-wired NN=0 keeps N flat at base
    let mut xb: i16 = xn.saturating_add(xw[Special::N as usize][XSC_MOVE]);
    let mut xj: i16 = NEG_INF_W;
    let mut xc: i16 = NEG_INF_W;

    for i in 1..=l {
        let rsc = word.rwv_row(dsq[i]);

        shift_up(&dpm[(nq - 1) * lanes..], NEG_INF_W, &mut mpv);
        shift_up(&dpi[(nq - 1) * lanes..], NEG_INF_W, &mut ipv);
        shift_up(&dpd[(nq - 1) * lanes..], NEG_INF_W, &mut dvv);
        splat(&mut xev, NEG_INF_W);
        splat(&mut dcv, NEG_INF_W);

        for q in 0..nq {
            let tw = word.tw7(q);
            let bm = &tw[TW_BM * lanes..][..lanes];
            let mm = &tw[TW_MM * lanes..][..lanes];
            let im = &tw[TW_IM * lanes..][..lanes];
            let dm = &tw[TW_DM * lanes..][..lanes];
            let md = &tw[TW_MD * lanes..][..lanes];
            let mi = &tw[TW_MI * lanes..][..lanes];
            let ii = &tw[TW_II * lanes..][..lanes];

            for (s, &b) in sv.iter_mut().zip(bm) {
                *s = xb.saturating_add(b);
            }
            max_adds_i16(&mut sv, &mpv, mm);
            max_adds_i16(&mut sv, &ipv, im);
            max_adds_i16(&mut sv, &dvv, dm);
            adds_i16(&mut sv, &rsc[q * lanes..(q + 1) * lanes]);
            max_i16(&mut xev, &sv);

            // Previous row's cells of this stripe, before overwriting.
            mpv.copy_from_slice(&dpm[q * lanes..(q + 1) * lanes]);
            ipv.copy_from_slice(&dpi[q * lanes..(q + 1) * lanes]);
            dvv.copy_from_slice(&dpd[q * lanes..(q + 1) * lanes]);

            dpm[q * lanes..(q + 1) * lanes].copy_from_slice(&sv);
            dpd[q * lanes..(q + 1) * lanes].copy_from_slice(&dcv);
            for (d, (&s, &t)) in dcv.iter_mut().zip(sv.iter().zip(md)) {
                *d = s.saturating_add(t);
            }

            let di = &mut dpi[q * lanes..(q + 1) * lanes];
            for (z, o) in di.iter_mut().enumerate() {
                *o = mpv[z]
                    .saturating_add(mi[z])
                    .max(ipv[z].saturating_add(ii[z]));
            }
        }

        // ---- Lazy-F: one mandatory DD pass...
        shift_up(&dcv, NEG_INF_W, &mut tmp);
        dcv.copy_from_slice(&tmp);
        for q in 0..nq {
            let dd = word.dd(q);
            let dq = &mut dpd[q * lanes..(q + 1) * lanes];
            max_i16(dq, &dcv);
            for (d, (&v, &t)) in dcv.iter_mut().zip(dq.iter().zip(dd)) {
                *d = v.saturating_add(t);
            }
        }
        // ...then extra passes, unless the exit bound rules them out.
        if hmax_i16(&dcv).saturating_add(word.ddbound) > xb {
            for _pass in 1..lanes {
                shift_up(&dcv, NEG_INF_W, &mut tmp);
                dcv.copy_from_slice(&tmp);
                let mut improved = false;
                for q in 0..nq {
                    let dd = word.dd(q);
                    let dq = &mut dpd[q * lanes..(q + 1) * lanes];
                    for (o, &v) in dq.iter_mut().zip(&dcv) {
                        if v > *o {
                            *o = v;
                            improved = true;
                        }
                    }
                    for (d, &t) in dcv.iter_mut().zip(dd) {
                        *d = d.saturating_add(t);
                    }
                }
                if !improved {
                    break;
                }
            }
        }

        // ---- Specials. NN/CC/JJ loops are pinned to zero in this layer.
        let xe = hmax_i16(&xev);
        if xe >= i16::MAX {
            return f32::INFINITY;
        }
        xc = xc.max(xe.saturating_add(xw[Special::E as usize][XSC_MOVE]));
        xj = xj.max(xe.saturating_add(xw[Special::E as usize][XSC_LOOP]));
        xb = xn
            .saturating_add(xw[Special::N as usize][XSC_MOVE])
            .max(xj.saturating_add(xw[Special::J as usize][XSC_MOVE]));
    }

    if xc == NEG_INF_W {
        return f32::NEG_INFINITY;
    }
    (f32::from(xc) + f32::from(xw[Special::C as usize][XSC_MOVE]) - f32::from(BASE_W)) / SCALE_W
        - 3.0
}

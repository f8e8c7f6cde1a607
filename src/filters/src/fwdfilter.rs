use alphabet::DigitalSeq;
use profile::fx::{PLANE_D, PLANE_I, PLANE_M};
use profile::gp::Special;
use profile::op::word::{TW_BM, TW_DM, TW_II, TW_IM, TW_MD, TW_MI, TW_MM};
use profile::{FilterMatrix, OptimizedProfile, XSC_LOOP, XSC_MOVE};

use crate::simdvec::*;

/// Rows whose E mass exceeds this are renormalized; the log of the factor
/// accumulates into the returned score.
const RESCALE_THRESHOLD: f32 = 1.0e4;

/// Striped single-precision Forward in odds-ratio space, local multihit,
/// true length model. Every row (all three planes, plus the cumulative log
/// of its rescalings) persists in the filter matrix for posterior decoding.
///
/// Returns the raw Forward score in nats (`-inf` when no path exists).
pub fn forward_filter(dsq: &DigitalSeq, om: &OptimizedProfile, fx: &mut FilterMatrix) -> f32 {
    let fl = &om.float;
    let nq = fl.stripe.q;
    let lanes = fl.stripe.lanes;
    let rl = fl.stripe.row_len();
    let l = dsq.len();

    fx.resize_float(rl, l);
    fx.fwd_row_mut(0).fill(0.0);
    fx.set_fwd_cum(0, 0.0);

    let xf = &fl.xf;
    let mut xn = 1.0_f32;
    let mut xb = xf[Special::N as usize][XSC_MOVE];
    let mut xj = 0.0_f32;
    let mut xc = 0.0_f32;
    let mut totscale = 0.0_f32;

    let mut mpv = vec![0.0_f32; lanes];
    let mut ipv = vec![0.0_f32; lanes];
    let mut dpv = vec![0.0_f32; lanes];
    let mut sv = vec![0.0_f32; lanes];
    let mut dcv = vec![0.0_f32; lanes];
    let mut tmp = vec![0.0_f32; lanes];

    for i in 1..=l {
        let rsc = fl.rfv_row(dsq[i]);
        let mut xe = 0.0_f32;
        {
            let (prev, cur) = fx.fwd_row_pair(i);
            let pm = FilterMatrix::plane(prev, PLANE_M, rl);
            let pi = FilterMatrix::plane(prev, PLANE_I, rl);
            let pd = FilterMatrix::plane(prev, PLANE_D, rl);
            let (cm, rest) = cur.split_at_mut(rl);
            let (ci, cd) = rest.split_at_mut(rl);

            shift_up(&pm[(nq - 1) * lanes..], 0.0, &mut mpv);
            shift_up(&pi[(nq - 1) * lanes..], 0.0, &mut ipv);
            shift_up(&pd[(nq - 1) * lanes..], 0.0, &mut dpv);
            splat(&mut dcv, 0.0);

            for q in 0..nq {
                let tf = fl.tf7(q);
                let bm = &tf[TW_BM * lanes..][..lanes];
                let mm = &tf[TW_MM * lanes..][..lanes];
                let im = &tf[TW_IM * lanes..][..lanes];
                let dm = &tf[TW_DM * lanes..][..lanes];
                let md = &tf[TW_MD * lanes..][..lanes];
                let mi = &tf[TW_MI * lanes..][..lanes];
                let ii = &tf[TW_II * lanes..][..lanes];
                let r = &rsc[q * lanes..(q + 1) * lanes];

                for z in 0..lanes {
                    sv[z] = (xb * bm[z] + mpv[z] * mm[z] + ipv[z] * im[z] + dpv[z] * dm[z])
                        * r[z];
                    xe += sv[z];
                }
                cm[q * lanes..(q + 1) * lanes].copy_from_slice(&sv);

                let pmq = &pm[q * lanes..(q + 1) * lanes];
                let piq = &pi[q * lanes..(q + 1) * lanes];
                for z in 0..lanes {
                    ci[q * lanes + z] = pmq[z] * mi[z] + piq[z] * ii[z];
                }

                cd[q * lanes..(q + 1) * lanes].copy_from_slice(&dcv);
                for z in 0..lanes {
                    dcv[z] = sv[z] * md[z];
                }

                mpv.copy_from_slice(pmq);
                ipv.copy_from_slice(piq);
                dpv.copy_from_slice(&pd[q * lanes..(q + 1) * lanes]);
            }

            // ---- DD paths: one full pass, then increment-only passes
            //      until the wrapped mass dies out.
            shift_up(&dcv, 0.0, &mut tmp);
            dcv.copy_from_slice(&tmp);
            for q in 0..nq {
                let dd = fl.dd(q);
                let dq = &mut cd[q * lanes..(q + 1) * lanes];
                for z in 0..lanes {
                    dq[z] += dcv[z];
                    dcv[z] = dq[z] * dd[z];
                }
            }
            for _pass in 1..lanes {
                shift_up(&dcv, 0.0, &mut tmp);
                dcv.copy_from_slice(&tmp);
                if dcv.iter().all(|&v| v == 0.0) {
                    break;
                }
                for q in 0..nq {
                    let dd = fl.dd(q);
                    let dq = &mut cd[q * lanes..(q + 1) * lanes];
                    for z in 0..lanes {
                        dq[z] += dcv[z];
                        dcv[z] *= dd[z];
                    }
                }
            }

            // ---- Specials and the per-row renormalization.
            xc = xc * xf[Special::C as usize][XSC_LOOP] + xe * xf[Special::E as usize][XSC_MOVE];
            xj = xj * xf[Special::J as usize][XSC_LOOP] + xe * xf[Special::E as usize][XSC_LOOP];
            xn *= xf[Special::N as usize][XSC_LOOP];
            xb = xn * xf[Special::N as usize][XSC_MOVE] + xj * xf[Special::J as usize][XSC_MOVE];

            if xe > RESCALE_THRESHOLD {
                let inv = 1.0 / xe;
                scale_f32(cm, inv);
                scale_f32(ci, inv);
                scale_f32(cd, inv);
                xc *= inv;
                xj *= inv;
                xn *= inv;
                xb *= inv;
                totscale += xe.ln();
            }
        }
        fx.set_fwd_cum(i, totscale);
    }

    (xc * xf[Special::C as usize][XSC_MOVE]).ln() + totscale
}

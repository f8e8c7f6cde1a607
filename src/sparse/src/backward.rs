use alphabet::DigitalSeq;
use profile::gp::{GenericProfile, Special, Transition, XSC_LOOP, XSC_MOVE};
use profile::logsum::logsum;

use crate::matrix::*;

/// Sparse dual-mode Backward over the same mask as [`crate::sparse_forward`].
/// Cell (i, k) holds the log probability of emitting residues i+1..L and
/// finishing; the total (read off N at row 0) agrees with Forward within
/// logsum tolerance.
pub fn sparse_backward(dsq: &DigitalSeq, gp: &GenericProfile, sx: &mut SparseMatrix) -> f32 {
    use Transition::*;
    let mask = sx.mask_arc();
    let (m, l) = (gp.m, mask.l());
    debug_assert_eq!(dsq.len(), l);
    let neg = f32::NEG_INFINITY;

    let nnl = gp.xsc(Special::N, XSC_LOOP);
    let jjl = gp.xsc(Special::J, XSC_LOOP);
    let ccl = gp.xsc(Special::C, XSC_LOOP);
    let nbm = gp.xsc(Special::N, XSC_MOVE);
    let jbm = gp.xsc(Special::J, XSC_MOVE);
    let ejl = gp.xsc(Special::E, XSC_LOOP);
    let ecm = gp.xsc(Special::E, XSC_MOVE);
    let blm = gp.xsc(Special::B, XSC_MOVE);
    let bgm = gp.xsc(Special::B, XSC_LOOP);
    let cm_exit = gp.xsc(Special::C, XSC_MOVE);

    // Running specials, valid for the row just *below* the one being
    // computed. Initialized as if at row L.
    let mut next_row = l;
    let mut xc = cm_exit;
    let mut xj = neg;
    let mut xn = neg;

    let segs = mask.segments().to_vec();
    for seg in segs.iter().rev() {
        // ---- Silent gap rows between this segment's end and the row the
        //      running specials describe; afterwards they describe row
        //      seg.ib + 1, which is what the first row iteration reads.
        let gap = next_row.saturating_sub(seg.ib + 1) as f32;
        if gap > 0.0 {
            xc += gap * ccl;
            xj += gap * jjl;
            xn += gap * nnl;
        }

        for i in (seg.ia - 1..=seg.ib).rev() {
            // -- Specials of row i; they look one row ahead.
            let (xl, xg) = if i < l {
                let x_next = dsq[i + 1];
                let mut xl = neg;
                let mut xg = neg;
                for &ku in mask.row(i + 1) {
                    let k = ku as usize;
                    let mnext = gp.msc(k, x_next);
                    xl = logsum(xl, gp.tsc(k, LM) + mnext + sx.get(i + 1, k, ML));
                    xg = logsum(xg, gp.tsc(k, GM) + mnext + sx.get(i + 1, k, MG));
                }
                (xl, xg)
            } else {
                (neg, neg)
            };
            let xb = logsum(blm + xl, bgm + xg);
            let xc_here = if i == l { cm_exit } else { ccl + xc };
            let xj_here = logsum(jbm + xb, jjl + xj);
            let xe = logsum(ecm + xc_here, ejl + xj_here);
            let xn_here = logsum(nbm + xb, nnl + xn);
            xc = xc_here;
            xj = xj_here;
            xn = xn_here;
            sx.set_x(i, XC, xc);
            sx.set_x(i, XJ, xj);
            sx.set_x(i, XN, xn);
            sx.set_x(i, XB, xb);
            sx.set_x(i, XL, xl);
            sx.set_x(i, XG, xg);
            sx.set_x(i, XE, xe);

            // -- Main cells, columns descending (delete reads k+1 of this
            //    same row).
            if i >= seg.ia {
                let row = mask.row(i).to_vec();
                let off = mask.row_offset(i);
                for (c, &ku) in row.iter().enumerate().rev() {
                    let k = ku as usize;
                    let idx = off + c;
                    let (diag_l, diag_g) = if i < l && k < m {
                        let mnext = gp.msc(k + 1, dsq[i + 1]);
                        (
                            mnext + sx.get(i + 1, k + 1, ML),
                            mnext + sx.get(i + 1, k + 1, MG),
                        )
                    } else {
                        (neg, neg)
                    };
                    let il_next = if i < l { sx.get(i + 1, k, IL) } else { neg };
                    let ig_next = if i < l { sx.get(i + 1, k, IG) } else { neg };
                    let dl_right = sx.get(i, k + 1, DL);
                    let dg_right = sx.get(i, k + 1, DG);
                    let glocal_exit = if k == m { xe } else { neg };

                    let ml = logsum(
                        logsum(gp.tsc(k + 1, MM) + diag_l, gp.tsc(k, MI) + il_next),
                        logsum(gp.tsc(k + 1, MD) + dl_right, xe),
                    );
                    let mg = logsum(
                        logsum(gp.tsc(k + 1, MM) + diag_g, gp.tsc(k, MI) + ig_next),
                        logsum(gp.tsc(k + 1, MD) + dg_right, glocal_exit),
                    );
                    let il = logsum(
                        gp.tsc(k + 1, IM) + diag_l,
                        gp.tsc(k, II) + il_next,
                    );
                    let ig = logsum(
                        gp.tsc(k + 1, IM) + diag_g,
                        gp.tsc(k, II) + ig_next,
                    );
                    let dl = logsum(
                        gp.tsc(k + 1, DM) + diag_l,
                        gp.tsc(k + 1, DD) + dl_right,
                    );
                    let dg = logsum(
                        logsum(gp.tsc(k + 1, DM) + diag_g, gp.tsc(k + 1, DD) + dg_right),
                        glocal_exit,
                    );

                    sx.set_cell(idx, ML, ml);
                    sx.set_cell(idx, MG, mg);
                    sx.set_cell(idx, IL, il);
                    sx.set_cell(idx, IG, ig);
                    sx.set_cell(idx, DL, dl);
                    sx.set_cell(idx, DG, dg);
                }
            }
        }
        next_row = seg.ia - 1;
    }

    // ---- Leading gap down to row 0.
    let gap = next_row as f32;
    if gap > 0.0 {
        xn += gap * nnl;
    }
    if mask.segments().is_empty() {
        neg
    } else {
        xn
    }
}

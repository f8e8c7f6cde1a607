use alphabet::DigitalSeq;
use profile::gp::{GenericProfile, Special, Transition, XSC_LOOP, XSC_MOVE};
use profile::logsum::logsum;

use crate::matrix::*;

/// Sparse dual-mode Forward: the sparse Viterbi recursion with log-space
/// sums. Returns the total score in nats.
pub fn sparse_forward(dsq: &DigitalSeq, gp: &GenericProfile, sx: &mut SparseMatrix) -> f32 {
    use Transition::*;
    let mask = sx.mask_arc();
    let (m, l) = (gp.m, mask.l());
    debug_assert_eq!(dsq.len(), l);

    let nnl = gp.xsc(Special::N, XSC_LOOP);
    let jjl = gp.xsc(Special::J, XSC_LOOP);
    let ccl = gp.xsc(Special::C, XSC_LOOP);
    let nbm = gp.xsc(Special::N, XSC_MOVE);
    let jbm = gp.xsc(Special::J, XSC_MOVE);
    let ejl = gp.xsc(Special::E, XSC_LOOP);
    let ecm = gp.xsc(Special::E, XSC_MOVE);
    let blm = gp.xsc(Special::B, XSC_MOVE);
    let bgm = gp.xsc(Special::B, XSC_LOOP);

    let mut xn = 0.0_f32;
    let mut xj = f32::NEG_INFINITY;
    let mut xc = f32::NEG_INFINITY;
    let mut prev_end = 0_usize;

    for seg in mask.segments().to_vec() {
        let gap = (seg.ia - 1 - prev_end) as f32;
        if gap > 0.0 {
            xn += gap * nnl;
            xj += gap * jjl;
            xc += gap * ccl;
        }
        let ia1 = seg.ia - 1;
        let xb = logsum(xn + nbm, xj + jbm);
        sx.set_x(ia1, XE, f32::NEG_INFINITY);
        sx.set_x(ia1, XN, xn);
        sx.set_x(ia1, XJ, xj);
        sx.set_x(ia1, XB, xb);
        sx.set_x(ia1, XL, xb + blm);
        sx.set_x(ia1, XG, xb + bgm);
        sx.set_x(ia1, XC, xc);

        for i in seg.ia..=seg.ib {
            let x = dsq[i];
            let xl_prev = sx.x(i - 1, XL);
            let xg_prev = sx.x(i - 1, XG);
            let mut xe = f32::NEG_INFINITY;

            let row = mask.row(i).to_vec();
            let off = mask.row_offset(i);
            for (c, &ku) in row.iter().enumerate() {
                let k = ku as usize;
                let idx = off + c;
                let msc = gp.msc(k, x);

                let ml = msc
                    + logsum(
                        logsum(
                            sx.get(i - 1, k - 1, ML) + gp.tsc(k, MM),
                            sx.get(i - 1, k - 1, IL) + gp.tsc(k, IM),
                        ),
                        logsum(
                            sx.get(i - 1, k - 1, DL) + gp.tsc(k, DM),
                            xl_prev + gp.tsc(k, LM),
                        ),
                    );
                let mg = msc
                    + logsum(
                        logsum(
                            sx.get(i - 1, k - 1, MG) + gp.tsc(k, MM),
                            sx.get(i - 1, k - 1, IG) + gp.tsc(k, IM),
                        ),
                        logsum(
                            sx.get(i - 1, k - 1, DG) + gp.tsc(k, DM),
                            xg_prev + gp.tsc(k, GM),
                        ),
                    );
                let il = logsum(
                    sx.get(i - 1, k, ML) + gp.tsc(k, MI),
                    sx.get(i - 1, k, IL) + gp.tsc(k, II),
                );
                let ig = logsum(
                    sx.get(i - 1, k, MG) + gp.tsc(k, MI),
                    sx.get(i - 1, k, IG) + gp.tsc(k, II),
                );
                let dl = logsum(
                    sx.get(i, k - 1, ML) + gp.tsc(k, MD),
                    sx.get(i, k - 1, DL) + gp.tsc(k, DD),
                );
                let dg = logsum(
                    sx.get(i, k - 1, MG) + gp.tsc(k, MD),
                    sx.get(i, k - 1, DG) + gp.tsc(k, DD),
                );

                sx.set_cell(idx, ML, ml);
                sx.set_cell(idx, MG, mg);
                sx.set_cell(idx, IL, il);
                sx.set_cell(idx, IG, ig);
                sx.set_cell(idx, DL, dl);
                sx.set_cell(idx, DG, dg);

                xe = logsum(xe, ml);
                if k == m {
                    xe = logsum(xe, logsum(mg, dg));
                }
            }

            xn += nnl;
            xj = logsum(xj + jjl, xe + ejl);
            xc = logsum(xc + ccl, xe + ecm);
            let xb = logsum(xn + nbm, xj + jbm);
            sx.set_x(i, XE, xe);
            sx.set_x(i, XN, xn);
            sx.set_x(i, XJ, xj);
            sx.set_x(i, XB, xb);
            sx.set_x(i, XL, xb + blm);
            sx.set_x(i, XG, xb + bgm);
            sx.set_x(i, XC, xc);
        }
        prev_end = seg.ib;
    }

    let gap = (l - prev_end) as f32;
    if gap > 0.0 {
        xc += gap * ccl;
    }
    xc + gp.xsc(Special::C, XSC_MOVE)
}

use alphabet::DigitalSeq;
use profile::gp::{GenericProfile, Special, Transition, XSC_LOOP, XSC_MOVE};
use profile::logsum::{logdiff, logsum};
use profile::SparseMask;

use crate::masstrace::Envelope;
use crate::matrix::*;

/// Fast envelope score approximation, read off the sparse Forward
/// specials: the mass of paths whose last domain ends inside the envelope,
/// `logdiff(C[ibe], C[iae−1])`, completed with the trailing C run.
pub fn approx_env_score(gp: &GenericProfile, sxf: &SparseMatrix, env: &Envelope, l: usize) -> f32 {
    let c_end = sxf.x(env.ibe, XC);
    let c_before = if env.iae >= 1 { sxf.x(env.iae - 1, XC) } else { f32::NEG_INFINITY };
    if c_end <= c_before {
        return f32::NEG_INFINITY; // no ending mass accrued inside the envelope
    }
    logdiff(c_end, c_before)
        + (l - env.ibe) as f32 * gp.xsc(Special::C, XSC_LOOP)
        + gp.xsc(Special::C, XSC_MOVE)
}

/// Exact envelope score: a constrained single-domain Forward restricted to
/// the mask cells inside the envelope. Entry is allowed on any envelope
/// row (everything before it emitted by N), exit likewise (everything
/// after emitted by C); there is no J state.
pub fn sparse_env_score(
    dsq : &DigitalSeq,
    gp  : &GenericProfile,
    mask: &SparseMask,
    env : &Envelope,
    l   : usize,
) -> f32 {
    use Transition::*;
    let neg = f32::NEG_INFINITY;
    let m = gp.m;
    let width = env.kbe - env.kae + 1;

    let nnl = gp.xsc(Special::N, XSC_LOOP);
    let ccl = gp.xsc(Special::C, XSC_LOOP);
    let nbm = gp.xsc(Special::N, XSC_MOVE);
    let ecm = gp.xsc(Special::E, XSC_MOVE);
    let blm = gp.xsc(Special::B, XSC_MOVE);
    let bgm = gp.xsc(Special::B, XSC_LOOP);

    let mut prev = vec![neg; width * N_MAIN];
    let mut cur = vec![neg; width * N_MAIN];
    let at = |k: usize, s: usize| (k - env.kae) * N_MAIN + s;

    let mut xc = neg;
    for i in env.iae..=env.ibe {
        let x = dsq[i];
        // B on the previous row: everything before it emitted by N.
        let xb_prev = (i - 1) as f32 * nnl + nbm;
        let xl_prev = xb_prev + blm;
        let xg_prev = xb_prev + bgm;

        cur.fill(neg);
        let mut xe = neg;
        for &ku in mask.row(i) {
            let k = ku as usize;
            if k < env.kae || k > env.kbe {
                continue;
            }
            let msc = gp.msc(k, x);
            let pdiag = |s: usize| if k > env.kae { prev[at(k - 1, s)] } else { neg };
            let psame = |s: usize| prev[at(k, s)];
            let cleft = |s: usize, cur: &Vec<f32>| if k > env.kae { cur[at(k - 1, s)] } else { neg };

            let ml = msc
                + logsum(
                    logsum(pdiag(ML) + gp.tsc(k, MM), pdiag(IL) + gp.tsc(k, IM)),
                    logsum(pdiag(DL) + gp.tsc(k, DM), xl_prev + gp.tsc(k, LM)),
                );
            let mg = msc
                + logsum(
                    logsum(pdiag(MG) + gp.tsc(k, MM), pdiag(IG) + gp.tsc(k, IM)),
                    logsum(pdiag(DG) + gp.tsc(k, DM), xg_prev + gp.tsc(k, GM)),
                );
            let il = logsum(psame(ML) + gp.tsc(k, MI), psame(IL) + gp.tsc(k, II));
            let ig = logsum(psame(MG) + gp.tsc(k, MI), psame(IG) + gp.tsc(k, II));
            let dl = logsum(
                cleft(ML, &cur) + gp.tsc(k, MD),
                cleft(DL, &cur) + gp.tsc(k, DD),
            );
            let dg = logsum(
                cleft(MG, &cur) + gp.tsc(k, MD),
                cleft(DG, &cur) + gp.tsc(k, DD),
            );

            cur[at(k, ML)] = ml;
            cur[at(k, MG)] = mg;
            cur[at(k, IL)] = il;
            cur[at(k, IG)] = ig;
            cur[at(k, DL)] = dl;
            cur[at(k, DG)] = dg;

            xe = logsum(xe, ml);
            if k == m {
                xe = logsum(xe, logsum(mg, dg));
            }
        }

        xc = logsum(xc + ccl, xe + ecm);
        std::mem::swap(&mut prev, &mut cur);
    }

    xc + (l - env.ibe) as f32 * ccl + gp.xsc(Special::C, XSC_MOVE)
}

use log::trace;

use crate::decoding::row_mass;
use crate::matrix::*;

/// A posterior-mass envelope around one domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Envelope {
    pub iae: usize,
    pub ibe: usize,
    pub kae: usize,
    pub kbe: usize,
}

/// Expand an envelope outward from a domain anchor over the decoded
/// posterior matrix. Each edge stops as soon as the posterior mass left
/// outside the bracket drops below `epsilon`; the row walk is bounded by
/// the inter-domain window `[wa, wb]`, the column walk by the model.
pub fn mass_trace(
    sxd     : &SparseMatrix,
    anchor_i: usize,
    anchor_k: usize,
    wa      : usize,
    wb      : usize,
    epsilon : f32,
) -> Envelope {
    let mask = sxd.mask_arc();
    let m = mask.m();

    // ---- Row bracket: trace mass up, then down.
    let mut iae = anchor_i;
    let mut above: f32 = (wa..anchor_i).map(|i| row_mass(sxd, i)).sum();
    while above >= epsilon && iae > wa {
        iae -= 1;
        above -= row_mass(sxd, iae);
    }
    let mut ibe = anchor_i;
    let mut below: f32 = (anchor_i + 1..=wb).map(|i| row_mass(sxd, i)).sum();
    while below >= epsilon && ibe < wb {
        ibe += 1;
        below -= row_mass(sxd, ibe);
    }

    // ---- Column bracket over the row bracket, on match mass only.
    let mut colmass = vec![0.0_f32; m + 2];
    for i in iae..=ibe {
        let off = mask.row_offset(i);
        for (c, &ku) in mask.row(i).iter().enumerate() {
            colmass[ku as usize] += sxd.cell(off + c, ML) + sxd.cell(off + c, MG);
        }
    }
    let mut kae = anchor_k;
    let mut left: f32 = colmass[1..anchor_k].iter().sum();
    while left >= epsilon && kae > 1 {
        kae -= 1;
        left -= colmass[kae];
    }
    let mut kbe = anchor_k;
    let mut right: f32 = colmass[anchor_k + 1..=m].iter().sum();
    while right >= epsilon && kbe < m {
        kbe += 1;
        right -= colmass[kbe];
    }

    trace!("mass trace from ({anchor_i},{anchor_k}): rows {iae}..={ibe}, cols {kae}..={kbe}");
    Envelope { iae, ibe, kae, kbe }
}

use crate::matrix::*;

/// Posterior-decode a Forward/Backward pair over their shared mask into
/// `sxd`: every main cell and stored special becomes
/// `exp(F + B − F_total)`.
///
/// `sxd` must be re-initialized on the same mask beforehand.
pub fn sparse_decoding(sxf: &SparseMatrix, sxb: &SparseMatrix, total: f32, sxd: &mut SparseMatrix) {
    let mask = sxd.mask_arc();
    debug_assert_eq!(mask.n_cells(), sxf.mask().n_cells());

    for seg in mask.segments() {
        for i in (seg.ia - 1)..=seg.ib {
            for s in 0..N_X {
                let p = (sxf.x(i, s) + sxb.x(i, s) - total).exp();
                sxd.set_x(i, s, p.min(1.0 + 1e-4));
            }
            if i < seg.ia {
                continue;
            }
            let off = mask.row_offset(i);
            for c in 0..mask.row(i).len() {
                let idx = off + c;
                for s in 0..N_MAIN {
                    let p = (sxf.cell(idx, s) + sxb.cell(idx, s) - total).exp();
                    sxd.set_cell(idx, s, p.min(1.0 + 1e-4));
                }
            }
        }
    }
}

/// Expected number of domains: the summed posterior usage of the B state.
pub fn expected_domains(sxd: &SparseMatrix) -> f32 {
    let mask = sxd.mask_arc();
    mask.segments()
        .iter()
        .flat_map(|seg| (seg.ia - 1)..=seg.ib)
        .map(|i| sxd.x(i, XB))
        .filter(|p| p.is_finite())
        .sum()
}

/// Emission mass of row `i`: summed match+insert posterior, the quantity
/// the mass trace walks over.
pub fn row_mass(sxd: &SparseMatrix, i: usize) -> f32 {
    let mask = sxd.mask_arc();
    let off = mask.row_offset(i);
    (0..mask.row(i).len())
        .map(|c| {
            let idx = off + c;
            sxd.cell(idx, ML) + sxd.cell(idx, MG) + sxd.cell(idx, IL) + sxd.cell(idx, IG)
        })
        .sum()
}

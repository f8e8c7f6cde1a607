use alphabet::{Alphabet, Background};

use crate::ProfileError;

/// Probability-space transition indices of [`CoreModel::t`], all seven
/// transitions leaving a node.
pub mod t {
    pub const MM: usize = 0;
    pub const MI: usize = 1;
    pub const MD: usize = 2;
    pub const IM: usize = 3;
    pub const II: usize = 4;
    pub const DM: usize = 5;
    pub const DD: usize = 6;
}
pub const N_CORE_TRANSITIONS: usize = 7;

/// The underlying probability-space HMM a search profile is configured
/// from: per-node match emission distributions and per-node transition
/// distributions. Node 0 is the begin boundary (its `MM`/`MD` rows are the
/// `B→M1`/`B→D1` probabilities, its emissions unused); node M is forced to
/// exit (`MM=1`).
///
/// # Fields
/// - `alphabet`: residue alphabet of the emissions.
/// - `m`       : number of match nodes.
/// - `mat`     : `(m+1) × K` match emission probabilities.
/// - `t`       : `(m+1) × 7` transition probabilities, [`t`] order.
#[derive(Debug, Clone)]
pub struct CoreModel {
    pub alphabet: Alphabet,
    pub m       : usize,
    pub mat     : Vec<Vec<f32>>,
    pub t       : Vec<[f32; N_CORE_TRANSITIONS]>,
}

impl CoreModel {
    /// Validate the probability tables: each emission row and each of the
    /// three transition distributions per node must sum to ~1.
    pub fn validate(&self) -> Result<(), ProfileError> {
        const TOL: f32 = 1e-3;
        if self.m == 0 {
            return Err(ProfileError::InvalidProfile("model length M=0".to_string()));
        }
        if self.mat.len() != self.m + 1 || self.t.len() != self.m + 1 {
            return Err(ProfileError::InvalidProfile(format!(
                "table sizes ({}, {}) do not match M={}",
                self.mat.len(), self.t.len(), self.m
            )));
        }
        for k in 1..=self.m {
            let esum: f32 = self.mat[k].iter().sum();
            if (esum - 1.0).abs() > TOL {
                return Err(ProfileError::InvalidProfile(format!(
                    "match emissions of node {k} sum to {esum}"
                )));
            }
        }
        for k in 0..=self.m {
            let tm = self.t[k][t::MM] + self.t[k][t::MI] + self.t[k][t::MD];
            let ti = self.t[k][t::IM] + self.t[k][t::II];
            let td = self.t[k][t::DM] + self.t[k][t::DD];
            for (state, sum) in [("M", tm), ("I", ti), ("D", td)] {
                if (sum - 1.0).abs() > TOL {
                    return Err(ProfileError::InvalidProfile(format!(
                        "{state}-state transitions of node {k} sum to {sum}"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Mean match emission distribution, background-blended; carried on the
    /// configured profile as its composition.
    pub fn composition(&self, bg: &Background) -> Vec<f32> {
        let k_can = self.alphabet.k();
        let mut comp = vec![0.0_f32; k_can];
        for k in 1..=self.m {
            for (x, c) in comp.iter_mut().enumerate() {
                *c += self.mat[k][x];
            }
        }
        for (x, c) in comp.iter_mut().enumerate() {
            *c = 0.5 * (*c / self.m as f32 + bg.freq(x as u8));
        }
        comp
    }
}

use std::fmt;

use alphabet::{Alphabet, Background};

use crate::model::{t as ct, CoreModel};
use crate::stats::EvalueParams;
use crate::ProfileError;

/// Profile transition-score indices. All main-state transitions are stored
/// by *destination* node: `tsc(k, MM)` is the score of `M(k−1) → M(k)`,
/// `tsc(k, MI)`/`tsc(k, II)` the insert transitions of node k itself,
/// `LM`/`GM` the local and (wing-retracted) glocal entries into `M(k)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum Transition {
    MM = 0,
    IM = 1,
    DM = 2,
    MD = 3,
    MI = 4,
    II = 5,
    DD = 6,
    LM = 7,
    GM = 8,
}
pub const N_TRANSITIONS: usize = 9;

/// Special-state row indices of [`GenericProfile::xsc`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum Special {
    E = 0,
    N = 1,
    J = 2,
    C = 3,
    B = 4,
}
pub const N_SPECIALS: usize = 5;
pub const XSC_MOVE: usize = 0;
pub const XSC_LOOP: usize = 1;

/// Alignment mode of the configured profile. Multihit throughout; the mode
/// decides how the B state splits between local (L) and glocal (G) entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Local,
    Glocal,
    Dual,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local  => write!(f, "local-multihit"),
            Self::Glocal => write!(f, "glocal-multihit"),
            Self::Dual   => write!(f, "dual-multihit"),
        }
    }
}

/// A search profile in log-odds space, configured from a [`CoreModel`] and
/// a [`Background`]. Immutable once built, except for the length model
/// ([`Self::set_length`]).
///
/// # Fields
/// - `msc` : `(m+1) × Kp` match emission log-odds, degeneracies filled with
///           background-weighted expected scores. Node 0 is −inf.
/// - `tsc` : `(m+2) × 9` transition scores, [`Transition`] order; rows 0 and
///           m+1 are −inf so k±1 reads never need bounds checks.
/// - `xsc` : special-state transitions, `[Special][MOVE|LOOP]`.
#[derive(Debug, Clone)]
pub struct GenericProfile {
    pub alphabet   : Alphabet,
    pub m          : usize,
    pub l          : usize,
    pub mode       : Mode,
    msc            : Vec<f32>,
    tsc            : Vec<f32>,
    pub xsc        : [[f32; 2]; N_SPECIALS],
    pub evparams   : EvalueParams,
    pub composition: Vec<f32>,
    pub name       : String,
}

impl GenericProfile {
    /// Configure a search profile.
    ///
    /// # Arguments
    /// - `hmm` : the probability-space core model.
    /// - `bg`  : background frequencies for the log-odds conversion.
    /// - `mode`: alignment mode (B→L / B→G split).
    /// - `l`   : initial target length for the length model (500 is the
    ///           conventional pre-configuration).
    ///
    /// # Errors
    /// Returns `InvalidProfile` if the core model's probability tables do
    /// not validate.
    pub fn config(hmm: &CoreModel, bg: &Background, mode: Mode, l: usize) -> Result<GenericProfile, ProfileError> {
        hmm.validate()?;
        let m  = hmm.m;
        let kp = hmm.alphabet.kp();

        // ---- Match emission log-odds, canonical first.
        let mut msc = vec![f32::NEG_INFINITY; (m + 1) * kp];
        for k in 1..=m {
            for x in 0..hmm.alphabet.k() {
                msc[k * kp + x] = (hmm.mat[k][x] / bg.freq(x as u8)).ln();
            }
            // Degeneracies score as the background-weighted mean of their members.
            for x in hmm.alphabet.k()..kp {
                let members = hmm.alphabet.degeneracy(x as u8);
                let wsum: f32 = members.iter().map(|&c| bg.freq(c)).sum();
                msc[k * kp + x] = members.iter()
                    .map(|&c| bg.freq(c) * msc[k * kp + c as usize])
                    .sum::<f32>() / wsum;
            }
        }

        // ---- Transition scores.
        let mut tsc = vec![f32::NEG_INFINITY; (m + 2) * N_TRANSITIONS];
        let lm_entry = (2.0 / (m as f32 * (m as f32 + 1.0))).ln();
        let mut set = |k: usize, tr: Transition, sc: f32| tsc[k * N_TRANSITIONS + tr as usize] = sc;
        for k in 1..=m {
            if k >= 2 {
                set(k, Transition::MM, hmm.t[k - 1][ct::MM].ln());
                set(k, Transition::IM, hmm.t[k - 1][ct::IM].ln());
                set(k, Transition::DM, hmm.t[k - 1][ct::DM].ln());
                set(k, Transition::MD, hmm.t[k - 1][ct::MD].ln());
                set(k, Transition::DD, hmm.t[k - 1][ct::DD].ln());
            }
            set(k, Transition::MI, hmm.t[k][ct::MI].ln());
            set(k, Transition::II, hmm.t[k][ct::II].ln());
            set(k, Transition::LM, lm_entry);
        }
        // Glocal entries, wing retraction folded in:
        // GM[k] = ln t(G→D1) + Σ ln t(Dj→Dj+1) + ln t(D(k−1)→Mk).
        set(1, Transition::GM, hmm.t[0][ct::MM].ln());
        let mut acc = hmm.t[0][ct::MD].ln();
        for k in 2..=m {
            set(k, Transition::GM, acc + hmm.t[k - 1][ct::DM].ln());
            acc += hmm.t[k - 1][ct::DD].ln();
        }

        let mut gp = GenericProfile {
            alphabet: hmm.alphabet,
            m,
            l: 0,
            mode,
            msc,
            tsc,
            xsc: [[f32::NEG_INFINITY; 2]; N_SPECIALS],
            evparams: EvalueParams::default(),
            composition: hmm.composition(bg),
            name: format!("model-m{m}"),
        };

        // ---- Mode-dependent specials.
        gp.xsc[Special::E as usize] = [0.5_f32.ln(), 0.5_f32.ln()]; // E→C, E→J (multihit)
        gp.xsc[Special::B as usize] = match mode {
            Mode::Local  => [0.0, f32::NEG_INFINITY],
            Mode::Glocal => [f32::NEG_INFINITY, 0.0],
            Mode::Dual   => [0.5_f32.ln(), 0.5_f32.ln()],
        };
        gp.set_length(l);
        Ok(gp)
    }

    /// Match emission log-odds of residue `x` at node `k`.
    #[inline]
    pub fn msc(&self, k: usize, x: u8) -> f32 {
        debug_assert!(k <= self.m && (x as usize) < self.alphabet.kp());
        self.msc[k * self.alphabet.kp() + x as usize]
    }

    /// Transition score into/at node `k`. Valid for `k` in `[0, m+1]`.
    #[inline]
    pub fn tsc(&self, k: usize, tr: Transition) -> f32 {
        debug_assert!(k <= self.m + 1);
        self.tsc[k * N_TRANSITIONS + tr as usize]
    }

    #[inline]
    pub fn xsc(&self, s: Special, d: usize) -> f32 {
        self.xsc[s as usize][d]
    }

    /// Rewrite the length-dependent special transitions for a target of
    /// length `l`. The striped layers of an optimized profile derived from
    /// this one must be reconfigured separately.
    pub fn set_length(&mut self, l: usize) {
        let lf = l as f32;
        let pmove = (3.0 / (lf + 3.0)).ln();
        let ploop = (lf / (lf + 3.0)).ln();
        for s in [Special::N, Special::J, Special::C] {
            self.xsc[s as usize] = [pmove, ploop];
        }
        self.l = l;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::sample_model;
    use float_cmp::assert_approx_eq;

    fn fixture(m: usize) -> (CoreModel, Background) {
        let mut rng = fastrand::Rng::with_seed(11);
        let hmm = sample_model(Alphabet::Dna, m, &mut rng);
        let bg = Background::new(Alphabet::Dna);
        (hmm, bg)
    }

    #[test]
    fn config_matches_core_probabilities() {
        let (hmm, bg) = fixture(10);
        let gp = GenericProfile::config(&hmm, &bg, Mode::Dual, 500).unwrap();
        assert_approx_eq!(f32, gp.msc(3, 0), (hmm.mat[3][0] / 0.25).ln(), epsilon = 1e-6);
        assert_approx_eq!(f32, gp.tsc(4, Transition::MM), hmm.t[3][ct::MM].ln(), epsilon = 1e-6);
        assert_approx_eq!(f32, gp.tsc(4, Transition::MI), hmm.t[4][ct::MI].ln(), epsilon = 1e-6);
        // Boundary rows stay -inf.
        assert_eq!(gp.tsc(0, Transition::MM), f32::NEG_INFINITY);
        assert_eq!(gp.tsc(gp.m + 1, Transition::DD), f32::NEG_INFINITY);
        assert_eq!(gp.tsc(1, Transition::MM), f32::NEG_INFINITY);
    }

    #[test]
    fn wing_retracted_entries() {
        let (hmm, bg) = fixture(6);
        let gp = GenericProfile::config(&hmm, &bg, Mode::Glocal, 500).unwrap();
        assert_approx_eq!(f32, gp.tsc(1, Transition::GM), hmm.t[0][ct::MM].ln(), epsilon = 1e-6);
        let want = hmm.t[0][ct::MD].ln() + hmm.t[1][ct::DD].ln() + hmm.t[2][ct::DM].ln();
        assert_approx_eq!(f32, gp.tsc(3, Transition::GM), want, epsilon = 1e-5);
    }

    #[test]
    fn degenerate_scores_average_members() {
        let (hmm, bg) = fixture(5);
        let gp = GenericProfile::config(&hmm, &bg, Mode::Dual, 500).unwrap();
        // DNA 'R' = A|G with equal background weights.
        let r = Alphabet::Dna.encode('R').unwrap();
        let want = 0.5 * (gp.msc(2, 0) + gp.msc(2, 2));
        assert_approx_eq!(f32, gp.msc(2, r), want, epsilon = 1e-5);
    }

    #[test]
    fn length_model() {
        let (hmm, bg) = fixture(5);
        let mut gp = GenericProfile::config(&hmm, &bg, Mode::Dual, 500).unwrap();
        gp.set_length(100);
        assert_approx_eq!(f32, gp.xsc(Special::N, XSC_LOOP), (100.0_f32 / 103.0).ln(), epsilon = 1e-6);
        assert_approx_eq!(f32, gp.xsc(Special::C, XSC_MOVE), (3.0_f32 / 103.0).ln(), epsilon = 1e-6);
        // L=0: loops impossible, moves free.
        gp.set_length(0);
        assert_eq!(gp.xsc(Special::N, XSC_LOOP), f32::NEG_INFINITY);
        assert_approx_eq!(f32, gp.xsc(Special::N, XSC_MOVE), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn modes_split_b_state() {
        let (hmm, bg) = fixture(5);
        let local = GenericProfile::config(&hmm, &bg, Mode::Local, 500).unwrap();
        assert_eq!(local.xsc(Special::B, XSC_MOVE), 0.0);
        assert_eq!(local.xsc(Special::B, XSC_LOOP), f32::NEG_INFINITY);
        let dual = GenericProfile::config(&hmm, &bg, Mode::Dual, 500).unwrap();
        assert_approx_eq!(f32, dual.xsc(Special::B, XSC_MOVE), 0.5_f32.ln(), epsilon = 1e-6);
    }
}

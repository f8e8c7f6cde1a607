use std::fmt;

use alphabet::DigitalSeq;

use crate::gp::{GenericProfile, Special, Transition, XSC_LOOP, XSC_MOVE};
use crate::ProfileError;

/// States a traceback can visit. `S`/`T` bracket the path; `N`/`J`/`C`
/// emit on their self-loops only; deletes never emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceState {
    S,
    N,
    B,
    L,
    G,
    ML,
    MG,
    IL,
    IG,
    DL,
    DG,
    E,
    J,
    C,
    T,
}

impl TraceState {
    pub fn is_main(self) -> bool {
        matches!(self, Self::ML | Self::MG | Self::IL | Self::IG | Self::DL | Self::DG)
    }

    pub fn is_match(self) -> bool {
        matches!(self, Self::ML | Self::MG)
    }
}

impl fmt::Display for TraceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::S => "S", Self::N => "N", Self::B => "B", Self::L => "L", Self::G => "G",
            Self::ML => "ML", Self::MG => "MG", Self::IL => "IL", Self::IG => "IG",
            Self::DL => "DL", Self::DG => "DG", Self::E => "E", Self::J => "J",
            Self::C => "C", Self::T => "T",
        };
        write!(f, "{s}")
    }
}

/// One aligned step of a path: `(state, node, position)`. `k` is 0 for
/// non-main states; `i` is 0 for non-emitting steps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TraceStep {
    pub st: TraceState,
    pub k : usize,
    pub i : usize,
    pub pp: f32,
}

/// A state path through the profile, with optional per-step posterior
/// probabilities attached after decoding.
#[derive(Debug, Clone, Default)]
pub struct Trace {
    steps: Vec<TraceStep>,
}

/// A `B..E` region of a trace, with its sequence and model coordinates.
///
/// # Fields
/// - `sqfrom`/`sqto`  : first/last emitted target position of the domain.
/// - `hmmfrom`/`hmmto`: first/last match node used.
/// - `anchor_i`/`anchor_k`: highest-posterior match cell (set by decoding).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Domain {
    pub sqfrom  : usize,
    pub sqto    : usize,
    pub hmmfrom : usize,
    pub hmmto   : usize,
    pub anchor_i: usize,
    pub anchor_k: usize,
}

impl Trace {
    pub fn new() -> Trace {
        Trace { steps: Vec::new() }
    }

    pub fn push(&mut self, st: TraceState, k: usize, i: usize) {
        self.steps.push(TraceStep { st, k, i, pp: 0.0 });
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn steps(&self) -> &[TraceStep] {
        &self.steps
    }

    pub fn step(&self, z: usize) -> &TraceStep {
        &self.steps[z]
    }

    pub fn set_pp(&mut self, z: usize, pp: f32) {
        self.steps[z].pp = pp;
    }

    pub fn pop(&mut self) -> Option<TraceStep> {
        self.steps.pop()
    }

    pub fn clear(&mut self) {
        self.steps.clear();
    }

    /// Score the path under a profile, in nats. Glocal entries through a
    /// leading delete chain are charged their wing-retracted `GM` score at
    /// the first match node, mirroring how the DP recursions account them.
    pub fn score(&self, gp: &GenericProfile, dsq: &DigitalSeq) -> Result<f32, ProfileError> {
        use TraceState::*;
        let mut sc = 0.0_f32;
        let mut wing = false; // inside a G -> DG1 .. DGk-1 entry chain
        for w in self.steps.windows(2) {
            let (p, c) = (w[0], w[1]);
            let tr = match (p.st, c.st) {
                (S, N) => 0.0,
                (N, N) => gp.xsc(Special::N, XSC_LOOP),
                (N, B) => gp.xsc(Special::N, XSC_MOVE),
                (B, L) => gp.xsc(Special::B, XSC_MOVE),
                (B, G) => gp.xsc(Special::B, XSC_LOOP),
                (L, ML) => gp.tsc(c.k, Transition::LM),
                (G, MG) => gp.tsc(1, Transition::GM),
                (G, DG) => {
                    wing = true;
                    0.0
                }
                (DG, DG) if wing => 0.0,
                (DG, MG) if wing => {
                    wing = false;
                    gp.tsc(c.k, Transition::GM)
                }
                (ML, ML) | (MG, MG) => gp.tsc(c.k, Transition::MM),
                (IL, ML) | (IG, MG) => gp.tsc(c.k, Transition::IM),
                (DL, ML) | (DG, MG) => gp.tsc(c.k, Transition::DM),
                (ML, IL) | (MG, IG) => gp.tsc(c.k, Transition::MI),
                (IL, IL) | (IG, IG) => gp.tsc(c.k, Transition::II),
                (ML, DL) | (MG, DG) => gp.tsc(c.k, Transition::MD),
                (DL, DL) | (DG, DG) => gp.tsc(c.k, Transition::DD),
                (ML, E) => 0.0,           // local exit, any node
                (MG | DG, E) => 0.0,      // glocal exit, node M only (validated)
                (E, J) => gp.xsc(Special::E, XSC_LOOP),
                (E, C) => gp.xsc(Special::E, XSC_MOVE),
                (J, J) => gp.xsc(Special::J, XSC_LOOP),
                (J, B) => gp.xsc(Special::J, XSC_MOVE),
                (C, C) => gp.xsc(Special::C, XSC_LOOP),
                (C, T) => gp.xsc(Special::C, XSC_MOVE),
                (a, b) => {
                    return Err(ProfileError::TraceInvalid(format!(
                        "illegal transition {a}->{b}"
                    )))
                }
            };
            sc += tr;
            if c.st.is_match() {
                sc += gp.msc(c.k, dsq[c.i]);
            }
        }
        Ok(sc)
    }

    /// Structural validation: bracketing, residue coverage, node and
    /// position bookkeeping. Test and debug aid; a failure here on an
    /// internally produced trace is a bug in the producer.
    pub fn validate(&self, gp: &GenericProfile, dsq: &DigitalSeq) -> Result<(), ProfileError> {
        use TraceState::*;
        let fail = |msg: String| Err(ProfileError::TraceInvalid(msg));
        if self.steps.is_empty() {
            return Ok(()); // an empty trace means "no alignment"
        }
        if self.steps[0].st != S || self.steps[self.steps.len() - 1].st != T {
            return fail("trace not bracketed by S..T".to_string());
        }
        let mut next_i = 1usize;
        for (z, step) in self.steps.iter().enumerate() {
            let emits = match step.st {
                ML | MG | IL | IG => true,
                N | J | C => step.i != 0, // loop emissions only
                _ => false,
            };
            if emits {
                if step.i != next_i {
                    return fail(format!("step {z} emits i={} (expected {next_i})", step.i));
                }
                next_i += 1;
            } else if step.i != 0 {
                return fail(format!("non-emitting step {z} carries i={}", step.i));
            }
            if step.st.is_main() {
                if step.k == 0 || step.k > gp.m {
                    return fail(format!("step {z} carries node k={} (M={})", step.k, gp.m));
                }
            } else if step.k != 0 {
                return fail(format!("special step {z} carries node k={}", step.k));
            }
            // Glocal exits leave from node M only.
            if matches!(step.st, MG | DG)
                && z + 1 < self.steps.len()
                && self.steps[z + 1].st == E
                && step.k != gp.m
            {
                return fail(format!("glocal exit from node {} != M", step.k));
            }
        }
        if next_i != dsq.len() + 1 {
            return fail(format!("trace emits {} residues, sequence has {}", next_i - 1, dsq.len()));
        }
        // The scorer doubles as the transition-legality check.
        self.score(gp, dsq).map(|_| ())
    }

    /// Index the `B..E` regions of the trace into domains.
    pub fn index_domains(&self) -> Vec<Domain> {
        use TraceState::*;
        let mut domains = Vec::new();
        let mut cur: Option<Domain> = None;
        for step in &self.steps {
            match step.st {
                B => {
                    cur = Some(Domain {
                        sqfrom: 0, sqto: 0, hmmfrom: 0, hmmto: 0, anchor_i: 0, anchor_k: 0,
                    });
                }
                ML | MG | IL | IG => {
                    if let Some(d) = cur.as_mut() {
                        if d.sqfrom == 0 {
                            d.sqfrom = step.i;
                        }
                        d.sqto = step.i;
                        if step.st.is_match() {
                            if d.hmmfrom == 0 {
                                d.hmmfrom = step.k;
                            }
                            d.hmmto = step.k;
                        }
                    }
                }
                E => {
                    if let Some(d) = cur.take() {
                        if d.sqfrom != 0 {
                            domains.push(d);
                        }
                    }
                }
                _ => (),
            }
        }
        domains
    }

    /// Index of the step aligning match node `k` to position `i`, if any.
    pub fn find_match_step(&self, i: usize, k: usize) -> Option<usize> {
        self.steps
            .iter()
            .position(|s| s.st.is_match() && s.i == i && s.k == k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alphabet::{Alphabet, Background};
    use crate::gp::Mode;
    use crate::sample::sample_model;

    fn toy() -> (GenericProfile, DigitalSeq, Trace) {
        let mut rng = fastrand::Rng::with_seed(3);
        let hmm = sample_model(Alphabet::Dna, 3, &mut rng);
        let bg = Background::new(Alphabet::Dna);
        let gp = GenericProfile::config(&hmm, &bg, Mode::Dual, 4).unwrap();
        let dsq = DigitalSeq::from_text(Alphabet::Dna, "ACGT").unwrap();

        // N -> B -> L -> ML1 ML2 ML3 -> E -> C (emitting once) -> T
        let mut tr = Trace::new();
        tr.push(TraceState::S, 0, 0);
        tr.push(TraceState::N, 0, 0);
        tr.push(TraceState::N, 0, 1);
        tr.push(TraceState::B, 0, 0);
        tr.push(TraceState::L, 0, 0);
        tr.push(TraceState::ML, 1, 2);
        tr.push(TraceState::ML, 2, 3);
        tr.push(TraceState::ML, 3, 4);
        tr.push(TraceState::E, 0, 0);
        tr.push(TraceState::C, 0, 0);
        tr.push(TraceState::T, 0, 0);
        (gp, dsq, tr)
    }

    #[test]
    fn toy_trace_validates_and_scores() {
        let (gp, dsq, tr) = toy();
        tr.validate(&gp, &dsq).unwrap();
        let sc = tr.score(&gp, &dsq).unwrap();
        let want = gp.xsc(Special::N, XSC_LOOP)
            + gp.xsc(Special::N, XSC_MOVE)
            + gp.xsc(Special::B, XSC_MOVE)
            + gp.tsc(1, Transition::LM)
            + gp.msc(1, dsq[2])
            + gp.tsc(2, Transition::MM)
            + gp.msc(2, dsq[3])
            + gp.tsc(3, Transition::MM)
            + gp.msc(3, dsq[4])
            + gp.xsc(Special::E, XSC_MOVE)
            + gp.xsc(Special::C, XSC_MOVE);
        assert!((sc - want).abs() < 1e-5, "got {sc}, want {want}");
    }

    #[test]
    fn domain_indexing() {
        let (_, _, tr) = toy();
        let doms = tr.index_domains();
        assert_eq!(doms.len(), 1);
        assert_eq!((doms[0].sqfrom, doms[0].sqto), (2, 4));
        assert_eq!((doms[0].hmmfrom, doms[0].hmmto), (1, 3));
    }

    #[test]
    fn bad_traces_are_rejected() {
        let (gp, dsq, mut tr) = toy();
        // Skip a residue.
        tr.steps[6].i = 4;
        assert!(tr.validate(&gp, &dsq).is_err());

        let (gp, dsq, mut tr) = toy();
        // Illegal transition: L directly to E.
        tr.steps[5] = TraceStep { st: TraceState::E, k: 0, i: 0, pp: 0.0 };
        assert!(tr.validate(&gp, &dsq).is_err());
    }
}

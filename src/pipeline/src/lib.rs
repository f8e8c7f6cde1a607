use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, error, info, trace};

use alphabet::{Background, DigitalSeq};
use filters::{backward_filter, forward_filter, msv_filter, viterbi_filter};
use profile::op::word::TW_II;
use profile::trace::TraceState;
use profile::{FilterMatrix, GenericProfile, OptimizedProfile};
use sparse::matrix as sp;
use sparse::{
    approx_env_score, expected_domains, mass_trace, sparse_backward, sparse_decoding,
    sparse_env_score, sparse_forward, sparse_viterbi, sparse_viterbi_trace, SparseMatrix,
};

mod config;
pub use config::PipelineConfig;

mod record;
pub use record::DomainRecord;

mod error;
pub use error::PipelineError;

/// Cascade stages, in gate order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Msv,
    Viterbi,
    Forward,
    Backward,
    Sparse,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Msv      => write!(f, "MSV"),
            Self::Viterbi  => write!(f, "ViterbiFilter"),
            Self::Forward  => write!(f, "ForwardFilter"),
            Self::Backward => write!(f, "BackwardFilter"),
            Self::Sparse   => write!(f, "SparseDP"),
        }
    }
}

/// Terminal state of one sequence: either it missed a gate or it produced
/// a (possibly empty) domain report.
///
/// `pvalue` is the significance the failed gate computed. Only the scored
/// gates (MSV, ViterbiFilter, ForwardFilter) have one; a Backward-stage
/// skip means the posterior mask came back empty, which carries no
/// P-value of its own, so it reports `None`.
#[derive(Debug, Clone, PartialEq)]
pub enum SequenceOutcome {
    Skipped { stage: Stage, pvalue: Option<f64> },
    Reported(Vec<DomainRecord>),
}

/// Running tallies over one pipeline's lifetime; logged when a run ends.
#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineStats {
    pub n_sequences: u64,
    pub n_past_msv : u64,
    pub n_past_vit : u64,
    pub n_past_fwd : u64,
    pub n_reported : u64,
}

/// One worker's acceleration pipeline: the profile pair, the reusable
/// scratch, and the gate policy. Workers never share mutable state; shard
/// the sequence stream and give each worker its own `Pipeline`.
#[derive(Debug)]
pub struct Pipeline {
    pub config: PipelineConfig,
    pub stats : PipelineStats,
    gp        : GenericProfile,
    om        : OptimizedProfile,
    bg        : Background,
    fx        : FilterMatrix,
    sxv       : SparseMatrix,
    sxf       : SparseMatrix,
    sxb       : SparseMatrix,
    sxd       : SparseMatrix,
}

impl Pipeline {
    /// Assemble a worker pipeline.
    ///
    /// # Errors
    /// `InsertLoopUnclamped` if the word layer carries a free insert loop
    /// and the configuration demands the clamp.
    pub fn new(
        gp    : GenericProfile,
        om    : OptimizedProfile,
        bg    : Background,
        config: PipelineConfig,
    ) -> Result<Pipeline, PipelineError> {
        if config.require_vit_ii_negative {
            let stripe = om.word.stripe;
            for q in 0..stripe.q {
                let ii = &om.word.tw7(q)[TW_II * stripe.lanes..(TW_II + 1) * stripe.lanes];
                for z in 0..stripe.lanes {
                    if stripe.node(q, z) <= om.m && ii[z] > -1 {
                        return Err(PipelineError::InsertLoopUnclamped);
                    }
                }
            }
        }
        Ok(Pipeline {
            config,
            stats: PipelineStats::default(),
            gp,
            om,
            bg,
            fx: FilterMatrix::new(),
            sxv: SparseMatrix::new(),
            sxf: SparseMatrix::new(),
            sxb: SparseMatrix::new(),
            sxd: SparseMatrix::new(),
        })
    }

    /// Run one sequence through the cascade. Scratch is recycled, not
    /// freed; the outcome says where the sequence stopped.
    pub fn process(&mut self, name: &str, dsq: &DigitalSeq) -> Result<SequenceOutcome, PipelineError> {
        if dsq.alphabet != self.gp.alphabet {
            return Err(PipelineError::AlphabetMismatch(name.to_string()));
        }
        let l = dsq.len();
        self.stats.n_sequences += 1;

        // ---- 1. Length models and the null score.
        self.bg.set_length(l);
        self.gp.set_length(l);
        self.om.reconfig_length(l);
        self.fx.reset();
        let null = self.bg.null1(l);
        let to_bits = |raw: f32| (raw - null) / std::f32::consts::LN_2;

        // ---- 2. MSV gate.
        let msv_bits = to_bits(msv_filter(dsq, &self.om, &mut self.fx));
        let p = self.gp.evparams.msv_pvalue(msv_bits);
        trace!("{name}: MSV {msv_bits:.2} bits, P={p:.3e}");
        if p > self.config.msv_p {
            return Ok(SequenceOutcome::Skipped { stage: Stage::Msv, pvalue: Some(p) });
        }
        self.stats.n_past_msv += 1;

        // ---- 3. Viterbi gate.
        let vit_bits = to_bits(viterbi_filter(dsq, &self.om, &mut self.fx));
        let p = self.gp.evparams.vit_pvalue(vit_bits);
        trace!("{name}: VF {vit_bits:.2} bits, P={p:.3e}");
        if p > self.config.vf_p {
            return Ok(SequenceOutcome::Skipped { stage: Stage::Viterbi, pvalue: Some(p) });
        }
        self.stats.n_past_vit += 1;

        // ---- 4. Forward gate.
        let fwd_raw = forward_filter(dsq, &self.om, &mut self.fx);
        let p = self.gp.evparams.fwd_pvalue(to_bits(fwd_raw));
        trace!("{name}: FF {:.2} bits, P={p:.3e}", to_bits(fwd_raw));
        if p > self.config.ff_p {
            return Ok(SequenceOutcome::Skipped { stage: Stage::Forward, pvalue: Some(p) });
        }
        self.stats.n_past_fwd += 1;

        // ---- 5. Backward + posterior mask.
        let mask = Arc::new(backward_filter(
            dsq,
            &self.om,
            &mut self.fx,
            fwd_raw,
            self.config.tau_sparse,
        ));
        debug!("{name}: sparse mask holds {} cells in {} segments", mask.n_cells(), mask.segments().len());
        if mask.n_cells() == 0 {
            // No cell cleared the posterior cutoff. This stage has no
            // P-value; the Forward gate's was already passed.
            return Ok(SequenceOutcome::Skipped { stage: Stage::Backward, pvalue: None });
        }

        // ---- 6. Sparse DP quartet.
        self.sxv.reinit(Arc::clone(&mask));
        self.sxf.reinit(Arc::clone(&mask));
        self.sxb.reinit(Arc::clone(&mask));
        self.sxd.reinit(Arc::clone(&mask));

        sparse_viterbi(dsq, &self.gp, &mut self.sxv);
        let mut path = sparse_viterbi_trace(&self.gp, &self.sxv)?;
        let fsc = sparse_forward(dsq, &self.gp, &mut self.sxf);
        let bsc = sparse_backward(dsq, &self.gp, &mut self.sxb);
        debug_assert!(
            (fsc - bsc).abs() < 1e-2,
            "{name}: sparse F {fsc} and B {bsc} disagree"
        );
        sparse_decoding(&self.sxf, &self.sxb, fsc, &mut self.sxd);

        // Attach posteriors to the trace.
        for z in 0..path.len() {
            let step = *path.step(z);
            let pp = match step.st {
                TraceState::ML => self.sxd.get(step.i, step.k, sp::ML),
                TraceState::MG => self.sxd.get(step.i, step.k, sp::MG),
                TraceState::IL => self.sxd.get(step.i, step.k, sp::IL),
                TraceState::IG => self.sxd.get(step.i, step.k, sp::IG),
                TraceState::N if step.i > 0 => self.sxd.x(step.i, sp::XN),
                TraceState::J if step.i > 0 => self.sxd.x(step.i, sp::XJ),
                TraceState::C if step.i > 0 => self.sxd.x(step.i, sp::XC),
                _ => 0.0,
            };
            path.set_pp(z, pp.max(0.0));
        }

        // ---- 7. Per-domain envelopes and scores.
        let ndom_exp = expected_domains(&self.sxd);
        let domains = path.index_domains();
        let mut records = Vec::with_capacity(domains.len());
        for (di, dom) in domains.iter().enumerate() {
            let (anchor_i, anchor_k) = self.find_anchor(&path, dom.sqfrom, dom.sqto);
            let wa = if di == 0 { 1 } else { domains[di - 1].sqto + 1 };
            let wb = if di + 1 == domains.len() { l } else { domains[di + 1].sqfrom - 1 };
            let env = mass_trace(&self.sxd, anchor_i, anchor_k, wa, wb, self.config.mass_trace_epsilon);
            let envsc_approx = approx_env_score(&self.gp, &self.sxf, &env, l);
            let envsc_exact = sparse_env_score(dsq, &self.gp, &mask, &env, l);

            let bprob = if dom.sqfrom >= 1 && self.sxd.has_x(dom.sqfrom - 1) {
                self.sxd.x(dom.sqfrom - 1, sp::XB).max(0.0)
            } else {
                0.0
            };
            let eprob = if self.sxd.has_x(dom.sqto) {
                self.sxd.x(dom.sqto, sp::XE).max(0.0)
            } else {
                0.0
            };

            records.push(DomainRecord {
                name: name.to_string(),
                model: self.gp.name.clone(),
                d: di + 1,
                sqfrom: dom.sqfrom,
                sqto: dom.sqto,
                hmmfrom: dom.hmmfrom,
                hmmto: dom.hmmto,
                iae: env.iae,
                ibe: env.ibe,
                kae: env.kae,
                kbe: env.kbe,
                ndom_exp,
                bprob,
                eprob,
                envsc_approx,
                envsc_exact,
                delta: (envsc_approx - envsc_exact).abs(),
            });
        }
        self.stats.n_reported += records.len() as u64;
        Ok(SequenceOutcome::Reported(records))
    }

    /// Highest-posterior match step within a domain's sequence span.
    fn find_anchor(&self, path: &profile::Trace, sqfrom: usize, sqto: usize) -> (usize, usize) {
        let mut best = (sqfrom, 1);
        let mut best_pp = -1.0_f32;
        for step in path.steps() {
            if step.st.is_match() && step.i >= sqfrom && step.i <= sqto && step.pp > best_pp {
                best_pp = step.pp;
                best = (step.i, step.k);
            }
        }
        best
    }

    /// Process a stream of sequences in order, converting per-sequence
    /// errors into diagnostics while the stream continues. The cancel
    /// token is honored between sequences, never inside a DP kernel.
    pub fn run<'a, I>(&mut self, seqs: I, cancel: Option<&AtomicBool>) -> Vec<(String, SequenceOutcome)>
    where
        I: IntoIterator<Item = (String, &'a DigitalSeq)>,
    {
        let mut out = Vec::new();
        for (name, dsq) in seqs {
            if cancel.is_some_and(|c| c.load(Ordering::Relaxed)) {
                info!("cancellation requested; stopping after {} sequences", out.len());
                break;
            }
            match self.process(&name, dsq) {
                Ok(outcome) => out.push((name, outcome)),
                Err(e) => error!("sequence '{name}' aborted: {e}"),
            }
        }
        out
    }
}

/// Shard a sequence set over independent workers, one [`Pipeline`] each,
/// and merge the results back into input order. The profile trio is
/// cloned per worker; nothing mutable is shared.
pub fn run_sharded(
    gp     : &GenericProfile,
    om     : &OptimizedProfile,
    bg     : &Background,
    config : PipelineConfig,
    seqs   : &[(String, DigitalSeq)],
    workers: usize,
    cancel : Option<&AtomicBool>,
) -> Result<Vec<(String, SequenceOutcome)>, PipelineError> {
    use rayon::prelude::*;

    let workers = workers.max(1);
    let shard = seqs.len().div_euclid(workers).max(1);
    let mut indexed: Vec<(usize, String, SequenceOutcome)> = seqs
        .par_chunks(shard)
        .enumerate()
        .map(|(ci, chunk)| {
            let mut worker =
                Pipeline::new(gp.clone(), om.clone(), bg.clone(), config)?;
            let mut out = Vec::with_capacity(chunk.len());
            for (j, (name, dsq)) in chunk.iter().enumerate() {
                if cancel.is_some_and(|c| c.load(Ordering::Relaxed)) {
                    break;
                }
                match worker.process(name, dsq) {
                    Ok(outcome) => out.push((ci * shard + j, name.clone(), outcome)),
                    Err(e) => error!("sequence '{name}' aborted: {e}"),
                }
            }
            info!(
                "worker {ci}: {} sequences, {} past MSV, {} past VF, {} past FF, {} domains",
                worker.stats.n_sequences,
                worker.stats.n_past_msv,
                worker.stats.n_past_vit,
                worker.stats.n_past_fwd,
                worker.stats.n_reported
            );
            Ok(out)
        })
        .collect::<Result<Vec<_>, PipelineError>>()?
        .into_iter()
        .flatten()
        .collect();

    indexed.sort_by_key(|(i, _, _)| *i);
    Ok(indexed.into_iter().map(|(_, n, o)| (n, o)).collect())
}

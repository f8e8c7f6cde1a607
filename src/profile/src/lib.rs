mod error;
pub use error::ProfileError;

pub mod logsum;
pub use logsum::{logdiff, logsum};

pub mod model;
pub use model::CoreModel;

pub mod sample;
pub use sample::{emit_sequence, sample_model};

pub mod gp;
pub use gp::{GenericProfile, Mode, Special, Transition, XSC_LOOP, XSC_MOVE};

pub mod stats;
pub use stats::EvalueParams;

pub mod op;
pub use op::{OptimizedProfile, SimdWidth};

pub mod fx;
pub use fx::FilterMatrix;

pub mod mask;
pub use mask::{SparseMask, SparseMaskBuilder};

pub mod trace;
pub use trace::{Domain, Trace, TraceState};

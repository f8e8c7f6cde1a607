use thiserror::Error;

use profile::ProfileError;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Profile(#[from] ProfileError),

    #[error("Sequence '{0}' uses a different alphabet than the profile")]
    AlphabetMismatch(String),

    #[error("Optimized profile violates the insert-loop clamp (II >= 0 in the word layer)")]
    InsertLoopUnclamped,
}

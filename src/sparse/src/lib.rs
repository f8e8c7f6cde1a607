pub mod matrix;
pub use matrix::SparseMatrix;

mod viterbi;
pub use viterbi::{sparse_viterbi, sparse_viterbi_trace};

mod forward;
pub use forward::sparse_forward;

mod backward;
pub use backward::sparse_backward;

mod decoding;
pub use decoding::{expected_domains, row_mass, sparse_decoding};

mod masstrace;
pub use masstrace::{mass_trace, Envelope};

mod envscore;
pub use envscore::{approx_env_score, sparse_env_score};

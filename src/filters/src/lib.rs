pub mod simdvec;

mod msv;
pub use msv::msv_filter;

mod ssv;
pub use ssv::ssv_filter;

mod vitfilter;
pub use vitfilter::viterbi_filter;

mod fwdfilter;
pub use fwdfilter::forward_filter;

mod bckfilter;
pub use bckfilter::backward_filter;

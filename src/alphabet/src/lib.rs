mod alphabet;
pub use crate::alphabet::Alphabet;

mod background;
pub use background::Background;

mod dsq;
pub use dsq::{DigitalSeq, SENTINEL};

mod error;
pub use error::AlphabetError;

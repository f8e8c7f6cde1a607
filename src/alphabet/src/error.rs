use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum AlphabetError {
    #[error("Character '{0}' does not belong to this alphabet")]
    UnknownSymbol(char),

    #[error("Residue index {0} is out of range for this alphabet (Kp={1})")]
    InvalidResidue(u8, u8),
}

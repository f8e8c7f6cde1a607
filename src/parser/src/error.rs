use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum ParserError {
    #[error("Unsupported vector width '{0}' (expected 16, 32 or 64)")]
    InvalidWidth(u32),

    #[error("The planted fraction must lie in [0, 1] (got {0})")]
    InvalidPlantedFraction(f32),
}

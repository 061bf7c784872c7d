use thiserror::Error;

use crate::parameters::ParameterKind;

/// Recoverable errors produced by runtime lookups with caller-supplied names or indices.
///
/// None of these abort a tick: the offending call is ignored and evaluation continues with the
/// previous values.
#[non_exhaustive]
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RigError {
    #[error("No parameter named {0:?}")]
    UnknownParameter(String),
    #[error("Parameter {name:?} is a {found:?}, not a {expected:?}")]
    ParameterKindMismatch {
        name: String,
        found: ParameterKind,
        expected: ParameterKind,
    },
    #[error("Parameter index {0} is out of range")]
    InvalidParameter(usize),
    #[error("Layer index {0} is out of range")]
    InvalidLayer(usize),
    #[error("No state named {0:?} in this layer")]
    UnknownState(String),
    #[error("State index {0} is out of range")]
    InvalidState(usize),
    #[error("Body part index {0} is out of range")]
    InvalidBodyPart(usize),
    #[error("DoF index {0} is out of range")]
    InvalidDof(usize),
    #[error("Humanoid bone index {0} is out of range")]
    InvalidBone(usize),
}

pub type RigResult<T> = Result<T, RigError>;

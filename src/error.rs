//!
//! Error taxonomy of the quantization pipeline and the DP engines
//!
//! * `InvalidArgument`: programming errors (allocation too small, alphabet mismatch,
//!   model not in local mode). Not retriable.
//! * `Range`: the score left the dynamic range of the numeric path. The caller may
//!   retry with a different precision path.
//! * `Canceled`: cooperative abort requested by the caller.
//!
use thiserror::Error;

/// Which engine produced a numeric range failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Engine {
    Msv,
    Viterbi,
    Forward,
    Backward,
}

impl std::fmt::Display for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Engine::Msv => write!(f, "msv"),
            Engine::Viterbi => write!(f, "viterbi"),
            Engine::Forward => write!(f, "forward"),
            Engine::Backward => write!(f, "backward"),
        }
    }
}

/// Kind of the numeric range failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeKind {
    /// score is NaN
    NaN,
    /// score is 0.0 on a nonempty sequence
    Underflow,
    /// score is infinity, or a saturated integer score
    Overflow,
}

impl std::fmt::Display for RangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            RangeKind::NaN => write!(f, "is NaN"),
            RangeKind::Underflow => write!(f, "underflow (is 0.0)"),
            RangeKind::Overflow => write!(f, "overflow (is infinity)"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{engine} score {kind}")]
pub struct RangeError {
    pub engine: Engine,
    pub kind: RangeKind,
}

impl RangeError {
    ///
    /// Classify the final probability-space value of an engine.
    /// `Ok(())` if the value can be safely converted into a log score.
    ///
    pub fn check(engine: Engine, value: f32, length: usize) -> std::result::Result<(), RangeError> {
        if value.is_nan() {
            Err(RangeError {
                engine,
                kind: RangeKind::NaN,
            })
        } else if length > 0 && value == 0.0 {
            Err(RangeError {
                engine,
                kind: RangeKind::Underflow,
            })
        } else if value.is_infinite() && value.is_sign_positive() {
            Err(RangeError {
                engine,
                kind: RangeKind::Overflow,
            })
        } else {
            Ok(())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error(transparent)]
    Range(#[from] RangeError),
    #[error("canceled")]
    Canceled,
}

impl Error {
    /// Short-hand of `Error::InvalidArgument`
    pub fn invalid<S: Into<String>>(message: S) -> Error {
        Error::InvalidArgument(message.into())
    }
    ///
    /// Only range errors can be resolved by the caller rescoring with another
    /// numeric path.
    pub fn is_retriable(&self) -> bool {
        matches!(self, Error::Range(_))
    }
    pub fn is_canceled(&self) -> bool {
        matches!(self, Error::Canceled)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_check() {
        assert!(RangeError::check(Engine::Forward, 0.5, 10).is_ok());
        assert!(RangeError::check(Engine::Forward, 0.0, 0).is_ok());
        assert_eq!(
            RangeError::check(Engine::Forward, 0.0, 3).unwrap_err().kind,
            RangeKind::Underflow
        );
        assert_eq!(
            RangeError::check(Engine::Backward, f32::NAN, 3)
                .unwrap_err()
                .kind,
            RangeKind::NaN
        );
        assert_eq!(
            RangeError::check(Engine::Forward, f32::INFINITY, 3)
                .unwrap_err()
                .kind,
            RangeKind::Overflow
        );
    }

    #[test]
    fn error_messages() {
        let e: Error = RangeError {
            engine: Engine::Forward,
            kind: RangeKind::Overflow,
        }
        .into();
        assert_eq!(e.to_string(), "forward score overflow (is infinity)");
        assert!(e.is_retriable());
        assert!(!Error::Canceled.is_retriable());
        assert!(Error::Canceled.is_canceled());
        assert_eq!(
            Error::invalid("too small").to_string(),
            "invalid argument: too small"
        );
    }
}

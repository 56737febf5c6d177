//! Use case identifier parsing.
//!
//! Use case names encode their frame rate, e.g. `MODE_9_5FPS` runs at 5 fps.
//! The rate is the text between the second underscore and the `FPS` suffix.

const SEPARATOR: char = '_';
const FPS_SUFFIX: &str = "FPS";

/// Reason a use case identifier could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UseCaseParseError {
    /// Fewer than two underscore-separated fields.
    #[error("use case `{0}` needs two `_` separated fields before the frame rate")]
    MissingSeparator(String),
    /// No `FPS` after the second underscore.
    #[error("use case `{0}` has no `FPS` suffix")]
    MissingSuffix(String),
    /// The frame rate field is empty, not a number, or does not fit a `u16`.
    #[error("use case `{id}` has an invalid frame rate `{rate}`")]
    InvalidRate {
        /// The identifier being parsed.
        id: String,
        /// The text found where the frame rate should be.
        rate: String,
    },
}

/// Extract the expected frame rate from a use case identifier.
///
/// # Errors
///
/// Fails when the identifier does not follow `<prefix>_<n>_<rate>FPS`.
pub fn expected_frame_rate(id: &str) -> Result<u16, UseCaseParseError> {
    let (_, after_first) = id
        .split_once(SEPARATOR)
        .ok_or_else(|| UseCaseParseError::MissingSeparator(id.to_owned()))?;
    let (_, after_second) = after_first
        .split_once(SEPARATOR)
        .ok_or_else(|| UseCaseParseError::MissingSeparator(id.to_owned()))?;
    let (rate, _) = after_second
        .split_once(FPS_SUFFIX)
        .ok_or_else(|| UseCaseParseError::MissingSuffix(id.to_owned()))?;

    // `u16::from_str` accepts a leading `+`; a use case never carries one.
    if rate.is_empty() || !rate.bytes().all(|b| b.is_ascii_digit()) {
        return Err(UseCaseParseError::InvalidRate {
            id: id.to_owned(),
            rate: rate.to_owned(),
        });
    }

    rate.parse().map_err(|_| UseCaseParseError::InvalidRate {
        id: id.to_owned(),
        rate: rate.to_owned(),
    })
}

//! Error types for the control core.
//!
//! Driver errors are associated types on the platform traits; they are
//! mapped to [`ControlError`] variants where the call is made.

use playback::SequenceError;
use records::RecordError;

/// Settings/progress storage failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror_no_std::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StoreError {
    /// The EEPROM driver reported an error
    #[error("EEPROM access failed")]
    Io,

    /// The stored image could not be encoded or decoded
    #[error("settings record invalid: {0}")]
    Record(RecordError),
}

/// Failure inside one control-loop tick.
///
/// Every variant resolves to "play the error prompt and return to idle".
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror_no_std::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControlError {
    /// The MP3 module rejected a command
    #[error("audio driver error")]
    Audio,

    /// Settings storage failed
    #[error("storage error: {0}")]
    Storage(StoreError),

    /// The selected folder has nothing playable
    #[error("cannot start folder: {0}")]
    Sequence(SequenceError),
}

impl From<StoreError> for ControlError {
    fn from(err: StoreError) -> Self {
        Self::Storage(err)
    }
}

impl From<SequenceError> for ControlError {
    fn from(err: SequenceError) -> Self {
        Self::Sequence(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::string::ToString;

    #[test]
    fn test_display_includes_cause() {
        let err = ControlError::from(StoreError::Record(RecordError::Checksum));
        let text = err.to_string();
        assert!(text.starts_with("storage error"));
    }

    #[test]
    fn test_sequence_error_converts() {
        let err: ControlError = SequenceError::EmptyFolder.into();
        assert_eq!(err, ControlError::Sequence(SequenceError::EmptyFolder));
    }
}

//! Audible cue for critical alerts

use std::io::{self, Write};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SoundError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Sound output unavailable: {0}")]
    Unavailable(String),
}

/// Plays the alert cue. Failures are reported, never retried.
#[cfg_attr(test, mockall::automock)]
pub trait AlertSound: Send + Sync {
    fn play(&self) -> Result<(), SoundError>;
}

/// Rings the terminal bell on stderr
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalBell;

impl AlertSound for TerminalBell {
    fn play(&self) -> Result<(), SoundError> {
        let mut err = io::stderr().lock();
        err.write_all(b"\x07")?;
        err.flush()?;
        Ok(())
    }
}

/// No-op cue for headless runs and tests
#[derive(Debug, Default, Clone, Copy)]
pub struct Silent;

impl AlertSound for Silent {
    fn play(&self) -> Result<(), SoundError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silent_never_fails() {
        assert!(Silent.play().is_ok());
    }

    #[test]
    fn test_mock_reports_failure() {
        let mut sound = MockAlertSound::new();
        sound
            .expect_play()
            .times(1)
            .returning(|| Err(SoundError::Unavailable("no device".into())));

        let err = sound.play().unwrap_err();
        assert_eq!(err.to_string(), "Sound output unavailable: no device");
    }
}

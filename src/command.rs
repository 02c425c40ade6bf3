// src/command.rs - Outbound time command
use std::fmt;

/// Single-letter tag the firmware matches on.
pub const TIME_TAG: char = 'T';

/// The `T<seconds>` message sent once per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeCommand {
    pub seconds: i64,
}

impl TimeCommand {
    pub fn new(seconds: i64) -> Self {
        Self { seconds }
    }

    /// ASCII wire bytes, no terminator.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }
}

impl fmt::Display for TimeCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", TIME_TAG, self.seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format() {
        assert_eq!(TimeCommand::new(13).to_string(), "T13");
        assert_eq!(TimeCommand::new(0).to_string(), "T0");
        assert_eq!(TimeCommand::new(60).to_string(), "T60");
    }

    #[test]
    fn test_wire_bytes_are_ascii_without_terminator() {
        let bytes = TimeCommand::new(7).to_bytes();
        assert_eq!(bytes, b"T7");
        assert!(bytes.is_ascii());
    }
}

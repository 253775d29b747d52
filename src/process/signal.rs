//! # Termination signals.
//!
//! [`KillSignal`] names the signal sent to a process on timeout, `stop()`,
//! `stop_task()` and `destroy()`. It is a plain signal number so it can live in
//! [`Config`](crate::Config) on every platform; on non-unix targets any signal
//! degrades to a hard kill.

use std::fmt;
use std::str::FromStr;

/// Signal number used to terminate a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KillSignal(i32);

impl KillSignal {
    pub const HUP: KillSignal = KillSignal(1);
    pub const INT: KillSignal = KillSignal(2);
    pub const QUIT: KillSignal = KillSignal(3);
    pub const KILL: KillSignal = KillSignal(9);
    pub const TERM: KillSignal = KillSignal(15);

    /// Wraps a raw signal number.
    pub const fn from_raw(signo: i32) -> Self {
        Self(signo)
    }

    /// Returns the raw signal number.
    pub const fn as_raw(self) -> i32 {
        self.0
    }

    /// Short name without the `SIG` prefix, if the number is a well-known one.
    pub fn name(self) -> Option<&'static str> {
        match self.0 {
            1 => Some("HUP"),
            2 => Some("INT"),
            3 => Some("QUIT"),
            9 => Some("KILL"),
            15 => Some("TERM"),
            _ => None,
        }
    }

    #[cfg(unix)]
    pub(crate) fn to_nix(self) -> Option<nix::sys::signal::Signal> {
        nix::sys::signal::Signal::try_from(self.0).ok()
    }
}

impl Default for KillSignal {
    /// Returns [`KillSignal::TERM`].
    fn default() -> Self {
        KillSignal::TERM
    }
}

impl fmt::Display for KillSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "SIG{name}"),
            None => write!(f, "signal {}", self.0),
        }
    }
}

/// Error returned when a signal name cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown signal: {0}")]
pub struct ParseSignalError(String);

impl FromStr for KillSignal {
    type Err = ParseSignalError;

    /// Accepts numbers (`9`), bare names (`TERM`) and prefixed names (`SIGKILL`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(num) = trimmed.parse::<i32>() {
            if num > 0 {
                return Ok(KillSignal(num));
            }
            return Err(ParseSignalError(s.to_string()));
        }

        let upper = trimmed.to_ascii_uppercase();
        let name = upper.strip_prefix("SIG").unwrap_or(&upper);
        match name {
            "HUP" => Ok(KillSignal::HUP),
            "INT" => Ok(KillSignal::INT),
            "QUIT" => Ok(KillSignal::QUIT),
            "KILL" => Ok(KillSignal::KILL),
            "TERM" => Ok(KillSignal::TERM),
            _ => Err(ParseSignalError(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_names_and_numbers() {
        assert_eq!("TERM".parse::<KillSignal>(), Ok(KillSignal::TERM));
        assert_eq!("sigkill".parse::<KillSignal>(), Ok(KillSignal::KILL));
        assert_eq!("2".parse::<KillSignal>(), Ok(KillSignal::INT));
        assert!("BOGUS".parse::<KillSignal>().is_err());
        assert!("-3".parse::<KillSignal>().is_err());
    }

    #[test]
    fn display_prefers_names() {
        assert_eq!(KillSignal::KILL.to_string(), "SIGKILL");
        assert_eq!(KillSignal::from_raw(10).to_string(), "signal 10");
    }

    #[cfg(unix)]
    #[test]
    fn converts_to_nix() {
        assert_eq!(
            KillSignal::TERM.to_nix(),
            Some(nix::sys::signal::Signal::SIGTERM)
        );
    }
}

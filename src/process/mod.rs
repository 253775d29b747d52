//! External process plumbing.
//!
//! - [`KillSignal`]: signal used to terminate a process
//! - `executor`: spawns one process per run and reports chunks and closes

mod executor;
mod signal;

pub use signal::{KillSignal, ParseSignalError};

pub(crate) use executor::{OutputStream, ProcessExit, ProcessHandle, ProcessMsg, launch};

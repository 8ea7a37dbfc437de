//! The oracle: an external process treated as ground truth for elapsed time and the
//! running flag, plus the [`Invoker`] that serializes access to it.

mod builtin;
mod invoker;
mod process;

pub(crate) use builtin::BuiltinStopwatch;
pub(crate) use invoker::Invoker;
pub(crate) use process::{run_build_step, ExternalProcess};

use crate::model::OracleOutcome;

/// Something that, when run, reads the command slot and rewrites the result slots.
///
/// `run` blocks until the oracle has finished. Failing to launch is reported through
/// the returned outcome rather than an error; callers read the slots back either way.
pub trait OracleProcess: Send + Sync {
    fn run(&self) -> OracleOutcome;
}

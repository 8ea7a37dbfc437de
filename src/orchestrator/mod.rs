//! Session orchestration.
//!
//! The [`SessionController`] owns the session state and is the only path to the oracle;
//! the [`Ticker`] drives periodic `TICK`s through it. Presentation layers send
//! [`UiCommand`]s into [`run_controller`] and receive `SessionEvent`s back.

mod controller;
mod ticker;

pub(crate) use controller::{run_controller, SessionController, UiCommand};
pub(crate) use ticker::Ticker;

//! Control loop - fetches tasks and hands prompts to the assistant
//!
//! Lifecycle: `AwaitingInitialTask -> Running -> Terminated`. Everything runs
//! on one task; the only suspension points are fixed sleeps and I/O.

pub mod control_loop;
pub mod state;

pub use control_loop::{CONTINUE_PROMPT, ControlLoop};
pub use state::{LoopConfig, LoopState, SessionState, StartupError, Step, Termination};

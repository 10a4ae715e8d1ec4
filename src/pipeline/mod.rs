//! Window lifecycle: rotation on the interval clock, per-window processing
//! and the run loop around them.

mod processor;
mod runtime;

pub use processor::{Stage, WindowOutcome, WindowProcessor};
pub use runtime::{Pipeline, RunSummary};

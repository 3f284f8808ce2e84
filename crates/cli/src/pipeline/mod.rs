//! Session orchestration module.

mod orchestrator;
mod shutdown;
mod summary;

pub use orchestrator::{build_schedule, PlaybackSession, SessionReport};
pub use shutdown::Shutdown;
pub use summary::print_summary;

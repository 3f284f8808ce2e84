//! # Contracts
//!
//! Frozen interface contracts shared by every crate of the stereo driver.
//! Business crates depend on this crate only; reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Source timestamps are seconds (f64) as read from the dataset
//! - Schedule offsets are seconds of wall time relative to the pacing epoch
//! - `FrameId` is the index of an image inside its stream

mod engine;
mod error;
mod frame;
mod photometric;
mod schedule;
mod settings;
mod sink;

pub use engine::*;
pub use error::*;
pub use frame::*;
pub use photometric::*;
pub use schedule::*;
pub use settings::*;
pub use sink::*;

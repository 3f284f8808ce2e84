//! # Engine
//!
//! `EngineFactory` implementations.
//!
//! The real SLAM engine is linked externally; this crate ships the scripted
//! `MockEngine` used for dry runs and tests.

mod mock;

pub use contracts::{EngineFactory, SlamEngine};
pub use mock::{EngineJournal, MockEngine, MockEngineFactory, MockScript, SharedJournal};

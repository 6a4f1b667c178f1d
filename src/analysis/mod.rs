//! Read-mostly analyses over a parsed graph
//!
//! - Cycle detection over the two relation families that matter downstream
//! - Safety of an activity's backward dependency closure
//! - Deadlock/livelock freedom across a family of graphs

pub mod cycles;
pub mod freedom;
pub mod safety;

pub use cycles::CycleDetector;
pub use freedom::{CycleReport, Freedom};
pub use safety::{build_dependency_closure, is_safe};

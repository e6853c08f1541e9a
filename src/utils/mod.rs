pub mod locker;
pub mod pattern;

// Trait-based abstraction for testability
pub mod probe;

// Re-export commonly used types and traits (used by test crate)
#[allow(unused_imports)]
pub use probe::{Artifact, FilesystemProbe, ProbeError, RealProbe};

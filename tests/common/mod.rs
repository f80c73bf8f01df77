//! Common test utilities for testship tests

pub mod fakes;
pub mod fixtures;

// Re-exports for convenience - not all test binaries use all exports
#[allow(unused_imports)]
pub use fakes::*;
#[allow(unused_imports)]
pub use fixtures::*;

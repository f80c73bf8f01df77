//! testship - submit local test projects to a remote execution service
//!
//! The library packages a project's spec tree, uploads it, registers a
//! remote build and optionally waits for the build to finish. Every
//! collaborator sits behind a trait so the [`submit::SubmissionPipeline`]
//! can be driven against real HTTP services or in-memory fakes.

pub mod archive;
pub mod capabilities;
pub mod config;
pub mod error;
pub mod messages;
pub mod remote;
pub mod submit;
pub mod sync;
pub mod types;
pub mod usage;

//! Shared testing utilities for the will-call notification workspace.
//!
//! In-memory mock implementations of every repository and port trait, plus
//! builders for test entities. Add as a dev-dependency:
//!
//! ```toml
//! [dev-dependencies]
//! willcall-testing-utils = { path = "../testing-utils" }
//! ```

pub mod builders;
pub mod mocks;

pub use builders::*;
pub use mocks::*;

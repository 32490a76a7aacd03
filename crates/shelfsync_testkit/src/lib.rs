//! # Shelfsync Testkit
//!
//! Test utilities for Shelfsync.
//!
//! This crate provides:
//! - A builder for realistic library states
//! - Test devices backed by in-memory stores
//! - Temporary shared folders
//! - Property-based generators of well-formed states using proptest
//!
//! ## Usage
//!
//! ```rust
//! use shelfsync_testkit::prelude::*;
//!
//! let device = TestDevice::new(
//!     "phone",
//!     StateBuilder::new().completed(&["b1"]).progress("b1", 0.5, 1000).build(),
//! );
//! assert_eq!(device.state().len(), 3);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use fixtures::*;
pub use generators::*;

//! drf-core: Core types for Dominant Resource Fairness scheduling
//!
//! This crate provides the fundamental types shared by the policy and its callers:
//! - Resource dimensions, quantity vectors and weight vectors
//! - The schedulable consumer boundary
//! - Configuration types
//! - Error handling
//! - Environment assignment list parsing for container runtimes

pub mod config;
pub mod env;
pub mod error;
pub mod resource;
pub mod schedulable;

pub use config::*;
pub use env::{EnvParser, PlaceholderStyle};
pub use error::*;
pub use resource::*;
pub use schedulable::*;

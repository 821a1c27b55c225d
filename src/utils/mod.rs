//! Shared helpers.

pub mod domain;

pub use domain::registered_domain;

//! discernprep - health-article corpus preparation.
//!
//! Loads raw article HTML and survey responses, segments and annotates
//! the text into snippets, and caches the results as timestamped
//! snapshots for DISCERN quality-rating research.

pub mod annotators;
pub mod cli;
pub mod config;
pub mod datastore;
pub mod models;
pub mod transform;
pub mod utils;

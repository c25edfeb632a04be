//! # Battle Development Tools
//!
//! Command-line tools for development:
//! - Config and skill data validators
//! - Headless skirmish runner with demo collaborators

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod skirmish;
pub mod validate;

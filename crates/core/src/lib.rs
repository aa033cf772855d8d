//! Core types for kurswissen
//!
//! This crate contains domain types shared across all other crates:
//! courses, fact sets, session state, and shared utilities.

pub mod constants;
mod course;
mod env_config;
mod error;
mod facts;
mod json_utils;
mod session;

pub use course::*;
pub use env_config::*;
pub use error::*;
pub use facts::*;
pub use json_utils::*;
pub use session::*;

//! Core command dispatch + tag logic for the utility bot.
//!
//! This crate is intentionally framework-agnostic. The chat gateway lives behind
//! the messaging port and is implemented in adapter crates; persistence lives
//! behind the tag store port.

pub mod app;
pub mod commands;
pub mod config;
pub mod dispatcher;
pub mod domain;
pub mod errors;
pub mod formatting;
pub mod logging;
pub mod messaging;
pub mod modules;
pub mod permissions;
pub mod tags;

pub use errors::{Error, Result};

#[cfg(test)]
mod testing;

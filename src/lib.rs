//! casegen: a gateway between an issue tracker and a generative-language
//! model that turns user stories into test cases.
//!
//! Two in-process caches sit in front of the collaborators:
//! [`cache::SessionCache`] keeps authenticated tracker sessions per
//! `(endpoint, principal)` and [`cache::ResponseCache`] keeps generated test
//! cases per request fingerprint.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod generator;
pub mod health;
pub mod tracker;

#[cfg(test)]
mod testing;

pub use config::Config;
pub use error::{GatewayError, Result};

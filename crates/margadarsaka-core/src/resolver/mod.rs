//! Key resolution across an ordered provider chain
//!
//! This module provides the single entry point callers use to look up
//! configuration, plus the cache it keeps for the lifetime of the process.

mod cache;
mod secrets_resolver;

pub use cache::{ResolutionCache, ResolvedValue};
pub use secrets_resolver::{BatchResolution, ProviderStatus, SecretsResolver};

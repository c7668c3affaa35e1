// src/config/mod.rs

//! Configuration for packsible-dev.
//!
//! Responsibilities:
//! - Define the environment-variable backed data model (`model.rs`).
//! - Read the variables once at startup (`loader.rs`).
//! - Apply defaults and validate values (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_from_env, load_from_vars};
pub use model::{LifecycleTiming, RawServerConfig, ServerConfig};

// ABOUTME: Library root for greenswap - exposes public types for testing.
// ABOUTME: The main binary is in main.rs.

pub mod application;
pub mod config;
pub mod deploy;
pub mod deployer;
pub mod environment;
pub mod error;
pub mod output;
pub mod platform;
pub mod poll;
pub mod types;

pub use application::Application;
pub use config::{DeploySettings, Manifest};
pub use deployer::Deployer;
pub use environment::{Environment, EnvironmentEvent, EnvironmentOptions};
pub use error::{Error, Result};

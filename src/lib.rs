//! Fleet command agent.
//!
//! One agent runs on each managed machine. All agents subscribe to the same
//! chat channel; an inbound `/verb target argument` message is parsed, gated
//! against the local identity, executed, and answered on the same channel.

pub mod actions;
pub mod agent;
pub mod channels;
pub mod config;
pub mod error;
pub mod identity;
pub mod platform;
pub mod protocol;
pub mod response;

pub use agent::Agent;
pub use config::Config;

/// Crate version plus the build metadata embedded by `build.rs`.
pub const BUILD_INFO: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("FLEET_AGENT_GIT_SHA"),
    " built ",
    env!("FLEET_AGENT_BUILD_TIME"),
    ")"
);

pub fn build_info() -> &'static str {
    BUILD_INFO
}

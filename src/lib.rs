//! Pulse-oximeter telemetry agent.
//!
//! Samples the IR channel once per tick, turns contact into a heart-rate
//! record and uploads it to a per-tick (fast) endpoint and a rate-limited
//! (slow) endpoint. Hardware, Wi-Fi, SNTP and the HTTP stack live behind the
//! [`sensor::IrSensor`], [`clock::Clock`] and [`delivery::Transport`] traits.

pub mod clock;
pub mod config;
pub mod delivery;
pub mod error;
pub mod events;
pub mod metrics;
pub mod payload;
pub mod scheduler;
pub mod sensor;
pub mod sim;
pub mod telemetry;

pub use telemetry::{TelemetryLoop, TickReport};

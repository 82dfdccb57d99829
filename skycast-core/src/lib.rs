//! Core library for the `skycast` weather broadcaster.
//!
//! This crate defines:
//! - The gateway to the remote weather API (fetch + normalize)
//! - The typed update broadcaster that presentation code subscribes to
//! - Derived climate values (season, day/night phase)
//! - Configuration & credentials handling
//!
//! It is used by `skycast-cli`, but can also be reused by other binaries or
//! services that want weather snapshots fanned out to independent listeners.

pub mod broadcast;
pub mod climate;
pub mod config;
pub mod error;
pub mod gateway;
pub mod model;

pub use broadcast::{Subscription, UpdateBroadcaster};
pub use config::Config;
pub use error::{GatewayError, Result};
pub use gateway::WeatherGateway;
pub use model::{
    CurrentConditions, FiveDayRange, ForecastDay, LocationInfo, PlaceMatch, Season, TimeInfo,
    WeatherSnapshot,
};

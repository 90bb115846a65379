//! Core library for the `localweather` app.
//!
//! This crate defines:
//! - Configuration, constants & credentials handling
//! - Single-shot location capabilities and the permission seam
//! - The OpenWeather client and its error taxonomy
//! - The last-write-wins response cache
//! - Presentation of a record into screen strings
//! - The controller that runs permission → fix → fetch → cache → render
//!
//! It is used by `localweather-cli`, but the platform seams (permission prompt,
//! renderer, settings launcher) are traits so other front ends can reuse it.

pub mod cache;
pub mod config;
pub mod controller;
pub mod error;
pub mod location;
pub mod model;
pub mod network;
pub mod present;
pub mod provider;

pub use cache::{FileStore, KeyValueStore, MemoryStore, ResponseCache};
pub use config::Config;
pub use controller::{AppController, AppState, Collaborators, Notice, Renderer, SettingsLauncher, SettingsTarget};
pub use error::{ControllerError, FetchError, LocationError};
pub use location::{LocationProvider, LocationSource, PermissionPrompt, PermissionStatus};
pub use model::{Coordinate, Units, WeatherRecord};
pub use network::{DnsReachability, Reachability};
pub use present::{DisplayModel, IconCategory, TemperatureUnit, present};
pub use provider::WeatherProvider;

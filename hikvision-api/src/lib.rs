//! Client for the Hikvision HTTP/XML configuration API
//!
//! This crate reads device identity and toggles device features (motion
//! detection, on-screen overlays) on a single camera. It uses the private
//! `isapi-client` crate for the HTTP exchange.
//!
//! Every operation follows the same cycle: GET the feature's XML document,
//! locate a field, optionally change it and write the document back. Nothing
//! is cached between calls.
//!
//! ```rust,no_run
//! use hikvision_api::{ClientConfig, DeviceClient, Dialect};
//!
//! let config = ClientConfig::builder()
//!     .host("192.168.1.64")
//!     .credentials("admin", "12345")
//!     .dialect(Dialect::Legacy)
//!     .build()?;
//! let client = DeviceClient::connect(config)?;
//!
//! println!("firmware {:?}", client.version()?);
//! client.set_date_time_overlay(true)?;
//! # Ok::<(), hikvision_api::ApiError>(())
//! ```
//!
//! # Dialects
//!
//! Newer firmware serves everything under `/ISAPI`, older firmware uses flat
//! paths. [`Dialect`] picks one of the two URL sets once, at construction.
//!
//! # Logging
//!
//! Events are emitted through `tracing`. The crate never installs a
//! subscriber; see [`logging`] for opt-in helpers and per-client sinks.

pub mod client;
pub mod config;
pub mod device_info;
pub mod endpoint;
pub mod error;
pub mod logging;
pub mod xml;

pub use client::{DeviceClient, WriteOutcome};
pub use config::{AuthMode, ClientConfig, ClientConfigBuilder, MissingFieldPolicy, Scheme};
pub use device_info::DeviceInfo;
pub use endpoint::{Dialect, EndpointSet, Feature};
pub use error::{ApiError, Result};
pub use xml::{FieldPath, NamespaceMode, XmlDocument};

pub use isapi_client::{HttpTransport, Transport, TransportError, WriteMethod};

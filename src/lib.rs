//! GleSYS infrastructure provider.
//!
//! A plugin process that manages GleSYS cloud objects (servers, DNS, IP
//! addresses, load balancers, email, object storage, private networks and
//! databases) on behalf of an infrastructure-as-code host. The host talks to
//! it over gRPC; the provider talks to the GleSYS JSON API over HTTPS.
//!
//! # Layout
//!
//! - [`server`]: gRPC service, handshake and shutdown, plus the
//!   [`ProviderService`] trait
//! - [`provider`]: [`GlesysProvider`], routing host calls to resource types
//! - [`resources`] and [`data_sources`]: one type per managed object
//! - [`client`]: typed client for the GleSYS API
//! - [`wait`]: polling until a remote object reaches a state
//! - [`schema`], [`plan`], [`validation`], [`state`]: schema-driven plumbing
//!
//! # Handshake
//!
//! Once listening, the provider prints one line on stdout:
//!
//! ```text
//! GLESYS_PROVIDER|1|127.0.0.1:50051
//! ```
//!
//! Format: `GLESYS_PROVIDER|<protocol_version>|<address>`. Logs go to stderr.
//!
//! # Building
//!
//! `build.rs` generates the gRPC server code from `proto/provider.proto` on
//! every build, so the Protocol Buffers compiler `protoc` must be on `PATH`
//! (or named by the `PROTOC` environment variable).

#![warn(clippy::all)]

pub mod client;
pub mod config;
pub mod data_sources;
pub mod error;
pub mod logging;
pub mod plan;
pub mod provider;
pub mod resources;
pub mod schema;
pub mod server;
pub mod state;
pub mod testing;
pub mod types;
pub mod validation;
pub mod wait;

#[allow(clippy::all)]
pub mod generated;

pub use client::{ApiError, GlesysClient};
pub use config::ProviderConfig;
pub use error::ProviderError;
pub use logging::{init_logging, init_logging_with_default, try_init_logging};
pub use provider::GlesysProvider;
pub use schema::ProviderSchema;
pub use server::{serve, serve_with_options, ProviderService, ServeOptions};
pub use types::{
    AttributeChange, ImportedResource, PlanResult, ProviderMetadata, ServerCapabilities, HANDSHAKE_PREFIX,
    PROTOCOL_VERSION,
};
pub use wait::{wait_for_state, WaitCondition, WaitError};

//! # Plume
//!
//! Write server bot handlers as plain functions of named parameters; Plume
//! resolves those parameters for each request and adapts the handler to the
//! server bot protocol.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     ┌────────────────┐     ┌──────────┐     ┌─────────────────┐
//! │ QueryRequest │────▶│ ContextBuilder │────▶│ resolver │────▶│ ResponseHandler │──▶ ResponseStream
//! └──────────────┘     │ (full | gated) │     │  + cache │     │  (4 shapes)     │
//!                      └────────────────┘     └──────────┘     └─────────────────┘
//! ```
//!
//! - **Context**: per-request values (`request`, `messages`, `bot_name`, ...)
//!   plus the bound capabilities, with instance-level overrides on top
//! - **Resolver**: context → dependency → default → data type, siblings
//!   resolved concurrently, one dependency cache per pass
//! - **Handler shapes**: async or blocking, stream or single response
//! - **Runtime**: figment configuration, logging, service wiring
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use plume::prelude::*;
//!
//! struct EchoBot;
//!
//! impl EchoBot {
//!     fn get_response(self: Arc<Self>, request: QueryRequest) -> String {
//!         request.last_content().unwrap_or_default().to_string()
//!     }
//! }
//!
//! impl ServerBot for EchoBot {
//!     fn response_handler() -> ResponseHandler<Self> {
//!         ResponseHandler::blocking_single(Param::new("request"), Self::get_response)
//!     }
//! }
//!
//! let service = PlumeRuntime::builder().build()?.service(EchoBot);
//! ```
//!
//! ## Features
//!
//! - `derive`: `#[derive(Injectable)]` (default)
//! - `toml-config` / `yaml-config`: configuration file formats
//! - `json-log`: JSON log output
//! - `test-utils`: `BotTestHelper` with mocked downstream bots

pub use plume_core as core;
pub use plume_framework as framework;
pub use plume_runtime as runtime;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use plume::prelude::*;
/// ```
pub mod prelude {
    pub use std::sync::Arc;

    // Runtime
    pub use plume_runtime::{PlumeConfig, PlumeRuntime};

    // Parameter declarations (`Injectable` is also the derive macro with
    // the `derive` feature)
    pub use plume_core::{Context, DataType, DependsOn, Injectable, Param};

    // Bots and handlers
    pub use plume_framework::{BotService, ResponseHandler, ServerBot, SettingsHandler};

    // Capabilities
    pub use plume_framework::{Attachment, PostAttachment, RemoteCall, StreamCall};

    // Protocol
    pub use plume_framework::{
        ErrorResponse, ProtocolMessage, QueryRequest, ResponseItem, SettingsResponse,
    };

    pub use plume_framework::{Error, Result};
}

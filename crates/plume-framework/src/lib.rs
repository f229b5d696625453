//! # Plume Framework
//!
//! Adapts user-defined bot handlers to the server bot protocol.
//!
//! This layer provides:
//! - Protocol model (requests, messages, settings, response items)
//! - Capabilities (`remote_call`, `stream_call`, `post_attachment`) bound to
//!   the current request, with disabled stubs for blocking handlers
//! - Per-request context assembly with instance-level overrides
//! - Four handler shapes with response normalization
//! - [`BotService`], the adapted entry points, also usable as a `tower::Service`
//! - A test helper with mocked downstream bots (with `test-utils` feature)
//!
//! Parameter resolution itself is provided by `plume-core`.

pub mod capability;
pub mod context;
pub mod error;
pub mod handler;
pub mod protocol;
pub mod service;
pub mod settings;

#[cfg(feature = "test-utils")]
pub mod testing;

pub use capability::{
    Attachment, BotClient, PostAttachment, RemoteCall, RequestInput, ResponseStream, StreamCall,
};
pub use context::{ContextBuilder, RequestContext};
pub use error::{Error, Result};
pub use handler::{HandlerMethod, HandlerOutput, HandlerShape, ResponseHandler};
pub use protocol::{
    ErrorResponse, MessageAttachment, ProtocolMessage, QueryRequest, ResponseItem, Role,
    ServerSentEvent, SettingsRequest, SettingsResponse,
};
pub use service::{BotService, ServerBot};
pub use settings::{IntoSettings, SettingsHandler};

#[cfg(feature = "test-utils")]
pub use testing::{BotTestHelper, MockBot, MockResponses, ResponseText};

//! Per-request context assembly.
//!
//! For every invocation the [`ContextBuilder`] assembles a fresh base
//! [`Context`] from the request, merges the instance-level overrides on top
//! and derives two variants from the result:
//!
//! - the **full** context, handed to async handlers;
//! - the **gated** context, handed to blocking handlers, where every
//!   capability is replaced by a disabled stub.
//!
//! Gating is applied after the merge, so an override cannot re-enable a
//! capability for a blocking handler.
//!
//! | Key | Type | Present |
//! |-----|------|---------|
//! | `request` | [`QueryRequest`] / [`SettingsRequest`] | always |
//! | `messages` | `Vec<ProtocolMessage>` | responses |
//! | `bot_name` | `String` | always |
//! | `user_id`, `conversation_id`, `message_id` | `String` | responses |
//! | `remote_call` | [`RemoteCall`] | with a client, or via overrides |
//! | `stream_call` | [`StreamCall`] | with a client, or via overrides |
//! | `post_attachment` | [`PostAttachment`] | with a client, or via overrides |

use std::sync::Arc;

use plume_core::Context;

use crate::capability::{
    BotClient, POST_ATTACHMENT, PostAttachment, REMOTE_CALL, RemoteCall, STREAM_CALL, StreamCall,
};
use crate::handler::HandlerShape;
use crate::protocol::{QueryRequest, SettingsRequest};

/// Context key of the inbound request.
pub const REQUEST: &str = "request";
/// Context key of the inbound messages.
pub const MESSAGES: &str = "messages";
/// Context key of the responding bot's name.
pub const BOT_NAME: &str = "bot_name";
/// Context key of the requesting user.
pub const USER_ID: &str = "user_id";
/// Context key of the conversation.
pub const CONVERSATION_ID: &str = "conversation_id";
/// Context key of the message being answered.
pub const MESSAGE_ID: &str = "message_id";

/// Builds request contexts for one bot.
#[derive(Clone, Default)]
pub struct ContextBuilder {
    bot_name: String,
    client: Option<Arc<dyn BotClient>>,
    access_key: Option<String>,
    overrides: Context,
}

impl ContextBuilder {
    pub fn new(bot_name: impl Into<String>) -> Self {
        Self {
            bot_name: bot_name.into(),
            ..Self::default()
        }
    }

    /// Binds capabilities to `client`.
    pub fn client(mut self, client: Arc<dyn BotClient>) -> Self {
        self.client = Some(client);
        self
    }

    /// Access key used when a request carries none.
    pub fn access_key(mut self, access_key: impl Into<String>) -> Self {
        self.access_key = Some(access_key.into());
        self
    }

    /// Replaces the instance-level override map.
    pub fn overrides(mut self, overrides: Context) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn bot_name(&self) -> &str {
        &self.bot_name
    }

    pub fn has_client(&self) -> bool {
        self.client.is_some()
    }

    /// Returns the instance-level override map.
    pub fn override_map(&self) -> &Context {
        &self.overrides
    }

    /// Builds both context variants for a response invocation.
    pub fn for_response(&self, request: &QueryRequest) -> RequestContext {
        let mut ctx = Context::new()
            .with(REQUEST, request.clone())
            .with(MESSAGES, request.query.clone())
            .with(BOT_NAME, self.bot_name.clone())
            .with(USER_ID, request.user_id.clone())
            .with(CONVERSATION_ID, request.conversation_id.clone())
            .with(MESSAGE_ID, request.message_id.clone());

        if let Some(client) = &self.client {
            let access_key = self.effective_access_key(request);
            ctx.insert(
                REMOTE_CALL,
                RemoteCall::bound(client.clone(), request.clone(), access_key.clone()),
            );
            ctx.insert(
                STREAM_CALL,
                StreamCall::bound(client.clone(), request.clone(), access_key.clone()),
            );
            ctx.insert(
                POST_ATTACHMENT,
                PostAttachment::bound(client.clone(), request, access_key),
            );
        }

        let full = ctx.merged(&self.overrides);
        let gated = gate(full.clone());
        RequestContext { full, gated }
    }

    /// Builds the context for a settings invocation.
    ///
    /// Capabilities are always disabled.
    pub fn for_settings(&self, request: &SettingsRequest) -> Context {
        let ctx = Context::new()
            .with(REQUEST, request.clone())
            .with(BOT_NAME, self.bot_name.clone())
            .merged(&self.overrides);
        gate(ctx)
    }

    fn effective_access_key(&self, request: &QueryRequest) -> String {
        if request.access_key.is_empty() {
            self.access_key.clone().unwrap_or_default()
        } else {
            request.access_key.clone()
        }
    }
}

impl std::fmt::Debug for ContextBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextBuilder")
            .field("bot_name", &self.bot_name)
            .field("has_client", &self.has_client())
            .field("overrides", &self.overrides)
            .finish_non_exhaustive()
    }
}

/// Replaces every capability of `ctx` with a disabled stub.
pub fn gate(ctx: Context) -> Context {
    ctx.with(REMOTE_CALL, RemoteCall::disabled())
        .with(STREAM_CALL, StreamCall::disabled())
        .with(POST_ATTACHMENT, PostAttachment::disabled())
}

/// The two context variants of one response invocation.
#[derive(Clone, Debug)]
pub struct RequestContext {
    full: Context,
    gated: Context,
}

impl RequestContext {
    /// Context with live capabilities.
    pub fn full(&self) -> &Context {
        &self.full
    }

    /// Context with disabled capabilities.
    pub fn gated(&self) -> &Context {
        &self.gated
    }

    /// Selects the variant a handler of `shape` receives.
    pub fn for_shape(&self, shape: HandlerShape) -> &Context {
        if shape.is_blocking() {
            &self.gated
        } else {
            &self.full
        }
    }
}

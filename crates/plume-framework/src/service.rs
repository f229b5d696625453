//! Bot registration and the adapted entry points.
//!
//! A user bot implements [`ServerBot`] to register its handlers. Wrapping it
//! in a [`BotService`] yields the two entry points the transport calls:
//! [`get_response`](BotService::get_response) and
//! [`get_settings`](BotService::get_settings). `BotService` also implements
//! `tower::Service` for both request types.
//!
//! ```text
//! QueryRequest ─▶ ContextBuilder ─▶ resolver ─▶ ResponseHandler ─▶ ResponseStream
//!                  (full | gated)
//! ```

use std::sync::Arc;
use std::task::{Context as TaskContext, Poll};

use futures::FutureExt;
use futures::future::BoxFuture;
use plume_core::{Context, solve_dependencies};
use tower::Service;
use tracing::{Instrument, debug, debug_span};

use crate::capability::{BotClient, ResponseStream};
use crate::context::ContextBuilder;
use crate::error::{Error, Result};
use crate::handler::{HandlerShape, ResponseHandler};
use crate::protocol::{QueryRequest, SettingsRequest, SettingsResponse};
use crate::settings::SettingsHandler;

/// A server bot.
///
/// ```rust,ignore
/// struct AllCapsBot;
///
/// impl AllCapsBot {
///     fn get_response(
///         self: Arc<Self>,
///         request: QueryRequest,
///         stream_call: StreamCall,
///     ) -> impl Stream<Item = Result<String>> + Send {
///         async_stream::try_stream! {
///             let mut upstream = stream_call.call(request, "GPT-4o-Mini")?;
///             while let Some(item) = upstream.next().await {
///                 yield item?.as_text().unwrap_or_default().to_uppercase();
///             }
///         }
///     }
/// }
///
/// impl ServerBot for AllCapsBot {
///     fn response_handler() -> ResponseHandler<Self> {
///         ResponseHandler::stream(
///             (Param::new("request"), Param::new("stream_call")),
///             Self::get_response,
///         )
///     }
/// }
/// ```
pub trait ServerBot: Send + Sync + Sized + 'static {
    /// Registers the response handler.
    fn response_handler() -> ResponseHandler<Self>;

    /// Registers the settings handler. Without one, settings are all
    /// defaults.
    fn settings_handler() -> Option<SettingsHandler<Self>> {
        None
    }
}

/// A [`ServerBot`] with its handlers registered.
pub struct BotService<B> {
    bot: Arc<B>,
    response: ResponseHandler<B>,
    settings: Option<SettingsHandler<B>>,
    contexts: ContextBuilder,
}

impl<B> Clone for BotService<B> {
    fn clone(&self) -> Self {
        Self {
            bot: self.bot.clone(),
            response: self.response.clone(),
            settings: self.settings.clone(),
            contexts: self.contexts.clone(),
        }
    }
}

impl<B> std::fmt::Debug for BotService<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotService")
            .field("bot", &std::any::type_name::<B>())
            .field("response", &self.response)
            .field("settings", &self.settings)
            .field("contexts", &self.contexts)
            .finish()
    }
}

impl<B: ServerBot> BotService<B> {
    /// Registers `bot` under `bot_name`.
    pub fn new(bot: B, bot_name: impl Into<String>) -> Self {
        Self::from_arc(Arc::new(bot), bot_name)
    }

    /// Registers an already shared bot.
    pub fn from_arc(bot: Arc<B>, bot_name: impl Into<String>) -> Self {
        let contexts = ContextBuilder::new(bot_name);
        let response = B::response_handler();
        debug!(
            bot = %contexts.bot_name(),
            shape = %response.shape(),
            "Registered bot"
        );
        Self {
            bot,
            response,
            settings: B::settings_handler(),
            contexts,
        }
    }

    /// Sets the instance-level override map. Its entries win over the base
    /// context.
    pub fn with_overrides(mut self, overrides: Context) -> Self {
        self.contexts = self.contexts.overrides(overrides);
        self
    }

    /// Binds the capabilities to `client`.
    pub fn with_client(mut self, client: Arc<dyn BotClient>) -> Self {
        self.contexts = self.contexts.client(client);
        self
    }

    /// Access key used for capability calls when a request carries none.
    pub fn with_access_key(mut self, access_key: impl Into<String>) -> Self {
        self.contexts = self.contexts.access_key(access_key);
        self
    }

    pub fn bot(&self) -> &Arc<B> {
        &self.bot
    }

    pub fn bot_name(&self) -> &str {
        self.contexts.bot_name()
    }

    pub fn shape(&self) -> HandlerShape {
        self.response.shape()
    }

    /// Produces the response to `request`.
    ///
    /// Parameters are resolved before the stream is returned: a resolution
    /// failure is reported here and the handler never runs. Errors raised
    /// while the handler runs are items of the stream.
    pub async fn get_response(&self, request: QueryRequest) -> Result<ResponseStream> {
        let shape = self.response.shape();
        let span = debug_span!(
            "get_response",
            bot = %self.bot_name(),
            shape = %shape,
            message_id = %request.message_id,
        );

        async move {
            let contexts = self.contexts.for_response(&request);
            let resolved = solve_dependencies(self.response.signature(), contexts.for_shape(shape))
                .await
                .inspect_err(|err| debug!(error = %err, "Dependency resolution failed"))?;
            debug!(params = resolved.len(), "Invoking response handler");
            self.response.invoke(self.bot.clone(), resolved)
        }
        .instrument(span)
        .await
    }

    /// Produces the bot's settings.
    pub async fn get_settings(&self, request: SettingsRequest) -> Result<SettingsResponse> {
        let Some(handler) = &self.settings else {
            return Ok(SettingsResponse::default());
        };
        let span = debug_span!("get_settings", bot = %self.bot_name());

        async move {
            let ctx = self.contexts.for_settings(&request);
            let resolved = solve_dependencies(handler.signature(), &ctx).await?;
            handler.invoke(self.bot.clone(), resolved).await
        }
        .instrument(span)
        .await
    }
}

impl<B: ServerBot> Service<QueryRequest> for BotService<B> {
    type Response = ResponseStream;
    type Error = Error;
    type Future = BoxFuture<'static, Result<ResponseStream>>;

    fn poll_ready(&mut self, _cx: &mut TaskContext<'_>) -> Poll<Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: QueryRequest) -> Self::Future {
        let service = self.clone();
        async move { service.get_response(request).await }.boxed()
    }
}

impl<B: ServerBot> Service<SettingsRequest> for BotService<B> {
    type Response = SettingsResponse;
    type Error = Error;
    type Future = BoxFuture<'static, Result<SettingsResponse>>;

    fn poll_ready(&mut self, _cx: &mut TaskContext<'_>) -> Poll<Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: SettingsRequest) -> Self::Future {
        let service = self.clone();
        async move { service.get_settings(request).await }.boxed()
    }
}

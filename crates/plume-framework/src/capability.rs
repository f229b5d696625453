//! Capabilities handed to handlers through the resolution context.
//!
//! A handler talks to the platform only through three callables:
//!
//! - [`RemoteCall`] - query another bot and wait for its full answer
//! - [`StreamCall`] - query another bot and stream its answer
//! - [`PostAttachment`] - attach a file to the response message
//!
//! The context builder binds them to the current request on top of a
//! transport-supplied [`BotClient`]. Blocking handlers receive disabled stubs
//! that fail with [`Error::DisabledCapability`] before doing anything.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::{self, BoxFuture};
use futures::stream::{self, BoxStream};
use futures::{FutureExt, StreamExt, TryStreamExt};
use plume_core::BoxError;
use tracing::debug;

use crate::error::{Error, Result};
use crate::protocol::{ProtocolMessage, QueryRequest, ResponseItem};

/// Context key of the [`RemoteCall`] capability.
pub const REMOTE_CALL: &str = "remote_call";
/// Context key of the [`StreamCall`] capability.
pub const STREAM_CALL: &str = "stream_call";
/// Context key of the [`PostAttachment`] capability.
pub const POST_ATTACHMENT: &str = "post_attachment";

/// A stream of canonical response items.
pub type ResponseStream = BoxStream<'static, Result<ResponseItem>>;

// ============================================================================
// RequestInput
// ============================================================================

/// Anything a handler may send to another bot.
#[derive(Clone, Debug, PartialEq)]
pub enum RequestInput {
    /// A single user message.
    Text(String),
    /// One message.
    Message(ProtocolMessage),
    /// A whole conversation.
    Messages(Vec<ProtocolMessage>),
    /// A complete request, forwarded untouched.
    Query(QueryRequest),
}

impl RequestInput {
    /// Builds the request to send.
    ///
    /// Text and messages become a new request carrying the metadata of
    /// `original` (version, type, user, conversation, message id and access
    /// key). A full query passes through unchanged.
    pub fn into_query(self, original: &QueryRequest) -> QueryRequest {
        match self {
            Self::Text(text) => original.with_query(vec![ProtocolMessage::user(text)]),
            Self::Message(message) => original.with_query(vec![message]),
            Self::Messages(messages) => original.with_query(messages),
            Self::Query(query) => query,
        }
    }
}

impl From<&str> for RequestInput {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for RequestInput {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<ProtocolMessage> for RequestInput {
    fn from(message: ProtocolMessage) -> Self {
        Self::Message(message)
    }
}

impl From<Vec<ProtocolMessage>> for RequestInput {
    fn from(messages: Vec<ProtocolMessage>) -> Self {
        Self::Messages(messages)
    }
}

impl From<QueryRequest> for RequestInput {
    fn from(query: QueryRequest) -> Self {
        Self::Query(query)
    }
}

// ============================================================================
// BotClient - transport seam
// ============================================================================

/// A file to attach to the response message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attachment {
    pub data: Vec<u8>,
    pub filename: String,
    pub content_type: Option<String>,
    pub is_inline: bool,
}

impl Attachment {
    pub fn new(data: impl Into<Vec<u8>>, filename: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            filename: filename.into(),
            content_type: None,
            is_inline: false,
        }
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Displays the attachment inline in the message.
    pub fn inline(mut self) -> Self {
        self.is_inline = true;
        self
    }
}

/// Client-side access to the platform, supplied by the transport layer.
///
/// Every method is invoked exactly once per capability call. Implementations
/// must report failures instead of retrying or swallowing them.
#[async_trait]
pub trait BotClient: Send + Sync + 'static {
    /// Sends `request` to `bot_name` and returns its concatenated text.
    async fn get_final_response(
        &self,
        request: QueryRequest,
        bot_name: &str,
        access_key: &str,
    ) -> Result<String, BoxError>;

    /// Sends `request` to `bot_name` and streams its response items.
    async fn stream_request(
        &self,
        request: QueryRequest,
        bot_name: &str,
        access_key: &str,
    ) -> Result<BoxStream<'static, Result<ResponseItem, BoxError>>, BoxError>;

    /// Attaches a file to the message `message_id`.
    async fn post_message_attachment(
        &self,
        message_id: &str,
        access_key: &str,
        attachment: Attachment,
    ) -> Result<(), BoxError>;
}

// ============================================================================
// RemoteCall
// ============================================================================

type RemoteFn = Arc<dyn Fn(RequestInput, String) -> BoxFuture<'static, Result<String>> + Send + Sync>;

/// Queries another bot and returns its full answer.
#[derive(Clone)]
pub struct RemoteCall(Option<RemoteFn>);

impl RemoteCall {
    /// Wraps an arbitrary implementation.
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(RequestInput, String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String>> + Send + 'static,
    {
        Self(Some(Arc::new(move |input, bot| f(input, bot).boxed())))
    }

    /// A stub that fails every call with [`Error::DisabledCapability`].
    pub fn disabled() -> Self {
        Self(None)
    }

    /// Binds `client` to the originating `request`.
    pub fn bound(client: Arc<dyn BotClient>, request: QueryRequest, access_key: String) -> Self {
        Self::new(move |input: RequestInput, bot: String| {
            let client = client.clone();
            let request = input.into_query(&request);
            let access_key = access_key.clone();
            async move {
                debug!(bot = %bot, "Calling bot");
                client
                    .get_final_response(request, &bot, &access_key)
                    .await
                    .map_err(|source| Error::Remote { bot, source })
            }
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.0.is_some()
    }

    /// Sends `input` to `bot_name` and waits for the whole answer.
    pub fn call(
        &self,
        input: impl Into<RequestInput>,
        bot_name: impl Into<String>,
    ) -> BoxFuture<'static, Result<String>> {
        match &self.0 {
            Some(f) => f(input.into(), bot_name.into()),
            None => future::ready(Err(Error::DisabledCapability(REMOTE_CALL))).boxed(),
        }
    }

    /// Blocking variant of [`call`](Self::call).
    ///
    /// Disabled stubs fail without blocking. Must not be used from an async
    /// task.
    pub fn call_blocking(
        &self,
        input: impl Into<RequestInput>,
        bot_name: impl Into<String>,
    ) -> Result<String> {
        futures::executor::block_on(self.call(input, bot_name))
    }
}

impl std::fmt::Debug for RemoteCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("RemoteCall")
            .field(&if self.is_enabled() { "enabled" } else { "disabled" })
            .finish()
    }
}

// ============================================================================
// StreamCall
// ============================================================================

type StreamFn = Arc<dyn Fn(RequestInput, String) -> ResponseStream + Send + Sync>;

/// Queries another bot and streams its answer.
#[derive(Clone)]
pub struct StreamCall(Option<StreamFn>);

impl StreamCall {
    /// Wraps an arbitrary implementation.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(RequestInput, String) -> ResponseStream + Send + Sync + 'static,
    {
        Self(Some(Arc::new(f)))
    }

    /// A stub that fails every call with [`Error::DisabledCapability`].
    pub fn disabled() -> Self {
        Self(None)
    }

    /// Binds `client` to the originating `request`.
    pub fn bound(client: Arc<dyn BotClient>, request: QueryRequest, access_key: String) -> Self {
        Self::new(move |input: RequestInput, bot: String| {
            let client = client.clone();
            let request = input.into_query(&request);
            let access_key = access_key.clone();
            let open = async move {
                debug!(bot = %bot, "Streaming from bot");
                let remote = |source: BoxError| Error::Remote {
                    bot: bot.clone(),
                    source,
                };
                let items = client
                    .stream_request(request, &bot, &access_key)
                    .await
                    .map_err(remote)?;
                let bot = bot.clone();
                Ok::<_, Error>(items.map_err(move |source: BoxError| Error::Remote {
                    bot: bot.clone(),
                    source,
                }))
            };
            stream::once(open).try_flatten().boxed()
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.0.is_some()
    }

    /// Sends `input` to `bot_name` and returns the response stream.
    ///
    /// Fails immediately when the capability is disabled.
    pub fn call(
        &self,
        input: impl Into<RequestInput>,
        bot_name: impl Into<String>,
    ) -> Result<ResponseStream> {
        match &self.0 {
            Some(f) => Ok(f(input.into(), bot_name.into())),
            None => Err(Error::DisabledCapability(STREAM_CALL)),
        }
    }
}

impl std::fmt::Debug for StreamCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("StreamCall")
            .field(&if self.is_enabled() { "enabled" } else { "disabled" })
            .finish()
    }
}

// ============================================================================
// PostAttachment
// ============================================================================

type AttachFn = Arc<dyn Fn(Attachment) -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// Attaches files to the response message.
#[derive(Clone)]
pub struct PostAttachment(Option<AttachFn>);

impl PostAttachment {
    /// Wraps an arbitrary implementation.
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(Attachment) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        Self(Some(Arc::new(move |attachment| f(attachment).boxed())))
    }

    /// A stub that fails every call with [`Error::DisabledCapability`].
    pub fn disabled() -> Self {
        Self(None)
    }

    /// Binds `client` to the message of the originating `request`.
    pub fn bound(client: Arc<dyn BotClient>, request: &QueryRequest, access_key: String) -> Self {
        let message_id = request.message_id.clone();
        Self::new(move |attachment: Attachment| {
            let client = client.clone();
            let message_id = message_id.clone();
            let access_key = access_key.clone();
            async move {
                debug!(filename = %attachment.filename, "Posting attachment");
                client
                    .post_message_attachment(&message_id, &access_key, attachment)
                    .await
                    .map_err(Error::from_boxed)
            }
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.0.is_some()
    }

    /// Uploads `attachment`.
    pub fn call(&self, attachment: Attachment) -> BoxFuture<'static, Result<()>> {
        match &self.0 {
            Some(f) => f(attachment),
            None => future::ready(Err(Error::DisabledCapability(POST_ATTACHMENT))).boxed(),
        }
    }

    /// Blocking variant of [`call`](Self::call).
    pub fn call_blocking(&self, attachment: Attachment) -> Result<()> {
        futures::executor::block_on(self.call(attachment))
    }
}

impl std::fmt::Debug for PostAttachment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("PostAttachment")
            .field(&if self.is_enabled() { "enabled" } else { "disabled" })
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;
    use tokio_test::{assert_err, assert_ok};

    use super::*;

    #[derive(Default)]
    struct RecordingClient {
        calls: Mutex<Vec<(QueryRequest, String, String)>>,
        fail: bool,
    }

    #[async_trait]
    impl BotClient for RecordingClient {
        async fn get_final_response(
            &self,
            request: QueryRequest,
            bot_name: &str,
            access_key: &str,
        ) -> Result<String, BoxError> {
            let content = request.last_content().unwrap_or_default().to_string();
            self.calls
                .lock()
                .push((request, bot_name.to_string(), access_key.to_string()));
            if self.fail {
                return Err("bot offline".into());
            }
            Ok(content.to_uppercase())
        }

        async fn stream_request(
            &self,
            request: QueryRequest,
            bot_name: &str,
            access_key: &str,
        ) -> Result<BoxStream<'static, Result<ResponseItem, BoxError>>, BoxError> {
            self.calls
                .lock()
                .push((request, bot_name.to_string(), access_key.to_string()));
            let items = vec![Ok(ResponseItem::text("a")), Ok(ResponseItem::text("b"))];
            Ok(stream::iter(items).boxed())
        }

        async fn post_message_attachment(
            &self,
            _message_id: &str,
            _access_key: &str,
            _attachment: Attachment,
        ) -> Result<(), BoxError> {
            Ok(())
        }
    }

    fn original() -> QueryRequest {
        let mut request = QueryRequest::new(vec![ProtocolMessage::user("original")]);
        request.access_key = "request-key".to_string();
        request
    }

    #[test]
    fn test_text_input_copies_metadata() {
        let original = original();

        let query = RequestInput::from("hello").into_query(&original);

        assert_eq!(query.query, vec![ProtocolMessage::user("hello")]);
        assert_eq!(query.user_id, original.user_id);
        assert_eq!(query.conversation_id, original.conversation_id);
        assert_eq!(query.message_id, original.message_id);
        assert_eq!(query.access_key, "request-key");
    }

    #[test]
    fn test_query_input_passes_through() {
        let other = QueryRequest::new(vec![ProtocolMessage::user("other")]);

        let query = RequestInput::from(other.clone()).into_query(&original());

        assert_eq!(query, other);
    }

    #[tokio::test]
    async fn test_bound_remote_call_invokes_client_once() {
        let client = Arc::new(RecordingClient::default());
        let remote = RemoteCall::bound(client.clone(), original(), "request-key".to_string());

        let answer = assert_ok!(remote.call("ping", "GPT-4o").await);

        assert_eq!(answer, "PING");
        let calls = client.calls.lock();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].1, "GPT-4o");
        assert_eq!(calls[0].2, "request-key");
    }

    #[tokio::test]
    async fn test_remote_error_not_swallowed() {
        let client = Arc::new(RecordingClient {
            fail: true,
            ..Default::default()
        });
        let remote = RemoteCall::bound(client.clone(), original(), String::new());

        let err = assert_err!(remote.call("ping", "GPT-4o").await);

        assert!(matches!(err, Error::Remote { ref bot, .. } if bot == "GPT-4o"));
        assert_eq!(client.calls.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_bound_stream_call() {
        let client = Arc::new(RecordingClient::default());
        let streaming = StreamCall::bound(client, original(), String::new());

        let items: Vec<_> = assert_ok!(streaming.call("ping", "Claude"))
            .try_collect()
            .await
            .unwrap();

        assert_eq!(items, vec![ResponseItem::text("a"), ResponseItem::text("b")]);
    }

    #[tokio::test]
    async fn test_disabled_stubs_fail() {
        let err = assert_err!(RemoteCall::disabled().call("ping", "GPT-4o").await);
        assert!(matches!(err, Error::DisabledCapability(REMOTE_CALL)));

        let Err(err) = StreamCall::disabled().call("ping", "GPT-4o") else {
            panic!("disabled stream_call should fail");
        };
        assert!(matches!(err, Error::DisabledCapability(STREAM_CALL)));

        let attachment = Attachment::new(b"x".to_vec(), "x.txt");
        let err = assert_err!(PostAttachment::disabled().call(attachment).await);
        assert!(matches!(err, Error::DisabledCapability(POST_ATTACHMENT)));
    }

    #[test]
    fn test_disabled_blocking_call_fails_without_runtime() {
        let err = assert_err!(RemoteCall::disabled().call_blocking("ping", "GPT-4o"));

        assert!(matches!(err, Error::DisabledCapability(REMOTE_CALL)));
    }
}

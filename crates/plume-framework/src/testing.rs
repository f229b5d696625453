//! Test helper for server bots.
//!
//! [`BotTestHelper`] runs a bot through the full adapter with mocked
//! downstream bots injected as the `remote_call` and `stream_call`
//! capabilities, and folds the response items into a [`ResponseText`].
//!
//! ```rust,ignore
//! let helper = BotTestHelper::new();
//! let gpt = helper.mock_bot("GPT-4o-Mini", "hello world");
//!
//! let response = helper.send_message(AllCapsBot, "Hello", None).await?;
//!
//! assert_eq!(response, "HELLO WORLD");
//! assert_eq!(gpt.call_count(), 1);
//! gpt.assert_called_with_content("Hello");
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use futures::{StreamExt, stream};
use parking_lot::Mutex;
use plume_core::Context;
use thiserror::Error;

use crate::capability::{REMOTE_CALL, RemoteCall, RequestInput, STREAM_CALL, StreamCall};
use crate::error::{Error, Result};
use crate::protocol::{
    ProtocolMessage, QueryRequest, ResponseItem, ServerSentEvent, SettingsRequest,
    SettingsResponse,
};
use crate::service::{BotService, ServerBot};

/// Name the bot under test is registered with.
pub const TEST_BOT_NAME: &str = "TestBot";

/// Errors raised by the mocked capabilities.
#[derive(Debug, Error)]
pub enum TestError {
    #[error("Bot {0} not mocked. Use helper.mock_bot(\"{0}\", \"response\")")]
    NotMocked(String),
}

/// Canned answers of a mocked bot.
#[derive(Clone)]
pub enum MockResponses {
    /// One text chunk.
    Text(String),
    /// Several chunks, streamed in order and concatenated for full answers.
    Chunks(Vec<String>),
    /// Chunks computed from the request.
    Dynamic(Arc<dyn Fn(&QueryRequest) -> Vec<String> + Send + Sync>),
}

impl MockResponses {
    /// Computes the chunks from each request.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&QueryRequest) -> Vec<String> + Send + Sync + 'static,
    {
        Self::Dynamic(Arc::new(f))
    }

    fn chunks(&self, request: &QueryRequest) -> Vec<String> {
        match self {
            Self::Text(text) => vec![text.clone()],
            Self::Chunks(chunks) => chunks.clone(),
            Self::Dynamic(f) => f(request),
        }
    }
}

impl From<&str> for MockResponses {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for MockResponses {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Vec<String>> for MockResponses {
    fn from(chunks: Vec<String>) -> Self {
        Self::Chunks(chunks)
    }
}

impl From<Vec<&str>> for MockResponses {
    fn from(chunks: Vec<&str>) -> Self {
        Self::Chunks(chunks.into_iter().map(str::to_string).collect())
    }
}

impl std::fmt::Debug for MockResponses {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Chunks(chunks) => f.debug_tuple("Chunks").field(chunks).finish(),
            Self::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

/// Handle on a mocked bot, recording the requests it received.
#[derive(Clone, Debug)]
pub struct MockBot {
    name: String,
    calls: Arc<Mutex<Vec<QueryRequest>>>,
}

impl MockBot {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            calls: Arc::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of requests received.
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Requests received, in order.
    pub fn calls(&self) -> Vec<QueryRequest> {
        self.calls.lock().clone()
    }

    /// Panics unless a received request contains a message with exactly
    /// `content`.
    #[track_caller]
    pub fn assert_called_with_content(&self, content: &str) {
        let calls = self.calls.lock();
        let found = calls
            .iter()
            .flat_map(|request| &request.query)
            .any(|message| message.content == content);
        if !found {
            let seen: Vec<&str> = calls
                .iter()
                .filter_map(|request| request.query.first())
                .map(|message| message.content.as_str())
                .collect();
            panic!(
                "Expected call to {} with content '{content}' not found. Found:\n{}",
                self.name,
                seen.join("\n")
            );
        }
    }

    fn record(&self, request: QueryRequest) {
        self.calls.lock().push(request);
    }
}

/// The accumulated response of a bot.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResponseText {
    /// Current text.
    pub text: String,
    /// Texts replaced by replace items or by an error, oldest first.
    pub versions: Vec<String>,
    pub suggested_replies: Vec<String>,
    pub events: Vec<ServerSentEvent>,
    /// Set when the response ended with an error item; `text` is then the
    /// error text.
    pub is_error: bool,
}

impl ResponseText {
    fn apply(&mut self, item: ResponseItem) {
        match item {
            ResponseItem::Text { text } => self.text.push_str(&text),
            ResponseItem::Replace { text } => self.replace(text),
            ResponseItem::SuggestedReply { text } => self.suggested_replies.push(text),
            ResponseItem::Event(event) => self.events.push(event),
            ResponseItem::Error(err) => {
                self.replace(err.text);
                self.is_error = true;
            }
        }
    }

    fn replace(&mut self, text: String) {
        let previous = std::mem::replace(&mut self.text, text);
        self.versions.push(previous);
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl std::ops::Deref for ResponseText {
    type Target = str;

    fn deref(&self) -> &str {
        &self.text
    }
}

impl std::fmt::Display for ResponseText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

impl PartialEq<str> for ResponseText {
    fn eq(&self, other: &str) -> bool {
        self.text == other
    }
}

impl PartialEq<&str> for ResponseText {
    fn eq(&self, other: &&str) -> bool {
        self.text == *other
    }
}

struct MockEntry {
    responses: MockResponses,
    handle: MockBot,
}

/// Runs bots against mocked downstream bots.
#[derive(Clone)]
pub struct BotTestHelper {
    mocks: Arc<Mutex<HashMap<String, MockEntry>>>,
    request: QueryRequest,
}

impl Default for BotTestHelper {
    fn default() -> Self {
        Self::new()
    }
}

impl BotTestHelper {
    pub fn new() -> Self {
        Self {
            mocks: Arc::default(),
            request: mock_query_request(),
        }
    }

    /// Mocks the bot `bot_name`. Mocking a bot again replaces its answers
    /// and returns a fresh handle.
    pub fn mock_bot(&self, bot_name: &str, responses: impl Into<MockResponses>) -> MockBot {
        let handle = MockBot::new(bot_name);
        self.mocks.lock().insert(
            bot_name.to_string(),
            MockEntry {
                responses: responses.into(),
                handle: handle.clone(),
            },
        );
        handle
    }

    /// A `remote_call` answering from the mocks.
    pub fn remote_call(&self) -> RemoteCall {
        let helper = self.clone();
        RemoteCall::new(move |input: RequestInput, bot: String| {
            let chunks = helper.answer(input, &bot);
            async move { chunks.map(|chunks| chunks.concat()) }
        })
    }

    /// A `stream_call` answering from the mocks.
    pub fn stream_call(&self) -> StreamCall {
        let helper = self.clone();
        StreamCall::new(move |input: RequestInput, bot: String| {
            match helper.answer(input, &bot) {
                Ok(chunks) => stream::iter(chunks.into_iter().map(|c| Ok(ResponseItem::text(c)))).boxed(),
                Err(err) => stream::once(async move { Err(err) }).boxed(),
            }
        })
    }

    /// Sends `input` to `bot` and accumulates its response.
    ///
    /// `overrides` are merged on top of the mocked capabilities. Reading stops
    /// at the first error item; an error raised by the handler is returned as
    /// is.
    pub async fn send_message<B: ServerBot>(
        &self,
        bot: B,
        input: impl Into<RequestInput>,
        overrides: Option<Context>,
    ) -> Result<ResponseText> {
        let request = input.into().into_query(&self.request);
        let service = self.service(bot, overrides);

        let mut items = service.get_response(request).await?;
        let mut response = ResponseText::default();
        while let Some(item) = items.next().await {
            response.apply(item?);
            if response.is_error {
                break;
            }
        }
        Ok(response)
    }

    /// Fetches the settings of `bot`.
    pub async fn get_settings<B: ServerBot>(
        &self,
        bot: B,
        overrides: Option<Context>,
    ) -> Result<SettingsResponse> {
        let service = self.service(bot, overrides);
        service.get_settings(SettingsRequest::default()).await
    }

    fn service<B: ServerBot>(&self, bot: B, overrides: Option<Context>) -> BotService<B> {
        let mut ctx = Context::new()
            .with(REMOTE_CALL, self.remote_call())
            .with(STREAM_CALL, self.stream_call());
        if let Some(overrides) = overrides {
            ctx.merge(&overrides);
        }
        BotService::new(bot, TEST_BOT_NAME).with_overrides(ctx)
    }

    fn answer(&self, input: RequestInput, bot_name: &str) -> Result<Vec<String>> {
        // Released before the responses run: a dynamic mock may call back into the helper.
        let (responses, handle) = {
            let mocks = self.mocks.lock();
            let entry = mocks.get(bot_name).ok_or_else(|| {
                Error::Handler(Box::new(TestError::NotMocked(bot_name.to_string())))
            })?;
            (entry.responses.clone(), entry.handle.clone())
        };
        let request = input.into_query(&self.request);
        let chunks = responses.chunks(&request);
        handle.record(request);
        Ok(chunks)
    }
}

impl std::fmt::Debug for BotTestHelper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mocks = self.mocks.lock();
        let mut names: Vec<&str> = mocks.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("BotTestHelper")
            .field("mocked_bots", &names)
            .finish()
    }
}

/// The request every test message is derived from.
pub fn mock_query_request() -> QueryRequest {
    QueryRequest {
        query: Vec::<ProtocolMessage>::new(),
        version: "1.0".to_string(),
        request_type: "query".to_string(),
        user_id: "test_user".to_string(),
        conversation_id: "test_conv".to_string(),
        message_id: "test_msg".to_string(),
        access_key: "test_key".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unmocked_bot_error() {
        let helper = BotTestHelper::new();

        let err = helper.remote_call().call("hi", "Unknown").await.unwrap_err();

        assert!(err.to_string().contains("Bot Unknown not mocked"));
        assert!(err.downcast_handler_ref::<TestError>().is_some());
    }

    #[tokio::test]
    async fn test_mock_records_normalized_request() {
        let helper = BotTestHelper::new();
        let gpt = helper.mock_bot("GPT-4o", vec!["Hello", " world"]);

        let answer = helper.remote_call().call("Hi there", "GPT-4o").await.unwrap();

        assert_eq!(answer, "Hello world");
        assert_eq!(gpt.call_count(), 1);
        gpt.assert_called_with_content("Hi there");
        assert_eq!(gpt.calls()[0].access_key, "test_key");
    }

    #[tokio::test]
    async fn test_dynamic_mock_may_use_helper() {
        let helper = BotTestHelper::new();
        let inner = helper.clone();
        helper.mock_bot(
            "Router",
            MockResponses::from_fn(move |request| {
                let content = request.last_content().unwrap_or_default().to_string();
                inner.mock_bot("Follower", content.clone());
                vec![format!("routed {content}")]
            }),
        );

        let answer = helper.remote_call().call("hello", "Router").await.unwrap();
        let follower = helper.remote_call().call("again", "Follower").await.unwrap();

        assert_eq!(answer, "routed hello");
        assert_eq!(follower, "hello");
    }

    #[test]
    fn test_response_text_folding() {
        let mut response = ResponseText::default();
        response.apply(ResponseItem::text("Working"));
        response.apply(ResponseItem::suggested_reply("More?"));
        response.apply(ResponseItem::replace("Done"));

        assert_eq!(response, "Done");
        assert_eq!(response.versions, vec!["Working".to_string()]);
        assert_eq!(response.suggested_replies, vec!["More?".to_string()]);
        assert!(!response.is_error);
    }

    #[test]
    #[should_panic(expected = "not found")]
    fn test_assert_called_with_content_panics() {
        let helper = BotTestHelper::new();
        let gpt = helper.mock_bot("GPT-4o", "ok");

        gpt.assert_called_with_content("never sent");
    }
}

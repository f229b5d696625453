//! Wraps another bot and shouts its answer.

use futures::{Stream, StreamExt};
use plume::prelude::*;

/// Bot whose answer is upper-cased.
pub const UPSTREAM_BOT: &str = "GPT-3.5-Turbo";

pub struct AllCapsBot;

impl AllCapsBot {
    fn get_response(
        self: Arc<Self>,
        messages: Vec<ProtocolMessage>,
        stream_call: StreamCall,
    ) -> impl Stream<Item = Result<ResponseItem>> + Send {
        async_stream::try_stream! {
            let mut upstream = stream_call.call(messages, UPSTREAM_BOT)?;
            while let Some(item) = upstream.next().await {
                yield match item? {
                    ResponseItem::Text { text } => ResponseItem::text(text.to_uppercase()),
                    ResponseItem::Replace { text } => ResponseItem::replace(text.to_uppercase()),
                    other => other,
                };
            }
        }
    }

    fn get_settings(self: Arc<Self>) -> SettingsResponse {
        SettingsResponse {
            server_bot_dependencies: [(UPSTREAM_BOT.to_string(), 1)].into(),
            ..SettingsResponse::default()
        }
    }
}

impl ServerBot for AllCapsBot {
    fn response_handler() -> ResponseHandler<Self> {
        ResponseHandler::stream(
            (Param::new("messages"), Param::new("stream_call")),
            Self::get_response,
        )
    }

    fn settings_handler() -> Option<SettingsHandler<Self>> {
        Some(SettingsHandler::new((), Self::get_settings))
    }
}

//! Streams another bot's answer, then offers follow-up actions.

use futures::{Stream, StreamExt};
use plume::prelude::*;

pub const UPSTREAM_BOT: &str = "Claude-3.5-Sonnet";

pub const ACTIONS: [&str; 4] = ["Expand", "Condense", "Polish", "Simplify"];

pub struct SuggestedRepliesBot;

impl SuggestedRepliesBot {
    fn get_response(
        self: Arc<Self>,
        request: QueryRequest,
        stream_call: StreamCall,
    ) -> impl Stream<Item = Result<ResponseItem>> + Send {
        async_stream::try_stream! {
            let mut upstream = stream_call.call(request, UPSTREAM_BOT)?;
            while let Some(item) = upstream.next().await {
                yield item?;
            }
            for action in ACTIONS {
                yield ResponseItem::suggested_reply(action);
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

impl ServerBot for SuggestedRepliesBot {
    fn response_handler() -> ResponseHandler<Self> {
        ResponseHandler::stream(
            (Param::new("request"), Param::new("stream_call")),
            Self::get_response,
        )
    }

    fn settings_handler() -> Option<SettingsHandler<Self>> {
        Some(SettingsHandler::new((), Self::get_settings))
    }
}

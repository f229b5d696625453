//! A [`BotClient`] that answers locally, for trying bots without a platform.

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::{self, BoxStream};
use plume::core::BoxError;
use plume::framework::{Attachment, BotClient, QueryRequest, ResponseItem};
use tracing::info;

/// Answers every bot with `"<bot>: <last message>"`, streamed word by word.
#[derive(Clone, Debug, Default)]
pub struct LocalClient;

impl LocalClient {
    fn answer(request: &QueryRequest, bot_name: &str) -> String {
        format!("{bot_name}: {}", request.last_content().unwrap_or_default())
    }
}

#[async_trait]
impl BotClient for LocalClient {
    async fn get_final_response(
        &self,
        request: QueryRequest,
        bot_name: &str,
        _access_key: &str,
    ) -> Result<String, BoxError> {
        Ok(Self::answer(&request, bot_name))
    }

    async fn stream_request(
        &self,
        request: QueryRequest,
        bot_name: &str,
        _access_key: &str,
    ) -> Result<BoxStream<'static, Result<ResponseItem, BoxError>>, BoxError> {
        let answer = Self::answer(&request, bot_name);
        let chunks: Vec<String> = answer
            .split_inclusive(' ')
            .map(str::to_string)
            .collect();
        Ok(stream::iter(chunks)
            .map(|chunk| Ok(ResponseItem::text(chunk)))
            .boxed())
    }

    async fn post_message_attachment(
        &self,
        message_id: &str,
        _access_key: &str,
        attachment: Attachment,
    ) -> Result<(), BoxError> {
        info!(message_id, filename = %attachment.filename, "Attachment posted");
        Ok(())
    }
}

//! Asks several bots, then lets a judge bot pick the best answer.

use std::collections::{BTreeMap, HashMap};

use futures::future::join_all;
use plume::prelude::*;
use tracing::{debug, warn};

const JUDGE_PROMPT: &str =
    "Which response is best? Output only the key from the json. Nothing else is permitted. \n\n";

/// Which bots are asked and which one judges.
///
/// Resolved as a data type: a handler parameter `config` is built from the
/// `decision_bot` and `bots` context entries or the defaults below, unless
/// the context holds a whole `config`.
#[derive(Clone, Debug, PartialEq, Injectable)]
#[inject(crate = "plume::core")]
pub struct BestResponseConfig {
    #[inject(default = "Claude-3-Haiku".to_string())]
    pub decision_bot: String,
    #[inject(default = vec!["Claude-3-Haiku".to_string(), "GPT-3.5-Turbo".to_string()])]
    pub bots: Vec<String>,
}

impl BestResponseConfig {
    /// How often each bot is called per request.
    pub fn bot_dependencies(&self) -> HashMap<String, u32> {
        let mut counts = HashMap::new();
        for bot in self.bots.iter().chain([&self.decision_bot]) {
            *counts.entry(bot.clone()).or_insert(0) += 1;
        }
        counts
    }
}

/// Queries a candidate, reporting a failed candidate as an empty answer.
async fn ask_candidate(remote_call: &RemoteCall, request: &QueryRequest, bot: &str) -> (String, String) {
    match remote_call.call(request.clone(), bot).await {
        Ok(answer) => (bot.to_string(), answer),
        Err(err) => {
            warn!(bot, error = %err, "Candidate bot failed");
            (bot.to_string(), String::new())
        }
    }
}

pub struct BestResponseBot;

impl BestResponseBot {
    async fn get_response(
        self: Arc<Self>,
        request: QueryRequest,
        remote_call: RemoteCall,
        config: BestResponseConfig,
    ) -> Result<String> {
        let answers: BTreeMap<String, String> = join_all(
            config
                .bots
                .iter()
                .map(|bot| ask_candidate(&remote_call, &request, bot)),
        )
        .await
        .into_iter()
        .collect();

        let listing = serde_json::to_string_pretty(&answers).map_err(|e| Error::Handler(e.into()))?;
        let best = remote_call
            .call(format!("{JUDGE_PROMPT}{listing}"), config.decision_bot.as_str())
            .await?;
        debug!(best = %best, "Judge decided");

        let fallback = config.bots.first().and_then(|bot| answers.get(bot));
        Ok(answers
            .get(best.trim())
            .or(fallback)
            .cloned()
            .unwrap_or_default())
    }

    fn get_settings(self: Arc<Self>, config: BestResponseConfig) -> SettingsResponse {
        SettingsResponse {
            server_bot_dependencies: config.bot_dependencies(),
            ..SettingsResponse::default()
        }
    }
}

impl ServerBot for BestResponseBot {
    fn response_handler() -> ResponseHandler<Self> {
        ResponseHandler::single(
            (
                Param::new("request"),
                Param::new("remote_call"),
                Param::new("config").auto(),
            ),
            Self::get_response,
        )
    }

    fn settings_handler() -> Option<SettingsHandler<Self>> {
        Some(SettingsHandler::new(
            Param::new("config").auto(),
            Self::get_settings,
        ))
    }
}

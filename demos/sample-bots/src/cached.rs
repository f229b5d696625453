//! Caches answers of a downstream image bot across requests.
//!
//! The cache is a dependency of a dependency: `CachedRemoteCall` is built
//! from the request's `remote_call` and a `response_cache`, which falls back
//! to one process-wide cache. Supplying `response_cache` through the
//! overrides replaces it.

use std::collections::HashMap;
use std::sync::LazyLock;

use parking_lot::Mutex;
use plume::prelude::*;
use serde_json::json;
use tracing::debug;

pub const IMAGE_BOT: &str = "FLUX-pro-1.1";

const PROMPT_PREFIX: &str = "Output only Black&white image\n";

/// Answers keyed by bot and prompt.
#[derive(Clone, Debug, Default)]
pub struct ResponseCache(Arc<Mutex<HashMap<(String, String), String>>>);

impl ResponseCache {
    pub fn len(&self) -> usize {
        self.0.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get(&self, bot_name: &str, prompt: &str) -> Option<String> {
        self.0
            .lock()
            .get(&(bot_name.to_string(), prompt.to_string()))
            .cloned()
    }

    fn insert(&self, bot_name: &str, prompt: &str, answer: String) {
        self.0
            .lock()
            .insert((bot_name.to_string(), prompt.to_string()), answer);
    }
}

/// The process-wide cache.
pub fn shared_cache() -> ResponseCache {
    static CACHE: LazyLock<ResponseCache> = LazyLock::new(ResponseCache::default);
    CACHE.clone()
}

/// `remote_call` answering repeated prompts from a cache.
#[derive(Clone, Debug)]
pub struct CachedRemoteCall {
    remote_call: RemoteCall,
    cache: ResponseCache,
}

impl CachedRemoteCall {
    pub fn new(remote_call: RemoteCall, cache: ResponseCache) -> Self {
        Self { remote_call, cache }
    }

    pub async fn call(&self, prompt: &str, bot_name: &str) -> Result<String> {
        if let Some(answer) = self.cache.get(bot_name, prompt) {
            debug!(bot = bot_name, "Answer served from cache");
            return Ok(answer);
        }
        let answer = self.remote_call.call(prompt, bot_name).await?;
        self.cache.insert(bot_name, prompt, answer.clone());
        Ok(answer)
    }
}

fn cached_remote_call_dependency() -> DependsOn<CachedRemoteCall> {
    DependsOn::new(
        (
            Param::new("remote_call"),
            Param::new("response_cache").depends_on(DependsOn::new((), shared_cache)),
        ),
        CachedRemoteCall::new,
    )
}

pub struct CachedBot;

impl CachedBot {
    async fn get_response(
        self: Arc<Self>,
        messages: Vec<ProtocolMessage>,
        cached_remote_call: CachedRemoteCall,
    ) -> Result<String> {
        let last = messages.last().map(|m| m.content.as_str()).unwrap_or_default();
        let prompt = format!("{PROMPT_PREFIX}{last}");
        cached_remote_call.call(&prompt, IMAGE_BOT).await
    }

    fn get_settings(self: Arc<Self>) -> serde_json::Value {
        json!({ "server_bot_dependencies": { IMAGE_BOT: 1 } })
    }
}

impl ServerBot for CachedBot {
    fn response_handler() -> ResponseHandler<Self> {
        ResponseHandler::single(
            (
                Param::new("messages"),
                Param::new("cached_remote_call").depends_on(cached_remote_call_dependency()),
            ),
            Self::get_response,
        )
    }

    fn settings_handler() -> Option<SettingsHandler<Self>> {
        Some(SettingsHandler::new((), Self::get_settings))
    }
}

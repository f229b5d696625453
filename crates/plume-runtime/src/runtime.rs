//! Process-level wiring of configuration, logging and bot services.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use plume_runtime::PlumeRuntime;
//!
//! // Loads plume.toml from the current directory or the user config dir
//! let runtime = PlumeRuntime::builder().build()?.with_client(client);
//!
//! let service = runtime.service(EchoBot);
//! let stream = service.get_response(request).await?;
//! ```

use std::path::Path;
use std::sync::Arc;

use plume_framework::{BotClient, BotService, ServerBot};
use tracing::info;

use crate::config::{ConfigLoader, ConfigResult, PlumeConfig, validate_config};
use crate::logging;

/// Configured runtime: owns the configuration and the transport client
/// bots are bound to.
#[derive(Clone)]
pub struct PlumeRuntime {
    config: PlumeConfig,
    client: Option<Arc<dyn BotClient>>,
}

impl PlumeRuntime {
    /// Creates a runtime builder loading the configuration from files and
    /// the environment.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Validates `config` and initializes logging from it.
    ///
    /// Logging is left untouched if a global subscriber is already installed.
    pub fn from_config(config: PlumeConfig) -> ConfigResult<Self> {
        validate_config(&config)?;
        logging::init_from_config(&config.logging);

        info!(
            bot = %config.bot.name,
            access_key = config.bot.access_key.is_some(),
            "Runtime initialized"
        );

        Ok(Self {
            config,
            client: None,
        })
    }

    /// Binds every service created afterwards to `client`.
    pub fn with_client(mut self, client: Arc<dyn BotClient>) -> Self {
        self.client = Some(client);
        self
    }

    pub fn config(&self) -> &PlumeConfig {
        &self.config
    }

    /// Wraps `bot` into a [`BotService`] carrying the configured bot name,
    /// fallback access key and client.
    pub fn service<B: ServerBot>(&self, bot: B) -> BotService<B> {
        self.service_arc(Arc::new(bot))
    }

    /// Like [`service`](Self::service) for an already shared bot.
    pub fn service_arc<B: ServerBot>(&self, bot: Arc<B>) -> BotService<B> {
        let mut service = BotService::from_arc(bot, self.config.bot.name.clone());
        if let Some(access_key) = &self.config.bot.access_key {
            service = service.with_access_key(access_key.clone());
        }
        if let Some(client) = &self.client {
            service = service.with_client(client.clone());
        }
        service
    }
}

impl std::fmt::Debug for PlumeRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlumeRuntime")
            .field("bot", &self.config.bot.name)
            .field("client", &self.client.is_some())
            .finish()
    }
}

/// Builder for [`PlumeRuntime`].
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
}

impl RuntimeBuilder {
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new(),
        }
    }

    /// Sets a specific configuration file to load.
    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    /// Sets the configuration profile (e.g. "development", "production").
    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    /// Adds a search path for configuration files.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    /// Disables loading environment variables.
    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Merges configuration values on top of every other source.
    pub fn merge(mut self, config: PlumeConfig) -> Self {
        self.config_loader = self.config_loader.merge(config);
        self
    }

    /// Loads the configuration and builds the runtime.
    pub fn build(self) -> ConfigResult<PlumeRuntime> {
        PlumeRuntime::from_config(self.config_loader.load()?)
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use futures::StreamExt;
    use futures::stream::BoxStream;
    use plume_core::{BoxError, Param};
    use plume_framework::{
        Attachment, Error, ProtocolMessage, QueryRequest, RemoteCall, ResponseHandler,
        ResponseItem,
    };

    use super::*;
    use crate::config::ConfigError;

    /// Answers with the access key it was called with.
    struct KeyEchoClient;

    #[async_trait]
    impl BotClient for KeyEchoClient {
        async fn get_final_response(
            &self,
            _request: QueryRequest,
            bot_name: &str,
            access_key: &str,
        ) -> Result<String, BoxError> {
            Ok(format!("{bot_name}/{access_key}"))
        }

        async fn stream_request(
            &self,
            _request: QueryRequest,
            _bot_name: &str,
            _access_key: &str,
        ) -> Result<BoxStream<'static, Result<ResponseItem, BoxError>>, BoxError> {
            Ok(futures::stream::empty().boxed())
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

    struct RelayBot;

    impl RelayBot {
        async fn get_response(
            self: Arc<Self>,
            bot_name: String,
            remote_call: RemoteCall,
        ) -> Result<String, Error> {
            let answer = remote_call.call("hi", "Downstream").await?;
            Ok(format!("{bot_name} via {answer}"))
        }
    }

    impl ServerBot for RelayBot {
        fn response_handler() -> ResponseHandler<Self> {
            ResponseHandler::single(
                (Param::new("bot_name"), Param::new("remote_call")),
                Self::get_response,
            )
        }
    }

    fn config(name: &str, access_key: Option<&str>) -> PlumeConfig {
        let mut config = PlumeConfig::default();
        config.bot.name = name.to_string();
        config.bot.access_key = access_key.map(str::to_string);
        config
    }

    async fn respond(service: &BotService<RelayBot>, access_key: &str) -> String {
        let mut request = QueryRequest::new(vec![ProtocolMessage::user("hello")]);
        request.access_key = access_key.to_string();
        let mut items = service.get_response(request).await.unwrap();
        let item = items.next().await.unwrap().unwrap();
        item.as_text().unwrap().to_string()
    }

    #[test]
    fn test_from_config_rejects_empty_name() {
        let err = PlumeRuntime::from_config(config("", None)).unwrap_err();

        assert!(matches!(err, ConfigError::MissingField { .. }));
    }

    #[tokio::test]
    async fn test_service_uses_configured_name_and_fallback_key() {
        let runtime = PlumeRuntime::from_config(config("Relay", Some("cfg-key")))
            .unwrap()
            .with_client(Arc::new(KeyEchoClient));
        let service = runtime.service(RelayBot);

        assert_eq!(service.bot_name(), "Relay");
        assert_eq!(respond(&service, "").await, "Relay via Downstream/cfg-key");
        assert_eq!(
            respond(&service, "request-key").await,
            "Relay via Downstream/request-key"
        );
    }

    #[tokio::test]
    async fn test_service_without_client_cannot_call_out() {
        let runtime = PlumeRuntime::from_config(config("Relay", None)).unwrap();
        let service = runtime.service(RelayBot);

        let result = service
            .get_response(QueryRequest::new(vec![ProtocolMessage::user("hello")]))
            .await;

        assert!(matches!(result, Err(Error::UnresolvableDependency(ref p)) if p == "remote_call"));
    }
}

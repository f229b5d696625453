//! Settings handlers.
//!
//! A settings handler declares its parameters like a response handler and
//! returns anything that [`IntoSettings`]: the canonical
//! [`SettingsResponse`], a JSON object of settings keys, or a `Result` of
//! either. It is invoked once per settings request with the gated context.

use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::{self, BoxFuture};
use plume_core::{BoxError, ParamList, Resolved, Signature};

use crate::error::{Error, Result};
use crate::handler::HandlerMethod;
use crate::protocol::SettingsResponse;

/// A value describing a bot's settings.
pub trait IntoSettings: Send + 'static {
    fn into_settings(self) -> Result<SettingsResponse>;
}

impl IntoSettings for SettingsResponse {
    fn into_settings(self) -> Result<SettingsResponse> {
        Ok(self)
    }
}

/// Keys missing from the object take their defaults. Anything but an object,
/// or an entry of the wrong type, fails with [`Error::InvalidSettings`].
impl IntoSettings for serde_json::Value {
    fn into_settings(self) -> Result<SettingsResponse> {
        serde_json::from_value(self).map_err(Error::InvalidSettings)
    }
}

impl IntoSettings for serde_json::Map<String, serde_json::Value> {
    fn into_settings(self) -> Result<SettingsResponse> {
        serde_json::Value::Object(self).into_settings()
    }
}

impl<T, E> IntoSettings for std::result::Result<T, E>
where
    T: IntoSettings,
    E: Into<BoxError> + Send + 'static,
{
    fn into_settings(self) -> Result<SettingsResponse> {
        match self {
            Ok(value) => value.into_settings(),
            Err(err) => Err(Error::from_boxed(err.into())),
        }
    }
}

type SettingsFn<B> =
    Arc<dyn Fn(Arc<B>, Resolved) -> BoxFuture<'static, Result<SettingsResponse>> + Send + Sync>;

/// A registered settings handler.
pub struct SettingsHandler<B> {
    signature: Signature,
    invoke: SettingsFn<B>,
}

impl<B> Clone for SettingsHandler<B> {
    fn clone(&self) -> Self {
        Self {
            signature: self.signature.clone(),
            invoke: self.invoke.clone(),
        }
    }
}

impl<B> std::fmt::Debug for SettingsHandler<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsHandler")
            .field("params", &self.signature.names().collect::<Vec<_>>())
            .finish()
    }
}

impl<B: Send + Sync + 'static> SettingsHandler<B> {
    /// Registers a synchronous settings handler. It runs inline.
    pub fn new<P, M, R>(params: P, method: M) -> Self
    where
        P: ParamList,
        M: HandlerMethod<B, P::Values, R>,
        R: IntoSettings,
    {
        Self::from_parts(params, move |bot, args| {
            future::ready(method.call(bot, args).into_settings()).boxed()
        })
    }

    /// Registers an async settings handler.
    pub fn new_async<P, M, Fut>(params: P, method: M) -> Self
    where
        P: ParamList,
        M: HandlerMethod<B, P::Values, Fut>,
        Fut: Future + Send + 'static,
        Fut::Output: IntoSettings,
    {
        Self::from_parts(params, move |bot, args| {
            method
                .call(bot, args)
                .map(IntoSettings::into_settings)
                .boxed()
        })
    }

    /// Declarations of the handler's parameters.
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Runs the handler on already resolved parameters.
    pub fn invoke(&self, bot: Arc<B>, resolved: Resolved) -> BoxFuture<'static, Result<SettingsResponse>> {
        (self.invoke)(bot, resolved)
    }

    fn from_parts<P, G>(params: P, run: G) -> Self
    where
        P: ParamList,
        G: Fn(Arc<B>, P::Values) -> BoxFuture<'static, Result<SettingsResponse>>
            + Send
            + Sync
            + 'static,
    {
        let signature = params.signature();
        let invoke: SettingsFn<B> = Arc::new(move |bot, mut resolved| {
            match params.extract(&mut resolved) {
                Ok(args) => run(bot, args),
                Err(err) => future::ready(Err(Error::from(err))).boxed(),
            }
        });

        Self { signature, invoke }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_json_object_into_settings() {
        let settings = json!({ "allow_attachments": true, "introduction_message": "Hi" })
            .into_settings()
            .unwrap();

        assert!(settings.allow_attachments);
        assert_eq!(settings.introduction_message, "Hi");
        assert!(settings.expand_text_attachments);
    }

    #[test]
    fn test_non_object_rejected() {
        assert!(matches!(
            json!(["allow_attachments"]).into_settings(),
            Err(Error::InvalidSettings(_))
        ));
        assert!(matches!(
            json!({ "allow_attachments": "yes" }).into_settings(),
            Err(Error::InvalidSettings(_))
        ));
    }

    #[test]
    fn test_result_error_propagates() {
        let output: std::result::Result<SettingsResponse, std::io::Error> =
            Err(std::io::Error::other("no settings"));

        let err = output.into_settings().unwrap_err();

        assert_eq!(err.to_string(), "no settings");
    }
}

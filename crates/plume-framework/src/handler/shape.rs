//! Handler shapes.
//!
//! A response handler has one of four shapes, fixed when it is registered:
//!
//! | Shape | Handler returns | Context | Runs on |
//! |-------|-----------------|---------|---------|
//! | [`Stream`](HandlerShape::Stream) | `impl Stream<Item = O>` | full | the invoking task |
//! | [`Single`](HandlerShape::Single) | `impl Future<Output = O>` | full | the invoking task |
//! | [`BlockingStream`](HandlerShape::BlockingStream) | `impl IntoIterator<Item = O>` | gated | the blocking pool |
//! | [`BlockingSingle`](HandlerShape::BlockingSingle) | `O` | gated | the blocking pool |
//!
//! where `O` is any [`HandlerOutput`].

use std::future::Future;
use std::sync::Arc;

use futures::stream::{self, Stream};
use futures::{FutureExt, StreamExt};
use plume_core::{ParamList, Resolved, Signature};
use tokio::sync::mpsc;
use tokio::task::JoinError;

use super::method::HandlerMethod;
use super::output::{HandlerOutput, normalize_stream, single_item, stream_item};
use crate::capability::ResponseStream;
use crate::error::{Error, Result};
use crate::protocol::ResponseItem;

/// How a handler produces its response.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HandlerShape {
    /// Async stream of values.
    Stream,
    /// Async function returning one value.
    Single,
    /// Blocking iterator of values.
    BlockingStream,
    /// Blocking function returning one value.
    BlockingSingle,
}

impl HandlerShape {
    /// Blocking shapes receive the gated context.
    pub fn is_blocking(self) -> bool {
        matches!(self, Self::BlockingStream | Self::BlockingSingle)
    }

    pub fn is_stream(self) -> bool {
        matches!(self, Self::Stream | Self::BlockingStream)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stream => "stream",
            Self::Single => "single",
            Self::BlockingStream => "blocking_stream",
            Self::BlockingSingle => "blocking_single",
        }
    }
}

impl std::fmt::Display for HandlerShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

type InvokeFn<B> = Arc<dyn Fn(Arc<B>, Resolved) -> Result<ResponseStream> + Send + Sync>;

/// A registered response handler: its shape, its parameter declarations and
/// the erased method.
pub struct ResponseHandler<B> {
    shape: HandlerShape,
    signature: Signature,
    invoke: InvokeFn<B>,
}

impl<B> Clone for ResponseHandler<B> {
    fn clone(&self) -> Self {
        Self {
            shape: self.shape,
            signature: self.signature.clone(),
            invoke: self.invoke.clone(),
        }
    }
}

impl<B> std::fmt::Debug for ResponseHandler<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseHandler")
            .field("shape", &self.shape)
            .field("params", &self.signature.names().collect::<Vec<_>>())
            .finish()
    }
}

impl<B: Send + Sync + 'static> ResponseHandler<B> {
    /// Registers an async stream handler.
    ///
    /// ```rust,ignore
    /// fn get_response(self: Arc<Self>, messages: Vec<ProtocolMessage>)
    ///     -> impl Stream<Item = String> + Send
    /// {
    ///     async_stream::stream! {
    ///         for m in messages { yield m.content; }
    ///     }
    /// }
    ///
    /// ResponseHandler::stream(Param::new("messages"), Self::get_response)
    /// ```
    pub fn stream<P, M, S>(params: P, method: M) -> Self
    where
        P: ParamList,
        M: HandlerMethod<B, P::Values, S>,
        S: Stream + Send + 'static,
        S::Item: HandlerOutput,
    {
        Self::from_parts(HandlerShape::Stream, params, move |bot, args| {
            normalize_stream(method.call(bot, args))
        })
    }

    /// Registers an async handler returning one value.
    pub fn single<P, M, Fut>(params: P, method: M) -> Self
    where
        P: ParamList,
        M: HandlerMethod<B, P::Values, Fut>,
        Fut: Future + Send + 'static,
        Fut::Output: HandlerOutput,
    {
        Self::from_parts(HandlerShape::Single, params, move |bot, args| {
            method.call(bot, args).map(single_item).into_stream().boxed()
        })
    }

    /// Registers a blocking handler producing several values.
    ///
    /// The handler runs on the blocking thread pool. Values are handed over
    /// one at a time, and iteration stops as soon as the response stream is
    /// dropped or an error was produced.
    pub fn blocking_stream<P, M, I>(params: P, method: M) -> Self
    where
        P: ParamList,
        M: HandlerMethod<B, P::Values, I>,
        I: IntoIterator + 'static,
        I::Item: HandlerOutput,
    {
        let method = Arc::new(method);
        Self::from_parts(HandlerShape::BlockingStream, params, move |bot, args| {
            let method = method.clone();
            let items = async_stream::stream! {
                let (tx, mut rx) = mpsc::channel(1);
                let producer = tokio::task::spawn_blocking(move || {
                    drain_blocking(method.call(bot, args), tx);
                });

                while let Some(item) = rx.recv().await {
                    yield item;
                }

                if let Err(err) = producer.await {
                    yield Err(join_error(err));
                }
            };
            items.boxed()
        })
    }

    /// Registers a blocking handler returning one value.
    ///
    /// The handler runs on the blocking thread pool.
    pub fn blocking_single<P, M, R>(params: P, method: M) -> Self
    where
        P: ParamList,
        M: HandlerMethod<B, P::Values, R>,
        R: HandlerOutput,
    {
        let method = Arc::new(method);
        Self::from_parts(HandlerShape::BlockingSingle, params, move |bot, args| {
            let method = method.clone();
            stream::once(async move {
                tokio::task::spawn_blocking(move || single_item(method.call(bot, args)))
                    .await
                    .unwrap_or_else(|err| Err(join_error(err)))
            })
            .boxed()
        })
    }

    pub fn shape(&self) -> HandlerShape {
        self.shape
    }

    /// Declarations of the handler's parameters.
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Runs the handler on already resolved parameters.
    ///
    /// Fails before running anything when a resolved value does not have
    /// the declared type.
    pub fn invoke(&self, bot: Arc<B>, resolved: Resolved) -> Result<ResponseStream> {
        (self.invoke)(bot, resolved)
    }

    fn from_parts<P, G>(shape: HandlerShape, params: P, run: G) -> Self
    where
        P: ParamList,
        G: Fn(Arc<B>, P::Values) -> ResponseStream + Send + Sync + 'static,
    {
        let signature = params.signature();
        let invoke: InvokeFn<B> = Arc::new(move |bot, mut resolved| {
            let args = params.extract(&mut resolved).map_err(Error::from)?;
            Ok(run(bot, args))
        });

        Self {
            shape,
            signature,
            invoke,
        }
    }
}

/// Iterates a blocking handler's values into `tx`.
fn drain_blocking<I>(outputs: I, tx: mpsc::Sender<Result<ResponseItem>>)
where
    I: IntoIterator,
    I::Item: HandlerOutput,
{
    for output in outputs {
        let item = stream_item(output);
        let last = item.as_ref().map_or(true, ResponseItem::is_error);
        if tx.blocking_send(item).is_err() || last {
            break;
        }
    }
}

fn join_error(err: JoinError) -> Error {
    match err.try_into_panic() {
        Ok(panic) => std::panic::resume_unwind(panic),
        Err(err) => Error::Handler(Box::new(err)),
    }
}

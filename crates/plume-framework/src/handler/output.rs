//! Response normalization.
//!
//! Every value a handler produces is turned into at most one canonical
//! [`ResponseItem`]:
//!
//! | Produced value | Item |
//! |----------------|------|
//! | `String`, `&'static str` | text delta |
//! | [`ResponseItem`] | unchanged |
//! | [`ErrorResponse`] | error item, ends the response |
//! | `()`, `None`, JSON `null` | an empty text in single shapes, [`Error::InvalidResponseType`] in streams |
//! | `Ok(value)` | `value`, normalized |
//! | `Err(error)` | the error, ends the response |
//! | other JSON values | [`Error::InvalidResponseType`] |

use futures::stream::{self, BoxStream};
use futures::{Stream, StreamExt};
use plume_core::BoxError;

use crate::capability::ResponseStream;
use crate::error::{Error, Result};
use crate::protocol::{ErrorResponse, ResponseItem, ServerSentEvent};

/// A value a handler may produce.
pub trait HandlerOutput: Send + 'static {
    /// Converts the value into a canonical item, or nothing.
    fn into_item(self) -> Result<Option<ResponseItem>>;
}

impl HandlerOutput for ResponseItem {
    fn into_item(self) -> Result<Option<ResponseItem>> {
        Ok(Some(self))
    }
}

impl HandlerOutput for String {
    fn into_item(self) -> Result<Option<ResponseItem>> {
        Ok(Some(ResponseItem::text(self)))
    }
}

impl HandlerOutput for &'static str {
    fn into_item(self) -> Result<Option<ResponseItem>> {
        Ok(Some(ResponseItem::text(self)))
    }
}

impl HandlerOutput for ErrorResponse {
    fn into_item(self) -> Result<Option<ResponseItem>> {
        Ok(Some(ResponseItem::Error(self)))
    }
}

impl HandlerOutput for ServerSentEvent {
    fn into_item(self) -> Result<Option<ResponseItem>> {
        Ok(Some(ResponseItem::Event(self)))
    }
}

impl HandlerOutput for () {
    fn into_item(self) -> Result<Option<ResponseItem>> {
        Ok(None)
    }
}

impl<T: HandlerOutput> HandlerOutput for Option<T> {
    fn into_item(self) -> Result<Option<ResponseItem>> {
        match self {
            Some(value) => value.into_item(),
            None => Ok(None),
        }
    }
}

impl<T, E> HandlerOutput for std::result::Result<T, E>
where
    T: HandlerOutput,
    E: Into<BoxError> + Send + 'static,
{
    fn into_item(self) -> Result<Option<ResponseItem>> {
        match self {
            Ok(value) => value.into_item(),
            Err(err) => Err(Error::from_boxed(err.into())),
        }
    }
}

impl HandlerOutput for serde_json::Value {
    fn into_item(self) -> Result<Option<ResponseItem>> {
        match self {
            serde_json::Value::String(text) => Ok(Some(ResponseItem::text(text))),
            serde_json::Value::Null => Ok(None),
            other => Err(Error::InvalidResponseType(other.to_string())),
        }
    }
}

/// Normalizes the only value of a single-shape handler.
///
/// Nothing becomes one empty text item.
pub fn single_item<O: HandlerOutput>(output: O) -> Result<ResponseItem> {
    Ok(output.into_item()?.unwrap_or_else(|| ResponseItem::text("")))
}

/// Normalizes one value of a handler stream.
///
/// A value producing nothing has no place in a stream and is rejected.
pub fn stream_item<O: HandlerOutput>(output: O) -> Result<ResponseItem> {
    output
        .into_item()?
        .ok_or_else(|| Error::InvalidResponseType("null".to_string()))
}

/// Normalizes every value of a handler stream.
///
/// The stream ends right after an error item or an error; the handler
/// stream is dropped without being polled again.
pub fn normalize_stream<S>(outputs: S) -> ResponseStream
where
    S: Stream + Send + 'static,
    S::Item: HandlerOutput,
{
    let outputs: BoxStream<'static, S::Item> = outputs.boxed();
    stream::unfold(Some(outputs), |state| async move {
        let mut outputs = state?;
        let output = outputs.next().await?;
        match stream_item(output) {
            Ok(item) => {
                let next = if item.is_error() { None } else { Some(outputs) };
                Some((Ok(item), next))
            }
            Err(err) => Some((Err(err), None)),
        }
    })
    .boxed()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;

    use super::*;

    #[test]
    fn test_string_becomes_text() {
        assert_eq!(
            "hello".to_string().into_item().unwrap(),
            Some(ResponseItem::text("hello"))
        );
    }

    #[test]
    fn test_nothing_becomes_empty_text_in_single_shape() {
        assert_eq!(single_item(()).unwrap(), ResponseItem::text(""));
        assert_eq!(single_item(None::<String>).unwrap(), ResponseItem::text(""));
        assert_eq!(single_item(json!(null)).unwrap(), ResponseItem::text(""));
    }

    #[test]
    fn test_invalid_json_value() {
        let err = json!({ "answer": 42 }).into_item().unwrap_err();

        assert!(matches!(err, Error::InvalidResponseType(ref v) if v.contains("answer")));
    }

    #[test]
    fn test_err_keeps_handler_error() {
        let output: std::result::Result<String, std::io::Error> =
            Err(std::io::Error::other("disk full"));

        let err = output.into_item().unwrap_err();

        assert!(err.downcast_handler_ref::<std::io::Error>().is_some());
    }

    #[tokio::test]
    async fn test_stream_stops_after_error_item() {
        let polled = Arc::new(AtomicUsize::new(0));
        let counter = polled.clone();
        let outputs = stream::iter(vec![
            ResponseItem::text("Working"),
            ResponseItem::error("Sad face"),
            ResponseItem::text("unreachable"),
        ])
        .inspect(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let items: Vec<_> = normalize_stream(outputs).collect().await;

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap(), &ResponseItem::text("Working"));
        assert!(items[1].as_ref().unwrap().is_error());
        assert_eq!(polled.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_stream_ends_on_invalid_value() {
        let outputs = stream::iter(vec![json!("a"), json!(3), json!("b")]);

        let items: Vec<_> = normalize_stream(outputs).collect().await;

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap(), &ResponseItem::text("a"));
        assert!(matches!(items[1], Err(Error::InvalidResponseType(ref v)) if v == "3"));
    }

    #[tokio::test]
    async fn test_stream_rejects_null() {
        let outputs = stream::iter(vec![json!("a"), json!(null), json!("b")]);

        let items: Vec<_> = normalize_stream(outputs).collect().await;

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap(), &ResponseItem::text("a"));
        assert!(matches!(items[1], Err(Error::InvalidResponseType(ref v)) if v == "null"));
    }

    #[tokio::test]
    async fn test_stream_rejects_unit_and_none() {
        let units: Vec<_> = normalize_stream(stream::iter(vec![(), ()])).collect().await;
        let options: Vec<_> = normalize_stream(stream::iter(vec![Some("x"), None, Some("y")]))
            .collect()
            .await;

        assert_eq!(units.len(), 1);
        assert!(matches!(units[0], Err(Error::InvalidResponseType(_))));
        assert_eq!(options.len(), 2);
        assert_eq!(options[0].as_ref().unwrap(), &ResponseItem::text("x"));
        assert!(matches!(options[1], Err(Error::InvalidResponseType(_))));
    }
}

//! Handler registration and response normalization.
//!
//! - **Method** ([`method`]) – The [`HandlerMethod`] trait implemented for
//!   bot methods with an `Arc<Self>` receiver and up to 12 parameters
//! - **Output** ([`output`]) – The [`HandlerOutput`] trait and the
//!   normalization of produced values into [`ResponseItem`]s
//! - **Shape** ([`shape`]) – [`ResponseHandler`], which fixes one of the four
//!   [`HandlerShape`]s at registration
//!
//! # Example
//!
//! ```rust,ignore
//! impl EchoBot {
//!     fn get_response(self: Arc<Self>, messages: Vec<ProtocolMessage>) -> String {
//!         messages.last().map(|m| m.content.clone()).unwrap_or_default()
//!     }
//! }
//!
//! impl ServerBot for EchoBot {
//!     fn response_handler() -> ResponseHandler<Self> {
//!         ResponseHandler::blocking_single(Param::new("messages"), Self::get_response)
//!     }
//! }
//! ```
//!
//! [`ResponseItem`]: crate::protocol::ResponseItem

pub mod method;
pub mod output;
pub mod shape;

pub use method::HandlerMethod;
pub use output::{HandlerOutput, normalize_stream, single_item, stream_item};
pub use shape::{HandlerShape, ResponseHandler};

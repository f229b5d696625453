//! Sample server bots built with Plume.
//!
//! | Bot | Shape | Shows |
//! |-----|-------|-------|
//! | [`EchoBot`] | blocking single | the simplest handler |
//! | [`AllCapsBot`] | stream | `stream_call` passthrough with a transformation |
//! | [`CachedBot`] | single | a dependency built from a capability and a shared cache |
//! | [`BestResponseBot`] | single | a derived config data type and concurrent `remote_call`s |
//! | [`SuggestedRepliesBot`] | stream | suggested-reply items after a streamed answer |
//!
//! The `plume-chat` binary runs any of them against a local client.

pub mod allcaps;
pub mod best_response;
pub mod cached;
pub mod echo;
pub mod local_client;
pub mod suggested_replies;

pub use allcaps::AllCapsBot;
pub use best_response::{BestResponseBot, BestResponseConfig};
pub use cached::{CachedBot, CachedRemoteCall, ResponseCache};
pub use echo::EchoBot;
pub use local_client::LocalClient;
pub use suggested_replies::SuggestedRepliesBot;

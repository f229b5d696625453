//! # Plume Runtime
//!
//! Process-level concerns of a Plume bot server:
//! - Layered configuration with figment (`config`)
//! - Logging on `tracing-subscriber` (`logging`)
//! - [`PlumeRuntime`], which turns configured bots into [`BotService`]s
//!
//! ```rust,ignore
//! use plume_runtime::PlumeRuntime;
//!
//! let runtime = PlumeRuntime::builder().profile("production").build()?;
//! let service = runtime.service(EchoBot);
//! ```
//!
//! [`BotService`]: plume_framework::BotService

pub mod config;
pub mod logging;
pub mod runtime;

pub use config::{BotConfig, ConfigError, ConfigLoader, ConfigResult, LoggingConfig, PlumeConfig};
pub use logging::{LoggingBuilder, SpanEvents};
pub use runtime::{PlumeRuntime, RuntimeBuilder};

// Re-export tracing for use by bot crates
pub use tracing;
pub use tracing_subscriber;

/// Logging macros for bot code.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}

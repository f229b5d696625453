//! Sends one message to a sample bot and prints its response.
//!
//! Downstream bots are answered by [`LocalClient`].
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin plume-chat -- --bot allcaps "tell me a joke"
//! PLUME_LOGGING__LEVEL=debug cargo run --bin plume-chat -- --bot best --settings
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::{Parser, ValueEnum};
use futures::StreamExt;
use plume::framework::{ProtocolMessage, QueryRequest, ResponseItem, SettingsRequest};
use plume::prelude::{BotService, ServerBot};
use plume::runtime::{PlumeConfig, PlumeRuntime};
use sample_bots::{
    AllCapsBot, BestResponseBot, CachedBot, EchoBot, LocalClient, SuggestedRepliesBot,
};
use tracing::{debug, info};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum BotKind {
    Echo,
    Allcaps,
    Cached,
    Best,
    Suggest,
}

#[derive(Debug, Parser)]
#[command(name = "plume-chat", version, about = "Chat with a sample Plume bot")]
struct Args {
    /// Bot to talk to.
    #[arg(short, long, value_enum, default_value_t = BotKind::Echo)]
    bot: BotKind,

    /// Configuration file (default: plume.toml in the current or user config directory).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Name the bot is served under, overriding the configuration.
    #[arg(long)]
    name: Option<String>,

    /// Print the bot's settings instead of sending a message.
    #[arg(long)]
    settings: bool,

    /// Message to send.
    #[arg(default_value = "Hello")]
    message: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut builder = PlumeRuntime::builder();
    if let Some(path) = &args.config {
        builder = builder.config_file(path);
    }
    if let Some(name) = &args.name {
        let mut overrides = PlumeConfig::default();
        overrides.bot.name = name.clone();
        builder = builder.merge(overrides);
    }
    let runtime = builder
        .build()
        .context("Failed to load configuration")?
        .with_client(Arc::new(LocalClient));

    info!(bot = ?args.bot, "Starting chat");
    match args.bot {
        BotKind::Echo => run(runtime.service(EchoBot), &args).await,
        BotKind::Allcaps => run(runtime.service(AllCapsBot), &args).await,
        BotKind::Cached => run(runtime.service(CachedBot), &args).await,
        BotKind::Best => run(runtime.service(BestResponseBot), &args).await,
        BotKind::Suggest => run(runtime.service(SuggestedRepliesBot), &args).await,
    }
}

async fn run<B: ServerBot>(service: BotService<B>, args: &Args) -> Result<()> {
    if args.settings {
        let settings = service.get_settings(SettingsRequest::default()).await?;
        println!("{}", serde_json::to_string_pretty(&settings)?);
        return Ok(());
    }

    let request = QueryRequest::new(vec![ProtocolMessage::user(args.message.as_str())]);
    let mut items = service.get_response(request).await?;

    let mut suggestions = Vec::new();
    while let Some(item) = items.next().await {
        match item? {
            ResponseItem::Text { text } => print!("{text}"),
            ResponseItem::Replace { text } => print!("\n{text}"),
            ResponseItem::SuggestedReply { text } => suggestions.push(text),
            ResponseItem::Event(event) => debug!(event = ?event.event, data = %event.data, "Event"),
            ResponseItem::Error(err) => {
                println!();
                anyhow::bail!("{}: {}", service.bot_name(), err.text);
            }
        }
    }
    println!();

    for suggestion in suggestions {
        println!("  > {suggestion}");
    }
    Ok(())
}

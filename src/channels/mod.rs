pub mod cli;
pub mod telegram;
pub mod traits;

pub use cli::CliChannel;
pub use telegram::TelegramChannel;
pub use traits::{Channel, ChannelMessage, InboundEvent};

use crate::agent::Agent;
use crate::config::Config;
use crate::response::{AttachmentKind, OutboundResponse};
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Inbound bus capacity shared by all listeners.
const CHANNEL_BUS_CAPACITY: usize = 100;
const HEALTH_CHECK_TIMEOUT_SECS: u64 = 10;

struct ChannelRuntimeContext {
    agent: Arc<Agent>,
    channels_by_name: HashMap<String, Arc<dyn Channel>>,
}

impl ChannelRuntimeContext {
    fn new(agent: Arc<Agent>, channels: &[Arc<dyn Channel>]) -> Self {
        let channels_by_name = channels
            .iter()
            .map(|ch| (ch.name().to_string(), Arc::clone(ch)))
            .collect();
        Self {
            agent,
            channels_by_name,
        }
    }
}

fn spawn_supervised_listener(
    ch: Arc<dyn Channel>,
    tx: tokio::sync::mpsc::Sender<ChannelMessage>,
    initial_backoff_secs: u64,
    max_backoff_secs: u64,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut backoff = initial_backoff_secs.max(1);
        let max_backoff = max_backoff_secs.max(backoff);

        loop {
            let result = ch.listen(tx.clone()).await;

            if tx.is_closed() {
                break;
            }

            match result {
                Ok(()) => {
                    tracing::warn!("Channel {} exited unexpectedly; restarting", ch.name());
                    // Clean exit: the listener ran, so start the backoff over.
                    backoff = initial_backoff_secs.max(1);
                }
                Err(e) => {
                    tracing::error!("Channel {} error: {e:#}; restarting", ch.name());
                }
            }

            tokio::time::sleep(Duration::from_secs(backoff)).await;
            // Double after sleeping so the first failure waits the initial backoff.
            backoff = backoff.saturating_mul(2).min(max_backoff);
        }
    })
}

fn log_worker_join_result(result: Result<(), tokio::task::JoinError>) {
    if let Err(error) = result {
        tracing::error!("Channel message worker crashed: {error}");
    }
}

/// Put one shaped response on `channel` as a reply to `reply_to`.
pub async fn deliver(
    channel: &dyn Channel,
    recipient: &str,
    reply_to: Option<&str>,
    response: OutboundResponse,
) -> Result<()> {
    match response {
        OutboundResponse::InlineReply(text) => channel.send(&text, recipient, reply_to).await,
        OutboundResponse::Attachment(att) => {
            let caption = att.caption.as_deref();
            match att.kind {
                AttachmentKind::Photo => {
                    channel
                        .send_photo(recipient, att.bytes, &att.file_name, caption, reply_to)
                        .await
                }
                AttachmentKind::Document => {
                    channel
                        .send_document(recipient, att.bytes, &att.file_name, caption, reply_to)
                        .await
                }
            }
        }
    }
}

async fn process_channel_message(ctx: Arc<ChannelRuntimeContext>, msg: ChannelMessage) {
    let Some(channel) = ctx.channels_by_name.get(&msg.channel).cloned() else {
        tracing::error!("Message {} arrived on unknown channel {}", msg.id, msg.channel);
        return;
    };

    match &msg.event {
        InboundEvent::TextCommand { raw_text, .. } => {
            tracing::info!("[{}] from {}: {raw_text}", msg.channel, msg.sender());
        }
        InboundEvent::FileUpload { file_name, .. } => {
            tracing::info!("[{}] upload from {}: {file_name}", msg.channel, msg.sender());
        }
    }

    let started_at = Instant::now();
    let Some(response) = ctx.agent.handle_event(channel.as_ref(), &msg.event).await else {
        return;
    };

    match deliver(channel.as_ref(), msg.sender(), Some(&msg.id), response).await {
        Ok(()) => tracing::debug!(
            "Replied to {} on {} in {}ms",
            msg.id,
            channel.name(),
            started_at.elapsed().as_millis()
        ),
        Err(e) => tracing::error!("Failed to reply on {}: {e:#}", channel.name()),
    }
}

async fn run_message_dispatch_loop(
    mut rx: tokio::sync::mpsc::Receiver<ChannelMessage>,
    ctx: Arc<ChannelRuntimeContext>,
    max_in_flight_messages: usize,
) {
    let semaphore = Arc::new(tokio::sync::Semaphore::new(max_in_flight_messages.max(1)));
    let mut workers = tokio::task::JoinSet::new();

    while let Some(msg) = rx.recv().await {
        let permit = match Arc::clone(&semaphore).acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => break,
        };

        let worker_ctx = Arc::clone(&ctx);
        workers.spawn(async move {
            let _permit = permit;
            process_channel_message(worker_ctx, msg).await;
        });

        while let Some(result) = workers.try_join_next() {
            log_worker_join_result(result);
        }
    }

    while let Some(result) = workers.join_next().await {
        log_worker_join_result(result);
    }
}

fn log_identity(agent: &Agent) {
    match agent.identity().hostname() {
        Ok(name) => tracing::info!("Agent identity: {name}"),
        Err(e) => tracing::error!("Agent identity unavailable, only broadcast commands will run: {e}"),
    }
}

/// Run the agent on Telegram until interrupted.
pub async fn start_telegram(config: Config) -> Result<()> {
    let token = config.require_bot_token()?.to_string();
    let telegram: Arc<dyn Channel> = Arc::new(TelegramChannel::new(
        token,
        config.telegram.allowed_users.clone(),
        &config.telegram.api_base,
    ));

    if !telegram.health_check().await {
        tracing::warn!("Telegram health check failed; listener will keep retrying");
    }

    let agent = Arc::new(Agent::from_config(&config.agent));
    log_identity(&agent);

    let channels = vec![telegram];
    let ctx = Arc::new(ChannelRuntimeContext::new(agent, &channels));
    let (tx, rx) = tokio::sync::mpsc::channel(CHANNEL_BUS_CAPACITY);

    let listeners: Vec<_> = channels
        .iter()
        .map(|ch| {
            spawn_supervised_listener(
                Arc::clone(ch),
                tx.clone(),
                config.reliability.channel_initial_backoff_secs,
                config.reliability.channel_max_backoff_secs,
            )
        })
        .collect();
    drop(tx);

    tracing::info!("Listening on {} channel(s)", channels.len());

    tokio::select! {
        () = run_message_dispatch_loop(rx, ctx, config.agent.max_in_flight) => {
            tracing::warn!("All channel listeners stopped");
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for shutdown signal")?;
            tracing::info!("Shutting down");
        }
    }

    for listener in listeners {
        listener.abort();
    }
    Ok(())
}

/// Run the agent against stdin/stdout until end of input.
///
/// Lines are handled one at a time so replies print in input order.
pub async fn start_console(config: Config, save_dir: PathBuf) -> Result<()> {
    let agent = Arc::new(Agent::from_config(&config.agent));
    log_identity(&agent);

    let console: Arc<dyn Channel> = Arc::new(CliChannel::new(save_dir));
    let ctx = Arc::new(ChannelRuntimeContext::new(agent, &[Arc::clone(&console)]));
    let (tx, rx) = tokio::sync::mpsc::channel(CHANNEL_BUS_CAPACITY);

    let listener = tokio::spawn(async move { console.listen(tx).await });
    run_message_dispatch_loop(rx, ctx, 1).await;

    listener.await.context("console listener panicked")?
}

/// Handle a single command text locally and print the result.
pub async fn exec_once(config: Config, text: &str, save_dir: PathBuf) -> Result<()> {
    let agent = Agent::from_config(&config.agent);
    let console = CliChannel::new(save_dir);

    match agent.handle_text(text).await {
        Some(response) => deliver(&console, cli::CONSOLE_SENDER, None, response).await,
        None => {
            println!("(no reply: not a command, or addressed to another agent)");
            Ok(())
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChannelHealthState {
    Healthy,
    Unhealthy,
    Timeout,
}

fn classify_health_result(
    result: &std::result::Result<bool, tokio::time::error::Elapsed>,
) -> ChannelHealthState {
    match result {
        Ok(true) => ChannelHealthState::Healthy,
        Ok(false) => ChannelHealthState::Unhealthy,
        Err(_) => ChannelHealthState::Timeout,
    }
}

/// Print the effective configuration and check the transport.
pub async fn doctor(config: Config) -> Result<()> {
    println!("Fleet agent doctor ({})", crate::build_info());
    println!();

    match &config.config_path {
        Some(path) => println!("  config      {}", path.display()),
        None => println!("  config      defaults (no file)"),
    }

    let agent = Agent::from_config(&config.agent);
    match agent.identity().hostname() {
        Ok(name) => println!("  identity    {name}"),
        Err(e) => println!("  identity    unavailable: {e}"),
    }
    match agent.identity().local_address().await {
        Ok(addr) => println!("  address     {addr}"),
        Err(e) => println!("  address     unavailable: {e}"),
    }
    println!("  uploads     {}", config.agent.uploads_path().display());
    if config.telegram.allowed_users.iter().any(|u| u == "*") {
        println!("  senders     anyone (telegram.allowed_users contains \"*\")");
    } else {
        println!("  senders     {}", config.telegram.allowed_users.join(", "));
    }
    println!();

    let token = match config.require_bot_token() {
        Ok(token) => token.to_string(),
        Err(e) => {
            println!("  telegram    not configured: {e}");
            return Ok(());
        }
    };

    let telegram = TelegramChannel::new(
        token,
        config.telegram.allowed_users.clone(),
        &config.telegram.api_base,
    );
    let result = tokio::time::timeout(
        Duration::from_secs(HEALTH_CHECK_TIMEOUT_SECS),
        telegram.health_check(),
    )
    .await;

    match classify_health_result(&result) {
        ChannelHealthState::Healthy => println!("  telegram    healthy"),
        ChannelHealthState::Unhealthy => println!("  telegram    unhealthy (token/network)"),
        ChannelHealthState::Timeout => {
            println!("  telegram    timed out (>{HEALTH_CHECK_TIMEOUT_SECS}s)");
        }
    }
    Ok(())
}

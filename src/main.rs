use aletheia_call::{
    create_router, generate_room_name, AppState, CallCapabilities, CallController, Config,
    HostAudioSession, HttpBackend, NatsTransportFactory, StartOutcome, StaticTokenProvider,
    TokenProvider, UsageTracker,
};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "aletheia-call", version, about = "Voice companion call client")]
struct Cli {
    /// Config file path (without extension)
    #[arg(short, long, default_value = "config/aletheia-call")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the local control API
    Serve,

    /// Run one call in the terminal until Ctrl-C
    Call {
        /// Room name (generated when omitted)
        #[arg(long)]
        room: Option<String>,

        /// Participant identity sent to the backend
        #[arg(long)]
        identity: Option<String>,
    },

    /// Query the status of a session's bot process
    Status { bot_pid: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;

    info!("Aletheia call client v{}", env!("CARGO_PKG_VERSION"));
    info!("Loaded config: {}", cfg.service.name);
    info!("Backend: {}", cfg.backend.base_url);

    let backend = Arc::new(HttpBackend::new(cfg.backend.base_url.clone()));
    let tokens = Arc::new(StaticTokenProvider::new(cfg.backend.auth_token.clone()));

    if let Command::Status { bot_pid } = &cli.command {
        let status = backend.bot_status(bot_pid).await?;
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    let usage = if cfg.usage.unmetered {
        None
    } else {
        let mut tracker = UsageTracker::new(cfg.usage.plan);
        if let Some(token) = tokens.get_token().await? {
            match backend.subscription(&token).await {
                Ok(subscription) => tracker.set_plan(subscription.plan),
                Err(e) => warn!("Subscription fetch failed, using configured plan: {:#}", e),
            }
        }
        Some(Arc::new(Mutex::new(tracker)))
    };

    let controller = CallController::new(
        cfg.call.clone(),
        CallCapabilities {
            backend,
            tokens,
            audio: Arc::new(HostAudioSession::new(cfg.backend.microphone_allowed)),
            transports: Arc::new(NatsTransportFactory),
            usage: usage.clone(),
        },
    );

    match cli.command {
        Command::Serve => serve(&cfg, controller, usage).await,
        Command::Call { room, identity } => run_call(controller, room, identity).await,
        Command::Status { .. } => Ok(()),
    }
}

async fn serve(
    cfg: &Config,
    controller: CallController,
    usage: Option<Arc<Mutex<UsageTracker>>>,
) -> Result<()> {
    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("HTTP server listening on {}", addr);

    let router = create_router(AppState::new(controller.clone(), usage));
    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("HTTP server failed")?;

    controller.shutdown().await;
    Ok(())
}

async fn run_call(
    controller: CallController,
    room: Option<String>,
    identity: Option<String>,
) -> Result<()> {
    let room = room.unwrap_or_else(|| generate_room_name(&controller.config().room_prefix));
    let mut updates = controller.subscribe();

    match controller.start_call(&room, identity.as_deref()).await {
        StartOutcome::Started => {}
        StartOutcome::AlreadyActive | StartOutcome::Cancelled => {
            anyhow::bail!("Call to {} did not start", room)
        }
        StartOutcome::Failed(err) => {
            if err.is_permission() {
                warn!("Allow microphone access in the backend config and try again");
            }
            return Err(err.into());
        }
    }

    let mut last = controller.snapshot().await;
    println!("Assistant: {}", last.assistant_message);

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = updates.borrow_and_update().clone();

                if snapshot.transcript != last.transcript && !snapshot.transcript.is_empty() {
                    println!("You: {}", snapshot.transcript);
                }
                if snapshot.assistant_message != last.assistant_message
                    && !snapshot.assistant_message.is_empty()
                {
                    println!("Assistant: {}", snapshot.assistant_message);
                }
                if snapshot.session_state() != last.session_state() {
                    info!("Session state: {:?}", snapshot.session_state());
                }
                if let Some(error) = &snapshot.error {
                    warn!("{}", error);
                }

                let ended = !snapshot.is_connecting && !snapshot.is_in_call;
                last = snapshot;
                if ended {
                    info!("Call ended by remote");
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, ending call");
                break;
            }
        }
    }

    controller.end_call().await;
    Ok(())
}

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context};
use gateway::api::{probe_auth, ProbeStatus};
use gateway::navigation::ChannelNavigator;
use gateway::notify::LogNotifier;
use gateway::session::FileStore;
use gateway::{CloseReason, Gateway, GatewayConfig, GatewayError, SessionContext, StreamCallbacks};
use protocol::SseEvent;
use tokio::sync::oneshot;

const DEFAULT_CREDENTIALS_PATH: &str = ".gateway/session.json";

#[derive(Debug, Clone, Default)]
struct CliArgs {
    base_url: Option<String>,
    username: Option<String>,
    password: Option<String>,
    credentials: Option<PathBuf>,
    timeout_ms: Option<u64>,
    probe: bool,
    chat: Option<String>,
    logout: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let args = parse_args()?;
    log::info!("Protocol version: {}", protocol::protocol_version());

    let mut config = GatewayConfig::load().context("failed to load gateway configuration")?;
    if let Some(base_url) = &args.base_url {
        config.base_url = base_url.clone();
    }
    if let Some(timeout_ms) = args.timeout_ms {
        config.timeout_ms = timeout_ms;
    }
    let credentials = args
        .credentials
        .clone()
        .or_else(|| config.credentials_path.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CREDENTIALS_PATH));
    config.credentials_path = Some(credentials.clone());

    println!("[gateway-cli] base url: {}", config.base_url);
    println!("[gateway-cli] credentials: {}", credentials.display());

    let session = SessionContext::new(Arc::new(FileStore::new(&credentials)))
        .context("failed to open credential store")?;
    let (navigator, mut redirects) = ChannelNavigator::new();
    tokio::spawn(async move {
        while let Some(route) = redirects.recv().await {
            println!(
                "[gateway-cli] redirected to {} ({}): log in again with --username/--password",
                route.name(),
                route.path()
            );
        }
    });

    let gateway = Gateway::builder(config)
        .session(session)
        .notifier(Arc::new(LogNotifier))
        .navigator(Arc::new(navigator))
        .build()
        .context("failed to build gateway")?;

    if args.logout {
        gateway.users().logout().context("failed to clear credential")?;
        println!("[gateway-cli] logged out");
        return Ok(());
    }

    if let (Some(username), Some(password)) = (&args.username, &args.password) {
        let credential = gateway
            .users()
            .login(username, password)
            .await
            .with_context(|| format!("login failed for {}", username))?;
        println!(
            "[gateway-cli] logged in as {} (role: {})",
            username,
            credential.role.as_deref().unwrap_or("unknown")
        );
    }

    if args.probe {
        run_probe(&gateway).await?;
    }

    if let Some(message) = &args.chat {
        run_chat(&gateway, message).await?;
    }

    Ok(())
}

async fn run_probe(gateway: &Gateway) -> anyhow::Result<()> {
    let report = probe_auth(gateway).await;

    println!("[gateway-cli] token present: {}", report.token_present);
    println!("[gateway-cli] /user/info: {}", describe(&report.api));
    println!("[gateway-cli] /chat/stream: {}", describe(&report.stream));

    if !report.authenticated() {
        bail!("authentication probe failed");
    }
    Ok(())
}

fn describe(status: &ProbeStatus) -> String {
    match status {
        ProbeStatus::Ok => "ok".to_string(),
        ProbeStatus::Unauthorized => "rejected (401)".to_string(),
        ProbeStatus::Failed(message) => format!("failed: {}", message),
        ProbeStatus::Skipped => "skipped".to_string(),
    }
}

async fn run_chat(gateway: &Gateway, message: &str) -> anyhow::Result<()> {
    let (done_tx, done_rx) = oneshot::channel();
    let mut done_tx = Some(done_tx);

    let handler = StreamCallbacks::new(
        |event: SseEvent| {
            print!("{}", event.data);
            let _ = std::io::stdout().flush();
        },
        |err: &GatewayError| eprintln!("\n[gateway-cli] stream error: {}", err),
        move || {
            if let Some(done) = done_tx.take() {
                let _ = done.send(());
            }
        },
    );

    let handle = gateway
        .chat()
        .chat_stream(message, handler)
        .await
        .map_err(|err| anyhow!("chat stream rejected: {}", err))?;

    let reason = tokio::select! {
        _ = tokio::signal::ctrl_c() => handle.abort().await,
        _ = done_rx => handle.closed().await,
    };

    println!();
    match reason {
        CloseReason::Failed => bail!("chat stream failed"),
        reason => {
            println!("[gateway-cli] chat stream closed ({:?})", reason);
            Ok(())
        }
    }
}

fn parse_args() -> anyhow::Result<CliArgs> {
    let mut cli = CliArgs::default();

    let mut args = std::env::args().skip(1).peekable();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--base-url" => cli.base_url = Some(next_arg_value(&mut args, &arg)?),
            "--username" => cli.username = Some(next_arg_value(&mut args, &arg)?),
            "--password" => cli.password = Some(next_arg_value(&mut args, &arg)?),
            "--credentials" => {
                cli.credentials = Some(PathBuf::from(next_arg_value(&mut args, &arg)?))
            }
            "--timeout-ms" => {
                let value = next_arg_value(&mut args, &arg)?;
                cli.timeout_ms = Some(
                    value
                        .parse::<u64>()
                        .with_context(|| format!("invalid --timeout-ms: {}", value))?,
                );
            }
            "--probe" => cli.probe = true,
            "--chat" => cli.chat = Some(next_arg_value(&mut args, &arg)?),
            "--logout" => cli.logout = true,
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            other => {
                bail!("unknown argument: {}\nUse --help to list the options.", other);
            }
        }
    }

    if cli.username.is_some() != cli.password.is_some() {
        bail!("--username and --password must be given together");
    }

    if !cli.logout && !cli.probe && cli.chat.is_none() && cli.username.is_none() {
        bail!("nothing to do: pass --username/--password, --probe, --chat or --logout");
    }

    Ok(cli)
}

fn next_arg_value<I>(args: &mut std::iter::Peekable<I>, flag: &str) -> anyhow::Result<String>
where
    I: Iterator<Item = String>,
{
    args.next()
        .ok_or_else(|| anyhow!("missing value for {}", flag))
}

fn print_help() {
    println!(
        "gateway-cli - drive the authenticated gateway against a backend\n\n\
Usage:\n\
  cargo run -p gateway --bin gateway-cli -- [options]\n\n\
Options:\n\
  --base-url <url>          Backend base URL (default: config or http://127.0.0.1:8080)\n\
  --username <user>         Log in with this user name\n\
  --password <pass>         Password for --username\n\
  --credentials <file>      Credential file (default: {})\n\
  --timeout-ms <ms>         Request timeout\n\
  --probe                   Check that the stored token is accepted\n\
  --chat <message>          Stream a chat reply to stdout (Ctrl-C aborts)\n\
  --logout                  Forget the stored credential\n\
  -h, --help                Show this help",
        DEFAULT_CREDENTIALS_PATH
    );
}

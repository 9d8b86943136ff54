use clap::Parser;
use color_eyre::Result;
use dashlink::config::{ApiConfig, Config};
use dashlink::DashboardApi;
use serde_json::Value;
use std::path::PathBuf;
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "dashlink")]
#[command(about = "Fetch dashboard data and follow live updates")]
#[command(version)]
struct Args {
  /// Path to config file (default: ./dashlink.yaml or $XDG_CONFIG_HOME/dashlink/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Base URL of the dashboard API
  #[arg(long)]
  api_url: Option<String>,

  /// Metrics JSON to push before printing the snapshot
  #[arg(long)]
  push: Option<String>,

  /// Keep running and print live updates until Ctrl-C
  #[arg(short, long)]
  watch: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  let (writer, _guard) = tracing_appender::non_blocking(std::io::stderr());
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("dashlink=info")),
    )
    .with_writer(writer)
    .init();

  let config = Config::load(args.config.as_deref())?;

  // Override API URL if specified on command line
  let config = if let Some(base_url) = args.api_url {
    Config {
      api: ApiConfig {
        base_url,
        ..config.api
      },
      ..config
    }
  } else {
    config
  };

  let api = DashboardApi::from_config(&config)?;

  if let Some(metrics) = args.push {
    let metrics: Value = serde_json::from_str(&metrics)?;
    let ack = api.push_metrics_update(&metrics).await?;
    println!("metrics accepted: {}", ack);
  }

  let snapshot = api.fetch_dashboard_snapshot().await?;
  println!("snapshot ({:?}):", snapshot.source);
  println!("{}", serde_json::to_string_pretty(&snapshot.data)?);

  let notifications = api.fetch_notifications().await;
  println!("{} notification(s)", notifications.len());
  for notification in &notifications {
    println!("  {}", notification);
  }

  if args.watch {
    let mut updates = api.subscribe();
    let live = api.live_channel_from_config(&config);
    live.connect();

    loop {
      tokio::select! {
        event = updates.recv() => match event {
          Ok(event) => {
            let at = event.received_at.format("%H:%M:%S");
            println!("[{}] {}: {}", at, event.name, event.payload);
          }
          Err(RecvError::Lagged(skipped)) => warn!(skipped, "Dropped live updates"),
          Err(RecvError::Closed) => break,
        },
        _ = tokio::signal::ctrl_c() => break,
      }
    }

    live.disconnect().await;
  }

  Ok(())
}

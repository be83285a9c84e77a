//! Binary entrypoint: read JSON request lines from stdin, write JSON response lines to stdout.
//!
//! Each input line is a `Request` tagged by `op`. Output lines are either:
//! - `{"ok": true, "result": ...}` when the operation succeeds
//! - An ErrorOutput when the line is malformed or the operation fails
//!
//! Configuration comes from `INCIDENT_PROVIDER_CONFIG` (a JSON object).
//! Logs go to stderr; filter with `RUST_LOG`.

use std::io::{self, IsTerminal, Write};

use incident_provider::types::{ErrorOutput, OkOutput, Request};
use incident_provider::{Config, IncidentProvider, MemoryProvider, ProviderError};
use serde::Serialize;
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const ENV_CONFIG: &str = "INCIDENT_PROVIDER_CONFIG";

#[tokio::main]
async fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_writer(io::stderr)
    .with_ansi(io::stderr().is_terminal())
    .init();

  let config = match load_config() {
    Ok(c) => c,
    Err(e) => {
      error!(error = %e, "failed to load config");
      std::process::exit(2);
    }
  };
  info!(source = %config.source, default_severity = %config.default_severity, "provider ready");
  let provider = MemoryProvider::new(config);

  let cancel = CancellationToken::new();
  let on_signal = cancel.clone();
  tokio::spawn(async move {
    if tokio::signal::ctrl_c().await.is_ok() {
      on_signal.cancel();
    }
  });

  let stdout = io::stdout();
  let mut out = io::BufWriter::new(stdout.lock());
  let stdin = BufReader::new(tokio::io::stdin());

  let code = match serve(&provider, &cancel, stdin, &mut out).await {
    Ok(()) => 0,
    Err(e) => {
      error!(error = %e, "stdio error");
      1
    }
  };
  let _ = out.flush();

  // The blocking stdin reader cannot be interrupted, so don't wait on runtime shutdown.
  std::process::exit(code);
}

fn load_config() -> Result<Config, ProviderError> {
  match std::env::var(ENV_CONFIG) {
    Ok(raw) if !raw.trim().is_empty() => Config::from_json_str(&raw),
    _ => Ok(Config::default()),
  }
}

/// Answer request lines until EOF or until `cancel` fires, whichever is first.
async fn serve<R, W>(
  provider: &dyn IncidentProvider,
  cancel: &CancellationToken,
  input: R,
  out: &mut W,
) -> io::Result<()>
where
  R: AsyncBufRead + Unpin,
  W: Write,
{
  let mut lines = input.lines();
  loop {
    let line = tokio::select! {
      _ = cancel.cancelled() => {
        info!("cancelled; stopping");
        return Ok(());
      }
      next = lines.next_line() => match next? {
        Some(l) => l,
        None => return Ok(()),
      },
    };

    // Skip blank lines.
    let trimmed = line.trim();
    if trimmed.is_empty() {
      continue;
    }

    match handle_line(provider, cancel, trimmed).await {
      Ok(result) => write_line(out, &result)?,
      Err(e) => write_line(out, &ErrorOutput::from(&e))?,
    }
  }
}

async fn handle_line(
  provider: &dyn IncidentProvider,
  cancel: &CancellationToken,
  line: &str,
) -> Result<OkOutput<Value>, ProviderError> {
  let request: Request = serde_json::from_str(line)?;
  let result = match request {
    Request::Create { input } => response_value(provider.create(cancel, input).await?)?,
    Request::Get { id } => response_value(provider.get(cancel, &id).await?)?,
    Request::Update { id, input } => response_value(provider.update(cancel, &id, input).await?)?,
    Request::Query { query } => response_value(provider.query(cancel, &query).await?)?,
    Request::GetTimeline { id } => response_value(provider.get_timeline(cancel, &id).await?)?,
    Request::AppendTimeline { id, input } => {
      provider.append_timeline(cancel, &id, input).await?;
      return Ok(OkOutput::empty());
    }
  };
  Ok(OkOutput::new(result))
}

/// Failing to encode our own response is a server fault, not bad input.
fn response_value<T: Serialize>(value: T) -> Result<Value, ProviderError> {
  serde_json::to_value(value).map_err(|e| ProviderError::internal(format!("encode response: {}", e)))
}

fn write_line<T: Serialize>(out: &mut impl Write, value: &T) -> io::Result<()> {
  serde_json::to_writer(&mut *out, value)?;
  writeln!(out)?;
  out.flush()
}

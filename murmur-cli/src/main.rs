use app::{App, Flow};
use command::Command;
use murmur_client::{
    config::ClientConfig,
    session::store::{FileStore, KeyValueStore, MemoryStore, StoreError},
};
use murmur_common::util::PositiveDuration;
use serde::Deserialize;
use std::{path::PathBuf, sync::Arc};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod app;
mod command;

#[derive(Debug, Error)]
enum InitError {
    #[error("Error parsing .env file: {0}")]
    Dotenv(#[from] dotenvy::Error),
    #[error("Error parsing environment: {0}")]
    Envy(#[from] envy::Error),
    #[error("Error opening session store: {0}")]
    Store(#[from] StoreError),
    #[error("Error building runtime: {0}")]
    Runtime(std::io::Error),
    #[error("Error talking to the terminal: {0}")]
    Terminal(std::io::Error),
}

/// Read from `MURMUR_*` variables.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
struct Env {
    /// Keeps the session across runs when set.
    session_dir: Option<PathBuf>,
    latency_ms: Option<PositiveDuration>,
    publish_delay_ms: Option<PositiveDuration>,
}

impl Env {
    fn client_config(&self) -> ClientConfig {
        let defaults = ClientConfig::default();
        ClientConfig {
            network_latency: self.latency_ms.unwrap_or(defaults.network_latency),
            publish_delay: self.publish_delay_ms.unwrap_or(defaults.publish_delay),
            ..defaults
        }
    }

    fn store(&self) -> Result<Arc<dyn KeyValueStore>, InitError> {
        let store: Arc<dyn KeyValueStore> = match &self.session_dir {
            Some(dir) => {
                info!(dir = %dir.display(), "Persisting session on disk");
                Arc::new(FileStore::open(dir)?)
            }
            None => {
                debug!("No session directory configured, the session lasts one run");
                Arc::new(MemoryStore::default())
            }
        };
        Ok(store)
    }
}

fn install_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "murmur_cli=debug,murmur_client=debug,murmur_common=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn get_env() -> Result<Env, InitError> {
    if let Err(e) = dotenvy::dotenv() {
        if e.not_found() {
            debug!("No .dotenv file found");
        } else {
            return Err(e.into());
        }
    }

    envy::prefixed("MURMUR_").from_env().map_err(InitError::from)
}

async fn run(app: App) -> Result<(), InitError> {
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    let greeting = match app.start().await {
        Ok(greeting) => greeting,
        Err(err) => {
            warn!(error = %err, "Client started degraded");
            err.to_string()
        }
    };
    print(&mut stdout, &greeting).await?;

    loop {
        let prompt = if app.dialog_open() { "auth> " } else { "> " };
        stdout
            .write_all(prompt.as_bytes())
            .await
            .map_err(InitError::Terminal)?;
        stdout.flush().await.map_err(InitError::Terminal)?;

        let Some(line) = lines.next_line().await.map_err(InitError::Terminal)? else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        let output = match line.parse::<Command>() {
            Ok(command) => match app.execute(command).await {
                Ok((Flow::Quit, output)) => {
                    print(&mut stdout, &output).await?;
                    break;
                }
                Ok((Flow::Continue, output)) => output,
                Err(err) => format!("Error: {err}"),
            },
            Err(err) => err.to_string(),
        };
        print(&mut stdout, &output).await?;
    }

    Ok(())
}

async fn print(stdout: &mut tokio::io::Stdout, text: &str) -> Result<(), InitError> {
    stdout
        .write_all(format!("{text}\n").as_bytes())
        .await
        .map_err(InitError::Terminal)
}

fn main() -> Result<(), InitError> {
    install_tracing();
    let env = get_env()?;
    let app = App::new(env.client_config(), env.store()?);

    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(InitError::Runtime)?
        .block_on(run(app))
}

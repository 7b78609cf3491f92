//! Command-line interface of the demo server.
//!
//! `logz-demo` feeds its own `tracing` events into per-level observers,
//! spawns writer tasks producing randomized warnings and serves the page
//! on `http://localhost:6060/`.

use crate::core::{Config, ConfigBuilder, LogzError, Result};
use crate::layer::LevelObservers;
use crate::page;
use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::PathBuf;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Target of writer events, hidden from console output.
const WRITER_TARGET: &str = "logz_demo::writer";

const WORDS: &[&str] = &[
    "lorem", "ipsum", "dolor", "sit", "amet", "consectetur", "adipiscing", "elit", "sed", "do",
    "eiusmod", "tempor", "incididunt", "labore", "dolore", "magna", "aliqua", "enim", "minim",
    "veniam", "quis", "nostrud", "exercitation", "ullamco", "laboris", "nisi", "aliquip",
    "commodo", "consequat", "duis", "aute", "irure", "voluptate", "velit", "esse", "cillum",
    "fugiat", "nulla", "pariatur", "excepteur", "sint", "occaecat", "cupidatat", "proident",
];

/// Log message observer demo - open the page and watch messages aggregate.
#[derive(Parser, Debug)]
#[command(name = "logz-demo")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Port to serve the page on
    #[arg(short, long, env = "LOGZ_PORT", default_value_t = 6060)]
    pub port: u16,

    /// Observer configuration file (YAML)
    #[arg(short, long, env = "LOGZ_CONFIG")]
    pub config: Option<PathBuf>,

    /// Number of concurrent writer tasks
    #[arg(short, long, default_value_t = 50)]
    pub writers: usize,

    /// Enable debug logging
    #[arg(short, long, env = "LOGZ_DEBUG")]
    pub debug: bool,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Load observer configuration from `--config`, or the demo defaults.
    pub async fn load_config(&self) -> Result<Config> {
        let Some(path) = &self.config else {
            return ConfigBuilder::new().max_cardinality(5).max_samples(10).build();
        };

        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            LogzError::config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        ConfigBuilder::new().from_yaml(&content)?.build()
    }

    /// Initialize console logging and feed all events into `observers`.
    pub fn init_logging(&self, observers: &LevelObservers) -> Result<()> {
        use tracing_subscriber::filter::Directive;
        use tracing_subscriber::{
            layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
        };

        let log_level = if self.debug { "debug" } else { "info" };

        let writer_off: Directive = format!("{}=off", WRITER_TARGET)
            .parse()
            .map_err(|e| LogzError::config(format!("Invalid log directive: {}", e)))?;
        let filter = EnvFilter::try_from_env("LOGZ_LOG")
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new(log_level))
            .add_directive(writer_off);

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(false)
            .compact()
            .with_filter(filter);

        tracing_subscriber::registry()
            .with(fmt_layer)
            .with(observers.layer())
            .try_init()
            .map_err(|e| LogzError::config(format!("Failed to initialize logging: {}", e)))?;

        Ok(())
    }
}

/// Run the demo until interrupted.
pub async fn execute(cli: Cli) -> Result<()> {
    let config = cli.load_config().await?;
    config.validate()?;

    let observers = LevelObservers::new(config);
    cli.init_logging(&observers)?;

    tracing::debug!("starting example");
    tracing::info!(one = 1, two = 2, "sample info");
    tracing::error!("unexpected end of the world");

    let writers: Vec<JoinHandle<()>> = (0..cli.writers)
        .map(|id| tokio::spawn(run_writer(id)))
        .collect();

    let app = page::router(observers.all())?;
    let addr = format!("0.0.0.0:{}", cli.port);
    let listener = TcpListener::bind(&addr).await.map_err(|e| {
        LogzError::Io(std::io::Error::new(
            std::io::ErrorKind::AddrInUse,
            format!("Failed to bind to {}: {}", addr, e),
        ))
    })?;

    tracing::info!("starting server at http://localhost:{}/", cli.port);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Received shutdown signal, stopping...");
        })
        .await?;

    for writer in writers {
        writer.abort();
    }

    Ok(())
}

/// Emit one fixed random sentence with random fields, forever.
async fn run_writer(id: usize) {
    let mut rng = StdRng::from_entropy();
    let msg = sentence(&mut rng, 3, 6);
    let mut iteration: u64 = 0;

    loop {
        iteration += 1;

        let extra: Vec<String> = (0..rng.gen_range(0..20))
            .map(|_| format!("{}={}", word(&mut rng), word(&mut rng)))
            .collect();

        tracing::warn!(
            target: WRITER_TARGET,
            writer = id,
            iteration,
            word = word(&mut rng),
            extra = %extra.join(" "),
            "{}",
            msg
        );

        tokio::time::sleep(Duration::from_secs_f64(rng.gen::<f64>())).await;
    }
}

fn word<R: Rng>(rng: &mut R) -> &'static str {
    WORDS[rng.gen_range(0..WORDS.len())]
}

/// Random sentence of `min..=max` words.
fn sentence<R: Rng>(rng: &mut R, min: usize, max: usize) -> String {
    let len = rng.gen_range(min..=max);
    let words: Vec<&str> = (0..len).map(|_| word(rng)).collect();

    let mut out = String::new();
    if let Some(first) = words.first() {
        let mut chars = first.chars();
        if let Some(c) = chars.next() {
            out.push(c.to_ascii_uppercase());
            out.push_str(chars.as_str());
        }
    }
    for w in words.iter().skip(1) {
        out.push(' ');
        out.push_str(w);
    }
    out.push('.');
    out
}

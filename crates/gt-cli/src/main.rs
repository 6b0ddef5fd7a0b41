use anyhow::Context;
use tracing_subscriber::EnvFilter;

use gt_cli::{execute, TuningConfig};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("GROVETUNE_CONFIG").ok())
        .context("usage: gt-tune <config.json> (or set GROVETUNE_CONFIG)")?;

    let config = TuningConfig::from_file(&path)
        .with_context(|| format!("failed to load tuning config from {path}"))?;
    let summary = execute(&config).context("tuning run failed")?;

    println!("{summary}");
    Ok(())
}

use std::{path::PathBuf, sync::Arc};

use anyhow::Context;

use mailburst::{Config, Engine, schedule, server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    mailburst::logging::init();

    let path = std::env::args()
        .nth(1)
        .map_or_else(|| PathBuf::from("./mailburst.toml"), PathBuf::from);

    let config = Config::load(&path)
        .with_context(|| format!("loading configuration from {}", path.display()))?;

    let engine = Arc::new(Engine::new(&config));

    if let Some(schedule_config) = config.schedule.clone() {
        tokio::spawn(schedule::run(Arc::clone(&engine), schedule_config));
    }

    server::serve(engine, &config.http)
        .await
        .context("running http server")?;

    Ok(())
}

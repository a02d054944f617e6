use duelhall::prelude::*;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => ServerConfig::load(&path).map_err(|e| {
            error!(%path, error = %e, "failed to load config");
            e
        })?,
        None => {
            info!("no config file given, using defaults");
            ServerConfig::default()
        }
    };

    info!(bind = %config.bind, game = ?config.game, "starting duelhall");

    let builder = DuelhallServerBuilder::from_config(&config);
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "could not listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    match config.game {
        GameKind::Grid => builder.build::<GridGame>(()).await?.run_until(shutdown).await?,
        GameKind::Quiz => {
            builder
                .build::<QuizDuel>(config.quiz.clone())
                .await?
                .run_until(shutdown)
                .await?
        }
    }

    info!("duelhall stopped");
    Ok(())
}

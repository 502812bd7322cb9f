use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal::unix::{SignalKind, signal};

use performer::{
    cli::config_path_from_args,
    config::Config,
    instrument::{Instrument, InstrumentSpec},
    logging::init_tracing,
    planner::{CheckpointStore, Planner, PlanningContext},
    preference::PreferenceTable,
    score::JsonScoreFile,
};

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = config_path_from_args()?;
    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;
    let logging = init_tracing(&config.logging).context("failed to initialize logging")?;

    let instrument_path = config
        .instrument_path
        .clone()
        .context("config does not set instrument_path")?;
    let score_path = config
        .score_path
        .clone()
        .context("config does not set score_path")?;

    let spec = InstrumentSpec::load(&instrument_path)
        .with_context(|| format!("failed to load instrument {}", instrument_path.display()))?;
    let instrument = Arc::new(Instrument::bootstrap(spec).context("instrument bootstrap failed")?);
    let score = JsonScoreFile::load(&score_path)
        .with_context(|| format!("failed to load score {}", score_path.display()))?;

    let context = Arc::new(PlanningContext::for_session(
        logging.session_id(),
        instrument,
        config.planner.clone(),
        Arc::new(PreferenceTable::with_builtins()),
    ));
    let store = CheckpointStore::new(config.checkpoint.state_path.clone());
    let restored = if config.checkpoint.enabled {
        store.load().context("failed to load planning checkpoint")?
    } else {
        None
    };
    let mut planner = match restored {
        Some(checkpoint) => Planner::from_checkpoint(Arc::clone(&context), checkpoint)?,
        None => Planner::new(Arc::clone(&context))?,
    };

    let result = {
        let plan = planner.plan(&score);
        tokio::pin!(plan);
        let interrupted = tokio::select! {
            result = &mut plan => Ok(result),
            signal_name = shutdown_signal() => Err(signal_name),
        };
        match interrupted {
            Ok(result) => result,
            Err(signal_name) => {
                eprintln!("received {}; stopping planner", signal_name?);
                context.shutdown();
                plan.await
            }
        }
    };

    if config.checkpoint.enabled {
        store
            .save(&planner.checkpoint())
            .context("failed to save planning checkpoint")?;
    }

    let graph = result.context("planning failed")?;
    eprintln!(
        "performer session {}: planned {} instances into {} snapshots and {} instructions (log {})",
        logging.session_id(),
        score.instance_count(),
        graph.len(),
        graph.edge_count(),
        logging.log_file()
    );
    Ok(())
}

async fn shutdown_signal() -> Result<&'static str> {
    let mut sigint =
        signal(SignalKind::interrupt()).context("unable to listen for SIGINT (Ctrl+C)")?;
    let mut sigterm = signal(SignalKind::terminate()).context("unable to listen for SIGTERM")?;

    Ok(tokio::select! {
        _ = sigint.recv() => "SIGINT",
        _ = sigterm.recv() => "SIGTERM",
    })
}

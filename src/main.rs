use std::sync::Arc;

mod config;
mod handler;
mod http;
mod inference;
mod logger;
mod server;

use inference::Predictor;
use server::SignalHandler;

/// Config file used when no path is given on the command line
const DEFAULT_CONFIG_PATH: &str = "config";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let cfg = config::Config::load_from(&config_path)?;

    logger::init(&cfg)?;

    // Artifacts load once, before the port opens; any failure is fatal
    let predictor = match Predictor::load(&cfg.inference.model_path, &cfg.inference.scaler_path) {
        Ok(predictor) => predictor,
        Err(e) => {
            logger::log_error(&format!("Failed to load inference artifacts: {e}"));
            return Err(e.into());
        }
    };
    logger::log_artifacts_loaded(&cfg, &predictor.info());

    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();

    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
        logger::log_info(&format!("Using {workers} worker threads"));
    } else {
        logger::log_info("Using default worker threads (CPU cores)");
    }

    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg, predictor))
}

async fn async_main(
    cfg: config::Config,
    predictor: Predictor,
) -> Result<(), Box<dyn std::error::Error>> {
    let addr = cfg.get_socket_addr()?;
    let listener = match server::create_listener(addr) {
        Ok(listener) => listener,
        Err(e) => {
            logger::log_error(&format!("Failed to bind {addr}: {e}"));
            return Err(e.into());
        }
    };

    logger::log_server_start(&addr, &cfg);

    let state = Arc::new(config::AppState::new(cfg, predictor));

    let signals = Arc::new(SignalHandler::new());
    server::start_signal_handler(Arc::clone(&signals));

    // Use LocalSet for spawn_local support
    let local = tokio::task::LocalSet::new();
    local
        .run_until(server::run_server_loop(listener, state, signals))
        .await
}

pub mod clock;
pub mod config;
pub mod intervention;
pub mod penalty;
pub mod platform;
pub mod random;
pub mod roast;
pub mod sensing;
pub mod service;
pub mod session;
pub mod settings;
pub mod store;
pub mod utils;

use std::{
    env,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{anyhow, Context, Result};

use clock::{Clock, SystemClock};
use config::GuardConfig;
use intervention::GuardDeps;
use penalty::PenaltyManager;
use platform::{HostPlatform, InputMethodSlot};
use random::SystemRandom;
use roast::MemePool;
use service::{
    emitter::{JsonLineEmitter, JsonLineUi},
    protocol::serve_lines,
    GuardService,
};
use settings::Settings;
use store::{ConfigStore, SqliteStore};

fn data_dir() -> Result<PathBuf> {
    if let Ok(dir) = env::var("BROSTOP_DATA_DIR") {
        return Ok(PathBuf::from(dir));
    }
    dirs::data_dir()
        .map(|dir| dir.join("brostop"))
        .ok_or_else(|| anyhow!("no data directory on this platform; set BROSTOP_DATA_DIR"))
}

fn start() -> Result<()> {
    let data_dir = data_dir()?;
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("failed to create {}", data_dir.display()))?;

    let store: Arc<dyn ConfigStore> = Arc::new(SqliteStore::open(data_dir.join("brostop.sqlite3"))?);

    if let Ok(path) = env::var("BROSTOP_SETTINGS") {
        let settings = Settings::from_json_file(Path::new(&path))?;
        settings.save(store.as_ref())?;
        log::info!("Imported settings from {path}");
    }

    let pool = match env::var("BROSTOP_MEMES") {
        Ok(path) => MemePool::load(Path::new(&path))?,
        Err(_) => MemePool::builtin(),
    };
    log::info!("{} roasts loaded", pool.len());

    // Lift penalties that lapsed while nothing was running.
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    PenaltyManager::new(store.clone(), clock.clone()).prune_expired()?;

    let emitter = JsonLineEmitter::stdout();
    let input_method = InputMethodSlot::default();
    let deps = GuardDeps {
        store,
        clock,
        random: Box::new(SystemRandom::new()),
        ui: Box::new(JsonLineUi::new(emitter.clone())),
        platform: Box::new(HostPlatform::new(emitter.clone(), input_method.clone())),
        pool,
    };
    let config = GuardConfig::from_env();

    let runtime = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
    runtime.block_on(async move {
        let service = GuardService::spawn(config, deps);
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        let served = serve_lines(stdin, service.handle(), input_method, emitter).await;
        service.shutdown().await?;
        served
    })
}

pub fn run() {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    log::info!("BroStop starting up...");

    if let Err(err) = start() {
        log::error!("BroStop stopped: {err:#}");
        std::process::exit(1);
    }
}

use tracing_subscriber::EnvFilter;

use trickstep_core::progress::{KeyValueStore, MemoryStore};
use trickstep_runner::config::RunnerConfig;
use trickstep_runner::run;
use trickstep_runner::store::JsonFileStore;
use trickstep_sim::{LevelPack, SimConfig};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    tracing::info!("Trickstep runner starting");

    let config = RunnerConfig::load();
    if let Err(e) = config.validate() {
        tracing::error!("Invalid runner configuration: {e}");
        std::process::exit(1);
    }
    let sim_config = SimConfig::load();

    let pack = match &config.level_pack {
        Some(path) => LevelPack::load(path),
        None => LevelPack::builtin(),
    };
    let pack = match pack {
        Ok(pack) => pack,
        Err(e) => {
            tracing::error!("Failed to load level pack: {e}");
            std::process::exit(1);
        },
    };

    let store: Box<dyn KeyValueStore> = match JsonFileStore::open(&config.progress_file) {
        Ok(store) => {
            tracing::info!("Progress file: {}", store.path().display());
            Box::new(store)
        },
        Err(e) => {
            tracing::warn!("Progress will not be saved: {e}");
            Box::new(MemoryStore::new())
        },
    };

    match run(&config, sim_config, pack, store) {
        Ok(summary) => match serde_json::to_string_pretty(&summary) {
            Ok(json) => println!("{json}"),
            Err(e) => tracing::error!("Failed to encode summary: {e}"),
        },
        Err(e) => {
            tracing::error!("Run failed: {e}");
            std::process::exit(1);
        },
    }
}

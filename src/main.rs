use clap::Parser;
use log::info;

use traynotes::{App, Cli, Commands, Config, FileStore, NoteStore, Result};

pub fn initialize_logger(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp_secs()
        .format_module_path(true)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    initialize_logger(cli.verbose);

    let mut config = Config::load_or_default(cli.config.as_deref());
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }

    if let Err(e) = run(cli.command, config).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(command: Commands, config: Config) -> Result<()> {
    let kv = FileStore::open(config.data_dir.clone())?;
    let store = NoteStore::new(Box::new(kv), config.clone()).into_shared();

    let summary = store.lock().await.load()?;
    if summary.migrated > 0 {
        info!("Migrated {} note fields on load", summary.migrated);
    }
    if summary.recovered {
        info!("Recovered from a corrupt note collection");
    }

    App::new(store, config).run(command).await
}

use std::sync::Arc;

use tokio::sync::Mutex;

use tracing::info;

use smsrelay_core::{config::Config, store::InterestStore};

#[tokio::main]
async fn main() -> Result<(), smsrelay_core::Error> {
    smsrelay_core::logging::init("smsrelay")?;

    // Configuration problems must stop the process before any I/O.
    let cfg = match Config::load() {
        Ok(cfg) => Arc::new(cfg),
        Err(e) => {
            eprintln!("configuration error: {e}");
            std::process::exit(1);
        }
    };

    // A corrupt state file aborts startup; only an absent file starts empty.
    let store = InterestStore::load(&cfg.state_file)?;
    info!(
        "state loaded from {}: {} destination(s)",
        cfg.state_file.display(),
        store.destinations().len()
    );
    let store = Arc::new(Mutex::new(store));

    smsrelay_telegram::dispatch::run(cfg, store)
        .await
        .map_err(|e| smsrelay_core::Error::External(format!("telegram bot failed: {e}")))?;

    Ok(())
}

use std::process;

use tracing::info;
#[cfg(not(feature = "tdjson"))]
use tracing::warn;

use tgvisd::config::Config;
use tgvisd::{logging, Daemon};

#[cfg(feature = "tdjson")]
use tgvisd::telegram::TdJsonTransport;

#[cfg(not(feature = "tdjson"))]
use tgvisd::telegram::StubTransport;

fn main() {
    // Config before logging: a missing variable must produce exactly one
    // diagnostic line on stderr and a non-zero exit.
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("tgvisd: {e}");
            process::exit(1);
        }
    };

    logging::init(&config.logging);
    info!(version = tgvisd::VERSION, "starting tgvisd");
    config.log_summary();

    #[cfg(feature = "tdjson")]
    let transport = TdJsonTransport::new();

    #[cfg(not(feature = "tdjson"))]
    let transport = {
        warn!("built without the tdjson feature, updates will not arrive");
        StubTransport::new()
    };

    let daemon = match Daemon::new(config, transport) {
        Ok(daemon) => daemon,
        Err(e) => {
            eprintln!("tgvisd: {e}");
            process::exit(1);
        }
    };

    daemon.run(cfg!(feature = "tdjson"));
    info!("clean shutdown");
}

use std::path::PathBuf;

use anyhow::Context;
use tracing::{error, subscriber};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::FmtSubscriber;

use ridedb::config::Config;
use ridedb::service;

pub fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("please provide a valid RIDEDB_* configuration")?;

    let level: LevelFilter = config
        .log_level
        .parse()
        .with_context(|| format!("unknown log level {:?}", config.log_level))?;
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    subscriber::set_global_default(subscriber)?;

    let input = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .context("usage: ridedb <input_file>")?;

    match service::run_files(&config, &input) {
        Ok(_) => Ok(()),
        // the duplicate notice is already in the output; stopping here is the
        // expected end of the run
        Err(err) if err.is_fatal() => {
            error!(cause = %err, "stopped");
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}

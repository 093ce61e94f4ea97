//! robotoscope server.
//!
//! Configuration comes from the environment, see [`robotoscope::config`].
//! Log verbosity follows `RUST_LOG` (default `info`).

use tracing_subscriber::{fmt, EnvFilter};

use robotoscope::{server, Config};

#[tokio::main]
async fn main() -> Result<(), robotoscope::Error> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let config = Config::from_env()?;
    server::run(config).await
}

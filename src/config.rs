// src/config.rs
use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;

/// Runtime settings. Every flag can also come from the environment or a `.env` file.
#[derive(Parser, Debug, Clone)]
#[command(name = "portfolio_tracker", about = "Portfolio valuation service")]
pub struct Config {
    /// Address the HTTP server listens on.
    #[arg(long, env = "PORTFOLIO_LISTEN", default_value = "127.0.0.1:3030")]
    pub listen: SocketAddr,

    /// Base URL of the remote portfolio backend.
    #[arg(
        long,
        env = "PORTFOLIO_API_BASE_URL",
        default_value = "http://localhost:8080/api"
    )]
    pub api_base_url: String,

    /// Bearer token for requests not made on behalf of a user (market refresh, insights).
    #[arg(long, env = "PORTFOLIO_API_TOKEN")]
    pub api_token: Option<String>,

    #[arg(long, env = "PORTFOLIO_REQUEST_TIMEOUT_SECS", default_value_t = 10)]
    pub request_timeout_secs: u64,

    #[arg(long, env = "PORTFOLIO_INSIGHT_TIMEOUT_SECS", default_value_t = 30)]
    pub insight_timeout_secs: u64,

    /// Seconds between market catalog refreshes; 0 disables the worker.
    #[arg(long, env = "PORTFOLIO_MARKET_REFRESH_SECS", default_value_t = 60)]
    pub market_refresh_secs: u64,
}

impl Config {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn insight_timeout(&self) -> Duration {
        Duration::from_secs(self.insight_timeout_secs)
    }

    pub fn market_refresh(&self) -> Option<Duration> {
        (self.market_refresh_secs > 0).then(|| Duration::from_secs(self.market_refresh_secs))
    }
}

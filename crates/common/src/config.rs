use serde::Deserialize;

/// Global application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// JSON-RPC endpoint serving the price feeds and token contracts
    pub rpc_url: String,

    /// Upper bound on a single feed or accounting read in milliseconds (default: 2000)
    pub rpc_timeout_ms: u64,

    /// Interval between refresh rounds in milliseconds (default: 12000)
    pub poll_interval_ms: u64,

    /// Socket address the HTTP API binds to (default: 0.0.0.0:3000)
    pub api_bind_addr: String,

    /// Path to the JSON file listing monitored collateral
    pub assets_path: String,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            rpc_url: std::env::var("RPC_URL")
                .unwrap_or_else(|_| "https://mainnet.base.org".to_string()),
            rpc_timeout_ms: std::env::var("RPC_TIMEOUT_MS")
                .unwrap_or_else(|_| "2000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("RPC_TIMEOUT_MS must be a valid u64"))?,
            poll_interval_ms: parse_poll_interval_ms(
                &std::env::var("POLL_INTERVAL_MS").unwrap_or_else(|_| "12000".to_string()),
            )?,
            api_bind_addr: std::env::var("API_BIND_ADDR")
                .unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            assets_path: std::env::var("ASSETS_PATH")
                .map_err(|_| anyhow::anyhow!("ASSETS_PATH environment variable is required"))?,
        })
    }
}

/// `tokio::time::interval` panics on a zero period, so zero is rejected here.
fn parse_poll_interval_ms(value: &str) -> anyhow::Result<u64> {
    let ms: u64 = value
        .parse()
        .map_err(|_| anyhow::anyhow!("POLL_INTERVAL_MS must be a valid u64"))?;
    if ms == 0 {
        anyhow::bail!("POLL_INTERVAL_MS must be greater than zero");
    }
    Ok(ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poll_interval_parses() {
        assert_eq!(parse_poll_interval_ms("12000").unwrap(), 12_000);
        assert_eq!(parse_poll_interval_ms("1").unwrap(), 1);
    }

    #[test]
    fn test_zero_poll_interval_rejected() {
        let err = parse_poll_interval_ms("0").unwrap_err();
        assert!(err.to_string().contains("greater than zero"));
    }

    #[test]
    fn test_non_numeric_poll_interval_rejected() {
        assert!(parse_poll_interval_ms("fast").is_err());
        assert!(parse_poll_interval_ms("-5").is_err());
    }
}

use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    // Storage
    pub db_path: String,

    // Resolution thresholds
    pub accepted_range_length: u32,
    pub range_ttl_secs: u64,

    // WHOIS provider
    pub whois_timeout_secs: u64,
    pub rdap_url: String,

    // Expiry sweep
    pub sweep_enabled: bool,
    pub sweep_interval_secs: u64,

    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: "ranges.db".to_string(),
            accepted_range_length: 4_194_304,
            range_ttl_secs: 15_552_000,
            whois_timeout_secs: 10,
            rdap_url: "https://rdap.org".to_string(),
            sweep_enabled: false,
            sweep_interval_secs: 3600,
            debug: false,
        }
    }
}

pub fn load_config() -> anyhow::Result<Config> {
    let db_path = std::env::var("ISPR_DB_PATH")
        .unwrap_or_else(|_| "ranges.db".to_string());

    let accepted_range_length = std::env::var("ISPR_ACCEPTED_RANGE_LENGTH")
        .unwrap_or_else(|_| "4194304".to_string())
        .parse()
        .unwrap_or(4_194_304);

    let range_ttl_secs = std::env::var("ISPR_RANGE_TTL_SECS")
        .unwrap_or_else(|_| "15552000".to_string())
        .parse()
        .unwrap_or(15_552_000);

    let whois_timeout_secs = std::env::var("ISPR_WHOIS_TIMEOUT_SECS")
        .unwrap_or_else(|_| "10".to_string())
        .parse()
        .unwrap_or(10);

    let rdap_url = std::env::var("ISPR_RDAP_URL")
        .unwrap_or_else(|_| "https://rdap.org".to_string());

    let sweep_enabled = std::env::var("ISPR_SWEEP_ENABLED")
        .map(|v| v == "1" || v.to_lowercase() == "true")
        .unwrap_or(false);

    let sweep_interval_secs = std::env::var("ISPR_SWEEP_INTERVAL_SECS")
        .unwrap_or_else(|_| "3600".to_string())
        .parse()
        .unwrap_or(3600);

    let debug = std::env::var("DEBUG").is_ok();

    Ok(Config {
        db_path,
        accepted_range_length,
        range_ttl_secs,
        whois_timeout_secs,
        rdap_url,
        sweep_enabled,
        sweep_interval_secs,
        debug,
    })
}

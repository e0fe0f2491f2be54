//! isp-resolver - IPv4 address to ISP resolution with a persistent range cache
//!
//! This is the composition root that wires together all the components.
//! Every address given on the command line is resolved and printed as one
//! JSON line.

use isp_resolver::adapters::outbound::{
    IanaReservedClassifier, RdapConfig, RdapWhoisClient, SqliteRangeStore,
};
use isp_resolver::application::{ExpirySweep, Resolver, ResolverConfig};
use isp_resolver::config::load_config;
use isp_resolver::domain::entities::Resolution;
use isp_resolver::domain::ports::RangeStore;
use serde::Serialize;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::fmt::format::FmtSpan;

/// One line of output.
#[derive(Serialize)]
struct ResolvedAddress {
    address: Ipv4Addr,
    #[serde(flatten)]
    resolution: Resolution,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration from environment
    let cfg = load_config()?;

    // Setup logging (stdout carries the JSON lines)
    let log_level = if cfg.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(std::io::stderr)
        .init();

    tracing::info!(
        "starting isp-resolver db={} rdap={} accepted_range_length={}",
        cfg.db_path,
        cfg.rdap_url,
        cfg.accepted_range_length
    );

    // ===== COMPOSITION ROOT =====

    // 1. Create outbound adapters
    let store: Arc<dyn RangeStore> = Arc::new(SqliteRangeStore::open(&cfg.db_path)?);

    let whois = Arc::new(RdapWhoisClient::new(RdapConfig {
        base_url: cfg.rdap_url.clone(),
        timeout: Duration::from_secs(cfg.whois_timeout_secs),
    })?);

    let classifier = Arc::new(IanaReservedClassifier::new());

    // 2. Create application services
    let resolver = Resolver::new(
        store.clone(),
        whois,
        classifier,
        ResolverConfig {
            accepted_range_length: cfg.accepted_range_length,
            whois_timeout: Duration::from_secs(cfg.whois_timeout_secs),
        },
    );

    let sweep = ExpirySweep::new(store.clone(), Duration::from_secs(cfg.range_ttl_secs));
    let sweep_task = if cfg.sweep_enabled {
        Some(sweep.spawn(Duration::from_secs(cfg.sweep_interval_secs)))
    } else {
        None
    };

    // 3. Resolve the requested addresses
    let addresses: Vec<String> = std::env::args().skip(1).collect();
    for raw in &addresses {
        let address: Ipv4Addr = match raw.trim().parse() {
            Ok(address) => address,
            Err(e) => {
                tracing::error!("skipping {:?}: {}", raw, e);
                continue;
            }
        };

        let resolution = resolver.match_or_create(address).await?;
        let line = serde_json::to_string(&ResolvedAddress {
            address,
            resolution,
        })?;
        println!("{}", line);
    }

    tracing::info!(
        "cache holds {} ranges owned by {} identities",
        store.count_ranges().await?,
        store.count_identities().await?
    );

    // Without addresses the process only serves the sweep
    if let Some(task) = sweep_task {
        if addresses.is_empty() {
            tracing::info!("running expiry sweep every {}s, press ctrl-c to stop", cfg.sweep_interval_secs);
            tokio::signal::ctrl_c().await?;
        }
        task.abort();
    }

    Ok(())
}

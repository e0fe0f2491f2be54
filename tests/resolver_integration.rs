//! Integration tests for the Resolver
//!
//! Drives address resolution end to end: SQLite range store, the RDAP
//! client against a mock server, and the expiry sweep.

use chrono::Utc;
use isp_resolver::adapters::outbound::{
    IanaReservedClassifier, RdapConfig, RdapWhoisClient, SqliteRangeStore,
};
use isp_resolver::application::{ExpirySweep, DEFAULT_RANGE_TTL};
use isp_resolver::{RangeStore, ResolveError, Resolver, ResolverConfig};
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;
use tempfile::NamedTempFile;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn rdap_network(cidr: &str, length: u8, name: &str, country: &str) -> serde_json::Value {
    serde_json::json!({
        "objectClassName": "ip network",
        "name": name,
        "country": country,
        "remarks": [{"description": [format!("{} Ltd", name), "abuse@example.net"]}],
        "cidr0_cidrs": [{"v4prefix": cidr, "length": length}]
    })
}

async fn mount_network(server: &MockServer, address: &str, body: serde_json::Value, hits: u64) {
    Mock::given(method("GET"))
        .and(path(format!("/ip/{}", address)))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(hits)
        .mount(server)
        .await;
}

fn resolver(store: Arc<SqliteRangeStore>, server: &MockServer, config: ResolverConfig) -> Resolver {
    let whois = RdapWhoisClient::new(RdapConfig {
        base_url: server.uri(),
        timeout: Duration::from_secs(5),
    })
    .unwrap();

    Resolver::new(store, Arc::new(whois), Arc::new(IanaReservedClassifier::new()), config)
}

fn ip(s: &str) -> Ipv4Addr {
    s.parse().unwrap()
}

/// First resolution queries RDAP, the next one is served from the cache
#[tokio::test]
async fn test_resolve_and_reuse_cached_range() {
    let server = MockServer::start().await;
    mount_network(&server, "1.2.3.4", rdap_network("1.2.3.0", 24, "FOO", "UN"), 1).await;

    let store = Arc::new(SqliteRangeStore::in_memory().unwrap());
    let resolver = resolver(store.clone(), &server, ResolverConfig::default());

    let first = resolver.match_or_create(ip("1.2.3.4")).await.unwrap();
    let second = resolver.match_or_create(ip("1.2.3.5")).await.unwrap();

    assert!(first.created);
    assert!(!second.created);
    let owner = second.owner.unwrap();
    assert_eq!(owner.name.as_deref(), Some("FOO Ltd"));
    assert_eq!(owner.country.as_deref(), Some("un"));
    assert_eq!(Some(owner), first.owner);

    let (_, length) = resolver.match_address(ip("1.2.3.255")).await.unwrap();
    assert_eq!(length, 255);
}

/// Ranges are persisted across store instances
#[tokio::test]
async fn test_cache_survives_reopen() {
    let server = MockServer::start().await;
    mount_network(&server, "1.2.3.4", rdap_network("1.2.3.0", 24, "FOO", "UN"), 1).await;

    let temp = NamedTempFile::new().unwrap();
    let db_path = temp.path().to_str().unwrap().to_string();

    {
        let store = Arc::new(SqliteRangeStore::open(&db_path).unwrap());
        let resolver = resolver(store, &server, ResolverConfig::default());
        resolver.match_or_create(ip("1.2.3.4")).await.unwrap();
    }

    let store = Arc::new(SqliteRangeStore::open(&db_path).unwrap());
    let resolver = resolver(store, &server, ResolverConfig::default());
    let resolution = resolver.match_or_create(ip("1.2.3.100")).await.unwrap();

    assert!(!resolution.created);
    assert_eq!(resolution.owner.unwrap().name.as_deref(), Some("FOO Ltd"));
}

/// A too broad cached range is refined, and kept as fallback on failure
#[tokio::test]
async fn test_broad_range_refinement_and_fallback() {
    let server = MockServer::start().await;
    mount_network(&server, "1.1.1.1", rdap_network("1.0.0.0", 8, "BROAD", "AU"), 1).await;
    mount_network(&server, "1.2.3.4", rdap_network("1.2.3.0", 24, "NARROW", "AU"), 1).await;
    Mock::given(method("GET"))
        .and(path("/ip/1.9.9.9"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(SqliteRangeStore::in_memory().unwrap());
    let resolver = resolver(store.clone(), &server, ResolverConfig::default());

    let broad = resolver.match_or_create(ip("1.1.1.1")).await.unwrap();
    let narrow = resolver.match_or_create(ip("1.2.3.4")).await.unwrap();
    let fallback = resolver.match_or_create(ip("1.9.9.9")).await.unwrap();

    assert_eq!(broad.owner.as_ref().unwrap().name.as_deref(), Some("BROAD Ltd"));
    assert_eq!(narrow.owner.unwrap().name.as_deref(), Some("NARROW Ltd"));
    assert!(!fallback.created);
    assert_eq!(fallback.owner, broad.owner);
    assert_eq!(store.count_ranges().await.unwrap(), 2);
}

/// An RDAP answer that does not cover the address is not cached
#[tokio::test]
async fn test_mismatching_answer_is_discarded() {
    let server = MockServer::start().await;
    mount_network(&server, "1.2.3.4", rdap_network("4.5.6.0", 24, "OTHER", "UN"), 1).await;

    let store = Arc::new(SqliteRangeStore::in_memory().unwrap());
    let resolver = resolver(store.clone(), &server, ResolverConfig::default());

    let resolution = resolver.match_or_create(ip("1.2.3.4")).await.unwrap();

    assert!(resolution.owner.is_none());
    assert!(!resolution.created);
    assert_eq!(store.count_ranges().await.unwrap(), 0);
    assert!(matches!(
        resolver.match_address(ip("1.2.3.4")).await,
        Err(ResolveError::NotFound(_))
    ));
}

/// Slow providers are cut off by the resolver timeout
#[tokio::test]
async fn test_slow_provider_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ip/1.2.3.4"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(rdap_network("1.2.3.0", 24, "FOO", "UN"))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let store = Arc::new(SqliteRangeStore::in_memory().unwrap());
    let resolver = resolver(
        store.clone(),
        &server,
        ResolverConfig {
            whois_timeout: Duration::from_millis(100),
            ..Default::default()
        },
    );

    let resolution = resolver.match_or_create(ip("1.2.3.4")).await.unwrap();

    assert!(resolution.owner.is_none());
    assert_eq!(store.count_ranges().await.unwrap(), 0);
}

/// Reserved addresses never reach the provider
#[tokio::test]
async fn test_reserved_addresses_skip_provider() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let store = Arc::new(SqliteRangeStore::in_memory().unwrap());
    let resolver = resolver(store, &server, ResolverConfig::default());

    let tests = vec![
        ("10.1.2.3", "Private-Use Networks"),
        ("127.0.0.1", "Loopback"),
        ("203.0.113.5", "TEST-NET-3"),
    ];

    for (address, expected) in tests {
        let resolution = resolver.match_or_create(ip(address)).await.unwrap();
        assert_eq!(
            resolution.owner.unwrap().name.as_deref(),
            Some(expected),
            "Failed for address: {}",
            address
        );
    }
}

/// Concurrent resolutions of one network store a single range and identity
#[tokio::test]
async fn test_concurrent_resolutions_on_disk() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(rdap_network("1.2.3.0", 24, "FOO", "UN")))
        .mount(&server)
        .await;

    let temp = NamedTempFile::new().unwrap();
    let db_path = temp.path().to_str().unwrap().to_string();

    let mut handles = Vec::new();
    for i in 0..6u8 {
        let store = Arc::new(SqliteRangeStore::open(&db_path).unwrap());
        let resolver = resolver(store, &server, ResolverConfig::default());
        handles.push(tokio::spawn(async move {
            resolver.match_or_create(Ipv4Addr::new(1, 2, 3, i)).await
        }));
    }

    let results = futures::future::join_all(handles).await;
    let owners: Vec<_> = results
        .into_iter()
        .map(|r| r.unwrap().unwrap().owner.unwrap().id)
        .collect();

    assert!(owners.iter().all(|id| *id == owners[0]));

    let store = SqliteRangeStore::open(&db_path).unwrap();
    assert_eq!(store.count_ranges().await.unwrap(), 1);
    assert_eq!(store.count_identities().await.unwrap(), 1);
}

/// Expired ranges are swept and then re-resolved
#[tokio::test]
async fn test_sweep_then_re_resolve() {
    let server = MockServer::start().await;
    mount_network(&server, "1.2.3.4", rdap_network("1.2.3.0", 24, "FOO", "UN"), 2).await;

    let store = Arc::new(SqliteRangeStore::in_memory().unwrap());
    let resolver = resolver(store.clone(), &server, ResolverConfig::default());
    let sweep = ExpirySweep::new(store.clone(), DEFAULT_RANGE_TTL);

    let first = resolver.match_or_create(ip("1.2.3.4")).await.unwrap();
    assert_eq!(sweep.run_once(Utc::now()).await.unwrap(), 0);

    let later = Utc::now() + chrono::Duration::days(181);
    assert_eq!(sweep.run_once(later).await.unwrap(), 1);
    assert_eq!(store.count_ranges().await.unwrap(), 0);

    // the identity outlives the range and is reused
    let second = resolver.match_or_create(ip("1.2.3.4")).await.unwrap();
    assert!(!second.created);
    assert_eq!(second.owner, first.owner);
    assert_eq!(store.count_identities().await.unwrap(), 1);
}

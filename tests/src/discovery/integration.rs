#![cfg(test)]
use std::collections::HashSet;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use pingx_common::config::ScanConfig;
use pingx_common::network::range::NetworkRange;
use pingx_core::network::simulated::SimulatedTransport;
use pingx_core::{ScanError, StopSignal, scanner};
use pingx_protocols::icmp::{self, ProbeIdentity};

fn test_config() -> ScanConfig {
    ScanConfig {
        poll_delay: Duration::from_millis(5),
        idle_delay: Duration::from_millis(25),
        sweep_interval: Duration::from_millis(50),
        ..ScanConfig::default()
    }
}

async fn sweep(
    range: &str,
    config: ScanConfig,
    sim: &Arc<SimulatedTransport>,
) -> anyhow::Result<Vec<String>> {
    let range: NetworkRange = range.parse()?;
    let transport = Arc::clone(sim);
    let stream = scanner::scan_with(range, config, StopSignal::new(), move || Ok(transport)).await?;
    Ok(stream.collect().await?)
}

/// Two of four hosts in a /30 answer; both show up in the order they replied.
#[tokio::test]
async fn discovery_slash_30_two_responders() {
    let sim = Arc::new(
        SimulatedTransport::new()
            .responsive([Ipv4Addr::new(10, 0, 0, 1), Ipv4Addr::new(10, 0, 0, 2)]),
    );

    let hosts = sweep("10.0.0.0/30", test_config(), &sim).await.unwrap();

    assert_eq!(hosts, vec!["10.0.0.1".to_string(), "10.0.0.2".to_string()]);
    assert_eq!(sim.sends_to(Ipv4Addr::new(10, 0, 0, 0)), 3);
    assert_eq!(sim.sends_to(Ipv4Addr::new(10, 0, 0, 3)), 3);
    assert_eq!(sim.close_count(), 1);
}

#[tokio::test]
async fn discovery_slash_24_scattered_responders() {
    let alive: Vec<Ipv4Addr> = [1u8, 17, 64, 128, 200, 254]
        .into_iter()
        .map(|last| Ipv4Addr::new(192, 168, 50, last))
        .collect();
    let sim = Arc::new(SimulatedTransport::new().responsive(alive.clone()).replies_per_probe(2));

    let hosts = sweep("192.168.50.0/24", test_config(), &sim).await.unwrap();

    let found: HashSet<String> = hosts.iter().cloned().collect();
    let expected: HashSet<String> = alive.iter().map(|ip| ip.to_string()).collect();
    assert_eq!(hosts.len(), found.len(), "duplicates in {hosts:?}");
    assert_eq!(found, expected);
    assert_eq!(sim.total_sends(), alive.len() + (256 - alive.len()) * 3);
}

/// Replies meant for another scanner on the same host are not ours to count.
#[tokio::test]
async fn discovery_ignores_concurrent_scanner_traffic() {
    let ours = ProbeIdentity::new(4000, 2333);
    let theirs = ProbeIdentity::new(4001, 2333);
    let sim = Arc::new(SimulatedTransport::new().responsive([Ipv4Addr::new(10, 1, 0, 5)]));
    for last in 0..8 {
        sim.inject(icmp::create_echo_reply(theirs).unwrap(), Ipv4Addr::new(10, 1, 0, last));
    }

    let config = ScanConfig {
        identity: Some(ours),
        ..test_config()
    };
    let hosts = sweep("10.1.0.0/29", config, &sim).await.unwrap();

    assert_eq!(hosts, vec!["10.1.0.5".to_string()]);
}

#[tokio::test]
async fn discovery_stops_on_external_signal() {
    let sim = Arc::new(SimulatedTransport::new().responsive([Ipv4Addr::new(172, 16, 0, 9)]));
    let config = ScanConfig {
        sweep_interval: Duration::from_secs(60),
        idle_delay: Duration::from_millis(100),
        ..test_config()
    };
    let stop = StopSignal::new();
    let transport = Arc::clone(&sim);
    let mut stream = scanner::scan_with(
        "172.16.0.0/28".parse().unwrap(),
        config,
        stop.clone(),
        move || Ok(transport),
    )
    .await
    .unwrap();

    assert_eq!(stream.next().await.as_deref(), Some("172.16.0.9"));

    let stopped_at = Instant::now();
    stop.stop();
    assert_eq!(stream.next().await, None);
    let summary = stream.finish().await.unwrap();

    assert!(stopped_at.elapsed() < Duration::from_millis(500));
    assert!(summary.cancelled);
    assert_eq!(summary.alive, 1);
    assert_eq!(sim.close_count(), 1);
}

#[tokio::test]
async fn discovery_without_targets_fails_up_front() {
    let config = ScanConfig {
        skip_network_and_broadcast: true,
        ..test_config()
    };
    let sim = Arc::new(SimulatedTransport::new());
    let transport = Arc::clone(&sim);

    let result = scanner::scan_with(
        "10.0.0.7/32".parse().unwrap(),
        config,
        StopSignal::new(),
        move || Ok(transport),
    )
    .await;

    assert!(matches!(result, Err(ScanError::NoTargets(_))));
    assert_eq!(sim.total_sends(), 0);
}

/// Needs raw socket privileges.
#[tokio::test]
#[ignore]
async fn privileged_discovery_loopback() {
    let range = NetworkRange::from_prefix(Ipv4Addr::LOCALHOST, 32).unwrap();
    let hosts = scanner::perform_discovery(range, ScanConfig::default()).await;

    match hosts {
        Ok(hosts) => assert_eq!(hosts, vec!["127.0.0.1".to_string()]),
        Err(e) => panic!("Discovery failed: {e}"),
    }
}

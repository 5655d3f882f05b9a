use std::time::{Duration, Instant};

use anyhow::{Context, bail};
use tracing::{info, warn};

use crate::commands::{DiscoverArgs, networks};
use crate::terminal::{input, print, spinner};
use pingx_common::network::range::NetworkRange;
use pingx_core::{ScanSummary, StopSignal, scanner};

pub async fn discover(args: DiscoverArgs) -> anyhow::Result<()> {
    let range: NetworkRange = match args.target {
        Some(range) => range,
        None => select_local_network()?,
    };

    if !is_root::is_root() {
        warn!("Raw ICMP sockets usually need root privileges");
    }

    let stop = StopSignal::new();
    abort_on_interrupt(stop.clone());
    if let Some(secs) = args.timeout {
        abort_after(stop.clone(), Duration::from_secs(secs));
    }

    print::header("network discovery");
    let start_time: Instant = Instant::now();
    let mut stream = scanner::scan(range, args.to_config(), stop)
        .await
        .with_context(|| format!("sweeping {range}"))?;

    spinner::start();
    let mut hosts: Vec<String> = Vec::new();
    while let Some(host) = stream.next().await {
        print::host(&host);
        hosts.push(host);
        spinner::report_discovery_progress(hosts.len());
    }
    let summary: ScanSummary = stream.finish().await?;
    spinner::finish();

    discovery_ends(&summary, start_time.elapsed());
    Ok(())
}

fn select_local_network() -> anyhow::Result<NetworkRange> {
    let nets = networks::networks();
    if nets.is_empty() {
        bail!("no local IPv4 network to sweep, pass one explicitly");
    }
    let idx: usize = input::select_index("select network: ", nets.len())?;
    Ok(nets[idx].range)
}

fn abort_on_interrupt(stop: StopSignal) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, wrapping up");
            stop.stop();
        }
    });
}

fn abort_after(stop: StopSignal, timeout: Duration) {
    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::time::sleep(timeout) => {
                warn!("Timeout of {}s reached", timeout.as_secs());
                stop.stop();
            }
            _ = stop.stopped() => {}
        }
    });
}

fn discovery_ends(summary: &ScanSummary, total_time: Duration) {
    if summary.alive == 0 {
        print::no_results();
    }
    print::summary(summary.alive, summary.targets, total_time, summary.cancelled);
}

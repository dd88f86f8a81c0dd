use eyre::Result;
use punchclock_client::connectivity::Connectivity;
use punchclock_client::Station;
use tracing::warn;

pub async fn run(station: &Station) -> Result<()> {
    station.enable_auto_sync();

    let mut rx = station.monitor.subscribe();
    let state = station.probe().await;
    let pending = station.queue.count().await?;
    println!("{state} ({pending} pending)");

    if state == Connectivity::Online {
        if let Err(err) = station.cache.install().await {
            warn!("precache failed {err}");
        }
    }

    let probe = tokio::spawn(
        station
            .monitor
            .clone()
            .run(station.api.clone(), station.settings.probe_interval()),
    );

    loop {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = *rx.borrow_and_update();
                let pending = station.queue.count().await?;
                println!("{state} ({pending} pending)");
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    probe.abort();
    Ok(())
}

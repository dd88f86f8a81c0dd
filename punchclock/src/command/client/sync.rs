use eyre::Result;
use punchclock_client::connectivity::Connectivity;
use punchclock_client::sync::SyncReport;
use punchclock_client::Station;

pub(crate) fn print_report(report: &SyncReport) {
    if report.submitted == 0 {
        println!("Nothing to sync");
        return;
    }

    println!(
        "Synced {} of {} ({} already recorded, {} failed)",
        report.synced + report.duplicates,
        report.submitted,
        report.duplicates,
        report.failed
    );
    for correction in &report.needs_correction {
        let at = correction
            .event
            .clock_in
            .or(correction.event.clock_out)
            .unwrap_or(correction.event.captured_at);
        println!(
            "  needs correction: {} at {at}: {}",
            correction.event.human_employee_id,
            correction.outcome.error_message().unwrap_or_default()
        );
    }
}

pub(crate) async fn run(station: &Station) -> Result<()> {
    if station.probe().await == Connectivity::Offline {
        let pending = station.queue.count().await?;
        println!("Server unreachable. {pending} events pending");
        return Ok(());
    }

    match station.coordinator.sync_now().await? {
        Some(report) => print_report(&report),
        None => println!("A sync is already running"),
    }
    Ok(())
}

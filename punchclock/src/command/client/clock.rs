use clap::Parser;
use eyre::Result;
use punchclock_client::clock::ClockOutcome;
use punchclock_client::Station;
use punchclock_common::api::ClockRequest;
use punchclock_common::domain::ClockAction;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

#[derive(Parser, Debug)]
pub struct Cmd {
    /// Employee code
    employee: String,
    /// Terminal code this event is captured on
    #[clap(long, short)]
    terminal: Option<String>,
    #[clap(long, short)]
    notes: Option<String>,
}

impl Cmd {
    pub async fn run(self, station: &Station, action: ClockAction) -> Result<()> {
        station.probe().await;

        let req = ClockRequest {
            human_employee_id: self.employee,
            human_terminal_id: self.terminal,
            action,
            at: OffsetDateTime::now_utc(),
            notes: self.notes,
        };

        match station.clock.record(&req).await? {
            ClockOutcome::Recorded(entry) => {
                let at = match action {
                    ClockAction::In => entry.clock_in,
                    ClockAction::Out => entry.clock_out.unwrap_or(req.at),
                };
                println!(
                    "Clocked {action} {} at {}",
                    req.human_employee_id,
                    at.format(&Rfc3339)?
                );
            }
            ClockOutcome::Queued { pending, .. } => {
                println!(
                    "Offline. Clock {action} for {} saved locally ({pending} pending)",
                    req.human_employee_id
                );
            }
        }

        // Catch up on anything left behind by earlier offline runs.
        if station.monitor.is_online() && station.queue.count().await? > 0 {
            if let Some(report) = station.coordinator.sync_now().await? {
                super::sync::print_report(&report);
            }
        }

        Ok(())
    }
}

use clap::Parser;
use eyre::Result;
use punchclock_client::settings::Settings;
use punchclock_client::Station;
use punchclock_common::domain::ClockAction;

mod clock;
mod directory;
mod status;
mod sync;
mod watch;

#[derive(Parser, Debug)]
#[clap(infer_subcommands = true)]
pub enum Cmd {
    /// Clock an employee in
    In(clock::Cmd),
    /// Clock an employee out
    Out(clock::Cmd),
    /// Show connectivity and the pending queue
    Status,
    /// Replay the pending queue now
    Sync,
    /// Stay running and replay the queue whenever the server comes back
    Watch,
    /// List active employees
    Employees,
    /// List active terminals
    Terminals,
}

impl Cmd {
    #[tokio::main]
    pub async fn run(self) -> Result<()> {
        let settings = Settings::new()?;
        let station = Station::open(settings).await?;

        match self {
            Self::In(cmd) => cmd.run(&station, ClockAction::In).await,
            Self::Out(cmd) => cmd.run(&station, ClockAction::Out).await,
            Self::Status => status::run(&station).await,
            Self::Sync => sync::run(&station).await,
            Self::Watch => watch::run(&station).await,
            Self::Employees => directory::employees(&station).await,
            Self::Terminals => directory::terminals(&station).await,
        }
    }
}

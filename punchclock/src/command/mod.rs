use clap::Subcommand;
use eyre::Result;
use tracing_subscriber::{self, fmt, prelude::*, EnvFilter};

mod client;
mod server;

#[derive(Subcommand)]
pub enum PunchclockCmd {
    #[command(flatten)]
    Client(client::Cmd),

    #[command(subcommand)]
    Server(server::Cmd),
}

impl PunchclockCmd {
    pub fn run(self) -> Result<()> {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr))
            .with(EnvFilter::from_default_env())
            .init();

        match self {
            Self::Server(cmd) => cmd.run(),
            Self::Client(cmd) => cmd.run(),
        }
    }
}

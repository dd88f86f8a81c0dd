use clap::Parser;
use eyre::{Context, Result};
use punchclock_server::database::Database;
use punchclock_server::models::{NewEmployee, NewTerminal};
use punchclock_server::settings::Settings;
use std::net::SocketAddr;

#[derive(Parser, Debug)]
#[clap(infer_subcommands = true)]
pub enum EmployeeCmd {
    /// Register an employee in the directory
    Add {
        /// Human facing employee code, e.g. E042
        code: String,
        first_name: String,
        last_name: String,
        #[clap(long, short)]
        department: Option<String>,
    },
}

#[derive(Parser, Debug)]
#[clap(infer_subcommands = true)]
pub enum TerminalCmd {
    /// Register a terminal in the directory
    Add {
        /// Human facing terminal code, e.g. T1
        code: String,
        name: String,
        #[clap(long, short)]
        location: Option<String>,
    },
}

#[derive(Parser, Debug)]
#[clap(infer_subcommands = true)]
pub enum Cmd {
    /// Start the remote server
    Start {
        /// Host address
        #[clap(long)]
        host: Option<String>,
        /// Port to bind
        #[clap(long, short)]
        port: Option<u16>,
    },
    #[command(subcommand)]
    Employee(EmployeeCmd),
    #[command(subcommand)]
    Terminal(TerminalCmd),
}

async fn open_database(settings: &Settings) -> Result<Database> {
    Database::new(&settings.db_path)
        .await
        .wrap_err_with(|| format!("Failed to open database {}", settings.db_path))
}

impl Cmd {
    #[tokio::main]
    pub async fn run(self) -> Result<()> {
        tracing::trace!(command = ?self, "server command");

        let settings = Settings::new()?;

        match self {
            Self::Start { host, port } => {
                let host = host.as_ref().unwrap_or(&settings.host);
                let port = port.unwrap_or(settings.port);
                let address = SocketAddr::new(host.parse()?, port);
                punchclock_server::launch(&settings, address).await
            }
            Self::Employee(EmployeeCmd::Add {
                code,
                first_name,
                last_name,
                department,
            }) => {
                let db = open_database(&settings).await?;
                let id = db
                    .add_employee(NewEmployee {
                        employee_code: code.clone(),
                        first_name,
                        last_name,
                        department,
                    })
                    .await?;
                println!("Employee {code} added ({id})");
                Ok(())
            }
            Self::Terminal(TerminalCmd::Add {
                code,
                name,
                location,
            }) => {
                let db = open_database(&settings).await?;
                let id = db
                    .add_terminal(NewTerminal {
                        terminal_code: code.clone(),
                        name,
                        location,
                    })
                    .await?;
                println!("Terminal {code} added ({id})");
                Ok(())
            }
        }
    }
}

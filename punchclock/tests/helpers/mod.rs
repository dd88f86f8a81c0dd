#![allow(dead_code)]

use axum::serve;
use eyre::{eyre, Result};
use fake::faker::name::en::{FirstName, LastName};
use fake::Fake;
use punchclock_client::settings::Settings as ClientSettings;
use punchclock_client::Station;
use punchclock_server::database::Database as ServerDatabase;
use punchclock_server::make_router;
use punchclock_server::models::{NewEmployee, NewTerminal};
use punchclock_server::settings::Settings as ServerSettings;
use tempfile::TempDir;
use tokio::net::TcpListener;
use uuid::Uuid;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub struct TestServer {
    pub settings: ServerSettings,
    pub database: ServerDatabase,
    _dir: TempDir,
}

impl TestServer {
    pub async fn build(host: &str, port: u16) -> Result<Self> {
        let dir = TempDir::new()?;
        let db_path = dir.path().join("server.db");

        let settings: ServerSettings = ServerSettings::builder()?
            .set_override("db_path", db_path.to_str())?
            .set_override("port", port)?
            .set_override("host", host)?
            .build()?
            .try_deserialize()
            .map_err(|e| eyre!("Failed to deserialize {e}"))?;

        let database = ServerDatabase::new(&settings.db_path).await?;

        Ok(TestServer {
            settings,
            database,
            _dir: dir,
        })
    }

    pub fn address(&self) -> String {
        format!("http://{}:{}", self.settings.host, self.settings.port)
    }

    pub async fn add_employee(&self, code: &str) -> Uuid {
        self.database
            .add_employee(NewEmployee {
                employee_code: code.into(),
                first_name: FirstName().fake(),
                last_name: LastName().fake(),
                department: None,
            })
            .await
            .unwrap()
    }

    pub async fn add_terminal(&self, code: &str) -> Uuid {
        self.database
            .add_terminal(NewTerminal {
                terminal_code: code.into(),
                name: format!("Terminal {code}"),
                location: None,
            })
            .await
            .unwrap()
    }

    pub async fn entry_count(&self) -> i64 {
        self.database.count_entries().await.unwrap()
    }
}

pub async fn spawn_app() -> Result<TestServer> {
    let host = "127.0.0.1";
    let listener = TcpListener::bind(format!("{host}:0")).await?;
    let port = listener.local_addr()?.port();

    let server = TestServer::build(host, port).await?;

    let r = make_router(&server.settings, server.database.clone()).await;
    tokio::spawn(async move { serve(listener, r.into_make_service()).await.unwrap() });
    Ok(server)
}

/// An address nothing listens on.
pub async fn unreachable_address() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{port}")
}

pub struct TestStation {
    pub station: Station,
    dir: TempDir,
}

impl TestStation {
    pub async fn build(server_address: &str) -> Result<Self> {
        Self::finish(TempDir::new()?, server_address).await
    }

    /// Opens a second station over the same local database, as after a restart.
    pub async fn reopen(self, server_address: &str) -> Result<Self> {
        let Self { station, dir } = self;
        station.database.pool.close().await;
        Self::finish(dir, server_address).await
    }

    async fn finish(dir: TempDir, server_address: &str) -> Result<Self> {
        let station = Station::open(Self::settings(&dir, server_address)?).await?;
        Ok(Self { station, dir })
    }

    fn settings(dir: &TempDir, server_address: &str) -> Result<ClientSettings> {
        let db_path = dir.path().join("terminal.db");

        ClientSettings::builder()?
            .set_override("db_path", db_path.to_str())?
            .set_override("server_address", server_address)?
            .set_override("sync_timeout_secs", 2)?
            .build()?
            .try_deserialize()
            .map_err(|e| eyre!("Failed to deserialize {e}"))
    }
}

impl std::ops::Deref for TestStation {
    type Target = Station;

    fn deref(&self) -> &Self::Target {
        &self.station
    }
}

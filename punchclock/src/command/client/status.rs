use eyre::Result;
use punchclock_client::Station;

use crate::VERSION;

pub async fn run(station: &Station) -> Result<()> {
    let state = station.probe().await;
    let pending = station.queue.count().await?;

    println!("Server: {} ({state})", station.settings.server_address);
    println!("Pending: {pending}");
    println!("Database: {}", station.settings.db_path);
    println!("Cache: {}", station.settings.cache_generation);
    println!();
    println!("Version: {VERSION}");
    Ok(())
}

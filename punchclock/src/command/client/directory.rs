use eyre::{bail, Result};
use punchclock_client::cache::{CachedResponse, ResponseSource};
use punchclock_client::Station;
use punchclock_common::api::{EmployeeView, TerminalView};

async fn load(station: &Station, path: &str) -> Result<CachedResponse> {
    let res = station.cache.get(path).await?;
    if !res.status.is_success() {
        bail!("{path} unavailable ({}), nothing cached yet", res.status);
    }
    if res.source == ResponseSource::Cache {
        println!("(cached)");
    }
    Ok(res)
}

pub async fn employees(station: &Station) -> Result<()> {
    let res = load(station, "/employees").await?;
    for employee in res.json::<Vec<EmployeeView>>()? {
        println!(
            "{}\t{} {}\t{}",
            employee.employee_id,
            employee.first_name,
            employee.last_name,
            employee.department.unwrap_or_default()
        );
    }
    Ok(())
}

pub async fn terminals(station: &Station) -> Result<()> {
    let res = load(station, "/terminals").await?;
    for terminal in res.json::<Vec<TerminalView>>()? {
        println!(
            "{}\t{}\t{}",
            terminal.terminal_id,
            terminal.name,
            terminal.location.unwrap_or_default()
        );
    }
    Ok(())
}

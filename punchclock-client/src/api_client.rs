use crate::error::ClientError;
use punchclock_common::api::{
    ClockRequest, EntryView, ErrorMessage, HealthCheckResponse, PendingEvent, SyncRequest,
    SyncResponse,
};
use reqwest::Response;
use std::time::Duration;
use tracing::debug;

async fn handle_response_error(res: Response) -> Result<Response, ClientError> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }

    let body = res.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorMessage>(&body)
        .map(|x| x.error)
        .unwrap_or(body);

    if status.is_client_error() {
        Err(ClientError::Rejected { status, message })
    } else {
        Err(ClientError::Server { status, message })
    }
}

pub async fn health_check(address: &str) -> Result<HealthCheckResponse, ClientError> {
    let url = format!("{address}/");
    let res = reqwest::get(url).await?;
    let res = handle_response_error(res).await?;

    let res = res.json::<HealthCheckResponse>().await?;
    Ok(res)
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    address: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl ApiClient {
    pub fn new(address: &str, timeout: Duration) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .build()?;

        Ok(Self {
            address: address.trim_end_matches('/').to_string(),
            client,
            timeout,
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub async fn health_check(&self) -> Result<HealthCheckResponse, ClientError> {
        let res = self
            .client
            .get(format!("{}/", self.address))
            .timeout(self.timeout)
            .send()
            .await?;
        let res = handle_response_error(res).await?;

        Ok(res.json::<HealthCheckResponse>().await?)
    }

    /// Submits the whole batch at once. The timeout covers the full exchange, so an expired
    /// request never counts as delivered.
    pub async fn submit_batch(
        &self,
        entries: &[PendingEvent],
    ) -> Result<SyncResponse, ClientError> {
        debug!("submitting batch of {} entries", entries.len());
        let res = self
            .client
            .post(format!("{}/sync", self.address))
            .timeout(self.timeout)
            .json(&SyncRequest {
                entries: entries.to_vec(),
            })
            .send()
            .await?;
        let res = handle_response_error(res).await?;

        Ok(res.json::<SyncResponse>().await?)
    }

    pub async fn clock(&self, req: &ClockRequest) -> Result<EntryView, ClientError> {
        let res = self
            .client
            .post(format!("{}/clock", self.address))
            .timeout(self.timeout)
            .json(req)
            .send()
            .await?;
        let res = handle_response_error(res).await?;

        Ok(res.json::<EntryView>().await?)
    }
}

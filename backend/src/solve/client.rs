//! The solver as seen from the workspace.

use async_trait::async_trait;
use log::{debug, info};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

use super::request::SolveRequest;
use crate::api_client::{check_status, ApiEndpoint};
use crate::error::{WorkspaceError, WorkspaceResult};
use crate::models::{HistoryEntry, Resident, ScheduleResult};

/// Remote optimisation oracle.
///
/// One call, one complete schedule. The oracle honours pins; the workspace
/// only decides what to send.
#[async_trait]
pub trait SolverOracle: Send + Sync {
    async fn solve(&self, request: SolveRequest) -> WorkspaceResult<ScheduleResult>;
}

/// Body of an export request: the projection of a result the CSV needs.
#[derive(Debug, Serialize)]
pub struct ExportRequest<'a> {
    pub success: bool,
    pub residents: &'a [Resident],
    pub resident_history: &'a [HistoryEntry],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub optimisation_scores: Option<&'a Vec<Value>>,
}

impl<'a> From<&'a ScheduleResult> for ExportRequest<'a> {
    fn from(result: &'a ScheduleResult) -> Self {
        Self {
            success: result.success,
            residents: &result.residents,
            resident_history: &result.resident_history,
            optimisation_scores: result.optimisation_scores(),
        }
    }
}

/// HTTP client for `POST /solve` and `POST /download-csv`.
#[derive(Debug, Clone)]
pub struct HttpSolverClient {
    endpoint: ApiEndpoint,
}

impl HttpSolverClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> WorkspaceResult<Self> {
        Ok(Self {
            endpoint: ApiEndpoint::new(base_url, timeout)?,
        })
    }

    pub fn from_endpoint(endpoint: ApiEndpoint) -> Self {
        Self { endpoint }
    }

    pub fn base_url(&self) -> &str {
        self.endpoint.base_url()
    }

    /// Render `result` as the timetable CSV.
    pub async fn export_csv(&self, result: &ScheduleResult) -> WorkspaceResult<Vec<u8>> {
        let response = self
            .endpoint
            .client()
            .post(self.endpoint.url("/download-csv"))
            .json(&ExportRequest::from(result))
            .send()
            .await?;
        let response = check_status(response)
            .await
            .map_err(|(status, message)| WorkspaceError::transport(Some(status.as_u16()), message))?;
        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl SolverOracle for HttpSolverClient {
    async fn solve(&self, request: SolveRequest) -> WorkspaceResult<ScheduleResult> {
        debug!("Sending solve request with fields {:?}", request.field_names());
        let form = request.into_multipart()?;

        let response = self
            .endpoint
            .client()
            .post(self.endpoint.url("/solve"))
            .multipart(form)
            .send()
            .await?;
        let response = check_status(response)
            .await
            .map_err(|(status, message)| WorkspaceError::transport(Some(status.as_u16()), message))?;

        let body = response.text().await?;
        let result: ScheduleResult = serde_json::from_str(&body).map_err(|e| {
            WorkspaceError::transport(None, format!("Failed to parse solver response: {}", e))
        })?;
        info!(
            "Solver answered success={} with {} residents",
            result.success,
            result.residents.len()
        );
        Ok(result)
    }
}

//! HTTP client for the session service.
//!
//! Speaks the JSON API served by `r2s-server` and by the dashboard backend:
//! `/db-status` and `/sessions[/{id}|/latest]`.

use async_trait::async_trait;
use log::debug;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

use crate::api_client::{check_status, ApiEndpoint};
use crate::db::models::{NewSession, Session, SessionId, SessionSummary, SessionUpdate};
use crate::db::repository::{ErrorContext, RepositoryError, RepositoryResult, SessionRepository};

#[derive(Deserialize)]
struct DbStatus {
    available: bool,
}

#[derive(Deserialize)]
struct SessionList {
    sessions: Vec<SessionSummary>,
}

#[derive(Deserialize)]
struct SessionEnvelope {
    session: SessionSummary,
}

#[derive(Deserialize)]
struct LatestEnvelope {
    session: Option<Session>,
}

/// Session repository backed by the remote session service.
#[derive(Debug, Clone)]
pub struct RemoteRepository {
    endpoint: ApiEndpoint,
}

impl RemoteRepository {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> RepositoryResult<Self> {
        let endpoint = ApiEndpoint::new(base_url, timeout).map_err(|e| {
            RepositoryError::configuration(
                e.to_string(),
                ErrorContext::new("create_remote_repository"),
            )
        })?;
        Ok(Self { endpoint })
    }

    pub fn from_endpoint(endpoint: ApiEndpoint) -> Self {
        Self { endpoint }
    }

    pub fn base_url(&self) -> &str {
        self.endpoint.base_url()
    }

    async fn read_json<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
        context: ErrorContext,
    ) -> RepositoryResult<T> {
        let response = check_status(response)
            .await
            .map_err(|(status, message)| {
                RepositoryError::from_status(status, message, context.clone())
            })?;
        response
            .json::<T>()
            .await
            .map_err(|e| RepositoryError::bad_response(e.to_string(), context))
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        context: &ErrorContext,
    ) -> RepositoryResult<reqwest::Response> {
        request
            .send()
            .await
            .map_err(|e| RepositoryError::from_transport(e, context.clone()))
    }
}

fn session_context(operation: &str, id: SessionId) -> ErrorContext {
    ErrorContext::new(operation).for_session(id)
}

#[async_trait]
impl SessionRepository for RemoteRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        let context = ErrorContext::new("health_check");
        let request = self.endpoint.client().get(self.endpoint.url("/db-status"));
        let response = self.send(request, &context).await?;
        let status: DbStatus = self.read_json(response, context).await?;
        debug!("Session service reports available={}", status.available);
        Ok(status.available)
    }

    async fn list_sessions(&self) -> RepositoryResult<Vec<SessionSummary>> {
        let context = ErrorContext::new("list_sessions");
        let request = self.endpoint.client().get(self.endpoint.url("/sessions"));
        let response = self.send(request, &context).await?;
        let list: SessionList = self.read_json(response, context).await?;
        Ok(list.sessions)
    }

    async fn create_session(&self, session: NewSession) -> RepositoryResult<SessionSummary> {
        let context = ErrorContext::new("create_session");
        let request = self
            .endpoint
            .client()
            .post(self.endpoint.url("/sessions"))
            .json(&session);
        let response = self.send(request, &context).await?;
        let envelope: SessionEnvelope = self.read_json(response, context).await?;
        Ok(envelope.session)
    }

    async fn get_session(&self, id: SessionId) -> RepositoryResult<Session> {
        let context = session_context("get_session", id);
        let request = self
            .endpoint
            .client()
            .get(self.endpoint.url(&format!("/sessions/{}", id)));
        let response = self.send(request, &context).await?;
        self.read_json(response, context).await
    }

    async fn latest_session(&self) -> RepositoryResult<Option<Session>> {
        let context = ErrorContext::new("latest_session");
        let request = self
            .endpoint
            .client()
            .get(self.endpoint.url("/sessions/latest"));
        let response = self.send(request, &context).await?;
        let envelope: LatestEnvelope = self.read_json(response, context).await?;
        Ok(envelope.session)
    }

    async fn update_session(
        &self,
        id: SessionId,
        update: SessionUpdate,
    ) -> RepositoryResult<SessionSummary> {
        let context = session_context("update_session", id);
        let request = self
            .endpoint
            .client()
            .put(self.endpoint.url(&format!("/sessions/{}", id)))
            .json(&update);
        let response = self.send(request, &context).await?;
        let envelope: SessionEnvelope = self.read_json(response, context).await?;
        Ok(envelope.session)
    }

    async fn delete_session(&self, id: SessionId) -> RepositoryResult<()> {
        let context = session_context("delete_session", id);
        let request = self
            .endpoint
            .client()
            .delete(self.endpoint.url(&format!("/sessions/{}", id)));
        let response = self.send(request, &context).await?;
        let _: serde_json::Value = self.read_json(response, context).await?;
        Ok(())
    }
}

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use shared::{
    domain::{Employee, EmployeeId},
    error::ApiError,
    protocol::{
        LoginRequest, LoginResponse, RegisterBiometryRequest, EMPLOYEES_PATH, LOGIN_PATH,
        REGISTER_BIOMETRY_PATH,
    },
};
use tracing::{debug, info, warn};

use crate::{
    config::Settings,
    error::{AuthError, FetchError, SubmitError},
};

/// Remote HR API. Every method except `login` must be given the session's
/// bearer token.
#[async_trait]
pub trait ApiClient: Send + Sync {
    async fn login(&self, username: &str, password: &str) -> Result<String, AuthError>;
    async fn list_employees(&self, token: &str) -> Result<Vec<Employee>, FetchError>;
    async fn register_biometry(
        &self,
        token: &str,
        employee_id: EmployeeId,
        template_b64: &str,
    ) -> Result<(), SubmitError>;
}

pub struct HttpApiClient {
    http: Client,
    base_url: String,
}

impl HttpApiClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, reqwest::Error> {
        Self::new(settings.api_base_url.clone(), settings.request_timeout())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

async fn api_error(response: Response) -> ApiError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = if body.trim().is_empty() {
        status.canonical_reason().unwrap_or("request failed").to_string()
    } else {
        body
    };
    ApiError::new(status.as_u16(), message)
}

#[async_trait]
impl ApiClient for HttpApiClient {
    async fn login(&self, username: &str, password: &str) -> Result<String, AuthError> {
        let response = self
            .http
            .post(self.url(LOGIN_PATH))
            .json(&LoginRequest {
                username: username.to_string(),
                password: password.to_string(),
            })
            .send()
            .await
            .map_err(|err| AuthError::ConnectionFailure(err.to_string()))?;

        if !response.status().is_success() {
            let err = api_error(response).await;
            warn!(status = err.status, "login rejected");
            return Err(AuthError::InvalidCredentials(err));
        }

        let body = response
            .text()
            .await
            .map_err(|err| AuthError::ConnectionFailure(err.to_string()))?;
        let parsed: LoginResponse = serde_json::from_str(&body)
            .map_err(|err| AuthError::MalformedResponse(err.to_string()))?;
        match parsed.token {
            Some(token) if !token.trim().is_empty() => {
                info!(username, "login accepted");
                Ok(token)
            }
            _ => Err(AuthError::MalformedResponse("token missing".to_string())),
        }
    }

    async fn list_employees(&self, token: &str) -> Result<Vec<Employee>, FetchError> {
        let response = self
            .http
            .get(self.url(EMPLOYEES_PATH))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|err| FetchError::Transport(err.to_string()))?;

        if !response.status().is_success() {
            return Err(FetchError::Status(api_error(response).await));
        }

        let body = response
            .bytes()
            .await
            .map_err(|err| FetchError::Transport(err.to_string()))?;
        let employees: Vec<Employee> =
            serde_json::from_slice(&body).map_err(|err| FetchError::Decode(err.to_string()))?;
        debug!(count = employees.len(), "fetched employees");
        Ok(employees)
    }

    async fn register_biometry(
        &self,
        token: &str,
        employee_id: EmployeeId,
        template_b64: &str,
    ) -> Result<(), SubmitError> {
        let response = self
            .http
            .post(self.url(REGISTER_BIOMETRY_PATH))
            .bearer_auth(token)
            .json(&RegisterBiometryRequest {
                employee_id,
                template_b64: template_b64.to_string(),
            })
            .send()
            .await
            .map_err(|err| SubmitError::Transport(err.to_string()))?;

        if !response.status().is_success() {
            return Err(SubmitError::Status(api_error(response).await));
        }
        info!(employee_id = employee_id.0, "biometry registered");
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/api_tests.rs"]
mod tests;

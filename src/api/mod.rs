//! Device HTTP API: the shared request layer for every privileged call.
//!
//! Attaches the bearer credential, hands 401s to the auth collaborator, and
//! turns non-success responses into `ApiError`s carrying the device's message.

use std::sync::Arc;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use thiserror::Error;
use tracing::debug;

use crate::auth::CredentialProvider;
use crate::protocol::{ApiReply, CameraSettings, CameraStatus, ErrorBody, SettingsReport, SettingsResponse};

const CAPTURE_PATH: &str = "/api/v1/camera/capture";
const SETTINGS_PATH: &str = "/api/v1/camera/settings";
const STATUS_PATH: &str = "/api/v1/camera/status";
const ENABLE_PATH: &str = "/api/v1/camera/enable";
const DISABLE_PATH: &str = "/api/v1/camera/disable";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unauthorized: the device rejected the session token")]
    Unauthorized,
    #[error("device returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("device rejected the request: {0}")]
    Rejected(String),
    #[error("unexpected response: {0}")]
    Decode(String),
}

#[derive(Clone)]
pub struct DeviceApi {
    client: Client,
    base_url: String,
    auth: Arc<dyn CredentialProvider>,
}

impl DeviceApi {
    pub fn new(base_url: String, auth: Arc<dyn CredentialProvider>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            auth,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let mut builder = self.client.request(method, url);
        if let Some(token) = self.auth.credential() {
            builder = builder.header(AUTHORIZATION, format!("Bearer {}", token));
        }
        builder
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, ApiError> {
        let resp = builder.send().await?;
        debug!(status = %resp.status(), url = %resp.url(), "device response");
        if resp.status() == StatusCode::UNAUTHORIZED {
            self.auth.on_unauthorized();
            return Err(ApiError::Unauthorized);
        }
        if !resp.status().is_success() {
            return Err(status_error(resp).await);
        }
        Ok(resp)
    }

    /// One JPEG from the camera, outside the stream
    pub async fn capture(&self) -> Result<Vec<u8>, ApiError> {
        let builder = self
            .request(Method::POST, CAPTURE_PATH)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body("");
        let resp = self.send(builder).await?;
        let bytes = resp.bytes().await?;
        if bytes.is_empty() {
            return Err(ApiError::Decode("empty capture body".to_string()));
        }
        Ok(bytes.to_vec())
    }

    pub async fn load_settings(&self) -> Result<SettingsReport, ApiError> {
        let resp = self.send(self.request(Method::GET, SETTINGS_PATH)).await?;
        let body: SettingsResponse = resp
            .json()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))?;
        if !body.success {
            return Err(ApiError::Rejected(
                body.message.unwrap_or_else(|| "settings unavailable".to_string()),
            ));
        }
        Ok(body.settings.unwrap_or_default())
    }

    /// Send the four capture parameters exactly as given
    pub async fn apply_settings(&self, settings: &CameraSettings) -> Result<String, ApiError> {
        let builder = self.request(Method::POST, SETTINGS_PATH).form(settings);
        let reply = self.reply(builder).await?;
        Ok(reply
            .message
            .unwrap_or_else(|| "Camera settings updated".to_string()))
    }

    pub async fn status(&self) -> Result<CameraStatus, ApiError> {
        let resp = self.send(self.request(Method::GET, STATUS_PATH)).await?;
        let status: CameraStatus = resp
            .json()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))?;
        if !status.success {
            return Err(ApiError::Rejected(
                status.message.unwrap_or_else(|| "status unavailable".to_string()),
            ));
        }
        Ok(status)
    }

    pub async fn set_enabled(&self, enabled: bool) -> Result<String, ApiError> {
        let path = if enabled { ENABLE_PATH } else { DISABLE_PATH };
        let builder = self
            .request(Method::POST, path)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body("");
        let reply = self.reply(builder).await?;
        // The device echoes the resulting state; trust it over the status code
        if let Some(now) = reply.enabled {
            if now != enabled {
                return Err(ApiError::Rejected(format!(
                    "camera is still {}",
                    if now { "enabled" } else { "disabled" }
                )));
            }
        }
        Ok(reply.message.unwrap_or_else(|| {
            if enabled { "Camera enabled" } else { "Camera disabled" }.to_string()
        }))
    }

    async fn reply(&self, builder: RequestBuilder) -> Result<ApiReply, ApiError> {
        let resp = self.send(builder).await?;
        let reply: ApiReply = resp
            .json()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))?;
        if !reply.success {
            return Err(ApiError::Rejected(
                reply.message.unwrap_or_else(|| "no reason given".to_string()),
            ));
        }
        Ok(reply)
    }
}

async fn status_error(resp: Response) -> ApiError {
    let status = resp.status();
    let text = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .ok()
        .and_then(|b| b.message)
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        });
    ApiError::Status {
        status: status.as_u16(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticToken;
    use crate::mock_device::{MockHttp, MockResponse};

    fn api(base: String, token: Option<&str>) -> (DeviceApi, Arc<StaticToken>) {
        let auth = Arc::new(StaticToken::new(token.map(str::to_string)));
        (DeviceApi::new(base, auth.clone()), auth)
    }

    #[tokio::test]
    async fn test_bearer_attached_and_settings_parsed() {
        let mock = MockHttp::start(vec![MockResponse::json(
            200,
            r#"{"success":true,"settings":{"quality":10,"brightness":1,"contrast":-1,"framesize":5}}"#,
        )])
        .await;
        let (api, _) = api(mock.base_url(), Some("tok-1"));

        let report = api.load_settings().await.unwrap();
        assert_eq!(report.quality, Some(10));
        assert_eq!(report.contrast, Some(-1));

        let req = mock.next_request().await;
        assert_eq!(req.method, "GET");
        assert_eq!(req.path, "/api/v1/camera/settings");
        assert_eq!(req.header("authorization").as_deref(), Some("Bearer tok-1"));
    }

    #[tokio::test]
    async fn test_unauthorized_notifies_auth() {
        let mock = MockHttp::start(vec![MockResponse::json(401, r#"{"success":false}"#)]).await;
        let (api, auth) = api(mock.base_url(), Some("stale"));

        let err = api.status().await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized));
        assert!(auth.is_invalidated());
    }

    #[tokio::test]
    async fn test_error_message_from_body() {
        let mock = MockHttp::start(vec![MockResponse::json(
            400,
            r#"{"success":false,"message":"Camera is disabled"}"#,
        )])
        .await;
        let (api, _) = api(mock.base_url(), None);

        match api.capture().await {
            Err(ApiError::Status { status, message }) => {
                assert_eq!(status, 400);
                assert_eq!(message, "Camera is disabled");
            }
            other => panic!("unexpected: {:?}", other.map(|b| b.len())),
        }
        let req = mock.next_request().await;
        assert_eq!(req.header("authorization"), None);
    }

    #[tokio::test]
    async fn test_enable_disable_paths() {
        let mock = MockHttp::start(vec![
            MockResponse::json(200, r#"{"success":true,"message":"Camera disabled","enabled":false}"#),
            MockResponse::json(200, r#"{"success":true,"message":"Camera enabled","enabled":true}"#),
        ])
        .await;
        let (api, _) = api(mock.base_url(), Some("t"));

        assert_eq!(api.set_enabled(false).await.unwrap(), "Camera disabled");
        assert_eq!(api.set_enabled(true).await.unwrap(), "Camera enabled");
        assert_eq!(mock.next_request().await.path, "/api/v1/camera/disable");
        assert_eq!(mock.next_request().await.path, "/api/v1/camera/enable");
    }

    #[tokio::test]
    async fn test_enable_not_reflected_is_rejected() {
        let mock = MockHttp::start(vec![
            MockResponse::json(200, r#"{"success":true,"message":"Camera enabled","enabled":false}"#),
            MockResponse::json(200, r#"{"success":true}"#),
        ])
        .await;
        let (api, _) = api(mock.base_url(), Some("t"));

        match api.set_enabled(true).await {
            Err(ApiError::Rejected(reason)) => assert_eq!(reason, "camera is still disabled"),
            other => panic!("unexpected: {:?}", other),
        }
        // No echoed state: the reply alone decides
        assert_eq!(api.set_enabled(false).await.unwrap(), "Camera disabled");
    }

    #[tokio::test]
    async fn test_status_parsed_and_failure_rejected() {
        let mock = MockHttp::start(vec![
            MockResponse::json(
                200,
                r#"{"success":true,"enabled":true,"initialized":true,"settings":{"quality":12,"framesize":8}}"#,
            ),
            MockResponse::json(200, r#"{"success":false,"message":"Camera not initialized"}"#),
            MockResponse::json(200, r#"{"enabled":true}"#),
        ])
        .await;
        let (api, _) = api(mock.base_url(), None);

        let status = api.status().await.unwrap();
        assert!(status.enabled && status.initialized);
        assert_eq!(status.settings.and_then(|s| s.quality), Some(12));
        assert_eq!(mock.next_request().await.path, "/api/v1/camera/status");

        match api.status().await {
            Err(ApiError::Rejected(reason)) => assert_eq!(reason, "Camera not initialized"),
            other => panic!("unexpected: {:?}", other),
        }
        assert!(matches!(api.status().await, Err(ApiError::Rejected(_))));
    }
}

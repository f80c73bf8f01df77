//! HTTP client for the remote execution service

use crate::config::{BrowserSpec, Credentials, Endpoints, RunConfiguration};
use crate::error::{Error, Result};
use crate::remote::{ArtifactUploader, BuildStatusSource, BuildSubmitter};
use crate::types::{BuildRecord, BuildStatus, UploadHandle};
use async_trait::async_trait;
use base64::Engine;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Default request timeout in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Upload timeout in seconds; archives can be large
const UPLOAD_TIMEOUT_SECS: u64 = 300;

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

#[derive(Serialize)]
struct CreateBuildPayload<'a> {
    browsers: &'a [BrowserSpec],
    run_settings: BuildRunSettings<'a>,
    test_suite: &'a str,
}

#[derive(Serialize)]
struct BuildRunSettings<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    build_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    parallels: Option<i64>,
    specs: &'a [String],
    env: &'a BTreeMap<String, String>,
    local: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    local_identifier: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dependencies: Option<&'a BTreeMap<String, String>>,
}

#[derive(Deserialize)]
struct BuildResponse {
    #[serde(default)]
    message: String,
    build_id: String,
    dashboard_url: Option<String>,
}

#[derive(Deserialize)]
struct StatusResponse {
    status: BuildStatus,
}

/// Remote service client using reqwest
pub struct RemoteClient {
    client: Client,
    endpoints: Endpoints,
}

impl RemoteClient {
    /// Create a client for `endpoints`
    pub fn new(endpoints: Endpoints) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .user_agent(concat!("testship/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Internal(format!("failed to create HTTP client: {e}")))?;
        Ok(Self { client, endpoints })
    }

    fn auth_header(credentials: &Credentials) -> String {
        let auth = format!("{}:{}", credentials.username, credentials.access_key);
        let encoded = base64::engine::general_purpose::STANDARD.encode(auth);
        format!("Basic {encoded}")
    }

    /// Service message from an error body, or the HTTP status
    async fn failure_message(response: Response) -> String {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|b| b.message)
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| format!("HTTP {status}"))
    }
}

#[async_trait]
impl ArtifactUploader for RemoteClient {
    async fn upload(&self, config: &RunConfiguration, artifact: &Path) -> Result<UploadHandle> {
        let bytes = tokio::fs::read(artifact).await?;
        debug!(path = %artifact.display(), size = bytes.len(), "uploading artifact");

        let file_name = artifact
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("tests.zip")
            .to_string();
        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("application/zip")?;
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(self.endpoints.api_url("/upload"))
            .header("Authorization", Self::auth_header(&config.credentials))
            .timeout(Duration::from_secs(UPLOAD_TIMEOUT_SECS))
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::Upload(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::Upload(Self::failure_message(response).await));
        }

        let handle: UploadHandle = response
            .json()
            .await
            .map_err(|e| Error::Upload(format!("unexpected upload response: {e}")))?;
        debug!(url = %handle.url, "uploaded artifact");
        Ok(handle)
    }
}

#[async_trait]
impl BuildSubmitter for RemoteClient {
    async fn create_build(
        &self,
        config: &RunConfiguration,
        upload: &UploadHandle,
    ) -> Result<BuildRecord> {
        let run_settings = &config.run_settings;
        let payload = CreateBuildPayload {
            browsers: &config.browsers,
            run_settings: BuildRunSettings {
                build_name: config.build_name(),
                parallels: config.parallels,
                specs: &run_settings.specs,
                env: &run_settings.env,
                local: config.local,
                local_identifier: config.local_identifier.as_deref(),
                dependencies: run_settings.dependencies.as_ref(),
            },
            test_suite: &upload.url,
        };
        debug!(build_name = ?config.build_name(), parallels = ?config.parallels, "creating build");

        let response = self
            .client
            .post(self.endpoints.api_url("/builds"))
            .header("Authorization", Self::auth_header(&config.credentials))
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::Build(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::Build(Self::failure_message(response).await));
        }

        let build: BuildResponse = response
            .json()
            .await
            .map_err(|e| Error::Build(format!("unexpected build response: {e}")))?;
        let dashboard_url = build
            .dashboard_url
            .unwrap_or_else(|| self.endpoints.build_dashboard_url(&build.build_id));

        debug!(build_id = %build.build_id, "created build");
        Ok(BuildRecord {
            build_id: build.build_id,
            message: build.message,
            dashboard_url,
        })
    }
}

#[async_trait]
impl BuildStatusSource for RemoteClient {
    async fn build_status(&self, config: &RunConfiguration, build_id: &str) -> Result<BuildStatus> {
        let url = self
            .endpoints
            .api_url(&format!("/builds/{}", urlencoding::encode(build_id)));

        let response: StatusResponse = self
            .client
            .get(&url)
            .header("Authorization", Self::auth_header(&config.credentials))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        debug!(build_id, status = %response.status, "fetched build status");
        Ok(response.status)
    }
}

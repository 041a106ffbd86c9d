use std::time::Duration;

use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;

use super::JobBackend;
use super::error::ApiError;
use super::types::{ErrorBody, FormatCatalog, SubmitAccepted, SubmitBody, VideoInfo};
use crate::session::{ArtifactRef, JobHandle, JobRequest, StatusSnapshot};

pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:5000/api/";

/// HTTP client for the extraction backend. Every call is a single request;
/// nothing here retries.
pub struct BackendClient {
    client: Client,
    base_url: Url,
}

impl BackendClient {
    /// Build a client for the backend rooted at `base_url`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        // Without the trailing slash `Url::join` would replace the last segment.
        let mut base = base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base).map_err(|e| ApiError::InvalidUrl(format!("{base}: {e}")))?;
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(timeout)
            .build()?;
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Absolute URL of an artifact reference.
    pub fn artifact_url(&self, artifact: &ArtifactRef) -> Result<Url, ApiError> {
        self.endpoint(artifact.download_url.trim_start_matches('/'))
    }

    /// `GET info?url=...`: metadata for the video behind `url`.
    pub async fn fetch_info(&self, url: &str) -> Result<VideoInfo, ApiError> {
        let mut endpoint = self.endpoint("info")?;
        endpoint.query_pairs_mut().append_pair("url", url);
        let response = self.client.get(endpoint).send().await?;
        read_json(response).await
    }

    /// `GET formats`: the formats and qualities the backend accepts.
    pub async fn fetch_formats(&self) -> Result<FormatCatalog, ApiError> {
        let response = self.client.get(self.endpoint("formats")?).send().await?;
        read_json(response).await
    }

    /// `GET artifact/{id}`: the finished audio file.
    pub async fn fetch_artifact(&self, artifact: &ArtifactRef) -> Result<Vec<u8>, ApiError> {
        let response = self.client.get(self.artifact_url(artifact)?).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(error_from_body(status.as_u16(), body));
        }
        let bytes = response.bytes().await?;
        Ok(bytes.to_vec())
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path)
            .map_err(|e| ApiError::InvalidUrl(format!("{path}: {e}")))
    }
}

impl JobBackend for BackendClient {
    async fn submit_job(&self, request: &JobRequest) -> Result<JobHandle, ApiError> {
        let body = SubmitBody {
            url: &request.url,
            format: request.format,
            quality: request.quality,
        };
        let response = self
            .client
            .post(self.endpoint("download")?)
            .json(&body)
            .send()
            .await?;
        let accepted: SubmitAccepted = read_json(response).await?;
        if let Some(message) = &accepted.message {
            tracing::debug!(job_id = %accepted.id, message = %message, "Backend accepted job");
        }
        Ok(JobHandle { id: accepted.id })
    }

    async fn fetch_status(&self, handle: &JobHandle) -> Result<StatusSnapshot, ApiError> {
        let endpoint = self.endpoint(&format!("status/{}", handle.id))?;
        let response = self.client.get(endpoint).send().await?;
        read_json(response).await
    }
}

/// Decode a JSON answer, preferring the expected shape and falling back to
/// the backend's `{error}` convention.
async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(error_from_body(status.as_u16(), body));
    }

    match serde_json::from_str::<T>(&body) {
        Ok(value) => Ok(value),
        Err(parse_err) => match serde_json::from_str::<ErrorBody>(&body) {
            Ok(ErrorBody { error }) => Err(ApiError::Rejected(error)),
            Err(_) => Err(ApiError::Malformed(parse_err.to_string())),
        },
    }
}

fn error_from_body(status: u16, body: String) -> ApiError {
    match serde_json::from_str::<ErrorBody>(&body) {
        Ok(ErrorBody { error }) => ApiError::Rejected(error),
        Err(_) => ApiError::Status {
            status,
            message: body,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{AudioFormat, JobStatus, Quality};
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> BackendClient {
        BackendClient::new(&format!("{}/api", server.uri()), Duration::from_secs(5)).unwrap()
    }

    fn request() -> JobRequest {
        JobRequest {
            url: "https://youtu.be/abc123".into(),
            format: AudioFormat::Mp3,
            quality: Quality::Kbps192,
        }
    }

    #[test]
    fn base_url_gets_trailing_slash() {
        let client = BackendClient::new("http://localhost:5000/api", Duration::from_secs(1)).unwrap();
        assert_eq!(client.base_url().as_str(), "http://localhost:5000/api/");
        let artifact = JobHandle { id: "job-1".into() }.artifact();
        assert_eq!(
            client.artifact_url(&artifact).unwrap().as_str(),
            "http://localhost:5000/api/artifact/job-1"
        );
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let result = BackendClient::new("not a url", Duration::from_secs(1));
        assert!(matches!(result, Err(ApiError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn submit_posts_request_and_returns_handle() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/download"))
            .and(body_json(json!({
                "url": "https://youtu.be/abc123",
                "format": "mp3",
                "quality": "192"
            })))
            .respond_with(ResponseTemplate::new(202).set_body_json(json!({
                "id": "job-1",
                "status": "queued",
                "message": "Download started"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let handle = client_for(&server).submit_job(&request()).await.unwrap();
        assert_eq!(handle, JobHandle { id: "job-1".into() });
    }

    #[tokio::test]
    async fn submit_surfaces_backend_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/download"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(json!({"error": "Invalid YouTube URL"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let err = client_for(&server).submit_job(&request()).await.unwrap_err();
        assert!(matches!(err, ApiError::Rejected(ref m) if m == "Invalid YouTube URL"));
    }

    #[tokio::test]
    async fn status_parses_snapshot() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/status/job-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "job-1",
                "status": "converting",
                "progress": 55,
                "error": null,
                "formatted_duration": "3:32"
            })))
            .mount(&server)
            .await;

        let snap = client_for(&server)
            .fetch_status(&JobHandle { id: "job-1".into() })
            .await
            .unwrap();
        assert_eq!(snap.status, JobStatus::Converting);
        assert_eq!(snap.progress, 55);
        assert!(snap.error.is_none());
    }

    #[tokio::test]
    async fn status_keeps_failed_snapshot_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/status/job-2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "failed",
                "progress": 0,
                "error": "video unavailable"
            })))
            .mount(&server)
            .await;

        let snap = client_for(&server)
            .fetch_status(&JobHandle { id: "job-2".into() })
            .await
            .unwrap();
        assert_eq!(snap.status, JobStatus::Failed);
        assert_eq!(snap.error.as_deref(), Some("video unavailable"));
    }

    #[tokio::test]
    async fn status_not_found_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/status/missing"))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(json!({"error": "Download not found"})),
            )
            .mount(&server)
            .await;

        let err = client_for(&server)
            .fetch_status(&JobHandle { id: "missing".into() })
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Rejected(ref m) if m == "Download not found"));
    }

    #[tokio::test]
    async fn status_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/status/job-3"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .fetch_status(&JobHandle { id: "job-3".into() })
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Malformed(_)));
    }

    #[tokio::test]
    async fn server_error_without_json_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/status/job-4"))
            .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .fetch_status(&JobHandle { id: "job-4".into() })
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Status { status: 502, .. }));
    }

    #[tokio::test]
    async fn unreachable_server_is_network_error() {
        // Nothing listens on the discard port.
        let client = BackendClient::new("http://127.0.0.1:9/api", Duration::from_secs(2)).unwrap();
        let err = client
            .fetch_status(&JobHandle { id: "job-1".into() })
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Network(_)));
    }

    #[tokio::test]
    async fn info_sends_url_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/info"))
            .and(query_param("url", "https://youtu.be/abc123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "title": "Test video",
                "formatted_duration": "1:05",
                "view_count": 1234,
                "uploader": "Someone"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let info = client_for(&server)
            .fetch_info("https://youtu.be/abc123")
            .await
            .unwrap();
        assert_eq!(info.title, "Test video");
        assert_eq!(info.formatted_duration.as_deref(), Some("1:05"));
    }

    #[tokio::test]
    async fn info_error_body_with_server_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/info"))
            .respond_with(
                ResponseTemplate::new(500).set_body_json(json!({"error": "Video unavailable"})),
            )
            .mount(&server)
            .await;

        let err = client_for(&server)
            .fetch_info("https://youtu.be/abc123")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Video unavailable");
    }

    #[tokio::test]
    async fn formats_catalog() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/formats"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "formats": ["mp3", "m4a", "wav"],
                "qualities": ["128", "192", "320"],
                "default_format": "mp3",
                "default_quality": "192"
            })))
            .mount(&server)
            .await;

        let catalog = client_for(&server).fetch_formats().await.unwrap();
        assert_eq!(catalog.formats, vec!["mp3", "m4a", "wav"]);
        assert_eq!(catalog.default_quality, "192");
    }

    #[tokio::test]
    async fn artifact_download_returns_bytes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/artifact/job-1"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ID3fake".to_vec()))
            .mount(&server)
            .await;

        let artifact = JobHandle { id: "job-1".into() }.artifact();
        let bytes = client_for(&server).fetch_artifact(&artifact).await.unwrap();
        assert_eq!(bytes, b"ID3fake");
    }

    #[tokio::test]
    async fn expired_artifact_on_server() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/artifact/job-1"))
            .respond_with(
                ResponseTemplate::new(404)
                    .set_body_json(json!({"error": "File expired or not found"})),
            )
            .mount(&server)
            .await;

        let artifact = JobHandle { id: "job-1".into() }.artifact();
        let err = client_for(&server).fetch_artifact(&artifact).await.unwrap_err();
        assert!(matches!(err, ApiError::Rejected(_)));
    }
}

use reqwest::{Client, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum SdkError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The server answered with a non-success status.
    #[error("server returned {status}: {message}")]
    Api { status: StatusCode, message: String },
}

impl SdkError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            SdkError::Api { status, .. } => Some(*status),
            SdkError::Http(e) => e.status(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusResponse {
    pub status: String,
    pub service: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub email: String,
    pub expires_in_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResponse {
    pub email: String,
    pub created_at: String,
    pub expires_in_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

pub struct TitanClient {
    client: Client,
    base_url: String,
    api_key_header: String,
}

impl TitanClient {
    pub fn new(base_url: &str) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key_header: "X-API-Key".to_string(),
        }
    }

    /// Use a header other than `X-API-Key` for [`TitanClient::status`].
    pub fn api_key_header(mut self, header: &str) -> Self {
        self.api_key_header = header.to_string();
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn health(&self) -> Result<HealthResponse, SdkError> {
        let resp = self.client.get(self.url("/health")).send().await?;
        decode(resp).await
    }

    pub async fn status(&self, api_key: &str) -> Result<StatusResponse, SdkError> {
        let resp = self
            .client
            .get(self.url("/status"))
            .header(self.api_key_header.as_str(), api_key)
            .send()
            .await?;
        decode(resp).await
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, SdkError> {
        let resp = self
            .client
            .post(self.url("/auth/login"))
            .json(&LoginRequest { email, password })
            .send()
            .await?;
        decode(resp).await
    }

    pub async fn session(&self, token: &str) -> Result<SessionResponse, SdkError> {
        let resp = self
            .client
            .get(self.url("/auth/session"))
            .bearer_auth(token)
            .send()
            .await?;
        decode(resp).await
    }

    pub async fn logout(&self, token: &str) -> Result<(), SdkError> {
        let resp = self
            .client
            .post(self.url("/auth/logout"))
            .bearer_auth(token)
            .send()
            .await?;
        decode::<serde_json::Value>(resp).await.map(|_| ())
    }
}

async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, SdkError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp.json().await?);
    }

    let text = resp.text().await?;
    let message = serde_json::from_str::<ErrorBody>(&text)
        .map(|body| body.error)
        .unwrap_or(text);
    Err(SdkError::Api { status, message })
}

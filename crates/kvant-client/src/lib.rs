use std::time::Duration;

use anyhow::Context;
use kvant_types::domain::order::Order;
use kvant_types::domain::user::{User, UserId};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{RequestBuilder, Response, Url};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct KvantClientBuilder {
    base: Url,
    headers: HeaderMap,
    timeout: Option<Duration>,
    client: Option<reqwest::Client>,
}

/// Thin typed wrapper over the HTTP API. Protected calls need a token, see
/// [`KvantClient::login`] and [`KvantClient::with_token`].
#[derive(Clone)]
pub struct KvantClient {
    base: Url,
    client: reqwest::Client,
    token: Option<String>,
}

impl std::fmt::Debug for KvantClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KvantClient")
            .field("base", &self.base.as_str())
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl KvantClient {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        Self::builder(base_url)?.build()
    }

    pub fn builder(base_url: &str) -> anyhow::Result<KvantClientBuilder> {
        let base = Url::parse(base_url).context("invalid base url")?;
        Ok(KvantClientBuilder {
            base,
            headers: HeaderMap::new(),
            timeout: None,
            client: None,
        })
    }

    /// A copy of this client that sends `token` as a bearer credential.
    pub fn with_token(&self, token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            ..self.clone()
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    fn url(&self, path: &str) -> anyhow::Result<Url> {
        self.base.join(path).context("failed to join url")
    }

    fn authed(&self, req: RequestBuilder) -> anyhow::Result<RequestBuilder> {
        let token = self
            .token
            .as_deref()
            .context("this call needs a token, log in first")?;
        Ok(req.bearer_auth(token))
    }

    /// Exchanges credentials for a token and returns an authenticated client.
    pub async fn login(&self, email: &str, password: &str) -> anyhow::Result<Self> {
        let res = self
            .client
            .post(self.url("auth/login")?)
            .json(&LoginRequest { email, password })
            .send()
            .await?;
        let body: TokenResponse = check(res).await?.json().await?;
        tracing::debug!("logged in as {}", email);
        Ok(self.with_token(body.token))
    }

    pub async fn create_user(&self, req: &CreateUserRequest) -> anyhow::Result<User> {
        let res = self
            .client
            .post(self.url("users")?)
            .json(req)
            .send()
            .await?;
        Ok(check(res).await?.json().await?)
    }

    pub async fn list_users(&self, query: &ListUsersQuery) -> anyhow::Result<UserPage> {
        let res = self
            .client
            .get(self.url("users")?)
            .query(query)
            .send()
            .await?;
        Ok(check(res).await?.json().await?)
    }

    pub async fn get_user(&self, id: UserId) -> anyhow::Result<User> {
        let res = self
            .client
            .get(self.url(&format!("user/{id}"))?)
            .send()
            .await?;
        Ok(check(res).await?.json().await?)
    }

    pub async fn update_user(&self, id: UserId, body: &UpdateUserRequest) -> anyhow::Result<User> {
        let res = self
            .authed(self.client.put(self.url(&format!("user/{id}"))?))?
            .json(body)
            .send()
            .await?;
        Ok(check(res).await?.json().await?)
    }

    pub async fn delete_user(&self, id: UserId) -> anyhow::Result<()> {
        let res = self
            .authed(self.client.delete(self.url(&format!("user/{id}"))?))?
            .send()
            .await?;
        check(res).await?;
        Ok(())
    }

    pub async fn create_order(
        &self,
        user_id: UserId,
        body: &CreateOrderRequest,
    ) -> anyhow::Result<Order> {
        let res = self
            .authed(
                self.client
                    .post(self.url(&format!("users/{user_id}/orders"))?),
            )?
            .json(body)
            .send()
            .await?;
        Ok(check(res).await?.json().await?)
    }

    pub async fn list_orders(&self, user_id: UserId) -> anyhow::Result<Vec<Order>> {
        let res = self
            .authed(self.client.get(self.url(&format!("users/{user_id}/orders"))?))?
            .send()
            .await?;
        Ok(check(res).await?.json().await?)
    }
}

/// Turns a non-2xx response into an error carrying the server's message.
async fn check(res: Response) -> anyhow::Result<Response> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }
    let message = match res.json::<ErrorBody>().await {
        Ok(body) => body.error,
        Err(_) => status.canonical_reason().unwrap_or("unknown").to_string(),
    };
    Err(ApiError { status: status.as_u16(), message }.into())
}

impl KvantClientBuilder {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_header(
        mut self,
        key: impl AsRef<str>,
        value: impl AsRef<str>,
    ) -> anyhow::Result<Self> {
        let header_name =
            HeaderName::from_bytes(key.as_ref().as_bytes()).context("invalid header name")?;
        let header_value = HeaderValue::from_str(value.as_ref()).context("invalid header value")?;
        self.headers.insert(header_name, header_value);
        Ok(self)
    }

    pub fn with_reqwest_client(mut self, client: reqwest::Client) -> Self {
        self.client = Some(client);
        self
    }

    pub fn build(self) -> anyhow::Result<KvantClient> {
        if let Some(client) = self.client {
            return Ok(KvantClient {
                base: self.base,
                client,
                token: None,
            });
        }

        let mut builder = reqwest::Client::builder();
        if !self.headers.is_empty() {
            builder = builder.default_headers(self.headers);
        }
        if let Some(t) = self.timeout {
            builder = builder.timeout(t);
        }
        let client = builder.build()?;
        Ok(KvantClient {
            base: self.base,
            client,
            token: None,
        })
    }
}

/// A non-2xx reply. Downcast from `anyhow::Error` to inspect the status.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("server returned {status}: {message}")]
pub struct ApiError {
    pub status: u16,
    pub message: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct TokenResponse {
    token: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub age: i32,
    pub password: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct UpdateUserRequest {
    pub name: String,
    pub email: String,
    pub age: i32,
}

#[derive(Serialize, Debug, Clone, Default)]
pub struct ListUsersQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_age: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_age: Option<i32>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct UserPage {
    pub data: Vec<User>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub min_age: Option<i32>,
    pub max_age: Option<i32>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CreateOrderRequest {
    pub product: String,
    pub quantity: i32,
    pub price: f64,
}

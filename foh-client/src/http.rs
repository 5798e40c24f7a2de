//! HTTP client for the re-fetch endpoints
//!
//! 重连与周期性刷新走这里：按桌台拉订单、拉当日会话、
//! 拉当前用户的权威记录。

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use shared::models::{Employee, Order, TableSession};
use shared::response::{
    ApiResponse, LoginBody, OrderListBody, SessionListBody, UserBody, ValidateBody,
};

use crate::{ClientConfig, ClientError, ClientResult};

/// HTTP client for making requests to the FOH server
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpClient {
    /// Create a new HTTP client from configuration
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout))
            .build()
            .map_err(ClientError::Http)?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.bearer_token().map(str::to_string),
        })
    }

    /// Set the authentication token
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    fn auth_header(&self) -> Option<String> {
        self.token.as_ref().map(|t| format!("Bearer {}", t))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.client.get(&url);
        if let Some(auth) = self.auth_header() {
            request = request.header(reqwest::header::AUTHORIZATION, auth);
        }
        Self::handle_response(request.send().await?).await
    }

    async fn post<T: DeserializeOwned, B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> ClientResult<T> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.client.post(&url).json(body);
        if let Some(auth) = self.auth_header() {
            request = request.header(reqwest::header::AUTHORIZATION, auth);
        }
        Self::handle_response(request.send().await?).await
    }

    async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> ClientResult<T> {
        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ApiResponse<()>>()
                .await
                .ok()
                .and_then(|r| r.message)
                .unwrap_or_else(|| status.to_string());
            return match status {
                StatusCode::UNAUTHORIZED => Err(ClientError::Unauthorized),
                StatusCode::FORBIDDEN => Err(ClientError::Forbidden(message)),
                StatusCode::NOT_FOUND => Err(ClientError::NotFound(message)),
                StatusCode::BAD_REQUEST | StatusCode::CONFLICT => {
                    Err(ClientError::Validation(message))
                }
                _ => Err(ClientError::Internal(message)),
            };
        }
        response.json().await.map_err(Into::into)
    }

    fn require<T>(data: Option<T>, what: &str) -> ClientResult<T> {
        data.ok_or_else(|| ClientError::InvalidResponse(format!("Missing {what} in response")))
    }

    // ========== Auth API ==========

    /// Login with username and password
    pub async fn login(&mut self, username: &str, password: &str) -> ClientResult<LoginBody> {
        #[derive(serde::Serialize)]
        struct LoginRequest<'a> {
            username: &'a str,
            password: &'a str,
        }

        let body = self
            .post::<ApiResponse<LoginBody>, _>(
                "/api/auth/login",
                &LoginRequest { username, password },
            )
            .await?;
        let login = Self::require(body.data, "login data")?;
        self.token = Some(login.token.clone());
        Ok(login)
    }

    /// 当前用户的权威记录
    pub async fn me(&self) -> ClientResult<Employee> {
        let body = self
            .get::<ApiResponse<UserBody>>("/api/accounts/me")
            .await?;
        Ok(Self::require(body.data, "user data")?.user)
    }

    // ========== Re-fetch API ==========

    /// 某桌台的全部订单 (新的在前)
    pub async fn orders_by_table(&self, table_number: u32) -> ClientResult<Vec<Order>> {
        let body = self
            .get::<ApiResponse<OrderListBody>>(&format!("/api/order/table/{table_number}"))
            .await?;
        Ok(Self::require(body.data, "order list")?.orders)
    }

    /// 当前营业日的会话 (员工凭证)
    pub async fn sessions_today(&self) -> ClientResult<Vec<TableSession>> {
        let body = self
            .get::<ApiResponse<SessionListBody>>("/api/table-session/active")
            .await?;
        Ok(Self::require(body.data, "session list")?.sessions)
    }

    /// 校验会话令牌 (客人扫码路径)
    pub async fn validate_session(&self, token: &str) -> ClientResult<ValidateBody> {
        let body = self
            .get::<ApiResponse<ValidateBody>>(&format!("/api/table-session/validate/{token}"))
            .await?;
        Self::require(body.data, "validation data")
    }
}

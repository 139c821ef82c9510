use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::{header, Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::{sync::Arc, time::Duration};

use super::stream::parse_user_response;
use crate::error::{ApiError, ApiResult};
use crate::models::*;
use crate::storage::{KeyValueStore, TOKEN_KEY};

pub const DEFAULT_BASE_URL: &str = "https://v2.starko.one";
pub const WORKSPACE_HEADER: &str = "x-starko-workspace-id";

#[async_trait]
pub trait HelpCenterApi: Send + Sync {
    async fn workspace(&self) -> ApiResult<Envelope<Workspace>>;
    async fn categories(&self) -> ApiResult<Envelope<Vec<CategorySummary>>>;
    async fn category(&self, category_id: &str) -> ApiResult<Envelope<CategoryDetail>>;
    async fn articles(&self, query: &ArticleQuery) -> ApiResult<Envelope<ArticlePage>>;
    async fn article(&self, article_id: &str) -> ApiResult<Envelope<Article>>;
    async fn submit_feedback(
        &self,
        article_id: &str,
        score: FeedbackScore,
    ) -> ApiResult<Envelope<Value>>;

    async fn register(&self, email: &str, name: &str) -> ApiResult<UserOpResponse>;
    async fn verify(&self, email: &str, code: &str) -> ApiResult<UserOpResponse>;
    async fn resend_code(&self, email: &str) -> ApiResult<UserOpResponse>;
    /// Resolves the stored bearer token. A 401/403 clears the stored token.
    async fn current_user(&self) -> ApiResult<Envelope<User>>;

    async fn messages(&self) -> ApiResult<Envelope<Conversation>>;
    async fn send_message(&self, message: &OutgoingMessage) -> ApiResult<Envelope<Value>>;

    async fn tickets(&self, search: Option<&str>) -> ApiResult<Envelope<Vec<Ticket>>>;
    async fn ticket(&self, ticket_id: &str) -> ApiResult<Envelope<Ticket>>;
    async fn create_ticket(&self, ticket: &NewTicket) -> ApiResult<Envelope<Value>>;
}

pub struct HelpCenterClient {
    client: Client,
    base_url: String,
    tokens: Arc<dyn KeyValueStore>,
}

impl HelpCenterClient {
    pub fn new(
        base_url: &str,
        workspace_id: &str,
        tokens: Arc<dyn KeyValueStore>,
    ) -> ApiResult<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(WORKSPACE_HEADER, header::HeaderValue::from_str(workspace_id)?);

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            tokens,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1/{}", self.base_url, path)
    }

    fn get(&self, path: &str) -> RequestBuilder {
        debug!("GET /api/v1/{}", path);
        self.client.get(self.url(path))
    }

    fn post(&self, path: &str) -> RequestBuilder {
        debug!("POST /api/v1/{}", path);
        self.client.post(self.url(path))
    }

    /// Attaches the stored bearer token, read fresh for every call.
    fn authorized(&self, request: RequestBuilder) -> ApiResult<RequestBuilder> {
        let token = self.tokens.get(TOKEN_KEY).ok_or(ApiError::MissingToken)?;
        Ok(request.bearer_auth(token))
    }

    async fn send(&self, request: RequestBuilder) -> ApiResult<Response> {
        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Http { status, body });
        }

        Ok(response)
    }

    async fn fetch<T: DeserializeOwned>(&self, request: RequestBuilder) -> ApiResult<T> {
        let text = self.send(request).await?.text().await?;
        Ok(serde_json::from_str(&text)?)
    }

    async fn user_operation(&self, body: Value) -> ApiResult<UserOpResponse> {
        let text = self.send(self.post("user").json(&body)).await?.text().await?;
        parse_user_response(&text)
    }
}

#[async_trait]
impl HelpCenterApi for HelpCenterClient {
    async fn workspace(&self) -> ApiResult<Envelope<Workspace>> {
        self.fetch(self.get("workspace")).await
    }

    async fn categories(&self) -> ApiResult<Envelope<Vec<CategorySummary>>> {
        self.fetch(self.get("categories")).await
    }

    async fn category(&self, category_id: &str) -> ApiResult<Envelope<CategoryDetail>> {
        self.fetch(self.get(&format!("categories/{}", category_id)))
            .await
    }

    async fn articles(&self, query: &ArticleQuery) -> ApiResult<Envelope<ArticlePage>> {
        self.fetch(self.get("articles").query(&query.to_pairs()))
            .await
    }

    async fn article(&self, article_id: &str) -> ApiResult<Envelope<Article>> {
        self.fetch(self.get(&format!("articles/{}", article_id)))
            .await
    }

    async fn submit_feedback(
        &self,
        article_id: &str,
        score: FeedbackScore,
    ) -> ApiResult<Envelope<Value>> {
        let request = self
            .post(&format!("articles/{}", article_id))
            .json(&json!({ "score": score }));
        self.fetch(request).await
    }

    async fn register(&self, email: &str, name: &str) -> ApiResult<UserOpResponse> {
        self.user_operation(json!({
            "email": email,
            "type": "register",
            "name": name,
        }))
        .await
    }

    async fn verify(&self, email: &str, code: &str) -> ApiResult<UserOpResponse> {
        self.user_operation(json!({
            "email": email,
            "type": "verify",
            "code": code,
        }))
        .await
    }

    async fn resend_code(&self, email: &str) -> ApiResult<UserOpResponse> {
        self.user_operation(json!({
            "email": email,
            "type": "resend-code",
        }))
        .await
    }

    async fn current_user(&self) -> ApiResult<Envelope<User>> {
        let request = self.authorized(self.get("user"))?;
        let result = self.fetch(request).await;

        if let Err(e) = &result {
            if e.is_unauthorized() {
                info!("token rejected by the server, clearing it");
                if let Err(clear_err) = self.tokens.remove(TOKEN_KEY) {
                    warn!("cannot clear stored token: {}", clear_err);
                }
            }
        }

        result
    }

    async fn messages(&self) -> ApiResult<Envelope<Conversation>> {
        let request = self.authorized(self.get("chat"))?;
        self.fetch(request).await
    }

    async fn send_message(&self, message: &OutgoingMessage) -> ApiResult<Envelope<Value>> {
        let request = self.authorized(self.post("chat").json(message))?;
        self.fetch(request).await
    }

    async fn tickets(&self, search: Option<&str>) -> ApiResult<Envelope<Vec<Ticket>>> {
        let mut request = self.get("ticket");
        if let Some(search) = search.map(str::trim).filter(|s| !s.is_empty()) {
            request = request.query(&[("search", search)]);
        }
        self.fetch(self.authorized(request)?).await
    }

    async fn ticket(&self, ticket_id: &str) -> ApiResult<Envelope<Ticket>> {
        let request = self.authorized(self.get(&format!("ticket/{}", ticket_id)))?;
        self.fetch(request).await
    }

    async fn create_ticket(&self, ticket: &NewTicket) -> ApiResult<Envelope<Value>> {
        let request = self.authorized(self.post("ticket").json(ticket))?;
        self.fetch(request).await
    }
}

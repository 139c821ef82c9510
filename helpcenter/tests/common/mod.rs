#![allow(dead_code)]

use async_trait::async_trait;
use helpcenter::api::HelpCenterApi;
use helpcenter::error::{ApiError, ApiResult};
use helpcenter::models::*;
use helpcenter::storage::{KeyValueStore, MemoryStore, TOKEN_KEY};
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

pub const VALID_TOKEN: &str = "token-123";
pub const VALID_CODE: &str = "1234";

/// In-memory backend. Calls are logged in order; `fail` makes a named call
/// fail a given number of times before succeeding.
pub struct FakeApi {
    pub tokens: Arc<dyn KeyValueStore>,
    pub categories: Vec<CategorySummary>,
    pub details: HashMap<String, CategoryDetail>,
    /// Keyed by `articles:{category}` or `articles:{category}:{sub}`.
    pub articles: HashMap<String, Vec<ArticleSummary>>,
    pub user: User,
    pub conversation: Mutex<Conversation>,
    pub tickets: Vec<Ticket>,
    pub failures: Mutex<HashMap<String, usize>>,
    pub log: Mutex<Vec<String>>,
    pub register_calls: AtomicUsize,
    pub verify_calls: AtomicUsize,
    pub resend_calls: AtomicUsize,
    pub current_user_calls: AtomicUsize,
    pub messages_calls: AtomicUsize,
}

pub fn category(id: &str, name: &str) -> CategorySummary {
    serde_json::from_value(json!({ "id": id, "name": name })).unwrap()
}

pub fn detail(id: &str, name: &str, sub_categories: &[&str]) -> CategoryDetail {
    let subs: Vec<Value> = sub_categories
        .iter()
        .map(|sub| json!({ "id": sub, "name": format!("Section {}", sub) }))
        .collect();
    serde_json::from_value(json!({ "id": id, "name": name, "sub_categories": subs })).unwrap()
}

pub fn article(id: &str, title: &str) -> ArticleSummary {
    serde_json::from_value(json!({ "id": id, "title": title, "content": "" })).unwrap()
}

pub fn message(id: &str, role: &str, timestamp: &str) -> Message {
    serde_json::from_value(json!({
        "id": id,
        "message": {
            "id": id,
            "threadId": "thread-1",
            "content": format!("message {}", id),
            "timestamp": timestamp,
            "role": role,
        }
    }))
    .unwrap()
}

pub fn ticket(id: &str, title: &str, status: &str) -> Ticket {
    serde_json::from_value(json!({ "id": id, "title": title, "status": status })).unwrap()
}

fn envelope<T>(data: T) -> Envelope<T> {
    Envelope {
        ok: true,
        message: None,
        data: Some(data),
    }
}

fn user_op(ok: bool, message: &str, data: Value) -> UserOpResponse {
    Envelope {
        ok,
        message: Some(message.to_string()),
        data: Some(data),
    }
}

fn server_error() -> ApiError {
    ApiError::Http {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        body: "boom".to_string(),
    }
}

impl FakeApi {
    /// Two categories: `guides` with sections `setup` and `billing`, and
    /// `faq` with none.
    pub fn new(tokens: Arc<dyn KeyValueStore>) -> Self {
        let articles = HashMap::from([
            (
                "articles:guides".to_string(),
                vec![
                    article("a1", "Installing the widget"),
                    article("a2", "Paying invoices"),
                    article("a3", "Getting started"),
                    article("a1", "Installing the widget"),
                ],
            ),
            (
                "articles:guides:setup".to_string(),
                vec![article("a1", "Installing the widget")],
            ),
            (
                "articles:guides:billing".to_string(),
                vec![article("a2", "Paying invoices"), article("a4", "Refunds")],
            ),
            (
                "articles:faq".to_string(),
                vec![article("f1", "How do I reset my password?")],
            ),
        ]);

        Self {
            tokens,
            categories: vec![category("guides", "Guides"), category("faq", "FAQ")],
            details: HashMap::from([
                ("guides".to_string(), detail("guides", "Guides", &["setup", "billing"])),
                ("faq".to_string(), detail("faq", "FAQ", &[])),
            ]),
            articles,
            user: serde_json::from_value(json!({
                "id": "user-1",
                "name": "Ada Lovelace",
                "email": "ada@example.com"
            }))
            .unwrap(),
            conversation: Mutex::new(Conversation::default()),
            tickets: Vec::new(),
            failures: Mutex::new(HashMap::new()),
            log: Mutex::new(Vec::new()),
            register_calls: AtomicUsize::new(0),
            verify_calls: AtomicUsize::new(0),
            resend_calls: AtomicUsize::new(0),
            current_user_calls: AtomicUsize::new(0),
            messages_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_memory_tokens() -> (Arc<Self>, Arc<MemoryStore>) {
        let tokens = Arc::new(MemoryStore::new());
        (Arc::new(Self::new(tokens.clone())), tokens)
    }

    pub async fn fail(&self, call: &str, times: usize) {
        self.failures.lock().await.insert(call.to_string(), times);
    }

    pub async fn calls(&self) -> Vec<String> {
        self.log.lock().await.clone()
    }

    pub async fn count(&self, call: &str) -> usize {
        self.log.lock().await.iter().filter(|c| *c == call).count()
    }

    /// Logs the call and reports whether it should fail this time.
    async fn record(&self, call: String) -> ApiResult<()> {
        self.log.lock().await.push(call.clone());
        let mut failures = self.failures.lock().await;
        match failures.get_mut(&call) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                Err(server_error())
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl HelpCenterApi for FakeApi {
    async fn workspace(&self) -> ApiResult<Envelope<Workspace>> {
        self.record("workspace".to_string()).await?;
        Ok(envelope(
            serde_json::from_value(json!({ "name": "Acme Support" })).unwrap(),
        ))
    }

    async fn categories(&self) -> ApiResult<Envelope<Vec<CategorySummary>>> {
        self.record("categories".to_string()).await?;
        Ok(envelope(self.categories.clone()))
    }

    async fn category(&self, category_id: &str) -> ApiResult<Envelope<CategoryDetail>> {
        self.record(format!("detail:{}", category_id)).await?;
        match self.details.get(category_id) {
            Some(detail) => Ok(envelope(detail.clone())),
            None => Err(ApiError::Http {
                status: StatusCode::NOT_FOUND,
                body: String::new(),
            }),
        }
    }

    async fn articles(&self, query: &ArticleQuery) -> ApiResult<Envelope<ArticlePage>> {
        let key = match (&query.category, &query.sub_category) {
            (Some(category), Some(sub)) => format!("articles:{}:{}", category, sub),
            (Some(category), None) => format!("articles:{}", category),
            _ => "articles".to_string(),
        };
        self.record(key.clone()).await?;
        Ok(envelope(ArticlePage {
            articles: self.articles.get(&key).cloned().unwrap_or_default(),
            pagination: Pagination::default(),
        }))
    }

    async fn article(&self, article_id: &str) -> ApiResult<Envelope<Article>> {
        self.record(format!("article:{}", article_id)).await?;
        Ok(envelope(
            serde_json::from_value(json!({ "id": article_id, "title": "An article", "content": "# Hi" }))
                .unwrap(),
        ))
    }

    async fn submit_feedback(
        &self,
        article_id: &str,
        score: FeedbackScore,
    ) -> ApiResult<Envelope<Value>> {
        self.record(format!("feedback:{}:{}", article_id, score)).await?;
        Ok(envelope(Value::Null))
    }

    async fn register(&self, email: &str, name: &str) -> ApiResult<UserOpResponse> {
        self.register_calls.fetch_add(1, Ordering::SeqCst);
        self.record(format!("register:{}:{}", email, name)).await?;
        Ok(user_op(true, "Verification code sent", Value::Null))
    }

    async fn verify(&self, email: &str, code: &str) -> ApiResult<UserOpResponse> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        self.record(format!("verify:{}:{}", email, code)).await?;
        if code == VALID_CODE {
            Ok(user_op(true, "Verified", json!({ "token": VALID_TOKEN })))
        } else {
            Ok(user_op(false, "Invalid verification code", Value::Null))
        }
    }

    async fn resend_code(&self, email: &str) -> ApiResult<UserOpResponse> {
        self.resend_calls.fetch_add(1, Ordering::SeqCst);
        self.record(format!("resend:{}", email)).await?;
        Ok(user_op(true, "Code resent", Value::Null))
    }

    async fn current_user(&self) -> ApiResult<Envelope<User>> {
        self.current_user_calls.fetch_add(1, Ordering::SeqCst);
        self.record("current_user".to_string()).await?;
        match self.tokens.get(TOKEN_KEY) {
            Some(token) if token == VALID_TOKEN => Ok(envelope(self.user.clone())),
            Some(_) => Err(ApiError::Http {
                status: StatusCode::UNAUTHORIZED,
                body: "invalid token".to_string(),
            }),
            None => Err(ApiError::MissingToken),
        }
    }

    async fn messages(&self) -> ApiResult<Envelope<Conversation>> {
        self.messages_calls.fetch_add(1, Ordering::SeqCst);
        self.record("messages".to_string()).await?;
        Ok(envelope(self.conversation.lock().await.clone()))
    }

    async fn send_message(&self, message: &OutgoingMessage) -> ApiResult<Envelope<Value>> {
        self.record(format!("send:{}", message.message)).await?;
        Ok(envelope(Value::Null))
    }

    async fn tickets(&self, search: Option<&str>) -> ApiResult<Envelope<Vec<Ticket>>> {
        self.record(format!("tickets:{}", search.unwrap_or_default())).await?;
        Ok(envelope(self.tickets.clone()))
    }

    async fn ticket(&self, ticket_id: &str) -> ApiResult<Envelope<Ticket>> {
        self.record(format!("ticket:{}", ticket_id)).await?;
        self.tickets
            .iter()
            .find(|t| t.id == ticket_id)
            .cloned()
            .map(envelope)
            .ok_or(ApiError::MissingData)
    }

    async fn create_ticket(&self, ticket: &NewTicket) -> ApiResult<Envelope<Value>> {
        self.record(format!("create_ticket:{}", ticket.title)).await?;
        Ok(envelope(Value::Null))
    }
}

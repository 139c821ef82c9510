use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Sent by the signed-in customer.
    Client,
    /// AI assistant reply.
    Assistant,
    /// Human support agent reply.
    User,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct MessageBody {
    pub id: String,
    #[serde(rename = "threadId", alias = "thread_id")]
    pub thread_id: String,
    #[serde(default)]
    pub content: String,
    pub timestamp: String,
    pub role: Role,
    #[serde(default)]
    pub blocks: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct Sender {
    pub name: Option<String>,
    pub email: Option<String>,
    pub avatar: Option<String>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Message {
    pub id: String,
    pub message: MessageBody,
    #[serde(default)]
    pub user: Option<Sender>,
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct ChatThread {
    pub id: Option<String>,
    #[serde(default)]
    pub is_handled_by_ai: bool,
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct Conversation {
    #[serde(default)]
    pub messages: Vec<Message>,
    pub thread: Option<ChatThread>,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct OutgoingMessage {
    pub message: String,
    pub blocks: Vec<serde_json::Value>,
}

impl OutgoingMessage {
    pub fn text(message: &str) -> Self {
        Self {
            message: message.to_string(),
            blocks: Vec::new(),
        }
    }
}

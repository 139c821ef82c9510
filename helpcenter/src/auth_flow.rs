use log::{debug, info, warn};
use std::sync::Arc;

use crate::api::HelpCenterApi;
use crate::storage::{KeyValueStore, TOKEN_KEY};

/// Length of the one-time code sent by email.
pub const CODE_LENGTH: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStep {
    CollectingEmail,
    CollectingCode,
    Verified,
}

type SuccessCallback = Box<dyn FnMut() + Send>;

/// Email + one-time code sign-in.
///
/// `CollectingEmail` → `CollectingCode` → `Verified`. Failures keep the
/// current step and leave a message in [`AuthFlow::error`].
pub struct AuthFlow {
    api: Arc<dyn HelpCenterApi>,
    tokens: Arc<dyn KeyValueStore>,
    step: AuthStep,
    email: String,
    name: String,
    code: String,
    error: Option<String>,
    closable: bool,
    on_success: Option<SuccessCallback>,
}

impl AuthFlow {
    pub fn new(api: Arc<dyn HelpCenterApi>, tokens: Arc<dyn KeyValueStore>) -> Self {
        Self {
            api,
            tokens,
            step: AuthStep::CollectingEmail,
            email: String::new(),
            name: String::new(),
            code: String::new(),
            error: None,
            closable: true,
            on_success: None,
        }
    }

    /// Whether [`AuthFlow::close`] may dismiss the flow.
    pub fn closable(mut self, closable: bool) -> Self {
        self.closable = closable;
        self
    }

    pub fn on_success(mut self, callback: impl FnMut() + Send + 'static) -> Self {
        self.on_success = Some(Box::new(callback));
        self
    }

    pub fn step(&self) -> AuthStep {
        self.step
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Requests a code for `email`. The display name defaults to the email.
    pub async fn submit_email(&mut self, email: &str, name: Option<&str>) -> bool {
        if self.step != AuthStep::CollectingEmail {
            return false;
        }

        self.error = None;
        let email = email.trim();
        if email.is_empty() {
            self.error = Some("Email is required".to_string());
            return false;
        }

        self.email = email.to_string();
        self.name = name.map(str::trim).unwrap_or_default().to_string();
        let display_name = if self.name.is_empty() {
            email
        } else {
            self.name.as_str()
        };

        match self.api.register(email, display_name).await {
            Ok(response) if response.ok => {
                debug!("verification code sent to {}", email);
                self.step = AuthStep::CollectingCode;
                true
            }
            Ok(response) => {
                self.error = Some(non_empty_or(
                    response.message(),
                    "Failed to send verification code",
                ));
                false
            }
            Err(e) => {
                warn!("register failed: {}", e);
                self.error = Some("An error occurred. Please try again.".to_string());
                false
            }
        }
    }

    /// Updates the code being typed. Reaching [`CODE_LENGTH`] characters
    /// verifies immediately; `Some(verified)` reports that attempt.
    pub async fn input_code(&mut self, value: &str) -> Option<bool> {
        if self.step != AuthStep::CollectingCode {
            return None;
        }

        self.code = value.trim().chars().take(CODE_LENGTH).collect();
        self.error = None;

        if self.code.chars().count() == CODE_LENGTH {
            Some(self.verify().await)
        } else {
            None
        }
    }

    /// Explicit submit; incomplete codes are never sent.
    pub async fn submit_code(&mut self) -> bool {
        if self.step != AuthStep::CollectingCode || self.code.chars().count() != CODE_LENGTH {
            return false;
        }
        self.verify().await
    }

    async fn verify(&mut self) -> bool {
        let response = match self.api.verify(&self.email, &self.code).await {
            Ok(response) => response,
            Err(e) => {
                warn!("verify failed: {}", e);
                self.error = Some("Verification failed. Please try again.".to_string());
                return false;
            }
        };

        let token = match response.token() {
            Some(token) if response.ok => token,
            _ => {
                self.error = Some(non_empty_or(
                    response.message(),
                    "Invalid verification code",
                ));
                return false;
            }
        };

        if let Err(e) = self.tokens.set(TOKEN_KEY, token) {
            warn!("cannot store token: {}", e);
            self.error = Some("Verification failed. Please try again.".to_string());
            return false;
        }

        info!("email {} verified", self.email);
        self.step = AuthStep::Verified;
        self.code.clear();
        if let Some(callback) = self.on_success.as_mut() {
            callback();
        }
        true
    }

    /// Asks the server for a new code. The step does not change.
    pub async fn resend_code(&mut self) -> bool {
        if self.step != AuthStep::CollectingCode {
            return false;
        }

        self.error = None;
        match self.api.resend_code(&self.email).await {
            Ok(response) if response.ok => true,
            Ok(response) => {
                self.error = Some(non_empty_or(response.message(), "Failed to resend code"));
                false
            }
            Err(e) => {
                warn!("resend failed: {}", e);
                self.error = Some("Failed to resend code. Please try again.".to_string());
                false
            }
        }
    }

    /// Dismisses the flow, resetting every field. Returns false when the flow
    /// is not closable.
    pub fn close(&mut self) -> bool {
        if !self.closable {
            return false;
        }

        self.step = AuthStep::CollectingEmail;
        self.email.clear();
        self.name.clear();
        self.code.clear();
        self.error = None;
        true
    }
}

fn non_empty_or(message: &str, fallback: &str) -> String {
    if message.is_empty() {
        fallback.to_string()
    } else {
        message.to_string()
    }
}

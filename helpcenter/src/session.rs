use log::{debug, info, warn};
use std::{io, sync::Arc};

use crate::api::HelpCenterApi;
use crate::models::{Envelope, User};
use crate::storage::{KeyValueStore, TOKEN_KEY};

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    /// Resolution has not finished yet.
    Unknown,
    Authenticated(User),
    Anonymous,
}

/// Authentication state of one application instance.
///
/// The only way into [`SessionState::Authenticated`] is [`SessionStore::check_auth`]
/// resolving a stored token; logout and rejected tokens always land in
/// [`SessionState::Anonymous`] with the token removed.
pub struct SessionStore {
    api: Arc<dyn HelpCenterApi>,
    tokens: Arc<dyn KeyValueStore>,
    state: SessionState,
}

impl SessionStore {
    pub fn new(api: Arc<dyn HelpCenterApi>, tokens: Arc<dyn KeyValueStore>) -> Self {
        Self {
            api,
            tokens,
            state: SessionState::Unknown,
        }
    }

    /// Creates the store and resolves the stored token right away.
    pub async fn initialize(api: Arc<dyn HelpCenterApi>, tokens: Arc<dyn KeyValueStore>) -> Self {
        let mut session = Self::new(api, tokens);
        session.check_auth().await;
        session
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_loading(&self) -> bool {
        self.state == SessionState::Unknown
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.state, SessionState::Authenticated(_))
    }

    pub fn user(&self) -> Option<&User> {
        match &self.state {
            SessionState::Authenticated(user) => Some(user),
            _ => None,
        }
    }

    /// Re-resolves the stored token. Safe to call any number of times.
    pub async fn check_auth(&mut self) -> &SessionState {
        if self.tokens.get(TOKEN_KEY).is_none() {
            debug!("no stored token, session is anonymous");
            self.state = SessionState::Anonymous;
            return &self.state;
        }

        self.state = match self.api.current_user().await {
            Ok(Envelope {
                ok: true,
                data: Some(user),
                ..
            }) => {
                info!("signed in as {}", user.display_name());
                SessionState::Authenticated(user)
            }
            Ok(envelope) => {
                info!("token not accepted: {}", envelope.message());
                self.forget_token();
                SessionState::Anonymous
            }
            Err(e) => {
                info!("cannot resolve current user: {}", e);
                self.forget_token();
                SessionState::Anonymous
            }
        };

        &self.state
    }

    /// Drops the stored token and re-resolves, which lands on anonymous.
    pub async fn logout(&mut self) -> io::Result<()> {
        self.tokens.remove(TOKEN_KEY)?;
        self.check_auth().await;
        Ok(())
    }

    fn forget_token(&self) {
        if let Err(e) = self.tokens.remove(TOKEN_KEY) {
            warn!("cannot clear stored token: {}", e);
        }
    }
}

//! Per-(tenant, user) conversation sessions.

pub mod locks;
pub mod state;
pub mod store;

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::TenantId;

pub use locks::SessionLocks;
pub use state::{FlowData, SessionState};
pub use store::{SessionStore, SqliteSessionStore};

/// Key identifying one conversation: which tenant's bot, which end user.
///
/// `tenant_id = None` is the admin bot's namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionKey {
    pub tenant_id: Option<TenantId>,
    pub user_id: i64,
}

impl SessionKey {
    pub fn new(tenant_id: Option<TenantId>, user_id: i64) -> Self {
        Self { tenant_id, user_id }
    }

    /// Admin-namespace key for a user.
    pub fn admin(user_id: i64) -> Self {
        Self {
            tenant_id: None,
            user_id,
        }
    }
}

impl std::fmt::Display for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.tenant_id {
            Some(t) => write!(f, "{}:{}", t, self.user_id),
            None => write!(f, "admin:{}", self.user_id),
        }
    }
}

/// One conversation's state, surviving across inbound messages.
///
/// Mutated by whichever handler runs for a turn; the dispatcher persists it
/// afterwards, only on success (see the dispatch error policy).
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub key: SessionKey,
    pub state: SessionState,
    pub last_activity_at: DateTime<Utc>,
    /// Resolved locale code ("en", "ru", ...)
    pub language: String,
    /// Payload of the flow that currently owns `state`
    pub flow_data: FlowData,
    /// Open scratch space, session lifetime
    pub attributes: HashMap<String, String>,
}

impl Session {
    /// Fresh session in the initial state.
    pub fn new(key: SessionKey) -> Self {
        Self {
            key,
            state: SessionState::New,
            last_activity_at: Utc::now(),
            language: "en".to_string(),
            flow_data: FlowData::None,
            attributes: HashMap::new(),
        }
    }

    /// Leaves whatever flow the session is in and returns to the main menu.
    pub fn reset_to_menu(&mut self) {
        self.state = SessionState::MainMenu;
        self.flow_data = FlowData::None;
    }

    /// Enters a flow state with its payload in one step.
    pub fn enter_flow(&mut self, state: SessionState, data: FlowData) {
        self.state = state;
        self.flow_data = data;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_distinguishes_admin_namespace() {
        assert_eq!(SessionKey::admin(5).to_string(), "admin:5");
        assert_eq!(SessionKey::new(Some(TenantId(3)), 5).to_string(), "3:5");
    }

    #[test]
    fn reset_clears_flow_data() {
        let mut session = Session::new(SessionKey::admin(1));
        session.enter_flow(
            SessionState::Registration(state::RegistrationStep::Name),
            FlowData::Registration(state::RegistrationData::default()),
        );
        assert!(session.state.in_flow());

        session.reset_to_menu();
        assert_eq!(session.state, SessionState::MainMenu);
        assert_eq!(session.flow_data, FlowData::None);
    }
}

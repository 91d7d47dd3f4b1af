//! Shared identity types for tenants and bot instances.

use serde::{Deserialize, Serialize};
use strum::Display;

/// Opaque tenant identifier (one flower shop).
///
/// `Option<TenantId>` is used wherever the admin bot's own namespace is a
/// valid target; `None` denotes the admin namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TenantId(pub i64);

impl std::fmt::Display for TenantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which role a bot identity plays on the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
pub enum BotKind {
    /// The single platform-wide bot shop owners talk to
    Admin,
    /// One per active shop, serving that shop's customers
    Tenant,
    /// Courier-facing bot (reserved)
    Driver,
}

/// Read-only bot identity resolved from a routing key.
///
/// Owned by the tenant directory; the registry only caches the mapping from
/// inbound routing key to identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotIdentity {
    /// `None` for the admin bot
    pub tenant_id: Option<TenantId>,
    /// Provider token; doubles as the webhook routing key
    pub token: String,
    /// Bot username without the leading @, when known
    pub username: Option<String>,
    pub kind: BotKind,
    pub active: bool,
}

impl BotIdentity {
    /// The admin identity for a given token.
    pub fn admin(token: impl Into<String>, username: Option<String>) -> Self {
        Self {
            tenant_id: None,
            token: token.into(),
            username,
            kind: BotKind::Admin,
            active: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bot_kind_display_is_lowercase() {
        assert_eq!(BotKind::Admin.to_string(), "admin");
        assert_eq!(BotKind::Tenant.to_string(), "tenant");
        assert_eq!(BotKind::Driver.to_string(), "driver");
    }

    #[test]
    fn admin_identity_has_no_tenant() {
        let id = BotIdentity::admin("123:abc", None);
        assert_eq!(id.tenant_id, None);
        assert!(id.active);
        assert_eq!(id.kind, BotKind::Admin);
    }
}

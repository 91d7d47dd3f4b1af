//! Task-scoped tenant context.
//!
//! Every unit of work (one inbound update) runs inside a tenant scope so that
//! logging and storage helpers on the same logical call can tell which tenant
//! they are acting for. The value is task-local, not a process global: two
//! updates for different tenants processed concurrently never observe each
//! other's context, and the scope is torn down on every exit path, including
//! panics and cancellation.

use crate::types::TenantId;

tokio::task_local! {
    static CURRENT_TENANT: Option<TenantId>;
}

/// Runs `fut` with the tenant context set to `tenant`.
///
/// `None` denotes the admin bot's own namespace.
pub async fn scope<F>(tenant: Option<TenantId>, fut: F) -> F::Output
where
    F: std::future::Future,
{
    CURRENT_TENANT.scope(tenant, fut).await
}

/// Returns the tenant the current task is working for.
///
/// Returns `None` both outside any scope and inside an admin-namespace scope;
/// callers that need to distinguish the two should pass the identity
/// explicitly instead of reading the ambient context.
pub fn current() -> Option<TenantId> {
    CURRENT_TENANT.try_with(|t| *t).ok().flatten()
}

/// Formats the current tenant for log lines: the tenant id, or "admin".
pub fn log_label() -> String {
    match current() {
        Some(t) => t.to_string(),
        None => "admin".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scope_is_visible_inside_and_cleared_outside() {
        assert_eq!(current(), None);

        let seen = scope(Some(TenantId(7)), async { current() }).await;
        assert_eq!(seen, Some(TenantId(7)));

        // Cleared after the scope ends.
        assert_eq!(current(), None);
    }

    #[tokio::test]
    async fn concurrent_scopes_do_not_leak_across_tasks() {
        let a = tokio::spawn(scope(Some(TenantId(1)), async {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            current()
        }));
        let b = tokio::spawn(scope(Some(TenantId(2)), async {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            current()
        }));

        assert_eq!(a.await.unwrap(), Some(TenantId(1)));
        assert_eq!(b.await.unwrap(), Some(TenantId(2)));
    }

    #[tokio::test]
    async fn admin_scope_reads_as_none() {
        let seen = scope(None, async { current() }).await;
        assert_eq!(seen, None);
        assert_eq!(scope(None, async { log_label() }).await, "admin");
    }
}

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use jobportal_core::types::UserRole;

use crate::http::{ClientError, PortalClient};
use crate::store::{Action, Session, Store};

/// Server-owned collection mirrored into the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncResource {
    Companies,
    Jobs,
    AdminJobs,
    Applications,
}

impl SyncResource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Companies => "companies",
            Self::Jobs => "jobs",
            Self::AdminJobs => "admin_jobs",
            Self::Applications => "applications",
        }
    }

    fn guard(self) -> RoleGuard {
        match self {
            Self::Companies | Self::AdminJobs => RoleGuard::Role(UserRole::Recruiter),
            Self::Applications => RoleGuard::Role(UserRole::Candidate),
            Self::Jobs => RoleGuard::Anyone,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum RoleGuard {
    Anyone,
    Role(UserRole),
}

impl RoleGuard {
    fn allows(self, session: Option<&Session>) -> bool {
        match self {
            Self::Anyone => true,
            Self::Role(required) => session.map_or(false, |session| session.role() == required),
        }
    }
}

/// Best-effort synchronization of one server-owned collection into the store.
///
/// Each invocation issues at most one request, gated on the session role.
/// Failures are logged and swallowed; the store keeps its previous value.
/// Overlapping invocations are serialised by a sequence ticket: a response
/// is dispatched only when no newer invocation has started, so a slow early
/// request can never overwrite a faster later one.
#[derive(Clone)]
pub struct CollectionSync {
    store: Store,
    client: PortalClient,
    resource: SyncResource,
    ticket: Arc<AtomicU64>,
}

impl CollectionSync {
    pub fn new(store: Store, client: PortalClient, resource: SyncResource) -> Self {
        Self {
            store,
            client,
            resource,
            ticket: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Runs one guarded fetch-and-dispatch pass. Never panics, never
    /// propagates an error; the store is the only observable output.
    pub async fn run_once(&self) {
        let session = self.store.session();
        if !self.resource.guard().allows(session.as_ref()) {
            // Guard not met is a no-op, not an error.
            return;
        }

        let ticket = self.ticket.fetch_add(1, Ordering::SeqCst) + 1;
        match self.fetch(session.as_ref()).await {
            Ok(action) => {
                if self.ticket.load(Ordering::SeqCst) == ticket {
                    self.store.dispatch(action);
                } else {
                    debug!(
                        resource = self.resource.as_str(),
                        "discarding stale sync result"
                    );
                }
            }
            Err(err) => {
                warn!(
                    resource = self.resource.as_str(),
                    error = %err,
                    "collection sync failed"
                );
            }
        }
    }

    async fn fetch(&self, session: Option<&Session>) -> Result<Action, ClientError> {
        let user_id = session.map(|session| session.user.id.clone());
        match self.resource {
            SyncResource::Companies => self
                .client
                .fetch_companies()
                .await
                .map(Action::SetCompanies),
            SyncResource::Jobs => self.client.fetch_jobs().await.map(Action::SetJobs),
            SyncResource::AdminJobs => {
                self.client
                    .fetch_admin_jobs(user_id.as_deref().unwrap_or_default())
                    .await
                    .map(Action::SetAdminJobs)
            }
            SyncResource::Applications => {
                self.client
                    .fetch_applications(user_id.as_deref().unwrap_or_default())
                    .await
                    .map(Action::SetApplications)
            }
        }
    }

    /// Spawns a worker that runs once immediately, then re-runs on every
    /// session transition (login, logout, role change). It never re-runs on
    /// a timer, and collection writes do not wake it.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut sessions = self.store.watch_session();
            self.run_once().await;
            while sessions.changed().await.is_ok() {
                self.run_once().await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;
    use std::time::Duration;
    use url::Url;

    use jobportal_core::types::{Profile, PublicUser};

    fn user(id: &str, role: UserRole) -> PublicUser {
        PublicUser {
            id: id.to_string(),
            fullname: "Test User".to_string(),
            email: format!("{id}@example.com"),
            phone_number: "555-0100".to_string(),
            role,
            profile: Profile::default(),
        }
    }

    fn portal_client(server: &MockServer) -> PortalClient {
        let base = Url::parse(&server.url("/")).expect("url");
        PortalClient::new(base).expect("client")
    }

    fn company_body() -> serde_json::Value {
        json!({
            "success": true,
            "companies": [{
                "_id": "c1",
                "name": "Acme",
                "user_id": "u1",
                "created_at": "2024-01-01T00:00:00Z"
            }]
        })
    }

    async fn wait_until<F: Fn() -> bool>(condition: F) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while !condition() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("condition not reached in time");
    }

    #[tokio::test]
    async fn no_session_issues_no_request() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/api/company/get");
                then.status(200).json_body(company_body());
            })
            .await;

        let store = Store::new();
        let sync = CollectionSync::new(store.clone(), portal_client(&server), SyncResource::Companies);
        sync.run_once().await;

        assert_eq!(mock.hits_async().await, 0);
        assert!(store.companies().is_empty());
    }

    #[tokio::test]
    async fn wrong_role_issues_no_request() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/api/company/get");
                then.status(200).json_body(company_body());
            })
            .await;

        let store = Store::new();
        store.dispatch(Action::SetSession(user("u2", UserRole::Candidate)));
        let sync = CollectionSync::new(store.clone(), portal_client(&server), SyncResource::Companies);
        sync.run_once().await;

        assert_eq!(mock.hits_async().await, 0);
        assert!(store.companies().is_empty());
    }

    #[tokio::test]
    async fn recruiter_fetch_replaces_companies() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/api/company/get");
                then.status(200).json_body(company_body());
            })
            .await;

        let store = Store::new();
        store.dispatch(Action::SetSession(user("u1", UserRole::Recruiter)));
        let sync = CollectionSync::new(store.clone(), portal_client(&server), SyncResource::Companies);
        sync.run_once().await;

        assert_eq!(mock.hits_async().await, 1);
        let companies = store.companies();
        assert_eq!(companies.len(), 1);
        assert_eq!(companies[0].id, "c1");
        assert_eq!(companies[0].name, "Acme");
    }

    #[tokio::test]
    async fn rejected_envelope_leaves_store_unchanged() {
        let server = MockServer::start_async().await;

        let store = Store::new();
        store.dispatch(Action::SetSession(user("u1", UserRole::Recruiter)));
        let client = portal_client(&server);
        let sync = CollectionSync::new(store.clone(), client.clone(), SyncResource::Companies);

        let seed = server
            .mock_async(|when, then| {
                when.method(GET).path("/api/company/get");
                then.status(200).json_body(company_body());
            })
            .await;
        sync.run_once().await;
        assert_eq!(store.companies().len(), 1);
        seed.delete_async().await;

        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/company/get");
                then.status(200)
                    .json_body(json!({ "success": false, "message": "err" }));
            })
            .await;
        sync.run_once().await;

        // Prior value survives the rejected refresh.
        assert_eq!(store.companies().len(), 1);
        assert_eq!(store.companies()[0].id, "c1");
    }

    #[tokio::test]
    async fn transport_failure_leaves_store_unchanged() {
        // Nothing listens on this address; the connection is refused.
        let base = Url::parse("http://127.0.0.1:9/").expect("url");
        let client = PortalClient::new(base).expect("client");

        let store = Store::new();
        store.dispatch(Action::SetSession(user("u1", UserRole::Recruiter)));
        let sync = CollectionSync::new(store.clone(), client, SyncResource::Companies);
        sync.run_once().await;

        assert!(store.companies().is_empty());
    }

    #[tokio::test]
    async fn worker_refetches_on_session_transitions_only() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/api/company/get");
                then.status(200).json_body(company_body());
            })
            .await;

        let store = Store::new();
        let sync = CollectionSync::new(store.clone(), portal_client(&server), SyncResource::Companies);
        let worker = sync.spawn();
        tokio::time::sleep(Duration::from_millis(50)).await;

        // No session yet: the initial pass is guarded off.
        assert_eq!(mock.hits_async().await, 0);

        store.dispatch(Action::SetSession(user("u1", UserRole::Recruiter)));
        wait_until(|| !store.companies().is_empty()).await;
        assert_eq!(mock.hits_async().await, 1);

        // Unchanged session and collection writes trigger nothing further.
        store.dispatch(Action::SetSession(user("u1", UserRole::Recruiter)));
        store.dispatch(Action::SetJobs(Vec::new()));
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(mock.hits_async().await, 1);

        // Logout is a transition, but the guard blocks the fetch.
        store.dispatch(Action::ClearSession);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(mock.hits_async().await, 1);

        // Logging back in refetches.
        store.dispatch(Action::SetSession(user("u1", UserRole::Recruiter)));
        tokio::time::timeout(Duration::from_secs(2), async {
            while mock.hits_async().await != 2 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("second fetch not observed in time");

        worker.abort();
    }

    #[tokio::test]
    async fn stale_in_flight_result_is_discarded() {
        let server = MockServer::start_async().await;

        let store = Store::new();
        store.dispatch(Action::SetSession(user("u1", UserRole::Recruiter)));
        let sync = CollectionSync::new(store.clone(), portal_client(&server), SyncResource::Companies);

        let slow = server
            .mock_async(|when, then| {
                when.method(GET).path("/api/company/get");
                then.status(200)
                    .delay(Duration::from_millis(300))
                    .json_body(json!({
                        "success": true,
                        "companies": [{
                            "_id": "stale",
                            "name": "Old Co",
                            "user_id": "u1",
                            "created_at": "2024-01-01T00:00:00Z"
                        }]
                    }));
            })
            .await;

        let early = {
            let sync = sync.clone();
            tokio::spawn(async move { sync.run_once().await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        // A newer invocation starts while the first is still in flight and
        // settles first with fresher data.
        slow.delete_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/company/get");
                then.status(200).json_body(company_body());
            })
            .await;
        sync.run_once().await;
        assert_eq!(store.companies()[0].id, "c1");

        // The slow early response settles last but must not win.
        early.await.expect("early run");
        assert_eq!(store.companies()[0].id, "c1");
    }
}

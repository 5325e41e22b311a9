use std::sync::Arc;

use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use jobportal_core::types::{Application, Company, Job, PublicUser, UserRole};

/// In-memory representation of the currently authenticated actor.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub user: PublicUser,
}

impl Session {
    pub fn role(&self) -> UserRole {
        self.user.role
    }
}

/// Snapshot of everything the store holds.
///
/// Each collection reflects the most recent successful fetch only; updates
/// replace the collection wholesale, there is no merging.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PortalState {
    pub session: Option<Session>,
    pub companies: Vec<Company>,
    pub jobs: Vec<Job>,
    pub admin_jobs: Vec<Job>,
    pub applications: Vec<Application>,
}

/// The only way to mutate the store.
#[derive(Debug, Clone)]
pub enum Action {
    SetSession(PublicUser),
    ClearSession,
    SetCompanies(Vec<Company>),
    SetJobs(Vec<Job>),
    SetAdminJobs(Vec<Job>),
    SetApplications(Vec<Application>),
}

/// Shared state container for the client.
///
/// Cloneable handle over a pair of watch channels: one carrying the whole
/// state for view subscribers, one carrying only the session so that
/// session-driven workers are not woken by collection writes. All mutation
/// goes through [`Store::dispatch`]; reads are cloned snapshots.
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    state: watch::Sender<PortalState>,
    session: watch::Sender<Option<Session>>,
}

impl Store {
    pub fn new() -> Self {
        let (state, _) = watch::channel(PortalState::default());
        let (session, _) = watch::channel(None);
        Self {
            inner: Arc::new(StoreInner { state, session }),
        }
    }

    /// Applies an action to the state and notifies subscribers.
    ///
    /// The session channel only fires on actual session transitions; setting
    /// an identical session again is not a transition.
    pub fn dispatch(&self, action: Action) {
        let touches_session = matches!(action, Action::SetSession(_) | Action::ClearSession);
        self.inner.state.send_modify(|state| reduce(state, action));

        if touches_session {
            let next = self.inner.state.borrow().session.clone();
            self.inner.session.send_if_modified(|current| {
                if *current == next {
                    false
                } else {
                    *current = next;
                    true
                }
            });
        }
    }

    /// Returns a cloned snapshot of the full state.
    pub fn snapshot(&self) -> PortalState {
        self.inner.state.borrow().clone()
    }

    pub fn session(&self) -> Option<Session> {
        self.inner.state.borrow().session.clone()
    }

    pub fn companies(&self) -> Vec<Company> {
        self.inner.state.borrow().companies.clone()
    }

    pub fn jobs(&self) -> Vec<Job> {
        self.inner.state.borrow().jobs.clone()
    }

    pub fn admin_jobs(&self) -> Vec<Job> {
        self.inner.state.borrow().admin_jobs.clone()
    }

    pub fn applications(&self) -> Vec<Application> {
        self.inner.state.borrow().applications.clone()
    }

    /// Subscribes to every state change.
    pub fn subscribe(&self) -> watch::Receiver<PortalState> {
        self.inner.state.subscribe()
    }

    /// Subscribes to session transitions only.
    pub fn watch_session(&self) -> watch::Receiver<Option<Session>> {
        self.inner.session.subscribe()
    }

    /// Stream view of state changes for reactive consumers.
    pub fn changes(&self) -> WatchStream<PortalState> {
        WatchStream::new(self.subscribe())
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

fn reduce(state: &mut PortalState, action: Action) {
    match action {
        Action::SetSession(user) => state.session = Some(Session { user }),
        Action::ClearSession => state.session = None,
        Action::SetCompanies(companies) => state.companies = companies,
        Action::SetJobs(jobs) => state.jobs = jobs,
        Action::SetAdminJobs(jobs) => state.admin_jobs = jobs,
        Action::SetApplications(applications) => state.applications = applications,
    }
}

pub mod http;
pub mod store;
pub mod sync;

pub use http::{ClientError, LoginRequest, PortalClient, RegisterRequest};
pub use store::{Action, PortalState, Session, Store};
pub use sync::{CollectionSync, SyncResource};

//! Client side of the service: a typed HTTP client, durable session storage
//! and the state store that ties them together.

mod api;
mod storage;
mod store;

pub use api::{ApiClient, ClientError};
pub use storage::{FileStorage, MemoryStorage, SessionStorage};
pub use store::{AuthState, Status, Store, TodosState};

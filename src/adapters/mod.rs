// Adapters layer: concrete implementations of the domain ports.

pub mod http;
pub mod session;
pub mod storage;

pub use http::ApiClient;
pub use session::{FileSessionStore, MemorySessionStore};
pub use storage::LocalStorage;

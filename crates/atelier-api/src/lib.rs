// atelier-api: Async row-store clients for the Atelier workshop backend.

pub mod error;
pub mod memory;
pub mod query;
pub mod rest;
pub mod store;
pub mod transport;

pub use error::Error;
pub use memory::MemoryStore;
pub use query::{Filter, Query, Range, Rows, Sort};
pub use rest::RestClient;
pub use store::RemoteStore;
pub use transport::{TlsMode, TransportConfig};

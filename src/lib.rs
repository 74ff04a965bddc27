//! REST conventions façade: configuration-driven resource routing, list envelopes and error payloads.

pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod query;
pub mod render;
pub mod response;
pub mod router;
pub mod routes;
pub mod service;
pub mod state;
pub mod store;

pub use config::{load_from_env, load_from_path, load_from_str, resolve, ApiConfig, ResolvedModel, ResolvedResource};
pub use error::{AppError, ConfigError, ErrorPayload, StoreError};
pub use response::{list_envelope, instance_body, Label, ListEnvelope, ResultSet};
pub use router::{classify, Format, Intent, RequestTarget};
pub use routes::{app, common_routes, resource_routes};
pub use service::ResourceService;
pub use state::AppState;
pub use store::{DataStore, MemoryStore, Record, Scope};

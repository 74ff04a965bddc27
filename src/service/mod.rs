//! ResourceService: executes router intents against the data store.

mod resource;
mod validation;
pub use resource::ResourceService;
pub use validation::RequestValidator;

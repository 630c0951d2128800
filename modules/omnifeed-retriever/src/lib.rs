pub mod handlers;
pub mod traits;
pub mod types;

pub use traits::{Adapter, AdapterRegistry, Handler, HandlerRegistry, SearchProvider, SearchProviderRegistry};
pub use types::*;

mod error;
mod models;
mod reference;

pub use error::ResolveError;
pub use models::{parse_manifest_platforms, Platform};
pub use reference::{resolve, RegistryTarget, ResolvedTarget};

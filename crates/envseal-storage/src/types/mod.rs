//! Type definitions for envseal storage.

mod environment;
mod ids;
mod integrations;
mod keys;
mod principals;
mod secrets;

pub use environment::*;
pub use ids::*;
pub use integrations::*;
pub use keys::*;
pub use principals::*;
pub use secrets::*;

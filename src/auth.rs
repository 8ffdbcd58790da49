//! Auth-domain identifiers, scope sets, request contexts, and token models.

pub mod context;
pub mod scope;
pub mod subject;
pub mod token;

pub use context::*;
pub use scope::*;
pub use subject::*;
pub use token::{record::*, secret::*};

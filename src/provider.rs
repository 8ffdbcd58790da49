//! Authorization-server descriptors (data) and strategies (behavior).
//!
//! `descriptor` holds the validated token endpoint, enabled grants, and client
//! authentication method derived from
//! [`AuthEnvironmentConfig`](crate::config::AuthEnvironmentConfig).
//! `strategy` defines [`ProviderStrategy`], the hook flows use to decorate token requests
//! and to sort error responses into the broker taxonomy.

pub mod descriptor;
pub mod strategy;

pub use descriptor::*;
pub use strategy::*;

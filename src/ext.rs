//! Helpers for attaching broker-issued tokens to outbound API requests.

pub mod request_signer;

pub use request_signer::*;

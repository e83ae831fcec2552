//! Signing provider implementations

pub mod gpg;

//! Gantry Signing - detached signatures for publications
//!
//! Every artifact of a publication, and its descriptor, gets an ASCII-armored
//! detached signature. Keys are supplied in memory and never touch the user's
//! keyring.

pub mod error;
pub mod provider;
pub mod providers;
pub mod publication;

pub use error::{Result, SigningError};
pub use provider::DetachedSigner;
pub use providers::gpg::GpgSigner;
pub use publication::{sign, sign_publication, signer_from_credentials};

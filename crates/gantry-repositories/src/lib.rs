//! Gantry Repositories - artifact repository uploads
//!
//! Publications are uploaded in the Maven layout, either to a remote HTTP
//! repository or to a `file://` directory. The [`PublicationManager`] fans a
//! publication out to every configured repository and reports per-repository
//! outcomes.

pub mod error;
pub mod local;
pub mod manager;
pub mod maven;
pub mod transport;

pub use error::{RepositoryError, Result};
pub use local::LocalRepository;
pub use manager::{
    PublicationManager, PublishReport, RepositoryOutcome, RepositoryReport, UploadReceipt,
};
pub use maven::MavenRepository;
pub use transport::{RepositoryTransport, UploadRequest};

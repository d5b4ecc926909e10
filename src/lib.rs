//! Library interface for histver
//!
//! Keeps a CSV table of every published release of a project together with
//! the runtime version that built it, recovered by downloading each release
//! and interrogating its executable.

pub mod error;
pub mod extract;
pub mod github;
pub mod platform;
pub mod probe;
pub mod record;
pub mod resolve;
pub mod sync;
pub mod table;
pub mod version;

// Re-export commonly used types
pub use github::{GitHubClient, Release};
pub use probe::Prober;
pub use record::VersionRecord;
pub use resolve::{Resolve, Resolver};
pub use table::Table;

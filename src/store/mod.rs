pub mod artifacts;
pub mod index;

pub use artifacts::ArtifactStore;
pub use index::{AnalysisStatus, IndexEntry, IndexUpdate, RepositoryIndex, SqliteIndex};

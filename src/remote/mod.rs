//! External collaborators
//!
//! The pipeline reaches remote services only through the traits in this
//! module: object storage, graph queries and job submission. Each trait has
//! a production implementation and an in-memory or mock one for testing.

mod command;
mod graph;
mod jobs;
mod storage;
mod uri;

pub use graph::{binding, parse_sparql_results, Binding, CommandGraphClient, GraphClient, GraphError, MockGraphClient, SparqlQuery};
pub use jobs::{CommandJobSubmitter, JobError, JobSubmitter, MockJobSubmitter, SpoolJobSubmitter};
pub use storage::{FsObjectStore, MemoryStore, ObjectStore, StorageError, StorageResult};
pub use uri::{join_path, parent_dir, path_file_name, path_file_stem, StorageUri, UriError};

//! Core domain logic for the diagram graph.
//! This crate is the single source of truth for graph invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod normalize;
pub mod repo;
pub mod seed;
pub mod service;

pub use config::{ConfigError, DiagramConfig};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::link::{
    Link, LinkEnd, LinkEndPatch, LinkEnds, LinkKind, LinkPatch, LinkProps, Sequence,
    SequencePatch, Side,
};
pub use model::node::{Node, NodeKind, NodePatch, NodeProps};
pub use model::project::Project;
pub use repo::graph_repo::{
    GraphRepoError, GraphRepoResult, GraphRepository, NewLink, NodeDeletion,
    SqliteGraphRepository,
};
pub use repo::project_repo::{ProjectRepoError, ProjectRepository, SqliteProjectRepository};
pub use seed::{provision_project, seed_sample_graph, SeedSummary};
pub use service::edit_lock_service::{EditLease, EditLockError, EditLockService};
pub use service::graph_service::{GraphService, GraphServiceError, GraphServiceResult};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}

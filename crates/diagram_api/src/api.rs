//! Request API over the graph engine and the edit lock.
//!
//! # Responsibility
//! - Expose one function per request with plain inputs.
//! - Turn every engine error into a `{success: false, message}` envelope.
//!
//! # Invariants
//! - No operation panics or returns `Err`; failures live in the envelope.
//! - Each call opens its own store session and drops it before returning.
//! - `is_project_being_edited` answers `false` when the store fails.

use crate::response::{
    ActionResponse, DeleteResponse, EditRightsResponse, EditStatusResponse, LinkEndInput,
    LinkEndResponse, LinkEndsResponse, LinkListResponse, LinkResponse, LinkUpdate,
    NodeListResponse, NodeResponse, NodeUpdate, SequenceResponse,
};
use diagram_core::service::graph_service::{parse_link_kind, parse_node_kind, parse_side};
use diagram_core::{
    core_version as core_version_inner, open_db, ping as ping_inner, seed_sample_graph,
    ConfigError, DiagramConfig, EditLockService, GraphService, GraphServiceResult, LinkEndPatch,
    LinkPatch, LinkProps, NodePatch, NodeProps, SequencePatch, SqliteGraphRepository,
    SqliteProjectRepository,
};
use log::warn;
use rusqlite::Connection;

pub fn ping() -> String {
    ping_inner().to_owned()
}

pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Request surface bound to one store location.
#[derive(Debug, Clone)]
pub struct DiagramApi {
    config: DiagramConfig,
}

impl DiagramApi {
    pub fn new(config: DiagramConfig) -> Self {
        Self { config }
    }

    /// Builds the API from `DIAGRAM_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        DiagramConfig::from_env().map(Self::new)
    }

    pub fn config(&self) -> &DiagramConfig {
        &self.config
    }

    /// Replaces all graph data with the sample diagram and an unlocked project.
    pub fn seed_db(&self) -> ActionResponse {
        let outcome = self
            .open_session()
            .and_then(|conn| seed_sample_graph(&conn).map_err(|err| err.to_string()));
        match outcome {
            Ok(summary) => ActionResponse::success(format!(
                "Seeded {} nodes and {} links.",
                summary.nodes, summary.links
            )),
            Err(err) => ActionResponse::failure(format!("seed_db failed: {err}")),
        }
    }

    pub fn create_node(
        &self,
        id: &str,
        label: &str,
        node_type: &str,
        props: NodeProps,
    ) -> NodeResponse {
        let outcome = self.with_graph_service(|service| {
            let kind = parse_node_kind(node_type)?;
            service.create_node(id, label, kind, &props)
        });
        node_response("create_node", "Node created.", outcome)
    }

    pub fn update_node(&self, id: &str, update: NodeUpdate) -> NodeResponse {
        let outcome = self.with_graph_service(|service| {
            let patch = NodePatch {
                node_type: update.node_type.as_deref().map(parse_node_kind).transpose()?,
                label: update.label,
                story: update.story,
                synchronous: update.synchronous,
                unreliable: update.unreliable,
            };
            service.update_node(id, &patch)
        });
        node_response("update_node", "Node updated.", outcome)
    }

    pub fn get_node(&self, id: &str) -> NodeResponse {
        match self.with_graph_service(|service| service.get_node(id)) {
            Ok(Some(node)) => NodeResponse {
                success: true,
                message: "Node found.".to_string(),
                node: Some(node),
            },
            Ok(None) => NodeResponse {
                success: false,
                message: format!("get_node failed: node not found: {id}"),
                node: None,
            },
            Err(err) => node_response("get_node", "", Err(err)),
        }
    }

    pub fn list_nodes(&self) -> NodeListResponse {
        match self.with_graph_service(|service| service.list_nodes()) {
            Ok(nodes) => NodeListResponse {
                success: true,
                message: format!("Found {} node(s).", nodes.len()),
                nodes,
            },
            Err(err) => NodeListResponse {
                success: false,
                message: format!("list_nodes failed: {err}"),
                nodes: Vec::new(),
            },
        }
    }

    /// Deletes a node and sweeps the links it orphaned.
    pub fn delete_node(&self, id: &str) -> DeleteResponse {
        match self.with_graph_service(|service| service.delete_node(id)) {
            Ok(deletion) => DeleteResponse {
                success: true,
                message: if deletion.node_deleted {
                    "Node deleted.".to_string()
                } else {
                    "Node was already absent.".to_string()
                },
                id: Some(id.to_string()),
                swept_links: deletion.swept_links,
            },
            Err(err) => delete_failure("delete_node", err),
        }
    }

    pub fn create_link(
        &self,
        id: &str,
        from_id: &str,
        to_id: &str,
        link_type: &str,
        label: &str,
        props: LinkProps,
    ) -> LinkResponse {
        let outcome = self.with_graph_service(|service| {
            let kind = parse_link_kind(link_type)?;
            service.create_link(id, from_id, to_id, kind, label, &props)
        });
        link_response("create_link", "Link created.", outcome)
    }

    /// Updates link properties; `x_id`/`y_id` re-point the endpoints.
    pub fn update_link(&self, id: &str, update: LinkUpdate) -> LinkResponse {
        let outcome = self.with_graph_service(|service| {
            let patch = LinkPatch {
                link_type: update.link_type.as_deref().map(parse_link_kind).transpose()?,
                label: update.label,
                story: update.story,
                optional: update.optional,
                x_id: update.x_id,
                y_id: update.y_id,
            };
            service.update_link(id, &patch)
        });
        link_response("update_link", "Link updated.", outcome)
    }

    pub fn get_link(&self, id: &str) -> LinkResponse {
        match self.with_graph_service(|service| service.get_link(id)) {
            Ok(Some(link)) => LinkResponse {
                success: true,
                message: "Link found.".to_string(),
                link: Some(link),
            },
            Ok(None) => LinkResponse {
                success: false,
                message: format!("get_link failed: link not found: {id}"),
                link: None,
            },
            Err(err) => link_response("get_link", "", Err(err)),
        }
    }

    pub fn list_links(&self) -> LinkListResponse {
        match self.with_graph_service(|service| service.list_links()) {
            Ok(links) => LinkListResponse {
                success: true,
                message: format!("Found {} link(s).", links.len()),
                links,
            },
            Err(err) => LinkListResponse {
                success: false,
                message: format!("list_links failed: {err}"),
                links: Vec::new(),
            },
        }
    }

    /// Deletes a link together with its sequence and link ends.
    pub fn delete_link(&self, id: &str) -> DeleteResponse {
        match self.with_graph_service(|service| service.delete_link(id)) {
            Ok(existed) => delete_success("Link", id, existed),
            Err(err) => delete_failure("delete_link", err),
        }
    }

    pub fn merge_sequence(&self, link_id: &str, patch: SequencePatch) -> SequenceResponse {
        match self.with_graph_service(|service| service.merge_sequence(link_id, &patch)) {
            Ok((seq, link)) => SequenceResponse {
                success: true,
                message: "Sequence merged.".to_string(),
                seq: Some(seq),
                link: Some(link),
            },
            Err(err) => SequenceResponse {
                success: false,
                message: format!("merge_sequence failed: {err}"),
                seq: None,
                link: None,
            },
        }
    }

    pub fn delete_sequence(&self, link_id: &str) -> DeleteResponse {
        match self.with_graph_service(|service| service.delete_sequence(link_id)) {
            Ok(existed) => delete_success("Sequence", link_id, existed),
            Err(err) => delete_failure("delete_sequence", err),
        }
    }

    pub fn merge_link_end(&self, link_id: &str, input: LinkEndInput) -> LinkEndResponse {
        let outcome = self.with_graph_service(|service| {
            let side = parse_side(&input.xy)?;
            let patch = LinkEndPatch {
                note: input.note,
                arrow: input.arrow,
            };
            service.merge_link_end(link_id, side, &patch)
        });
        match outcome {
            Ok((end, link)) => LinkEndResponse {
                success: true,
                message: "Link end merged.".to_string(),
                end: Some(end),
                link: Some(link),
            },
            Err(err) => LinkEndResponse {
                success: false,
                message: format!("merge_link_end failed: {err}"),
                end: None,
                link: None,
            },
        }
    }

    pub fn delete_link_end(&self, link_id: &str, xy: &str) -> DeleteResponse {
        let outcome = self.with_graph_service(|service| {
            let side = parse_side(xy)?;
            service.delete_link_end(link_id, side)
        });
        match outcome {
            Ok(existed) => delete_success("Link end", link_id, existed),
            Err(err) => delete_failure("delete_link_end", err),
        }
    }

    pub fn get_link_ends(&self, link_id: &str) -> LinkEndsResponse {
        match self.with_graph_service(|service| service.get_link_ends(link_id)) {
            Ok(ends) => LinkEndsResponse {
                success: true,
                message: "Link ends loaded.".to_string(),
                ends: Some(ends),
            },
            Err(err) => LinkEndsResponse {
                success: false,
                message: format!("get_link_ends failed: {err}"),
                ends: None,
            },
        }
    }

    /// Reports whether someone holds the edit lock.
    pub fn is_project_being_edited(&self) -> EditStatusResponse {
        let outcome = self.open_session().and_then(|conn| {
            let repo = SqliteProjectRepository::try_new(&conn).map_err(|err| err.to_string())?;
            EditLockService::new(repo, self.config.edit_lease)
                .is_being_edited()
                .map_err(|err| err.to_string())
        });
        match outcome {
            Ok(is_being_edited) => EditStatusResponse {
                success: true,
                message: if is_being_edited {
                    "Project is being edited.".to_string()
                } else {
                    "Project is free to edit.".to_string()
                },
                is_being_edited,
            },
            Err(err) => {
                warn!("event=edit_lock_query module=api status=error fallback=false");
                EditStatusResponse {
                    success: false,
                    message: err,
                    is_being_edited: false,
                }
            }
        }
    }

    /// Takes the edit lock without waiting and reports the grant.
    pub fn request_edit_rights(&self) -> EditRightsResponse {
        let outcome = self.open_session().and_then(|conn| {
            let repo = SqliteProjectRepository::try_new(&conn).map_err(|err| err.to_string())?;
            EditLockService::new(repo, self.config.edit_lease)
                .acquire()
                .map_err(|err| err.to_string())
        });
        match outcome {
            Ok(lease) => EditRightsResponse {
                success: true,
                message: "Editing rights granted.".to_string(),
                holder_token: Some(lease.holder_token),
                expires_at_ms: lease.expires_at_ms,
            },
            Err(err) => EditRightsResponse {
                success: false,
                message: err,
                holder_token: None,
                expires_at_ms: None,
            },
        }
    }

    /// Frees the edit lock whoever holds it.
    pub fn free_edit_rights(&self) -> ActionResponse {
        let outcome = self.open_session().and_then(|conn| {
            let repo = SqliteProjectRepository::try_new(&conn).map_err(|err| err.to_string())?;
            EditLockService::new(repo, self.config.edit_lease)
                .release()
                .map_err(|err| err.to_string())
        });
        match outcome {
            Ok(()) => ActionResponse::success("Editing rights freed."),
            Err(err) => ActionResponse::failure(err),
        }
    }

    fn open_session(&self) -> Result<Connection, String> {
        open_db(&self.config.db_path).map_err(|err| format!("graph store open failed: {err}"))
    }

    fn with_graph_service<T>(
        &self,
        f: impl FnOnce(&GraphService<SqliteGraphRepository<'_>>) -> GraphServiceResult<T>,
    ) -> Result<T, String> {
        let conn = self.open_session()?;
        let repo = SqliteGraphRepository::try_new(&conn)
            .map_err(|err| format!("graph repo init failed: {err}"))?;
        let service = GraphService::new(repo);
        f(&service).map_err(|err| err.to_string())
    }
}

fn node_response(
    op: &str,
    message: &str,
    outcome: Result<diagram_core::Node, String>,
) -> NodeResponse {
    match outcome {
        Ok(node) => NodeResponse {
            success: true,
            message: message.to_string(),
            node: Some(node),
        },
        Err(err) => NodeResponse {
            success: false,
            message: format!("{op} failed: {err}"),
            node: None,
        },
    }
}

fn link_response(
    op: &str,
    message: &str,
    outcome: Result<diagram_core::Link, String>,
) -> LinkResponse {
    match outcome {
        Ok(link) => LinkResponse {
            success: true,
            message: message.to_string(),
            link: Some(link),
        },
        Err(err) => LinkResponse {
            success: false,
            message: format!("{op} failed: {err}"),
            link: None,
        },
    }
}

fn delete_success(entity: &str, id: &str, existed: bool) -> DeleteResponse {
    DeleteResponse {
        success: true,
        message: if existed {
            format!("{entity} deleted.")
        } else {
            format!("{entity} was already absent.")
        },
        id: Some(id.to_string()),
        swept_links: Vec::new(),
    }
}

fn delete_failure(op: &str, err: String) -> DeleteResponse {
    DeleteResponse {
        success: false,
        message: format!("{op} failed: {err}"),
        id: None,
        swept_links: Vec::new(),
    }
}

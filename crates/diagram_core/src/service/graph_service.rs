//! Graph mutation engine.
//!
//! # Responsibility
//! - Validate caller input (ids, sides, categories) above the repository.
//! - Run node/link/sequence/link-end lifecycle operations.
//! - Emit one metadata-only log event per mutation.
//!
//! # Invariants
//! - Caller-supplied ids match `ENTITY_ID_RE` before reaching the store.
//! - Endpoint resolution failures surface as errors; no partial link is kept.
//! - Log events never carry labels, stories or notes.

use crate::model::link::{
    Link, LinkEnd, LinkEndPatch, LinkEnds, LinkKind, LinkPatch, LinkProps, Sequence,
    SequencePatch, Side,
};
use crate::model::node::{Node, NodeKind, NodePatch, NodeProps};
use crate::repo::graph_repo::{GraphRepoError, GraphRepository, NewLink, NodeDeletion};
use log::{info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

static ENTITY_ID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.:-]{0,127}$").expect("valid entity id regex")
});

/// Errors from graph service operations.
#[derive(Debug)]
pub enum GraphServiceError {
    /// Id is empty, too long or contains unsupported characters.
    InvalidId(String),
    /// Link side is not `x` or `y`.
    InvalidSide(String),
    /// Node category is not one of the known tags.
    UnknownNodeType(String),
    /// Link category is not one of the known tags.
    UnknownLinkType(String),
    Repo(GraphRepoError),
}

impl Display for GraphServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidId(id) => write!(f, "invalid entity id: `{id}`"),
            Self::InvalidSide(side) => write!(f, "invalid link side `{side}`; expected x|y"),
            Self::UnknownNodeType(value) => write!(f, "unknown node type `{value}`"),
            Self::UnknownLinkType(value) => write!(f, "unknown link type `{value}`"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for GraphServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<GraphRepoError> for GraphServiceError {
    fn from(value: GraphRepoError) -> Self {
        Self::Repo(value)
    }
}

pub type GraphServiceResult<T> = Result<T, GraphServiceError>;

/// Parses a node category name.
pub fn parse_node_kind(value: &str) -> GraphServiceResult<NodeKind> {
    NodeKind::parse(value).ok_or_else(|| GraphServiceError::UnknownNodeType(value.to_string()))
}

/// Parses a link category name.
pub fn parse_link_kind(value: &str) -> GraphServiceResult<LinkKind> {
    LinkKind::parse(value).ok_or_else(|| GraphServiceError::UnknownLinkType(value.to_string()))
}

/// Parses a link side (`x`/`y`, either case).
pub fn parse_side(value: &str) -> GraphServiceResult<Side> {
    Side::parse(value).ok_or_else(|| GraphServiceError::InvalidSide(value.to_string()))
}

/// Graph mutation engine facade.
pub struct GraphService<R: GraphRepository> {
    repo: R,
}

impl<R: GraphRepository> GraphService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates one node tagged with `kind`.
    ///
    /// Fails with `DuplicateNode` when the id is taken.
    pub fn create_node(
        &self,
        id: &str,
        label: &str,
        kind: NodeKind,
        props: &NodeProps,
    ) -> GraphServiceResult<Node> {
        let started_at = Instant::now();
        let result = validate_id(id).and_then(|()| {
            self.repo
                .create_node(id, label, kind, props)
                .map_err(Into::into)
        });
        log_outcome("node_create", "node_id", id, started_at, &result);
        result
    }

    /// Creates one link with both structural references.
    ///
    /// # Contract
    /// - Both endpoint ids must resolve to existing nodes; otherwise nothing
    ///   is written and `UnresolvedEndpoint` is returned.
    /// - The returned link carries the default sequence.
    pub fn create_link(
        &self,
        id: &str,
        from_id: &str,
        to_id: &str,
        kind: LinkKind,
        label: &str,
        props: &LinkProps,
    ) -> GraphServiceResult<Link> {
        let started_at = Instant::now();
        let result = validate_ids(&[id, from_id, to_id]).and_then(|()| {
            let link = NewLink {
                id: id.to_string(),
                from_id: from_id.to_string(),
                to_id: to_id.to_string(),
                kind,
                label: label.to_string(),
                props: props.clone(),
            };
            self.repo.create_link(&link).map_err(Into::into)
        });
        log_outcome("link_create", "link_id", id, started_at, &result);
        result
    }

    /// Applies a property patch; a new type replaces the old tag.
    pub fn update_node(&self, id: &str, patch: &NodePatch) -> GraphServiceResult<Node> {
        let started_at = Instant::now();
        let result = validate_id(id)
            .and_then(|()| self.repo.update_node(id, patch).map_err(Into::into));
        log_outcome("node_update", "node_id", id, started_at, &result);
        result
    }

    /// Applies a property patch and optionally re-points either side.
    ///
    /// # Contract
    /// - A re-pointed side ends with exactly one reference, to the new node.
    /// - An unresolvable new endpoint leaves the link unchanged.
    pub fn update_link(&self, id: &str, patch: &LinkPatch) -> GraphServiceResult<Link> {
        let started_at = Instant::now();
        let mut ids = vec![id];
        ids.extend(Side::BOTH.into_iter().filter_map(|side| patch.endpoint(side)));
        let result = validate_ids(&ids)
            .and_then(|()| self.repo.update_link(id, patch).map_err(Into::into));
        log_outcome("link_update", "link_id", id, started_at, &result);
        result
    }

    /// Creates or updates the link's single sequence.
    pub fn merge_sequence(
        &self,
        link_id: &str,
        patch: &SequencePatch,
    ) -> GraphServiceResult<(Sequence, Link)> {
        let started_at = Instant::now();
        let result = validate_id(link_id)
            .and_then(|()| self.repo.merge_sequence(link_id, patch).map_err(Into::into));
        log_outcome("sequence_merge", "link_id", link_id, started_at, &result);
        result
    }

    /// Creates or updates the link end on `side`.
    pub fn merge_link_end(
        &self,
        link_id: &str,
        side: Side,
        patch: &LinkEndPatch,
    ) -> GraphServiceResult<(LinkEnd, Link)> {
        let started_at = Instant::now();
        let result = validate_id(link_id).and_then(|()| {
            self.repo
                .merge_link_end(link_id, side, patch)
                .map_err(Into::into)
        });
        log_outcome("link_end_merge", "link_id", link_id, started_at, &result);
        result
    }

    /// Deletes a node and every link it leaves without both endpoints.
    pub fn delete_node(&self, id: &str) -> GraphServiceResult<NodeDeletion> {
        let started_at = Instant::now();
        let result = validate_id(id).and_then(|()| self.repo.delete_node(id).map_err(Into::into));
        if let Ok(deletion) = &result {
            info!(
                "event=node_delete_sweep module=graph node_id={} node_deleted={} swept_links={}",
                id,
                deletion.node_deleted,
                deletion.swept_links.len()
            );
        }
        log_outcome("node_delete", "node_id", id, started_at, &result);
        result
    }

    /// Deletes a link with its sequence and link ends.
    ///
    /// Returns `false` when no such link existed.
    pub fn delete_link(&self, id: &str) -> GraphServiceResult<bool> {
        let started_at = Instant::now();
        let result = validate_id(id).and_then(|()| self.repo.delete_link(id).map_err(Into::into));
        log_outcome("link_delete", "link_id", id, started_at, &result);
        result
    }

    /// Deletes only the link's sequence.
    pub fn delete_sequence(&self, link_id: &str) -> GraphServiceResult<bool> {
        let started_at = Instant::now();
        let result = validate_id(link_id)
            .and_then(|()| self.repo.delete_sequence(link_id).map_err(Into::into));
        log_outcome("sequence_delete", "link_id", link_id, started_at, &result);
        result
    }

    /// Deletes only the link end on `side`.
    pub fn delete_link_end(&self, link_id: &str, side: Side) -> GraphServiceResult<bool> {
        let started_at = Instant::now();
        let result = validate_id(link_id).and_then(|()| {
            self.repo
                .delete_link_end(link_id, side)
                .map_err(Into::into)
        });
        log_outcome("link_end_delete", "link_id", link_id, started_at, &result);
        result
    }

    pub fn get_node(&self, id: &str) -> GraphServiceResult<Option<Node>> {
        validate_id(id)?;
        Ok(self.repo.get_node(id)?)
    }

    pub fn list_nodes(&self) -> GraphServiceResult<Vec<Node>> {
        Ok(self.repo.list_nodes()?)
    }

    pub fn get_link(&self, id: &str) -> GraphServiceResult<Option<Link>> {
        validate_id(id)?;
        Ok(self.repo.get_link(id)?)
    }

    pub fn list_links(&self) -> GraphServiceResult<Vec<Link>> {
        Ok(self.repo.list_links()?)
    }

    pub fn get_link_ends(&self, link_id: &str) -> GraphServiceResult<LinkEnds> {
        validate_id(link_id)?;
        Ok(self.repo.get_link_ends(link_id)?)
    }
}

fn validate_id(id: &str) -> GraphServiceResult<()> {
    if ENTITY_ID_RE.is_match(id) {
        Ok(())
    } else {
        Err(GraphServiceError::InvalidId(id.to_string()))
    }
}

fn validate_ids(ids: &[&str]) -> GraphServiceResult<()> {
    ids.iter().try_for_each(|id| validate_id(id))
}

fn log_outcome<T>(
    event: &str,
    subject_key: &str,
    subject: &str,
    started_at: Instant,
    result: &GraphServiceResult<T>,
) {
    match result {
        Ok(_) => info!(
            "event={} module=graph status=ok {}={} duration_ms={}",
            event,
            subject_key,
            subject,
            started_at.elapsed().as_millis()
        ),
        Err(err) => warn!(
            "event={} module=graph status=error {}={} duration_ms={} error={}",
            event,
            subject_key,
            subject,
            started_at.elapsed().as_millis(),
            err
        ),
    }
}

//! Graph repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Create, update, merge and delete nodes, links and link dependents.
//! - Maintain the X/Y structural references between links and nodes.
//! - Sweep links orphaned by a node deletion.
//!
//! # Invariants
//! - Link creation and endpoint re-pointing are all-or-nothing: an endpoint id
//!   that does not resolve to a node aborts the whole operation.
//! - A re-pointed side has its old reference deleted before the new one is
//!   inserted, inside the same transaction.
//! - After `delete_node` commits, no link lacking an X or Y reference to an
//!   existing node remains.
//! - Deleting a link deletes its link ends and sequence first.

use super::{bool_to_int, find_schema_gap, SchemaGap};
use crate::db::DbError;
use crate::model::link::{
    Link, LinkEnd, LinkEndPatch, LinkEnds, LinkKind, LinkPatch, LinkProps, Sequence,
    SequencePatch, Side,
};
use crate::model::node::{Node, NodeKind, NodePatch, NodeProps};
use crate::normalize::{
    normalize_link, normalize_link_end, normalize_node, normalize_sequence, RawLink, RawLinkEnd,
    RawNode, RawSequence,
};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const GRAPH_TABLES: &[&str] = &["nodes", "links", "link_endpoints", "sequences", "link_ends"];

const NODE_SELECT_SQL: &str = "SELECT
    id,
    label,
    story,
    node_type,
    synchronous,
    unreliable
FROM nodes";

const LINK_SELECT_SQL: &str = "SELECT
    l.id AS id,
    l.label AS label,
    l.story AS story,
    l.link_type AS link_type,
    l.optional AS optional,
    x.node_id AS from_id,
    y.node_id AS to_id,
    s.id AS seq_id,
    s.group_name AS seq_group,
    s.seq AS seq_value,
    s.label AS seq_label
FROM links l
LEFT JOIN link_endpoints x ON x.link_id = l.id AND x.side = 'x'
LEFT JOIN link_endpoints y ON y.link_id = l.id AND y.side = 'y'
LEFT JOIN sequences s ON s.link_id = l.id";

pub type GraphRepoResult<T> = Result<T, GraphRepoError>;

/// Errors from graph repository operations.
#[derive(Debug)]
pub enum GraphRepoError {
    /// Store fault.
    Db(DbError),
    /// Connection is not bootstrapped for graph access.
    Schema(SchemaGap),
    NodeNotFound(String),
    LinkNotFound(String),
    /// A node with the caller-supplied id already exists.
    DuplicateNode(String),
    /// A link with the caller-supplied id already exists.
    DuplicateLink(String),
    /// Endpoint id does not resolve to an existing node.
    UnresolvedEndpoint { side: Side, node_id: String },
}

impl Display for GraphRepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Schema(gap) => write!(f, "{gap}"),
            Self::NodeNotFound(id) => write!(f, "node not found: {id}"),
            Self::LinkNotFound(id) => write!(f, "link not found: {id}"),
            Self::DuplicateNode(id) => write!(f, "node already exists: {id}"),
            Self::DuplicateLink(id) => write!(f, "link already exists: {id}"),
            Self::UnresolvedEndpoint { side, node_id } => write!(
                f,
                "link endpoint {side} does not resolve to an existing node: {node_id}"
            ),
        }
    }
}

impl Error for GraphRepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for GraphRepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for GraphRepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Insert request for one link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLink {
    pub id: String,
    pub from_id: String,
    pub to_id: String,
    pub kind: LinkKind,
    pub label: String,
    pub props: LinkProps,
}

impl NewLink {
    fn endpoint(&self, side: Side) -> &str {
        match side {
            Side::X => self.from_id.as_str(),
            Side::Y => self.to_id.as_str(),
        }
    }
}

/// Outcome of a node deletion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeDeletion {
    /// `false` when no node had the requested id.
    pub node_deleted: bool,
    /// Links removed by the orphan sweep, in sweep order.
    pub swept_links: Vec<String>,
}

/// Repository interface for graph lifecycle operations.
pub trait GraphRepository {
    fn create_node(
        &self,
        id: &str,
        label: &str,
        kind: NodeKind,
        props: &NodeProps,
    ) -> GraphRepoResult<Node>;
    fn update_node(&self, id: &str, patch: &NodePatch) -> GraphRepoResult<Node>;
    fn get_node(&self, id: &str) -> GraphRepoResult<Option<Node>>;
    fn list_nodes(&self) -> GraphRepoResult<Vec<Node>>;
    /// Detach-deletes one node, then sweeps links it orphaned.
    fn delete_node(&self, id: &str) -> GraphRepoResult<NodeDeletion>;

    fn create_link(&self, link: &NewLink) -> GraphRepoResult<Link>;
    fn update_link(&self, id: &str, patch: &LinkPatch) -> GraphRepoResult<Link>;
    fn get_link(&self, id: &str) -> GraphRepoResult<Option<Link>>;
    fn list_links(&self) -> GraphRepoResult<Vec<Link>>;
    /// Deletes one link with its dependents. Returns whether it existed.
    fn delete_link(&self, id: &str) -> GraphRepoResult<bool>;

    /// Creates the link's sequence or updates it in place.
    fn merge_sequence(
        &self,
        link_id: &str,
        patch: &SequencePatch,
    ) -> GraphRepoResult<(Sequence, Link)>;
    fn delete_sequence(&self, link_id: &str) -> GraphRepoResult<bool>;

    /// Creates the link end on `side` or updates it in place.
    fn merge_link_end(
        &self,
        link_id: &str,
        side: Side,
        patch: &LinkEndPatch,
    ) -> GraphRepoResult<(LinkEnd, Link)>;
    fn delete_link_end(&self, link_id: &str, side: Side) -> GraphRepoResult<bool>;
    fn get_link_ends(&self, link_id: &str) -> GraphRepoResult<LinkEnds>;
}

/// SQLite-backed graph repository.
pub struct SqliteGraphRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteGraphRepository<'conn> {
    /// Creates repository from a bootstrapped connection.
    pub fn try_new(conn: &'conn Connection) -> GraphRepoResult<Self> {
        if let Some(gap) = find_schema_gap(conn, GRAPH_TABLES)? {
            return Err(GraphRepoError::Schema(gap));
        }
        Ok(Self { conn })
    }
}

impl GraphRepository for SqliteGraphRepository<'_> {
    fn create_node(
        &self,
        id: &str,
        label: &str,
        kind: NodeKind,
        props: &NodeProps,
    ) -> GraphRepoResult<Node> {
        let inserted = self.conn.execute(
            "INSERT INTO nodes (
                id,
                label,
                story,
                node_type,
                synchronous,
                unreliable
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                id,
                label,
                props.story.as_deref(),
                kind.as_str(),
                props.synchronous.map(bool_to_int),
                props.unreliable.map(bool_to_int),
            ],
        );
        reject_duplicate(inserted, || GraphRepoError::DuplicateNode(id.to_string()))?;

        load_required_node(self.conn, id)
    }

    fn update_node(&self, id: &str, patch: &NodePatch) -> GraphRepoResult<Node> {
        // One column carries the type tag, so a new type replaces the old one.
        let changed = self.conn.execute(
            "UPDATE nodes
             SET
                label = COALESCE(?2, label),
                story = COALESCE(?3, story),
                node_type = COALESCE(?4, node_type),
                synchronous = COALESCE(?5, synchronous),
                unreliable = COALESCE(?6, unreliable),
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![
                id,
                patch.label.as_deref(),
                patch.story.as_deref(),
                patch.node_type.map(NodeKind::as_str),
                patch.synchronous.map(bool_to_int),
                patch.unreliable.map(bool_to_int),
            ],
        )?;

        if changed == 0 {
            return Err(GraphRepoError::NodeNotFound(id.to_string()));
        }

        load_required_node(self.conn, id)
    }

    fn get_node(&self, id: &str) -> GraphRepoResult<Option<Node>> {
        load_node(self.conn, id)
    }

    fn list_nodes(&self) -> GraphRepoResult<Vec<Node>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{NODE_SELECT_SQL} ORDER BY created_at ASC, id ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut nodes = Vec::new();
        while let Some(row) = rows.next()? {
            nodes.push(normalize_node(read_raw_node(row)?));
        }
        Ok(nodes)
    }

    fn delete_node(&self, id: &str) -> GraphRepoResult<NodeDeletion> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;

        // Only links that referenced this node can become orphans.
        let candidates = list_links_referencing(&tx, id)?;
        tx.execute("DELETE FROM link_endpoints WHERE node_id = ?1;", [id])?;
        let node_deleted = tx.execute("DELETE FROM nodes WHERE id = ?1;", [id])? > 0;
        let swept_links = sweep_orphaned_links(&tx, &candidates)?;

        tx.commit()?;
        Ok(NodeDeletion {
            node_deleted,
            swept_links,
        })
    }

    fn create_link(&self, link: &NewLink) -> GraphRepoResult<Link> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        for side in Side::BOTH {
            ensure_node_resolves(&tx, side, link.endpoint(side))?;
        }

        let inserted = tx.execute(
            "INSERT INTO links (
                id,
                label,
                story,
                link_type,
                optional
            ) VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                link.id.as_str(),
                link.label.as_str(),
                link.props.story.as_deref(),
                link.kind.as_str(),
                link.props.optional.map(bool_to_int),
            ],
        );
        reject_duplicate(inserted, || GraphRepoError::DuplicateLink(link.id.clone()))?;

        for side in Side::BOTH {
            insert_endpoint(&tx, &link.id, side, link.endpoint(side))?;
        }

        let created = load_required_link(&tx, &link.id)?;
        tx.commit()?;
        Ok(created)
    }

    fn update_link(&self, id: &str, patch: &LinkPatch) -> GraphRepoResult<Link> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;

        let changed = tx.execute(
            "UPDATE links
             SET
                label = COALESCE(?2, label),
                story = COALESCE(?3, story),
                link_type = COALESCE(?4, link_type),
                optional = COALESCE(?5, optional),
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![
                id,
                patch.label.as_deref(),
                patch.story.as_deref(),
                patch.link_type.map(LinkKind::as_str),
                patch.optional.map(bool_to_int),
            ],
        )?;
        if changed == 0 {
            return Err(GraphRepoError::LinkNotFound(id.to_string()));
        }

        for side in Side::BOTH {
            let Some(node_id) = patch.endpoint(side) else {
                continue;
            };
            ensure_node_resolves(&tx, side, node_id)?;
            tx.execute(
                "DELETE FROM link_endpoints WHERE link_id = ?1 AND side = ?2;",
                params![id, side.as_str()],
            )?;
            insert_endpoint(&tx, id, side, node_id)?;
        }

        let updated = load_required_link(&tx, id)?;
        tx.commit()?;
        Ok(updated)
    }

    fn get_link(&self, id: &str) -> GraphRepoResult<Option<Link>> {
        load_link(self.conn, id)
    }

    fn list_links(&self) -> GraphRepoResult<Vec<Link>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{LINK_SELECT_SQL} ORDER BY l.created_at ASC, l.id ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut links = Vec::new();
        while let Some(row) = rows.next()? {
            links.push(normalize_link(read_raw_link(row)?));
        }
        Ok(links)
    }

    fn delete_link(&self, id: &str) -> GraphRepoResult<bool> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let deleted = delete_link_cascade(&tx, id)?;
        tx.commit()?;
        Ok(deleted)
    }

    fn merge_sequence(
        &self,
        link_id: &str,
        patch: &SequencePatch,
    ) -> GraphRepoResult<(Sequence, Link)> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        ensure_link_exists(&tx, link_id)?;

        tx.execute(
            "INSERT INTO sequences (id, link_id, group_name, seq, label)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(link_id) DO UPDATE SET
                group_name = COALESCE(excluded.group_name, sequences.group_name),
                seq = COALESCE(excluded.seq, sequences.seq),
                label = COALESCE(excluded.label, sequences.label);",
            params![
                Uuid::new_v4().to_string(),
                link_id,
                patch.group.as_deref(),
                patch.seq,
                patch.label.as_deref(),
            ],
        )?;

        let sequence = tx.query_row(
            "SELECT id, group_name, seq, label FROM sequences WHERE link_id = ?1;",
            [link_id],
            read_raw_sequence,
        )?;
        let link = load_required_link(&tx, link_id)?;
        tx.commit()?;
        Ok((normalize_sequence(sequence), link))
    }

    fn delete_sequence(&self, link_id: &str) -> GraphRepoResult<bool> {
        let removed = self
            .conn
            .execute("DELETE FROM sequences WHERE link_id = ?1;", [link_id])?;
        Ok(removed > 0)
    }

    fn merge_link_end(
        &self,
        link_id: &str,
        side: Side,
        patch: &LinkEndPatch,
    ) -> GraphRepoResult<(LinkEnd, Link)> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        ensure_link_exists(&tx, link_id)?;

        tx.execute(
            "INSERT INTO link_ends (id, link_id, side, note, arrow)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(link_id, side) DO UPDATE SET
                note = COALESCE(excluded.note, link_ends.note),
                arrow = COALESCE(excluded.arrow, link_ends.arrow);",
            params![
                Uuid::new_v4().to_string(),
                link_id,
                side.as_str(),
                patch.note.as_deref(),
                patch.arrow.as_deref(),
            ],
        )?;

        let end = tx.query_row(
            "SELECT id, note, arrow FROM link_ends WHERE link_id = ?1 AND side = ?2;",
            params![link_id, side.as_str()],
            read_raw_link_end,
        )?;
        let link = load_required_link(&tx, link_id)?;
        tx.commit()?;
        Ok((normalize_link_end(end), link))
    }

    fn delete_link_end(&self, link_id: &str, side: Side) -> GraphRepoResult<bool> {
        let removed = self.conn.execute(
            "DELETE FROM link_ends WHERE link_id = ?1 AND side = ?2;",
            params![link_id, side.as_str()],
        )?;
        Ok(removed > 0)
    }

    fn get_link_ends(&self, link_id: &str) -> GraphRepoResult<LinkEnds> {
        ensure_link_exists(self.conn, link_id)?;

        let mut ends = LinkEnds::default();
        for side in Side::BOTH {
            let end = self
                .conn
                .query_row(
                    "SELECT id, note, arrow FROM link_ends WHERE link_id = ?1 AND side = ?2;",
                    params![link_id, side.as_str()],
                    read_raw_link_end,
                )
                .optional()?
                .map(normalize_link_end);
            match side {
                Side::X => ends.x = end,
                Side::Y => ends.y = end,
            }
        }
        Ok(ends)
    }
}

fn reject_duplicate(
    result: rusqlite::Result<usize>,
    duplicate: impl FnOnce() -> GraphRepoError,
) -> GraphRepoResult<()> {
    match result {
        Ok(_) => Ok(()),
        Err(err) => {
            let err = DbError::from(err);
            if err.is_constraint_violation() {
                Err(duplicate())
            } else {
                Err(err.into())
            }
        }
    }
}

fn load_node(conn: &Connection, id: &str) -> GraphRepoResult<Option<Node>> {
    let raw = conn
        .query_row(
            &format!("{NODE_SELECT_SQL} WHERE id = ?1;"),
            [id],
            read_raw_node,
        )
        .optional()?;
    Ok(raw.map(normalize_node))
}

fn load_required_node(conn: &Connection, id: &str) -> GraphRepoResult<Node> {
    load_node(conn, id)?.ok_or_else(|| GraphRepoError::NodeNotFound(id.to_string()))
}

fn load_link(conn: &Connection, id: &str) -> GraphRepoResult<Option<Link>> {
    let raw = conn
        .query_row(
            &format!("{LINK_SELECT_SQL} WHERE l.id = ?1;"),
            [id],
            read_raw_link,
        )
        .optional()?;
    Ok(raw.map(normalize_link))
}

fn load_required_link(conn: &Connection, id: &str) -> GraphRepoResult<Link> {
    load_link(conn, id)?.ok_or_else(|| GraphRepoError::LinkNotFound(id.to_string()))
}

fn ensure_node_resolves(conn: &Connection, side: Side, node_id: &str) -> GraphRepoResult<()> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM nodes WHERE id = ?1);",
        [node_id],
        |row| row.get(0),
    )?;
    if exists != 1 {
        return Err(GraphRepoError::UnresolvedEndpoint {
            side,
            node_id: node_id.to_string(),
        });
    }
    Ok(())
}

fn ensure_link_exists(conn: &Connection, link_id: &str) -> GraphRepoResult<()> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM links WHERE id = ?1);",
        [link_id],
        |row| row.get(0),
    )?;
    if exists != 1 {
        return Err(GraphRepoError::LinkNotFound(link_id.to_string()));
    }
    Ok(())
}

fn insert_endpoint(conn: &Connection, link_id: &str, side: Side, node_id: &str) -> GraphRepoResult<()> {
    conn.execute(
        "INSERT INTO link_endpoints (link_id, side, node_id) VALUES (?1, ?2, ?3);",
        params![link_id, side.as_str(), node_id],
    )?;
    Ok(())
}

fn list_links_referencing(conn: &Connection, node_id: &str) -> GraphRepoResult<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT link_id
         FROM link_endpoints
         WHERE node_id = ?1
         ORDER BY link_id ASC;",
    )?;
    let mut rows = stmt.query([node_id])?;
    let mut ids = Vec::new();
    while let Some(row) = rows.next()? {
        ids.push(row.get(0)?);
    }
    Ok(ids)
}

/// Deletes every candidate link that no longer has both references.
fn sweep_orphaned_links(conn: &Connection, candidates: &[String]) -> GraphRepoResult<Vec<String>> {
    let mut swept = Vec::new();
    for link_id in candidates {
        let references: i64 = conn.query_row(
            "SELECT COUNT(*) FROM link_endpoints WHERE link_id = ?1;",
            [link_id],
            |row| row.get(0),
        )?;
        if references < 2 && delete_link_cascade(conn, link_id)? {
            swept.push(link_id.clone());
        }
    }
    Ok(swept)
}

fn delete_link_cascade(conn: &Connection, link_id: &str) -> GraphRepoResult<bool> {
    conn.execute("DELETE FROM link_ends WHERE link_id = ?1;", [link_id])?;
    conn.execute("DELETE FROM sequences WHERE link_id = ?1;", [link_id])?;
    conn.execute("DELETE FROM link_endpoints WHERE link_id = ?1;", [link_id])?;
    let removed = conn.execute("DELETE FROM links WHERE id = ?1;", [link_id])?;
    Ok(removed > 0)
}

fn read_raw_node(row: &Row<'_>) -> rusqlite::Result<RawNode> {
    Ok(RawNode {
        id: row.get("id")?,
        label: row.get("label")?,
        story: row.get("story")?,
        node_type: row.get("node_type")?,
        synchronous: row.get("synchronous")?,
        unreliable: row.get("unreliable")?,
    })
}

fn read_raw_sequence(row: &Row<'_>) -> rusqlite::Result<RawSequence> {
    Ok(RawSequence {
        id: row.get("id")?,
        group: row.get("group_name")?,
        seq: row.get("seq")?,
        label: row.get("label")?,
    })
}

fn read_raw_link_end(row: &Row<'_>) -> rusqlite::Result<RawLinkEnd> {
    Ok(RawLinkEnd {
        id: row.get("id")?,
        note: row.get("note")?,
        arrow: row.get("arrow")?,
    })
}

fn read_raw_link(row: &Row<'_>) -> rusqlite::Result<RawLink> {
    let sequence = match row.get::<_, Option<String>>("seq_id")? {
        Some(seq_id) => Some(RawSequence {
            id: Some(seq_id),
            group: row.get("seq_group")?,
            seq: row.get("seq_value")?,
            label: row.get("seq_label")?,
        }),
        None => None,
    };

    Ok(RawLink {
        id: row.get("id")?,
        label: row.get("label")?,
        story: row.get("story")?,
        link_type: row.get("link_type")?,
        optional: row.get("optional")?,
        from_id: row.get("from_id")?,
        to_id: row.get("to_id")?,
        sequence,
    })
}

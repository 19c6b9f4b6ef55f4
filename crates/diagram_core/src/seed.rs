//! Sample data provisioning.
//!
//! # Responsibility
//! - Provision the project singleton the edit lock lives on.
//! - Replace the whole graph with a small sample diagram.
//!
//! # Invariants
//! - Seeding is one transaction: the store holds either the old graph or the
//!   complete sample, never a mix.
//! - Every seeded entity gets a fresh UUID.
//! - The project is left unlocked.

use crate::db::DbResult;
use crate::model::link::{LinkKind, Side};
use crate::model::node::NodeKind;
use crate::model::project::DEFAULT_PROJECT_NAME;
use log::info;
use rusqlite::{params, Connection, Transaction, TransactionBehavior};
use uuid::Uuid;

/// Counts of what `seed_sample_graph` wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedSummary {
    pub nodes: usize,
    pub links: usize,
    pub sequences: usize,
    pub link_ends: usize,
}

/// Creates the project row, or resets it to unlocked under `name`.
pub fn provision_project(conn: &Connection, name: &str) -> DbResult<()> {
    conn.execute(
        "INSERT INTO project (singleton_id, name, is_being_edited)
         VALUES (1, ?1, 0)
         ON CONFLICT(singleton_id) DO UPDATE SET
            name = excluded.name,
            is_being_edited = 0,
            holder_token = NULL,
            lease_expires_at = NULL;",
        [name],
    )?;
    Ok(())
}

/// Wipes every graph entity and the project, then writes the sample diagram.
pub fn seed_sample_graph(conn: &Connection) -> DbResult<SeedSummary> {
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    tx.execute_batch(
        "DELETE FROM link_ends;
         DELETE FROM sequences;
         DELETE FROM link_endpoints;
         DELETE FROM links;
         DELETE FROM nodes;
         DELETE FROM project;",
    )?;
    provision_project(&tx, DEFAULT_PROJECT_NAME)?;

    let mut seeder = Seeder {
        tx: &tx,
        summary: SeedSummary {
            nodes: 0,
            links: 0,
            sequences: 0,
            link_ends: 0,
        },
    };

    let ui = seeder.node(
        "UI",
        "Interaction point for the user",
        NodeKind::AbstractUserInterface,
        false,
    )?;
    let api = seeder.node(
        "Server",
        "Endpoint for requests, fetches and mutates data from/on the DB",
        NodeKind::Api,
        false,
    )?;
    let store = seeder.node(
        "NeoDB",
        "Saves data for the methodical designer",
        NodeKind::Persistence,
        true,
    )?;
    let event = seeder.node(
        "Create Node",
        "Event for creating a node",
        NodeKind::Event,
        true,
    )?;

    seeder.link(
        &api,
        &ui,
        LinkKind::Mutate,
        "Mutates",
        "Populates the UI with data",
    )?;

    let trigger_event = seeder.link(
        &ui,
        &event,
        LinkKind::Trigger,
        "Triggers",
        "Dispatch mutation call to the API",
    )?;
    seeder.sequence(&trigger_event, "Sequence Group", "Test Sequence", 1)?;
    seeder.link_end(
        &trigger_event,
        Side::X,
        "A note on the X end of the Trigger link",
    )?;
    seeder.link_end(
        &trigger_event,
        Side::Y,
        "A note on the Y end of the Trigger link",
    )?;

    let trigger_server = seeder.link(
        &event,
        &api,
        LinkKind::Trigger,
        "Triggers",
        "Invoke mutation function to alter data in the DB",
    )?;
    seeder.link_end(
        &trigger_server,
        Side::X,
        "A note on the X end of the Trigger link",
    )?;

    let mutate_store = seeder.link(
        &api,
        &store,
        LinkKind::Mutate,
        "Mutates",
        "Mutates the data in the DB upon an event from the UI",
    )?;
    seeder.link_end(
        &mutate_store,
        Side::X,
        "A note on the X end of the Mutate link",
    )?;
    seeder.sequence(&mutate_store, "Sequence Group", "Test Sequence", 1)?;

    seeder.link(
        &api,
        &store,
        LinkKind::Read,
        "Read",
        "Fetches data from the DB",
    )?;

    let summary = seeder.summary;
    tx.commit()?;

    info!(
        "event=seed module=seed status=ok nodes={} links={} sequences={} link_ends={}",
        summary.nodes, summary.links, summary.sequences, summary.link_ends
    );
    Ok(summary)
}

struct Seeder<'a> {
    tx: &'a Connection,
    summary: SeedSummary,
}

impl Seeder<'_> {
    fn node(
        &mut self,
        label: &str,
        story: &str,
        kind: NodeKind,
        unreliable: bool,
    ) -> DbResult<String> {
        let id = Uuid::new_v4().to_string();
        self.tx.execute(
            "INSERT INTO nodes (id, label, story, node_type, synchronous, unreliable)
             VALUES (?1, ?2, ?3, ?4, 0, ?5);",
            params![id, label, story, kind.as_str(), i64::from(unreliable)],
        )?;
        self.summary.nodes += 1;
        Ok(id)
    }

    fn link(
        &mut self,
        from_id: &str,
        to_id: &str,
        kind: LinkKind,
        label: &str,
        story: &str,
    ) -> DbResult<String> {
        let id = Uuid::new_v4().to_string();
        self.tx.execute(
            "INSERT INTO links (id, label, story, link_type, optional)
             VALUES (?1, ?2, ?3, ?4, 0);",
            params![id, label, story, kind.as_str()],
        )?;
        for (side, node_id) in [(Side::X, from_id), (Side::Y, to_id)] {
            self.tx.execute(
                "INSERT INTO link_endpoints (link_id, side, node_id) VALUES (?1, ?2, ?3);",
                params![id, side.as_str(), node_id],
            )?;
        }
        self.summary.links += 1;
        Ok(id)
    }

    fn sequence(&mut self, link_id: &str, group: &str, label: &str, seq: i64) -> DbResult<()> {
        self.tx.execute(
            "INSERT INTO sequences (id, link_id, group_name, seq, label)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![Uuid::new_v4().to_string(), link_id, group, seq, label],
        )?;
        self.summary.sequences += 1;
        Ok(())
    }

    fn link_end(&mut self, link_id: &str, side: Side, note: &str) -> DbResult<()> {
        self.tx.execute(
            "INSERT INTO link_ends (id, link_id, side, note, arrow)
             VALUES (?1, ?2, ?3, ?4, 'default');",
            params![Uuid::new_v4().to_string(), link_id, side.as_str(), note],
        )?;
        self.summary.link_ends += 1;
        Ok(())
    }
}

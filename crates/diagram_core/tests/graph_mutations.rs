use diagram_core::db::open_db_in_memory;
use diagram_core::{
    GraphRepoError, GraphService, GraphServiceError, LinkKind, LinkPatch, LinkProps, NodeKind,
    NodePatch, NodeProps, Side, SqliteGraphRepository,
};
use rusqlite::Connection;

fn setup() -> Connection {
    open_db_in_memory().unwrap()
}

fn seed_pair(service: &GraphService<SqliteGraphRepository<'_>>) {
    service
        .create_node("ui", "UI", NodeKind::AbstractUserInterface, &NodeProps::default())
        .unwrap();
    service
        .create_node("api", "Server", NodeKind::Api, &NodeProps::default())
        .unwrap();
}

fn endpoint_refs(conn: &Connection, link_id: &str, side: &str) -> Vec<String> {
    let mut stmt = conn
        .prepare("SELECT node_id FROM link_endpoints WHERE link_id = ?1 AND side = ?2;")
        .unwrap();
    let rows = stmt
        .query_map([link_id, side], |row| row.get::<_, String>(0))
        .unwrap();
    rows.map(Result::unwrap).collect()
}

#[test]
fn create_node_merges_props_over_defaults() {
    let conn = setup();
    let service = GraphService::new(SqliteGraphRepository::try_new(&conn).unwrap());

    let bare = service
        .create_node("bare", "Bare", NodeKind::Event, &NodeProps::default())
        .unwrap();
    assert_eq!(bare.id, "bare");
    assert_eq!(bare.node_type, "Event");
    assert_eq!(bare.story, "None");
    assert!(!bare.synchronous);
    assert!(!bare.unreliable);

    let store = service
        .create_node(
            "store",
            "NeoDB",
            NodeKind::Persistence,
            &NodeProps {
                story: Some("Saves data".to_string()),
                synchronous: Some(true),
                unreliable: Some(true),
            },
        )
        .unwrap();
    assert_eq!(store.story, "Saves data");
    assert!(store.synchronous);
    assert!(store.unreliable);
}

#[test]
fn duplicate_node_id_is_rejected() {
    let conn = setup();
    let service = GraphService::new(SqliteGraphRepository::try_new(&conn).unwrap());
    seed_pair(&service);

    let err = service
        .create_node("ui", "Again", NodeKind::Event, &NodeProps::default())
        .unwrap_err();
    assert!(matches!(
        err,
        GraphServiceError::Repo(GraphRepoError::DuplicateNode(ref id)) if id == "ui"
    ));
    assert_eq!(service.get_node("ui").unwrap().unwrap().label, "UI");
}

#[test]
fn update_node_swaps_type_tag_and_keeps_unpatched_fields() {
    let conn = setup();
    let service = GraphService::new(SqliteGraphRepository::try_new(&conn).unwrap());
    seed_pair(&service);

    let first = service
        .update_node(
            "api",
            &NodePatch {
                node_type: Some(NodeKind::Event),
                story: Some("Now an event".to_string()),
                ..NodePatch::default()
            },
        )
        .unwrap();
    let second = service
        .update_node(
            "api",
            &NodePatch {
                node_type: Some(NodeKind::Persistence),
                ..NodePatch::default()
            },
        )
        .unwrap();

    assert_eq!(first.node_type, "Event");
    assert_eq!(second.node_type, "Persistence");
    assert_eq!(second.label, "Server");
    assert_eq!(second.story, "Now an event");

    let unchanged = service.update_node("api", &NodePatch::default()).unwrap();
    assert_eq!(unchanged, second);
}

#[test]
fn update_missing_node_is_not_found() {
    let conn = setup();
    let service = GraphService::new(SqliteGraphRepository::try_new(&conn).unwrap());

    let err = service
        .update_node(
            "ghost",
            &NodePatch {
                label: Some("boo".to_string()),
                ..NodePatch::default()
            },
        )
        .unwrap_err();
    assert!(matches!(
        err,
        GraphServiceError::Repo(GraphRepoError::NodeNotFound(_))
    ));
}

#[test]
fn create_link_writes_both_references_and_default_sequence() {
    let conn = setup();
    let service = GraphService::new(SqliteGraphRepository::try_new(&conn).unwrap());
    seed_pair(&service);

    let link = service
        .create_link(
            "populates",
            "api",
            "ui",
            LinkKind::Mutate,
            "Mutates",
            &LinkProps {
                story: Some("Populates the UI".to_string()),
                optional: None,
            },
        )
        .unwrap();

    assert_eq!(link.from_id, "api");
    assert_eq!(link.to_id, "ui");
    assert_eq!(link.link_type, "Mutate");
    assert_eq!(link.story, "Populates the UI");
    assert!(!link.optional);
    assert_eq!(link.sequence.seq, -1);
    assert_eq!(link.sequence.group, "None");
    assert_eq!(endpoint_refs(&conn, "populates", "x"), vec!["api"]);
    assert_eq!(endpoint_refs(&conn, "populates", "y"), vec!["ui"]);
}

#[test]
fn create_link_with_unresolved_endpoint_writes_nothing() {
    let conn = setup();
    let service = GraphService::new(SqliteGraphRepository::try_new(&conn).unwrap());
    seed_pair(&service);

    let err = service
        .create_link(
            "dangling",
            "api",
            "missing",
            LinkKind::Read,
            "Read",
            &LinkProps::default(),
        )
        .unwrap_err();
    assert!(matches!(
        err,
        GraphServiceError::Repo(GraphRepoError::UnresolvedEndpoint {
            side: Side::Y,
            ref node_id,
        }) if node_id == "missing"
    ));

    assert!(service.get_link("dangling").unwrap().is_none());
    let refs: i64 = conn
        .query_row("SELECT COUNT(*) FROM link_endpoints;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(refs, 0);
}

#[test]
fn invalid_ids_never_reach_the_store() {
    let conn = setup();
    let service = GraphService::new(SqliteGraphRepository::try_new(&conn).unwrap());

    let err = service
        .create_node("bad id", "x", NodeKind::Event, &NodeProps::default())
        .unwrap_err();
    assert!(matches!(err, GraphServiceError::InvalidId(_)));
    assert!(service.list_nodes().unwrap().is_empty());
}

#[test]
fn repointing_x_leaves_exactly_one_reference() {
    let conn = setup();
    let service = GraphService::new(SqliteGraphRepository::try_new(&conn).unwrap());
    seed_pair(&service);
    service
        .create_node("event", "Create Node", NodeKind::Event, &NodeProps::default())
        .unwrap();
    service
        .create_link(
            "trigger",
            "ui",
            "api",
            LinkKind::Trigger,
            "Triggers",
            &LinkProps::default(),
        )
        .unwrap();

    let updated = service
        .update_link(
            "trigger",
            &LinkPatch {
                x_id: Some("event".to_string()),
                link_type: Some(LinkKind::Read),
                ..LinkPatch::default()
            },
        )
        .unwrap();

    assert_eq!(updated.from_id, "event");
    assert_eq!(updated.to_id, "api");
    assert_eq!(updated.link_type, "Read");
    assert_eq!(endpoint_refs(&conn, "trigger", "x"), vec!["event"]);
    assert_eq!(endpoint_refs(&conn, "trigger", "y"), vec!["api"]);
}

#[test]
fn repointing_y_leaves_x_untouched() {
    let conn = setup();
    let service = GraphService::new(SqliteGraphRepository::try_new(&conn).unwrap());
    seed_pair(&service);
    service
        .create_node("store", "NeoDB", NodeKind::Persistence, &NodeProps::default())
        .unwrap();
    service
        .create_link(
            "mutates",
            "api",
            "ui",
            LinkKind::Mutate,
            "Mutates",
            &LinkProps::default(),
        )
        .unwrap();

    let updated = service
        .update_link(
            "mutates",
            &LinkPatch {
                y_id: Some("store".to_string()),
                ..LinkPatch::default()
            },
        )
        .unwrap();

    assert_eq!(updated.from_id, "api");
    assert_eq!(updated.to_id, "store");
    assert_eq!(endpoint_refs(&conn, "mutates", "x"), vec!["api"]);
    assert_eq!(endpoint_refs(&conn, "mutates", "y"), vec!["store"]);
}

#[test]
fn repointing_both_sides_in_one_patch() {
    let conn = setup();
    let service = GraphService::new(SqliteGraphRepository::try_new(&conn).unwrap());
    seed_pair(&service);
    for (id, kind) in [("event", NodeKind::Event), ("store", NodeKind::Persistence)] {
        service
            .create_node(id, id, kind, &NodeProps::default())
            .unwrap();
    }
    service
        .create_link(
            "trigger",
            "ui",
            "api",
            LinkKind::Trigger,
            "Triggers",
            &LinkProps::default(),
        )
        .unwrap();

    let updated = service
        .update_link(
            "trigger",
            &LinkPatch {
                x_id: Some("event".to_string()),
                y_id: Some("store".to_string()),
                ..LinkPatch::default()
            },
        )
        .unwrap();

    assert_eq!(updated.from_id, "event");
    assert_eq!(updated.to_id, "store");
    assert_eq!(endpoint_refs(&conn, "trigger", "x"), vec!["event"]);
    assert_eq!(endpoint_refs(&conn, "trigger", "y"), vec!["store"]);
    let total: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM link_endpoints WHERE link_id = 'trigger';",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(total, 2);
}

#[test]
fn empty_endpoint_ids_count_as_not_given() {
    let conn = setup();
    let service = GraphService::new(SqliteGraphRepository::try_new(&conn).unwrap());
    seed_pair(&service);
    service
        .create_link(
            "trigger",
            "ui",
            "api",
            LinkKind::Trigger,
            "Triggers",
            &LinkProps::default(),
        )
        .unwrap();

    let updated = service
        .update_link(
            "trigger",
            &LinkPatch {
                label: Some("Dispatches".to_string()),
                x_id: Some(String::new()),
                y_id: Some(String::new()),
                ..LinkPatch::default()
            },
        )
        .unwrap();

    assert_eq!(updated.label, "Dispatches");
    assert_eq!(endpoint_refs(&conn, "trigger", "x"), vec!["ui"]);
    assert_eq!(endpoint_refs(&conn, "trigger", "y"), vec!["api"]);
}

#[test]
fn repointing_to_unknown_node_leaves_link_unchanged() {
    let conn = setup();
    let service = GraphService::new(SqliteGraphRepository::try_new(&conn).unwrap());
    seed_pair(&service);
    service
        .create_link(
            "trigger",
            "ui",
            "api",
            LinkKind::Trigger,
            "Triggers",
            &LinkProps::default(),
        )
        .unwrap();

    let err = service
        .update_link(
            "trigger",
            &LinkPatch {
                label: Some("renamed".to_string()),
                y_id: Some("nowhere".to_string()),
                ..LinkPatch::default()
            },
        )
        .unwrap_err();
    assert!(matches!(
        err,
        GraphServiceError::Repo(GraphRepoError::UnresolvedEndpoint { side: Side::Y, .. })
    ));

    let link = service.get_link("trigger").unwrap().unwrap();
    assert_eq!(link.label, "Triggers");
    assert_eq!(link.to_id, "api");
}

#[test]
fn list_links_returns_every_link_normalized() {
    let conn = setup();
    let service = GraphService::new(SqliteGraphRepository::try_new(&conn).unwrap());
    seed_pair(&service);
    for (id, kind) in [("l1", LinkKind::Mutate), ("l2", LinkKind::Read)] {
        service
            .create_link(id, "api", "ui", kind, "link", &LinkProps::default())
            .unwrap();
    }

    let links = service.list_links().unwrap();
    let ids: Vec<&str> = links.iter().map(|link| link.id.as_str()).collect();
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&"l1"));
    assert!(ids.contains(&"l2"));
    assert!(links.iter().all(|link| link.sequence.seq == -1));
}

use diagram_core::db::open_db_in_memory;
use diagram_core::{
    GraphService, LinkEndPatch, LinkKind, LinkProps, NodeKind, NodeProps, SequencePatch, Side,
    SqliteGraphRepository,
};
use rusqlite::Connection;

fn count(conn: &Connection, sql: &str, link_id: &str) -> i64 {
    conn.query_row(sql, [link_id], |row| row.get(0)).unwrap()
}

fn dependents(conn: &Connection, link_id: &str) -> (i64, i64, i64) {
    (
        count(conn, "SELECT COUNT(*) FROM sequences WHERE link_id = ?1;", link_id),
        count(conn, "SELECT COUNT(*) FROM link_ends WHERE link_id = ?1;", link_id),
        count(
            conn,
            "SELECT COUNT(*) FROM link_endpoints WHERE link_id = ?1;",
            link_id,
        ),
    )
}

fn build_graph(service: &GraphService<SqliteGraphRepository<'_>>) {
    for (id, kind) in [
        ("ui", NodeKind::AbstractUserInterface),
        ("api", NodeKind::Api),
        ("store", NodeKind::Persistence),
    ] {
        service
            .create_node(id, id, kind, &NodeProps::default())
            .unwrap();
    }
    for (id, from, to, kind) in [
        ("api-ui", "api", "ui", LinkKind::Mutate),
        ("ui-api", "ui", "api", LinkKind::Trigger),
        ("api-store", "api", "store", LinkKind::Read),
    ] {
        service
            .create_link(id, from, to, kind, id, &LinkProps::default())
            .unwrap();
        service
            .merge_sequence(
                id,
                &SequencePatch {
                    seq: Some(1),
                    ..SequencePatch::default()
                },
            )
            .unwrap();
        for side in Side::BOTH {
            service
                .merge_link_end(id, side, &LinkEndPatch::default())
                .unwrap();
        }
    }
}

#[test]
fn delete_link_removes_sequence_and_both_ends() {
    let conn = open_db_in_memory().unwrap();
    let service = GraphService::new(SqliteGraphRepository::try_new(&conn).unwrap());
    build_graph(&service);
    assert_eq!(dependents(&conn, "api-ui"), (1, 2, 2));

    assert!(service.delete_link("api-ui").unwrap());

    assert!(service.get_link("api-ui").unwrap().is_none());
    assert_eq!(dependents(&conn, "api-ui"), (0, 0, 0));
    assert_eq!(dependents(&conn, "ui-api"), (1, 2, 2));
    assert_eq!(service.list_nodes().unwrap().len(), 3);
}

#[test]
fn delete_link_is_idempotent() {
    let conn = open_db_in_memory().unwrap();
    let service = GraphService::new(SqliteGraphRepository::try_new(&conn).unwrap());
    build_graph(&service);

    assert!(service.delete_link("api-store").unwrap());
    assert!(!service.delete_link("api-store").unwrap());
    assert!(!service.delete_sequence("api-store").unwrap());
    assert!(!service.delete_link_end("api-store", Side::X).unwrap());
}

#[test]
fn delete_node_sweeps_only_links_it_orphaned() {
    let conn = open_db_in_memory().unwrap();
    let service = GraphService::new(SqliteGraphRepository::try_new(&conn).unwrap());
    build_graph(&service);

    let deletion = service.delete_node("ui").unwrap();

    assert!(deletion.node_deleted);
    assert_eq!(
        deletion.swept_links,
        vec!["api-ui".to_string(), "ui-api".to_string()]
    );
    let remaining: Vec<String> = service
        .list_links()
        .unwrap()
        .into_iter()
        .map(|link| link.id)
        .collect();
    assert_eq!(remaining, vec!["api-store".to_string()]);
    for swept in ["api-ui", "ui-api"] {
        assert_eq!(dependents(&conn, swept), (0, 0, 0));
    }
    assert_eq!(dependents(&conn, "api-store"), (1, 2, 2));
}

#[test]
fn every_surviving_link_keeps_both_references() {
    let conn = open_db_in_memory().unwrap();
    let service = GraphService::new(SqliteGraphRepository::try_new(&conn).unwrap());
    build_graph(&service);

    service.delete_node("store").unwrap();

    let orphaned: i64 = conn
        .query_row(
            "SELECT COUNT(*)
             FROM links l
             WHERE (SELECT COUNT(*) FROM link_endpoints e WHERE e.link_id = l.id) <> 2;",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(orphaned, 0);
    assert_eq!(service.list_links().unwrap().len(), 2);
}

#[test]
fn self_loop_is_swept_once() {
    let conn = open_db_in_memory().unwrap();
    let service = GraphService::new(SqliteGraphRepository::try_new(&conn).unwrap());
    service
        .create_node("loop", "Loop", NodeKind::Event, &NodeProps::default())
        .unwrap();
    service
        .create_link(
            "self",
            "loop",
            "loop",
            LinkKind::Trigger,
            "Retry",
            &LinkProps::default(),
        )
        .unwrap();

    let deletion = service.delete_node("loop").unwrap();
    assert_eq!(deletion.swept_links, vec!["self".to_string()]);
    assert!(service.list_links().unwrap().is_empty());
}

#[test]
fn deleting_missing_node_succeeds_without_sweeping() {
    let conn = open_db_in_memory().unwrap();
    let service = GraphService::new(SqliteGraphRepository::try_new(&conn).unwrap());
    build_graph(&service);

    let deletion = service.delete_node("ghost").unwrap();
    assert!(!deletion.node_deleted);
    assert!(deletion.swept_links.is_empty());
    assert_eq!(service.list_links().unwrap().len(), 3);
}

use nodegraph_core::model::system_ids::*;
use nodegraph_core::service::bootstrap::{seed_system_nodes, BootstrapContext};
use nodegraph_core::{
    bootstrap_system_nodes, open_db, open_db_in_memory, FieldType, NodeService, PropertyValue,
    QueryDefinition, SqliteNodeRepository,
};
use rusqlite::Connection;
use std::thread;

fn node_and_property_counts(conn: &Connection) -> (i64, i64) {
    let nodes = conn
        .query_row("SELECT COUNT(*) FROM nodes;", [], |row| row.get(0))
        .unwrap();
    let properties = conn
        .query_row("SELECT COUNT(*) FROM node_properties;", [], |row| row.get(0))
        .unwrap();
    (nodes, properties)
}

fn duplicate_system_ids(conn: &Connection) -> i64 {
    conn.query_row(
        "SELECT COUNT(*) FROM (
            SELECT system_id FROM nodes
            WHERE system_id IS NOT NULL AND deleted_at IS NULL
            GROUP BY system_id HAVING COUNT(*) > 1
        );",
        [],
        |row| row.get(0),
    )
    .unwrap()
}

#[test]
fn bootstrap_twice_is_idempotent() {
    let conn = open_db_in_memory().unwrap();

    let first = bootstrap_system_nodes(&conn).unwrap();
    let counts_after_first = node_and_property_counts(&conn);
    let second = bootstrap_system_nodes(&conn).unwrap();

    assert!(!first.already_bootstrapped);
    assert_eq!(first.nodes_created, first.node_count);
    assert!(second.already_bootstrapped);
    assert_eq!(second.nodes_created, 0);
    assert_eq!(first.node_count, second.node_count);
    assert_eq!(first.property_count, second.property_count);
    assert_eq!(node_and_property_counts(&conn), counts_after_first);
    assert_eq!(duplicate_system_ids(&conn), 0);
}

#[test]
fn bootstrap_seeds_the_full_catalogue() {
    let conn = open_db_in_memory().unwrap();
    let summary = bootstrap_system_nodes(&conn).unwrap();
    // 3 bootstrap fields, 3 meta, 8 entity supertags, 17 fields, 4 queries.
    assert_eq!(summary.node_count, 35);

    let service = NodeService::new(SqliteNodeRepository::try_new(&conn).unwrap());
    for system_id in [
        FIELD_SUPERTAG,
        FIELD_EXTENDS,
        FIELD_FIELD_TYPE,
        SUPERTAG_SUPERTAG,
        SUPERTAG_FIELD,
        SUPERTAG_SYSTEM,
        SUPERTAG_ITEM,
        SUPERTAG_COMMAND,
        FIELD_RRULE,
        FIELD_EVALUATED_AT,
        QUERY_RECENT_ITEMS,
    ] {
        assert!(
            service.find_node(system_id).unwrap().is_some(),
            "{system_id} missing"
        );
    }
}

#[test]
fn bootstrap_fields_are_typed_and_self_described() {
    let conn = open_db_in_memory().unwrap();
    bootstrap_system_nodes(&conn).unwrap();
    let service = NodeService::new(SqliteNodeRepository::try_new(&conn).unwrap());

    let expectations = [
        (FIELD_SUPERTAG, FieldType::Nodes),
        (FIELD_EXTENDS, FieldType::Node),
        (FIELD_FIELD_TYPE, FieldType::Text),
        (FIELD_STATUS, FieldType::Text),
        (FIELD_PRIORITY, FieldType::Number),
        (FIELD_START_DATE, FieldType::Date),
        (FIELD_ALL_DAY, FieldType::Boolean),
        (FIELD_TAGS, FieldType::Nodes),
        (FIELD_QUERY_DEFINITION, FieldType::Json),
    ];
    for (system_id, expected) in expectations {
        let field = service.find_node(system_id).unwrap().unwrap();
        assert_eq!(service.field_type(field.id).unwrap(), Some(expected), "{system_id}");

        let assembled = service.assemble_node(field.id).unwrap().unwrap();
        assert!(assembled.has_supertag(SUPERTAG_FIELD), "{system_id}");
        assert!(assembled.has_supertag(SUPERTAG_SYSTEM), "{system_id}");
    }

    let meta = service.find_node(SUPERTAG_SUPERTAG).unwrap().unwrap();
    let assembled = service.assemble_node(meta.id).unwrap().unwrap();
    assert_eq!(assembled.primary_supertag().unwrap().id, meta.id);
}

#[test]
fn entity_supertags_declare_their_parents() {
    let conn = open_db_in_memory().unwrap();
    bootstrap_system_nodes(&conn).unwrap();
    let service = NodeService::new(SqliteNodeRepository::try_new(&conn).unwrap());
    let item = service.find_node(SUPERTAG_ITEM).unwrap().unwrap();

    for child in [SUPERTAG_TOOL, SUPERTAG_REPO, SUPERTAG_TASK, SUPERTAG_EVENT] {
        let supertag = service.find_node(child).unwrap().unwrap();
        assert_eq!(
            service.get_property(supertag.id, FIELD_EXTENDS).unwrap(),
            Some(PropertyValue::Node(item.id)),
            "{child}"
        );
    }
    for root in [SUPERTAG_ITEM, SUPERTAG_TAG, SUPERTAG_COMMAND, SUPERTAG_QUERY] {
        let supertag = service.find_node(root).unwrap().unwrap();
        assert_eq!(service.get_property(supertag.id, FIELD_EXTENDS).unwrap(), None);
    }
}

#[test]
fn builtin_queries_hold_valid_definitions() {
    let conn = open_db_in_memory().unwrap();
    bootstrap_system_nodes(&conn).unwrap();
    let service = NodeService::new(SqliteNodeRepository::try_new(&conn).unwrap());

    for system_id in [
        QUERY_INBOX_PENDING,
        QUERY_OPEN_TASKS,
        QUERY_UPCOMING_EVENTS,
        QUERY_RECENT_ITEMS,
    ] {
        let node = service.find_node(system_id).unwrap().unwrap();
        let assembled = service.assemble_node(node.id).unwrap().unwrap();
        assert!(assembled.has_supertag(SUPERTAG_QUERY));
        let definition: QueryDefinition = service.load_query_definition(node.id).unwrap().unwrap();
        assert!(!definition.filters.is_empty(), "{system_id}");
    }

    let inbox = service.find_node(QUERY_INBOX_PENDING).unwrap().unwrap();
    assert_eq!(inbox.content, "Inbox: Pending Items");
}

#[test]
fn rerun_keeps_locally_edited_query_definitions() {
    let conn = open_db_in_memory().unwrap();
    bootstrap_system_nodes(&conn).unwrap();
    let inbox_id = {
        let service = NodeService::new(SqliteNodeRepository::try_new(&conn).unwrap());
        let inbox = service.find_node(QUERY_INBOX_PENDING).unwrap().unwrap();
        let edited = QueryDefinition::default().limit(5);
        service.save_query_definition(inbox.id, &edited).unwrap();
        inbox.id
    };

    bootstrap_system_nodes(&conn).unwrap();

    let service = NodeService::new(SqliteNodeRepository::try_new(&conn).unwrap());
    let definition = service.load_query_definition(inbox_id).unwrap().unwrap();
    assert_eq!(definition.limit, 5);
}

#[test]
fn bootstrap_recreates_a_soft_deleted_system_node() {
    let conn = open_db_in_memory().unwrap();
    bootstrap_system_nodes(&conn).unwrap();
    {
        let service = NodeService::new(SqliteNodeRepository::try_new(&conn).unwrap());
        let color = service.find_node(FIELD_COLOR).unwrap().unwrap();
        service.delete_node(color.id).unwrap();
    }

    let summary = bootstrap_system_nodes(&conn).unwrap();

    assert_eq!(summary.nodes_created, 1);
    assert!(!summary.already_bootstrapped);
    assert_eq!(duplicate_system_ids(&conn), 0);
}

#[test]
fn context_exposes_resolved_ids() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteNodeRepository::try_new(&conn).unwrap();
    let mut context = BootstrapContext::new();

    let summary = seed_system_nodes(&repo, &mut context).unwrap();

    assert_eq!(context.len(), summary.node_count);
    let status = NodeService::new(&repo).find_node(FIELD_STATUS).unwrap().unwrap();
    assert_eq!(context.id(FIELD_STATUS), Some(status.id));
    assert_eq!(context.id("field:unknown"), None);
}

#[test]
fn concurrent_bootstraps_do_not_duplicate_system_nodes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("race.db");
    drop(open_db(&path).unwrap());

    let handles = (0..4)
        .map(|_| {
            let path = path.clone();
            thread::spawn(move || {
                let conn = open_db(&path).unwrap();
                bootstrap_system_nodes(&conn).unwrap()
            })
        })
        .collect::<Vec<_>>();
    let summaries = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect::<Vec<_>>();

    let conn = open_db(&path).unwrap();
    assert_eq!(duplicate_system_ids(&conn), 0);
    let created: usize = summaries.iter().map(|summary| summary.nodes_created).sum();
    assert_eq!(created, summaries[0].node_count);
    assert_eq!(
        summaries
            .iter()
            .filter(|summary| !summary.already_bootstrapped)
            .count(),
        1
    );
}

use nodegraph_core::model::system_ids::{
    FIELD_DESCRIPTION, FIELD_PRIORITY, FIELD_STATUS, FIELD_TAGS, SUPERTAG_FIELD, SUPERTAG_SUPERTAG,
    SUPERTAG_TAG, SUPERTAG_TASK,
};
use nodegraph_core::{
    assemble_node, bootstrap_system_nodes, open_db_in_memory, Assembler, NewNode,
    NodeRepository, NodeService, PropertyValue, SqliteNodeRepository,
};
use rusqlite::Connection;

fn setup() -> Connection {
    let conn = open_db_in_memory().unwrap();
    bootstrap_system_nodes(&conn).unwrap();
    conn
}

#[test]
fn assembled_node_exposes_properties_by_field_name() {
    let conn = setup();
    let service = NodeService::new(SqliteNodeRepository::try_new(&conn).unwrap());
    let urgent = service
        .create_node(&NewNode::new("urgent").supertag(SUPERTAG_TAG))
        .unwrap();
    let later = service
        .create_node(&NewNode::new("later").supertag(SUPERTAG_TAG))
        .unwrap();
    let task = service
        .create_node(&NewNode::new("Ship release").supertag(SUPERTAG_TASK))
        .unwrap();
    service.set_property(task, FIELD_STATUS, "open", None).unwrap();
    service.set_property(task, FIELD_PRIORITY, 2_i64, None).unwrap();
    service.set_property(task, FIELD_TAGS, urgent, None).unwrap();
    service.set_property(task, FIELD_TAGS, later, None).unwrap();

    let assembled = service.assemble_node(task).unwrap().unwrap();

    assert_eq!(assembled.content, "Ship release");
    assert_eq!(assembled.text("status"), Some("open"));
    assert_eq!(assembled.first_value("priority"), Some(&PropertyValue::Number(2.0)));
    assert_eq!(
        assembled.values_for_field(FIELD_TAGS),
        &[PropertyValue::Node(urgent), PropertyValue::Node(later)]
    );
    assert_eq!(assembled.primary_supertag().unwrap().name(), "task");
    assert!(assembled.values("description").is_empty());
}

#[test]
fn deleted_and_unknown_nodes_assemble_to_none() {
    let conn = setup();
    let repo = SqliteNodeRepository::try_new(&conn).unwrap();
    let service = NodeService::new(&repo);
    let id = service.create_node(&NewNode::new("gone")).unwrap();
    service.delete_node(id).unwrap();

    assert_eq!(assemble_node(&repo, id).unwrap(), None);
    assert_eq!(assemble_node(&repo, uuid::Uuid::new_v4()).unwrap(), None);
}

#[test]
fn undecodable_rows_are_skipped() {
    let conn = setup();
    let repo = SqliteNodeRepository::try_new(&conn).unwrap();
    let service = NodeService::new(&repo);
    let node = service.create_node(&NewNode::new("messy")).unwrap();
    service.set_property(node, FIELD_STATUS, "kept", None).unwrap();
    let description = service.find_node(FIELD_DESCRIPTION).unwrap().unwrap();
    repo.insert_property(node, description.id, "{not json", None).unwrap();

    let assembled = service.assemble_node(node).unwrap().unwrap();

    assert_eq!(assembled.text("status"), Some("kept"));
    assert!(assembled.values("description").is_empty());
}

#[test]
fn values_of_deleted_fields_are_dropped() {
    let conn = setup();
    let service = NodeService::new(SqliteNodeRepository::try_new(&conn).unwrap());
    let mood = service
        .create_node(
            &NewNode::new("Mood")
                .system_id("field:mood")
                .supertag(SUPERTAG_FIELD),
        )
        .unwrap();
    let node = service.create_node(&NewNode::new("diary")).unwrap();
    service.set_property(node, "field:mood", "calm", None).unwrap();
    assert_eq!(
        service.assemble_node(node).unwrap().unwrap().text("mood"),
        Some("calm")
    );

    service.delete_node(mood).unwrap();

    let assembled = service.assemble_node(node).unwrap().unwrap();
    assert!(assembled.properties.get("mood").is_none());
}

#[test]
fn deleted_supertags_are_dropped_from_the_list() {
    let conn = setup();
    let service = NodeService::new(SqliteNodeRepository::try_new(&conn).unwrap());
    let custom = service
        .create_node(
            &NewNode::new("Project")
                .system_id("supertag:project")
                .supertag(SUPERTAG_SUPERTAG),
        )
        .unwrap();
    let node = service
        .create_node(
            &NewNode::new("launch")
                .supertag("supertag:project")
                .supertag(SUPERTAG_TASK),
        )
        .unwrap();
    assert_eq!(
        service.assemble_node(node).unwrap().unwrap().supertags[0].id,
        custom
    );

    service.delete_node(custom).unwrap();

    let assembled = service.assemble_node(node).unwrap().unwrap();
    assert_eq!(assembled.supertags.len(), 1);
    assert_eq!(assembled.primary_supertag().unwrap().name(), "task");
}

#[test]
fn field_without_system_id_is_keyed_by_content() {
    let conn = setup();
    let service = NodeService::new(SqliteNodeRepository::try_new(&conn).unwrap());
    let field = service
        .create_node(&NewNode::new("Energy").supertag(SUPERTAG_FIELD))
        .unwrap();
    let node = service.create_node(&NewNode::new("monday")).unwrap();
    service
        .set_property(node, &field.to_string(), "high", None)
        .unwrap();

    let assembled = service.assemble_node(node).unwrap().unwrap();

    assert_eq!(assembled.text("Energy"), Some("high"));
    assert_eq!(assembled.field_name_for_id(field), Some("Energy"));
}

#[test]
fn assembler_reuses_lookups_across_nodes() {
    let conn = setup();
    let repo = SqliteNodeRepository::try_new(&conn).unwrap();
    let service = NodeService::new(&repo);
    let first = service
        .create_node(&NewNode::new("one").supertag(SUPERTAG_TASK))
        .unwrap();
    let second = service
        .create_node(&NewNode::new("two").supertag(SUPERTAG_TASK))
        .unwrap();
    let missing = uuid::Uuid::new_v4();

    let mut assembler = Assembler::new(&repo);
    let nodes = assembler.assemble_nodes(&[second, missing, first]).unwrap();

    let ids = nodes.iter().map(|node| node.id).collect::<Vec<_>>();
    assert_eq!(ids, vec![second, first]);
    assert!(nodes.iter().all(|node| node.has_supertag(SUPERTAG_TASK)));
}

#[test]
fn colliding_field_names_keep_values_apart() {
    let conn = setup();
    let service = NodeService::new(SqliteNodeRepository::try_new(&conn).unwrap());
    let homonym = service
        .create_node(&NewNode::new("status").supertag(SUPERTAG_FIELD))
        .unwrap();
    let status = service.find_node(FIELD_STATUS).unwrap().unwrap().id;
    let node = service.create_node(&NewNode::new("both")).unwrap();
    service
        .set_property(node, &homonym.to_string(), "pending", None)
        .unwrap();
    service.set_property(node, FIELD_STATUS, "open", None).unwrap();

    let assembled = service.assemble_node(node).unwrap().unwrap();

    assert_eq!(
        assembled.values("status"),
        &[PropertyValue::String("open".to_string())]
    );
    assert_eq!(assembled.field_name_for_id(status), Some("status"));
    assert_eq!(
        assembled.values_by_field_id(homonym),
        &[PropertyValue::String("pending".to_string())]
    );
    assert_eq!(
        assembled.values_by_field_id(status),
        &[PropertyValue::String("open".to_string())]
    );
}

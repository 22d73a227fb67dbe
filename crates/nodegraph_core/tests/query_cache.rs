use nodegraph_core::model::system_ids::{
    FIELD_QUERY_DEFINITION, FIELD_STATUS, QUERY_INBOX_PENDING, QUERY_OPEN_TASKS, SUPERTAG_QUERY,
    SUPERTAG_TASK, SUPERTAG_TOOL,
};
use nodegraph_core::{
    bootstrap_system_nodes, open_db_in_memory, Filter, NewNode, NodeId, NodeRepository,
    NodeService, QueryDefinition, QueryError, RepoError, SqliteNodeRepository,
};
use rusqlite::Connection;

fn setup() -> Connection {
    let conn = open_db_in_memory().unwrap();
    bootstrap_system_nodes(&conn).unwrap();
    conn
}

fn query_node<R: NodeRepository>(service: &NodeService<R>, definition: &QueryDefinition) -> NodeId {
    let id = service
        .create_node(&NewNode::new("My tasks").supertag(SUPERTAG_QUERY))
        .unwrap();
    service.save_query_definition(id, definition).unwrap();
    id
}

#[test]
fn refresh_writes_the_cache_and_saving_drops_it() {
    let conn = setup();
    let service = NodeService::new(SqliteNodeRepository::try_new(&conn).unwrap());
    let first = service
        .create_node(&NewNode::new("one").supertag(SUPERTAG_TASK))
        .unwrap();
    let second = service
        .create_node(&NewNode::new("two").supertag(SUPERTAG_TASK))
        .unwrap();
    let query = query_node(
        &service,
        &QueryDefinition::new(vec![Filter::supertag(SUPERTAG_TASK)]),
    );
    assert_eq!(service.read_result_cache(query).unwrap(), None);

    let page = service.evaluate_saved_query(query, false).unwrap();
    assert_eq!(page.node_ids(), vec![first, second]);
    assert_eq!(service.read_result_cache(query).unwrap(), None);

    let page = service.evaluate_saved_query(query, true).unwrap();
    let cached = service.read_result_cache(query).unwrap().unwrap();
    assert_eq!(cached.node_ids, page.node_ids());
    assert!(cached.evaluated_at > 0);

    service
        .save_query_definition(query, &QueryDefinition::new(vec![Filter::supertag(SUPERTAG_TOOL)]))
        .unwrap();
    assert_eq!(service.read_result_cache(query).unwrap(), None);
    assert_eq!(
        service.load_query_definition(query).unwrap().unwrap().filters,
        vec![Filter::supertag(SUPERTAG_TOOL)]
    );
}

#[test]
fn cache_is_not_refreshed_implicitly() {
    let conn = setup();
    let service = NodeService::new(SqliteNodeRepository::try_new(&conn).unwrap());
    let first = service
        .create_node(&NewNode::new("one").supertag(SUPERTAG_TASK))
        .unwrap();
    let query = query_node(
        &service,
        &QueryDefinition::new(vec![Filter::supertag(SUPERTAG_TASK)]),
    );
    service.evaluate_saved_query(query, true).unwrap();

    service
        .create_node(&NewNode::new("two").supertag(SUPERTAG_TASK))
        .unwrap();

    let cached = service.read_result_cache(query).unwrap().unwrap();
    assert_eq!(cached.node_ids, vec![first]);
    assert_eq!(service.evaluate_saved_query(query, false).unwrap().total_count, 2);
}

#[test]
fn invalidate_is_idempotent() {
    let conn = setup();
    let service = NodeService::new(SqliteNodeRepository::try_new(&conn).unwrap());
    let query = query_node(
        &service,
        &QueryDefinition::new(vec![Filter::supertag(SUPERTAG_TASK)]),
    );
    service.evaluate_saved_query(query, true).unwrap();

    service.invalidate_result_cache(query).unwrap();
    service.invalidate_result_cache(query).unwrap();

    assert_eq!(service.read_result_cache(query).unwrap(), None);
}

#[test]
fn definitions_stored_as_json_text_are_accepted() {
    let conn = setup();
    let service = NodeService::new(SqliteNodeRepository::try_new(&conn).unwrap());
    let task = service
        .create_node(&NewNode::new("one").supertag(SUPERTAG_TASK))
        .unwrap();
    let query = service
        .create_node(&NewNode::new("raw").supertag(SUPERTAG_QUERY))
        .unwrap();
    service
        .set_property(
            query,
            FIELD_QUERY_DEFINITION,
            r#"{"filters":[{"type":"supertag","supertagSystemId":"supertag:task"}]}"#,
            None,
        )
        .unwrap();

    let page = service.evaluate_saved_query(query, false).unwrap();
    assert_eq!(page.node_ids(), vec![task]);
}

#[test]
fn missing_definition_and_deleted_node_are_errors() {
    let conn = setup();
    let service = NodeService::new(SqliteNodeRepository::try_new(&conn).unwrap());
    let empty = service
        .create_node(&NewNode::new("empty").supertag(SUPERTAG_QUERY))
        .unwrap();
    assert!(matches!(
        service.evaluate_saved_query(empty, false),
        Err(QueryError::InvalidDefinition(_))
    ));
    assert_eq!(service.load_query_definition(empty).unwrap(), None);

    let query = query_node(
        &service,
        &QueryDefinition::new(vec![Filter::supertag(SUPERTAG_TASK)]),
    );
    service.delete_node(query).unwrap();
    assert!(matches!(
        service.evaluate_saved_query(query, false),
        Err(QueryError::Repo(RepoError::NotFound(id))) if id == query
    ));
}

#[test]
fn invalid_definitions_are_not_saved() {
    let conn = setup();
    let service = NodeService::new(SqliteNodeRepository::try_new(&conn).unwrap());
    let query = service
        .create_node(&NewNode::new("bad").supertag(SUPERTAG_QUERY))
        .unwrap();

    let result = service.save_query_definition(query, &QueryDefinition::default().limit(0));

    assert!(matches!(result, Err(QueryError::InvalidDefinition(_))));
    assert_eq!(service.load_query_definition(query).unwrap(), None);
}

#[test]
fn builtin_queries_evaluate_against_user_data() {
    let conn = setup();
    let service = NodeService::new(SqliteNodeRepository::try_new(&conn).unwrap());
    let pending = service
        .create_node(&NewNode::new("review PR").supertag(SUPERTAG_TASK))
        .unwrap();
    service.set_property(pending, FIELD_STATUS, "pending", None).unwrap();
    let done = service
        .create_node(&NewNode::new("old chore").supertag(SUPERTAG_TASK))
        .unwrap();
    service.set_property(done, FIELD_STATUS, "done", None).unwrap();

    let open_tasks = service.find_node(QUERY_OPEN_TASKS).unwrap().unwrap();
    let page = service.evaluate_saved_query(open_tasks.id, false).unwrap();
    assert_eq!(page.node_ids(), vec![pending]);

    let inbox = service.find_node(QUERY_INBOX_PENDING).unwrap().unwrap();
    let page = service.evaluate_saved_query(inbox.id, true).unwrap();
    assert_eq!(page.node_ids(), vec![pending]);
    assert_eq!(
        service.read_result_cache(inbox.id).unwrap().unwrap().node_ids,
        vec![pending]
    );
}

use nodegraph_core::model::system_ids::{
    FIELD_COLOR, FIELD_COMMAND, FIELD_DESCRIPTION, FIELD_EXTENDS, FIELD_STATUS, FIELD_URL,
    SUPERTAG_COMMAND, SUPERTAG_ITEM, SUPERTAG_SUPERTAG, SUPERTAG_TAG, SUPERTAG_TOOL,
};
use nodegraph_core::{
    bootstrap_system_nodes, list_commands, list_commands_for_item, list_items, list_tags,
    open_db_in_memory, Command, Item, NewNode, NodeService, SqliteNodeRepository, Tag,
};
use rusqlite::Connection;

fn setup() -> Connection {
    let conn = open_db_in_memory().unwrap();
    bootstrap_system_nodes(&conn).unwrap();
    conn
}

#[test]
fn items_project_primary_type_and_text_fields() {
    let conn = setup();
    let repo = SqliteNodeRepository::try_new(&conn).unwrap();
    let service = NodeService::new(&repo);
    let tool = service
        .create_node(
            &NewNode::new("ripgrep")
                .supertag(SUPERTAG_TOOL)
                .supertag(SUPERTAG_ITEM),
        )
        .unwrap();
    service.set_property(tool, FIELD_STATUS, "active", None).unwrap();
    service
        .set_property(tool, FIELD_URL, "https://github.com/BurntSushi/ripgrep", None)
        .unwrap();
    service
        .set_property(tool, FIELD_DESCRIPTION, "fast grep", None)
        .unwrap();

    let items = list_items(&repo).unwrap();

    assert_eq!(items.len(), 1);
    let item = &items[0];
    assert_eq!(item.id, tool);
    assert_eq!(item.title, "ripgrep");
    assert_eq!(item.item_type, "tool");
    assert_eq!(item.supertags, vec!["tool".to_string(), "item".to_string()]);
    assert_eq!(item.status.as_deref(), Some("active"));
    assert_eq!(item.url.as_deref(), Some("https://github.com/BurntSushi/ripgrep"));
    assert_eq!(item.description.as_deref(), Some("fast grep"));

    let json = serde_json::to_value(item).unwrap();
    assert_eq!(json["itemType"], "tool");
}

#[test]
fn list_items_includes_runtime_subtypes() {
    let conn = setup();
    let repo = SqliteNodeRepository::try_new(&conn).unwrap();
    let service = NodeService::new(&repo);
    let item = service.find_node(SUPERTAG_ITEM).unwrap().unwrap();
    let book = service
        .create_node(
            &NewNode::new("Book")
                .system_id("supertag:book")
                .supertag(SUPERTAG_SUPERTAG),
        )
        .unwrap();
    service.set_property(book, FIELD_EXTENDS, item.id, None).unwrap();
    let novel = service
        .create_node(&NewNode::new("Dune").supertag("supertag:book"))
        .unwrap();
    service
        .create_node(&NewNode::new("not an item").supertag(SUPERTAG_TAG))
        .unwrap();

    let items = list_items(&repo).unwrap();

    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id, novel);
    assert_eq!(items[0].item_type, "book");

    let assembled = service.assemble_node(novel).unwrap().unwrap();
    assert_eq!(Item::from_assembled(&assembled), None);
}

#[test]
fn tags_carry_their_color() {
    let conn = setup();
    let repo = SqliteNodeRepository::try_new(&conn).unwrap();
    let service = NodeService::new(&repo);
    let red = service
        .create_node(&NewNode::new("urgent").supertag(SUPERTAG_TAG))
        .unwrap();
    service.set_property(red, FIELD_COLOR, "#ff0000", None).unwrap();
    let plain = service
        .create_node(&NewNode::new("someday").supertag(SUPERTAG_TAG))
        .unwrap();

    let tags = list_tags(&repo).unwrap();

    assert_eq!(
        tags,
        vec![
            Tag {
                id: red,
                name: "urgent".to_string(),
                color: Some("#ff0000".to_string()),
            },
            Tag {
                id: plain,
                name: "someday".to_string(),
                color: None,
            },
        ]
    );
}

#[test]
fn commands_belong_to_their_owning_item() {
    let conn = setup();
    let repo = SqliteNodeRepository::try_new(&conn).unwrap();
    let service = NodeService::new(&repo);
    let cargo = service
        .create_node(&NewNode::new("cargo").supertag(SUPERTAG_TOOL))
        .unwrap();
    let git = service
        .create_node(&NewNode::new("git").supertag(SUPERTAG_TOOL))
        .unwrap();
    let build = service
        .create_node(
            &NewNode::new("Build")
                .owner(cargo)
                .supertag(SUPERTAG_COMMAND),
        )
        .unwrap();
    service
        .set_property(build, FIELD_COMMAND, "cargo build --release", None)
        .unwrap();
    let status = service
        .create_node(&NewNode::new("Status").owner(git).supertag(SUPERTAG_COMMAND))
        .unwrap();

    assert_eq!(list_commands(&repo).unwrap().len(), 2);

    let cargo_commands = list_commands_for_item(&repo, cargo).unwrap();
    assert_eq!(
        cargo_commands,
        vec![Command {
            id: build,
            title: "Build".to_string(),
            item_id: Some(cargo),
            command: Some("cargo build --release".to_string()),
            description: None,
        }]
    );
    let git_commands = list_commands_for_item(&repo, git).unwrap();
    assert_eq!(git_commands.len(), 1);
    assert_eq!(git_commands[0].id, status);
}

#[test]
fn projections_reject_nodes_of_another_type() {
    let conn = setup();
    let repo = SqliteNodeRepository::try_new(&conn).unwrap();
    let service = NodeService::new(&repo);
    let tag = service
        .create_node(&NewNode::new("label").supertag(SUPERTAG_TAG))
        .unwrap();
    let assembled = service.assemble_node(tag).unwrap().unwrap();

    assert!(Item::from_assembled(&assembled).is_none());
    assert!(Command::from_assembled(&assembled).is_none());
    assert!(Tag::from_assembled(&assembled).is_some());
}

//! Well-known `systemId` handles.
//!
//! Downstream features hardcode these strings, so they must stay bit-exact:
//! `field:<name>`, `supertag:<name>`, `item:<id>`, `query:<name>`.

pub const FIELD_PREFIX: &str = "field:";
pub const SUPERTAG_PREFIX: &str = "supertag:";
pub const ITEM_PREFIX: &str = "item:";
pub const QUERY_PREFIX: &str = "query:";

// Bootstrap fields. These exist before anything can be tagged.
pub const FIELD_SUPERTAG: &str = "field:supertag";
pub const FIELD_EXTENDS: &str = "field:extends";
pub const FIELD_FIELD_TYPE: &str = "field:fieldType";

pub const FIELD_STATUS: &str = "field:status";
pub const FIELD_DESCRIPTION: &str = "field:description";
pub const FIELD_URL: &str = "field:url";
pub const FIELD_COLOR: &str = "field:color";
pub const FIELD_ICON: &str = "field:icon";
pub const FIELD_PRIORITY: &str = "field:priority";
pub const FIELD_DUE_DATE: &str = "field:due_date";
pub const FIELD_START_DATE: &str = "field:start_date";
pub const FIELD_END_DATE: &str = "field:end_date";
pub const FIELD_ALL_DAY: &str = "field:all_day";
pub const FIELD_LOCATION: &str = "field:location";
pub const FIELD_RRULE: &str = "field:rrule";
pub const FIELD_COMMAND: &str = "field:command";
pub const FIELD_TAGS: &str = "field:tags";
pub const FIELD_QUERY_DEFINITION: &str = "field:queryDefinition";
pub const FIELD_RESULT_CACHE: &str = "field:resultCache";
pub const FIELD_EVALUATED_AT: &str = "field:evaluatedAt";

pub const SUPERTAG_SUPERTAG: &str = "supertag:supertag";
pub const SUPERTAG_FIELD: &str = "supertag:field";
pub const SUPERTAG_SYSTEM: &str = "supertag:system";

pub const SUPERTAG_ITEM: &str = "supertag:item";
pub const SUPERTAG_TOOL: &str = "supertag:tool";
pub const SUPERTAG_REPO: &str = "supertag:repo";
pub const SUPERTAG_TAG: &str = "supertag:tag";
pub const SUPERTAG_TASK: &str = "supertag:task";
pub const SUPERTAG_EVENT: &str = "supertag:event";
pub const SUPERTAG_COMMAND: &str = "supertag:command";
pub const SUPERTAG_QUERY: &str = "supertag:query";

pub const QUERY_INBOX_PENDING: &str = "query:inbox-pending";
pub const QUERY_OPEN_TASKS: &str = "query:open-tasks";
pub const QUERY_UPCOMING_EVENTS: &str = "query:upcoming-events";
pub const QUERY_RECENT_ITEMS: &str = "query:recent-items";

pub fn field_system_id(name: &str) -> String {
    format!("{FIELD_PREFIX}{name}")
}

pub fn supertag_system_id(name: &str) -> String {
    format!("{SUPERTAG_PREFIX}{name}")
}

/// Handle for an entity instance imported from an external id.
pub fn item_system_id(external_id: &str) -> String {
    format!("{ITEM_PREFIX}{external_id}")
}

pub fn query_system_id(name: &str) -> String {
    format!("{QUERY_PREFIX}{name}")
}

/// Returns the bare name when `system_id` carries the given namespace.
pub fn strip_namespace<'a>(system_id: &'a str, prefix: &str) -> Option<&'a str> {
    system_id
        .strip_prefix(prefix)
        .filter(|name| !name.is_empty())
}

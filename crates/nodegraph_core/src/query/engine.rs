//! Query evaluation over assembled nodes.
//!
//! # Responsibility
//! - Evaluate a [`QueryDefinition`] against every live node.
//! - Apply the optional sort and the result cap.
//!
//! # Invariants
//! - Evaluate-then-filter: each candidate is assembled, then tested.
//! - A filter naming an unknown field, supertag or target is false.
//! - Memoized lookups live in one `EvalContext` per evaluation only.
//! - `total_count` counts matches before `limit` is applied.

use crate::db::now_epoch_ms;
use crate::model::assembled::AssembledNode;
use crate::model::node::NodeId;
use crate::model::system_ids::FIELD_SUPERTAG;
use crate::model::value::PropertyValue;
use crate::query::definition::{
    parse_date_ms, Filter, PropertyOp, QueryDefinition, QueryResult, QuerySort, RelationType,
    SortDirection, TemporalField, TemporalOp,
};
use crate::repo::node_repo::{NodeRepository, RepoResult};
use crate::service::assembler::Assembler;
use crate::service::inheritance::descendant_supertags;
use log::info;
use serde::Serialize;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::time::Instant;

const DAY_MS: i64 = 86_400_000;

/// One evaluation result page.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryPage {
    pub nodes: Vec<AssembledNode>,
    /// Matches before `limit` was applied.
    pub total_count: usize,
}

impl QueryPage {
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.iter().map(|node| node.id).collect()
    }
}

/// Query evaluator bound to one repository.
pub struct QueryEngine<'r, R: NodeRepository + ?Sized> {
    repo: &'r R,
    now_ms: Option<i64>,
}

impl<'r, R: NodeRepository + ?Sized> QueryEngine<'r, R> {
    pub fn new(repo: &'r R) -> Self {
        Self { repo, now_ms: None }
    }

    /// Pins "now" for `within` filters instead of reading the clock.
    pub fn with_now(mut self, now_ms: i64) -> Self {
        self.now_ms = Some(now_ms);
        self
    }

    pub fn evaluate(&self, definition: &QueryDefinition) -> QueryResult<QueryPage> {
        definition.validate()?;
        let started_at = Instant::now();

        let candidates = Assembler::new(self.repo).assemble_all()?;
        let candidate_count = candidates.len();
        let mut context = EvalContext::new(
            self.repo,
            &candidates,
            self.now_ms.unwrap_or_else(now_epoch_ms),
        );

        let mut matched = Vec::new();
        for (position, node) in candidates.iter().enumerate() {
            if context.matches_all(&definition.filters, node)? {
                matched.push(position);
            }
        }
        let total_count = matched.len();

        if let Some(sort) = &definition.sort {
            context.sort_positions(&mut matched, sort)?;
        }
        matched.truncate(definition.limit);
        let nodes = matched
            .into_iter()
            .map(|position| candidates[position].clone())
            .collect::<Vec<_>>();

        info!(
            "event=query_eval module=query status=ok filters={} candidates={} matched={} returned={} duration_ms={}",
            definition.filters.len(),
            candidate_count,
            total_count,
            nodes.len(),
            started_at.elapsed().as_millis()
        );

        Ok(QueryPage { nodes, total_count })
    }
}

/// Evaluates a definition with a call-scoped engine.
pub fn evaluate_query<R: NodeRepository + ?Sized>(
    repo: &R,
    definition: &QueryDefinition,
) -> QueryResult<QueryPage> {
    QueryEngine::new(repo).evaluate(definition)
}

/// Per-evaluation memo of resolved handles.
struct EvalContext<'a, R: NodeRepository + ?Sized> {
    repo: &'a R,
    candidates: &'a [AssembledNode],
    by_id: HashMap<NodeId, usize>,
    now_ms: i64,
    fields: HashMap<String, Option<NodeId>>,
    targets: HashMap<String, Option<NodeId>>,
    supertag_sets: HashMap<(String, bool), Option<HashSet<NodeId>>>,
    backlinks: HashMap<Option<NodeId>, HashSet<NodeId>>,
    supertag_field: Option<Option<NodeId>>,
}

impl<'a, R: NodeRepository + ?Sized> EvalContext<'a, R> {
    fn new(repo: &'a R, candidates: &'a [AssembledNode], now_ms: i64) -> Self {
        Self {
            repo,
            candidates,
            by_id: candidates
                .iter()
                .enumerate()
                .map(|(position, node)| (node.id, position))
                .collect(),
            now_ms,
            fields: HashMap::new(),
            targets: HashMap::new(),
            supertag_sets: HashMap::new(),
            backlinks: HashMap::new(),
            supertag_field: None,
        }
    }

    fn matches_all(&mut self, filters: &[Filter], node: &AssembledNode) -> RepoResult<bool> {
        for filter in filters {
            if !self.matches(filter, node)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn matches(&mut self, filter: &Filter, node: &AssembledNode) -> RepoResult<bool> {
        match filter {
            Filter::Supertag {
                supertag_system_id,
                include_inherited,
            } => {
                let Some(accepted) = self.supertag_set(supertag_system_id, *include_inherited)?
                else {
                    return Ok(false);
                };
                Ok(node.supertags.iter().any(|tag| accepted.contains(&tag.id)))
            }
            Filter::Property {
                field_system_id,
                op,
                value,
            } => {
                let Some(field_id) = self.field(field_system_id)? else {
                    return Ok(false);
                };
                Ok(property_matches(
                    &flatten(node.values_by_field_id(field_id)),
                    *op,
                    value,
                ))
            }
            Filter::Content {
                query,
                case_sensitive,
            } => Ok(if *case_sensitive {
                node.content.contains(query.as_str())
            } else {
                node.content.to_lowercase().contains(&query.to_lowercase())
            }),
            Filter::Relation {
                relation_type,
                target_node_id,
                field_system_id,
            } => self.relation_matches(
                node,
                *relation_type,
                target_node_id.as_deref(),
                field_system_id.as_deref(),
            ),
            Filter::Temporal {
                field,
                op,
                days,
                date,
            } => {
                let timestamp = match field {
                    TemporalField::CreatedAt => node.created_at,
                    TemporalField::UpdatedAt => node.updated_at,
                };
                Ok(match op {
                    TemporalOp::Within => days.is_some_and(|days| {
                        timestamp >= self.now_ms - i64::from(days) * DAY_MS
                    }),
                    TemporalOp::Before => date
                        .as_deref()
                        .and_then(parse_date_ms)
                        .is_some_and(|bound| timestamp < bound),
                    TemporalOp::After => date
                        .as_deref()
                        .and_then(parse_date_ms)
                        .is_some_and(|bound| timestamp > bound),
                })
            }
            Filter::HasField {
                field_system_id,
                negate,
            } => {
                let Some(field_id) = self.field(field_system_id)? else {
                    return Ok(false);
                };
                let present = !node.values_by_field_id(field_id).is_empty();
                Ok(present != *negate)
            }
            Filter::And { filters } => self.matches_all(filters, node),
            Filter::Or { filters } => {
                for child in filters {
                    if self.matches(child, node)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Filter::Not { filters } => {
                for child in filters {
                    if self.matches(child, node)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
        }
    }

    fn relation_matches(
        &mut self,
        node: &AssembledNode,
        relation_type: RelationType,
        target: Option<&str>,
        field: Option<&str>,
    ) -> RepoResult<bool> {
        let target_id = match target {
            Some(identifier) => match self.target(identifier)? {
                Some(id) => Some(id),
                None => return Ok(false),
            },
            None => None,
        };
        let field_id = match field {
            Some(identifier) => match self.field(identifier)? {
                Some(field_id) => Some(field_id),
                None => return Ok(false),
            },
            None => None,
        };

        match relation_type {
            RelationType::ChildOf | RelationType::OwnedBy => Ok(match target_id {
                Some(target_id) => node.owner_id == Some(target_id),
                None => node.owner_id.is_some(),
            }),
            RelationType::LinksTo => {
                let references = self.references(node, field_id)?;
                Ok(match target_id {
                    Some(target_id) => references.contains(&target_id),
                    None => !references.is_empty(),
                })
            }
            RelationType::LinkedFrom => match target_id {
                Some(target_id) => {
                    let Some(&position) = self.by_id.get(&target_id) else {
                        return Ok(false);
                    };
                    let candidates = self.candidates;
                    Ok(self
                        .references(&candidates[position], field_id)?
                        .contains(&node.id))
                }
                None => Ok(self.backlinks(field_id)?.contains(&node.id)),
            },
        }
    }

    /// Node ids referenced by `node`, either in one field or in any field
    /// other than `field:supertag`.
    fn references(
        &mut self,
        node: &AssembledNode,
        field_id: Option<NodeId>,
    ) -> RepoResult<Vec<NodeId>> {
        let supertag_field = self.supertag_field()?;
        let mut references = Vec::new();
        for (&current, values) in &node.field_values {
            let included = match field_id {
                Some(field_id) => current == field_id,
                None => Some(current) != supertag_field,
            };
            if included {
                references.extend(values.iter().flat_map(PropertyValue::referenced_node_ids));
            }
        }
        Ok(references)
    }

    fn backlinks(&mut self, field_id: Option<NodeId>) -> RepoResult<&HashSet<NodeId>> {
        if !self.backlinks.contains_key(&field_id) {
            let candidates = self.candidates;
            let mut referenced = HashSet::new();
            for source in candidates {
                referenced.extend(self.references(source, field_id)?);
            }
            self.backlinks.insert(field_id, referenced);
        }
        Ok(&self.backlinks[&field_id])
    }

    fn supertag_field(&mut self) -> RepoResult<Option<NodeId>> {
        if let Some(cached) = self.supertag_field {
            return Ok(cached);
        }
        let resolved = self
            .repo
            .get_node_by_system_id(FIELD_SUPERTAG)?
            .map(|field| field.id);
        self.supertag_field = Some(resolved);
        Ok(resolved)
    }

    fn field(&mut self, identifier: &str) -> RepoResult<Option<NodeId>> {
        if let Some(cached) = self.fields.get(identifier) {
            return Ok(*cached);
        }
        let resolved = self.repo.find_live(identifier)?.map(|field| field.id);
        self.fields.insert(identifier.to_string(), resolved);
        Ok(resolved)
    }

    fn target(&mut self, identifier: &str) -> RepoResult<Option<NodeId>> {
        if let Some(cached) = self.targets.get(identifier) {
            return Ok(*cached);
        }
        let resolved = self.repo.find_live(identifier)?.map(|node| node.id);
        self.targets.insert(identifier.to_string(), resolved);
        Ok(resolved)
    }

    fn supertag_set(
        &mut self,
        identifier: &str,
        include_inherited: bool,
    ) -> RepoResult<Option<&HashSet<NodeId>>> {
        let key = (identifier.to_string(), include_inherited);
        if !self.supertag_sets.contains_key(&key) {
            let resolved = match self.repo.find_live(identifier)? {
                Some(supertag) if include_inherited => Some(
                    descendant_supertags(self.repo, supertag.id)?
                        .into_iter()
                        .collect(),
                ),
                Some(supertag) => Some(HashSet::from([supertag.id])),
                None => None,
            };
            self.supertag_sets.insert(key.clone(), resolved);
        }
        Ok(self.supertag_sets[&key].as_ref())
    }

    fn sort_positions(&mut self, positions: &mut [usize], sort: &QuerySort) -> RepoResult<()> {
        let candidates = self.candidates;
        let sort_field = match sort.field.as_str() {
            "content" | "createdAt" | "updatedAt" => None,
            identifier => Some(self.field(identifier)?),
        };

        let mut keyed: Vec<(Option<SortKey>, usize)> = positions
            .iter()
            .map(|&position| {
                let node = &candidates[position];
                let key = match (sort.field.as_str(), sort_field) {
                    (_, Some(Some(field_id))) => node
                        .values_by_field_id(field_id)
                        .first()
                        .and_then(SortKey::from_value),
                    (_, Some(None)) => None,
                    ("content", None) => Some(SortKey::Text(node.content.to_lowercase())),
                    ("createdAt", None) => Some(SortKey::Number(node.created_at as f64)),
                    ("updatedAt", None) => Some(SortKey::Number(node.updated_at as f64)),
                    (_, None) => None,
                };
                (key, position)
            })
            .collect();

        keyed.sort_by(|(left_key, left_pos), (right_key, right_pos)| {
            match (left_key, right_key) {
                (Some(left), Some(right)) => {
                    let ordering = left.compare(right).then(left_pos.cmp(right_pos));
                    match sort.direction {
                        SortDirection::Asc => ordering,
                        SortDirection::Desc => ordering.reverse(),
                    }
                }
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => match sort.direction {
                    SortDirection::Asc => left_pos.cmp(right_pos),
                    SortDirection::Desc => right_pos.cmp(left_pos),
                },
            }
        });

        for (slot, (_, position)) in positions.iter_mut().zip(keyed) {
            *slot = position;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
enum SortKey {
    Number(f64),
    Text(String),
}

impl SortKey {
    fn from_value(value: &PropertyValue) -> Option<Self> {
        if let Some(number) = numeric(value) {
            return Some(Self::Number(number));
        }
        value
            .text_form()
            .map(|text| Self::Text(text.to_lowercase()))
    }

    fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Number(left), Self::Number(right)) => {
                left.partial_cmp(right).unwrap_or(Ordering::Equal)
            }
            (Self::Text(left), Self::Text(right)) => left.cmp(right),
            (Self::Number(_), Self::Text(_)) => Ordering::Less,
            (Self::Text(_), Self::Number(_)) => Ordering::Greater,
        }
    }
}

/// Splits reference lists so each id is tested on its own.
fn flatten(values: &[PropertyValue]) -> Vec<PropertyValue> {
    let mut flat = Vec::with_capacity(values.len());
    for value in values {
        match value {
            PropertyValue::Nodes(ids) => flat.extend(ids.iter().copied().map(PropertyValue::Node)),
            other => flat.push(other.clone()),
        }
    }
    flat
}

fn property_matches(values: &[PropertyValue], op: PropertyOp, expected: &Value) -> bool {
    let is_empty = values.iter().all(PropertyValue::is_blank);
    match op {
        PropertyOp::IsEmpty => is_empty,
        PropertyOp::IsNotEmpty => !is_empty,
        PropertyOp::Eq => values.iter().any(|value| values_equal(value, expected)),
        PropertyOp::Neq => !values.iter().any(|value| values_equal(value, expected)),
        PropertyOp::Gt => any_ordering(values, expected, |ordering| ordering == Ordering::Greater),
        PropertyOp::Gte => any_ordering(values, expected, |ordering| ordering != Ordering::Less),
        PropertyOp::Lt => any_ordering(values, expected, |ordering| ordering == Ordering::Less),
        PropertyOp::Lte => any_ordering(values, expected, |ordering| ordering != Ordering::Greater),
        PropertyOp::Contains => any_text(values, expected, |text, needle| text.contains(needle)),
        PropertyOp::StartsWith => {
            any_text(values, expected, |text, needle| text.starts_with(needle))
        }
        PropertyOp::EndsWith => any_text(values, expected, |text, needle| text.ends_with(needle)),
    }
}

fn any_ordering(
    values: &[PropertyValue],
    expected: &Value,
    accept: impl Fn(Ordering) -> bool,
) -> bool {
    values
        .iter()
        .filter_map(|value| compare_values(value, expected))
        .any(accept)
}

fn any_text(values: &[PropertyValue], expected: &Value, accept: impl Fn(&str, &str) -> bool) -> bool {
    let Some(needle) = expected_text(expected) else {
        return false;
    };
    let needle = needle.to_lowercase();
    values
        .iter()
        .filter_map(PropertyValue::text_form)
        .any(|text| accept(&text.to_lowercase(), &needle))
}

/// Numeric view of a stored value. Strings that parse as numbers count.
fn numeric(value: &PropertyValue) -> Option<f64> {
    match value {
        PropertyValue::Number(number) => Some(*number),
        PropertyValue::String(text) => text.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

fn expected_numeric(expected: &Value) -> Option<f64> {
    match expected {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

fn expected_text(expected: &Value) -> Option<String> {
    match expected {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(match number.as_f64() {
            Some(value) => PropertyValue::Number(value).text_form().unwrap_or_default(),
            None => number.to_string(),
        }),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

fn values_equal(stored: &PropertyValue, expected: &Value) -> bool {
    if let PropertyValue::Json(json) = stored {
        if json == expected {
            return true;
        }
    }
    if matches!(stored, PropertyValue::Number(_)) || matches!(expected, Value::Number(_)) {
        if let (Some(left), Some(right)) = (numeric(stored), expected_numeric(expected)) {
            return left == right;
        }
    }
    if let (PropertyValue::Boolean(left), Value::Bool(right)) = (stored, expected) {
        return left == right;
    }
    match (stored.text_form(), expected_text(expected)) {
        (Some(left), Some(right)) => left.to_lowercase() == right.to_lowercase(),
        _ => false,
    }
}

fn compare_values(stored: &PropertyValue, expected: &Value) -> Option<Ordering> {
    if let (Some(left), Some(right)) = (numeric(stored), expected_numeric(expected)) {
        return left.partial_cmp(&right);
    }
    let left = stored.text_form()?.to_lowercase();
    let right = expected_text(expected)?.to_lowercase();
    Some(left.cmp(&right))
}

#[cfg(test)]
mod tests {
    use super::{compare_values, flatten, property_matches, values_equal};
    use crate::model::value::PropertyValue;
    use crate::query::definition::PropertyOp;
    use serde_json::json;
    use std::cmp::Ordering;
    use uuid::Uuid;

    #[test]
    fn equality_is_numeric_or_case_insensitive() {
        assert!(values_equal(&PropertyValue::Number(2.0), &json!(2)));
        assert!(values_equal(&PropertyValue::String("2".into()), &json!(2)));
        assert!(values_equal(&PropertyValue::Number(2.0), &json!("2")));
        assert!(values_equal(&PropertyValue::String("Pending".into()), &json!("pending")));
        assert!(values_equal(&PropertyValue::Boolean(true), &json!(true)));
        assert!(!values_equal(&PropertyValue::Boolean(true), &json!(false)));
        assert!(!values_equal(&PropertyValue::Json(json!({"a": 1})), &json!("a")));
    }

    #[test]
    fn ordering_prefers_numbers_then_text() {
        assert_eq!(
            compare_values(&PropertyValue::Number(10.0), &json!(9)),
            Some(Ordering::Greater)
        );
        assert_eq!(
            compare_values(&PropertyValue::String("2024-05-01".into()), &json!("2024-06-01")),
            Some(Ordering::Less)
        );
        assert_eq!(compare_values(&PropertyValue::Json(json!([])), &json!(1)), None);
    }

    #[test]
    fn any_value_may_satisfy_a_multi_valued_field() {
        let values = vec![PropertyValue::Number(1.0), PropertyValue::Number(5.0)];
        assert!(property_matches(&values, PropertyOp::Gt, &json!(3)));
        assert!(property_matches(&values, PropertyOp::Eq, &json!(1)));
        assert!(!property_matches(&values, PropertyOp::Neq, &json!(1)));
        assert!(property_matches(&values, PropertyOp::Neq, &json!(2)));
    }

    #[test]
    fn string_ops_ignore_case() {
        let values = vec![PropertyValue::String("Inbox Zero".into())];
        assert!(property_matches(&values, PropertyOp::Contains, &json!("BOX")));
        assert!(property_matches(&values, PropertyOp::StartsWith, &json!("inbox")));
        assert!(property_matches(&values, PropertyOp::EndsWith, &json!("zero")));
        assert!(!property_matches(&values, PropertyOp::StartsWith, &json!("zero")));
    }

    #[test]
    fn emptiness_treats_blank_values_as_empty() {
        assert!(property_matches(&[], PropertyOp::IsEmpty, &json!(null)));
        assert!(property_matches(
            &[PropertyValue::String("  ".into())],
            PropertyOp::IsEmpty,
            &json!(null)
        ));
        assert!(property_matches(
            &[PropertyValue::Number(0.0)],
            PropertyOp::IsNotEmpty,
            &json!(null)
        ));
    }

    #[test]
    fn reference_lists_match_by_membership() {
        let wanted = Uuid::new_v4();
        let values = flatten(&[PropertyValue::Nodes(vec![Uuid::new_v4(), wanted])]);
        assert!(property_matches(&values, PropertyOp::Contains, &json!(wanted.to_string())));
        assert!(property_matches(&values, PropertyOp::Eq, &json!(wanted.to_string())));
    }
}

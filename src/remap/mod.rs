//! Query id rewriting inside query options and UI definitions.
//!
//! Event bindings that trigger a query carry a `queryId`. When a version is cloned
//! every query gets a fresh id, so each binding has to be pointed at the clone.
//! Bindings live at four places, modelled as [`EventNode`] kinds:
//!
//! - `options.events[*]` of a data query
//! - `components[*].component.definition.events[*]`
//! - `components[*].component.definition.properties.actions.value[*].events[*]`
//! - `components[*].component.definition.properties.columns.value[*].events[*]`
//!   for `Table` components only
//!
//! Missing intermediate keys mean there is nothing to rewrite. Ids absent from the
//! map are left as they are.

use std::collections::HashMap;

use serde_json::{Map, Value};
use uuid::Uuid;

pub const QUERY_ID_KEY: &str = "queryId";
pub const TABLE_COMPONENT: &str = "Table";

/// Old id -> new id, keyed by the string form used inside documents
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IdMap(HashMap<String, String>);

impl IdMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, old: Uuid, new: Uuid) {
        self.0.insert(old.to_string(), new.to_string());
    }

    pub fn get(&self, old: &str) -> Option<&str> {
        self.0.get(old).map(String::as_str)
    }

    /// Typed lookup for ids stored in columns rather than documents
    pub fn get_uuid(&self, old: Uuid) -> Option<Uuid> {
        self.get(&old.to_string())
            .and_then(|new| Uuid::parse_str(new).ok())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for IdMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DocumentKind {
    /// A data query's `options`
    QueryOptions,
    /// A version's UI definition
    Definition,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventNodeKind {
    QueryOptions,
    Component,
    ActionValue,
    TableColumn,
}

/// An object that may carry an event list
pub enum EventNode<'a> {
    QueryOptions(&'a mut Map<String, Value>),
    Component(&'a mut Map<String, Value>),
    ActionValue(&'a mut Map<String, Value>),
    TableColumn(&'a mut Map<String, Value>),
}

impl<'a> EventNode<'a> {
    pub fn kind(&self) -> EventNodeKind {
        match self {
            EventNode::QueryOptions(_) => EventNodeKind::QueryOptions,
            EventNode::Component(_) => EventNodeKind::Component,
            EventNode::ActionValue(_) => EventNodeKind::ActionValue,
            EventNode::TableColumn(_) => EventNodeKind::TableColumn,
        }
    }

    pub fn events_mut(&mut self) -> Option<&mut Vec<Value>> {
        let holder = match self {
            EventNode::QueryOptions(options) => options,
            EventNode::Component(definition) => definition,
            EventNode::ActionValue(action) => action,
            EventNode::TableColumn(column) => column,
        };
        holder.get_mut("events").and_then(Value::as_array_mut)
    }
}

/// Calls `visitor` once per event-bearing node of `document`
pub fn visit_event_nodes<F>(document: &mut Value, kind: DocumentKind, visitor: &mut F)
where
    F: FnMut(EventNode<'_>),
{
    match kind {
        DocumentKind::QueryOptions => {
            if let Some(options) = document.as_object_mut() {
                visitor(EventNode::QueryOptions(options));
            }
        }
        DocumentKind::Definition => visit_definition(document, visitor),
    }
}

fn visit_definition<F>(definition: &mut Value, visitor: &mut F)
where
    F: FnMut(EventNode<'_>),
{
    let Some(components) = definition
        .get_mut("components")
        .and_then(Value::as_object_mut)
    else {
        return;
    };

    for entry in components.values_mut() {
        let Some(component) = entry.get_mut("component").and_then(Value::as_object_mut) else {
            continue;
        };
        let is_table = component.get("component").and_then(Value::as_str) == Some(TABLE_COMPONENT);
        let Some(component_definition) = component
            .get_mut("definition")
            .and_then(Value::as_object_mut)
        else {
            continue;
        };

        visitor(EventNode::Component(&mut *component_definition));

        if let Some(actions) = property_values(component_definition, "actions") {
            for action in actions.iter_mut().filter_map(Value::as_object_mut) {
                visitor(EventNode::ActionValue(action));
            }
        }

        if is_table {
            if let Some(columns) = property_values(component_definition, "columns") {
                for column in columns.iter_mut().filter_map(Value::as_object_mut) {
                    visitor(EventNode::TableColumn(column));
                }
            }
        }
    }
}

fn property_values<'a>(
    definition: &'a mut Map<String, Value>,
    property: &str,
) -> Option<&'a mut Vec<Value>> {
    definition
        .get_mut("properties")?
        .get_mut(property)?
        .get_mut("value")?
        .as_array_mut()
}

/// Rewrites mapped `queryId`s in place and returns how many were changed
pub fn remap_in_place(document: &mut Value, kind: DocumentKind, map: &IdMap) -> usize {
    let mut rewritten = 0;
    if map.is_empty() {
        return rewritten;
    }

    visit_event_nodes(document, kind, &mut |mut node| {
        let Some(events) = node.events_mut() else {
            return;
        };
        for event in events.iter_mut().filter_map(Value::as_object_mut) {
            let replacement = event
                .get(QUERY_ID_KEY)
                .and_then(Value::as_str)
                .and_then(|old| map.get(old))
                .map(str::to_string);
            if let Some(new_id) = replacement {
                event.insert(QUERY_ID_KEY.to_string(), Value::String(new_id));
                rewritten += 1;
            }
        }
    });

    rewritten
}

pub fn remap_definition(definition: &Value, map: &IdMap) -> Value {
    let mut remapped = definition.clone();
    remap_in_place(&mut remapped, DocumentKind::Definition, map);
    remapped
}

pub fn remap_query_options(options: &Value, map: &IdMap) -> Value {
    let mut remapped = options.clone();
    remap_in_place(&mut remapped, DocumentKind::QueryOptions, map);
    remapped
}

/// Every `queryId` string referenced by the document, in traversal order
pub fn collect_query_ids(document: &Value, kind: DocumentKind) -> Vec<String> {
    event_lists(document, kind)
        .into_iter()
        .flatten()
        .filter_map(|event| event.get(QUERY_ID_KEY))
        .filter_map(Value::as_str)
        .map(str::to_string)
        .collect()
}

/// Read-only walk over the same nodes [`visit_event_nodes`] visits
fn event_lists(document: &Value, kind: DocumentKind) -> Vec<&Vec<Value>> {
    let mut lists = Vec::new();
    match kind {
        DocumentKind::QueryOptions => lists.extend(events_of(document)),
        DocumentKind::Definition => {
            let Some(components) = document.get("components").and_then(Value::as_object) else {
                return lists;
            };
            for entry in components.values() {
                let Some(component) = entry.get("component").filter(|c| c.is_object()) else {
                    continue;
                };
                let is_table =
                    component.get("component").and_then(Value::as_str) == Some(TABLE_COMPONENT);
                let Some(definition) = component.get("definition").filter(|d| d.is_object()) else {
                    continue;
                };

                lists.extend(events_of(definition));
                if let Some(actions) = property_values_ref(definition, "actions") {
                    lists.extend(actions.iter().filter_map(events_of));
                }
                if is_table {
                    if let Some(columns) = property_values_ref(definition, "columns") {
                        lists.extend(columns.iter().filter_map(events_of));
                    }
                }
            }
        }
    }
    lists
}

fn events_of(holder: &Value) -> Option<&Vec<Value>> {
    holder.as_object()?.get("events")?.as_array()
}

fn property_values_ref<'a>(definition: &'a Value, property: &str) -> Option<&'a Vec<Value>> {
    definition
        .get("properties")?
        .get(property)?
        .get("value")?
        .as_array()
}

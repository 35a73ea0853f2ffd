//! Read-only node views over an external JSON record.
//!
//! A [`Node`] is a borrowed view into a `serde_json::Value` tree: it never
//! copies scalar data and the core never mutates the backing record. The
//! whole record model is consumed through this one generic view; no
//! per-resource classes are needed.

use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;

use crate::error::{CardinalityError, Error, Result};

/// A primitive value carried by a node or produced by an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    /// Boolean value.
    Bool(bool),
    /// Whole number.
    Integer(i64),
    /// Decimal number.
    Decimal(f64),
    /// String value.
    String(String),
    /// Calendar date.
    Date(NaiveDate),
    /// Date and time of day.
    DateTime(NaiveDateTime),
}

impl Scalar {
    /// The dynamic type name of this value.
    pub fn type_name(&self) -> &'static str {
        match self {
            Scalar::Bool(_) => "boolean",
            Scalar::Integer(_) => "integer",
            Scalar::Decimal(_) => "decimal",
            Scalar::String(_) => "string",
            Scalar::Date(_) => "date",
            Scalar::DateTime(_) => "dateTime",
        }
    }
}

/// A typed, read-only view of one element within a record.
///
/// Identity is positional: every node knows the dotted path locating it
/// within the root record, which is what issue locations report.
#[derive(Debug, Clone)]
pub struct Node<'a> {
    type_name: String,
    value: &'a Value,
    path: String,
}

impl<'a> Node<'a> {
    /// Wrap a record as the root node of a tree.
    ///
    /// The record must be a JSON object carrying a `resourceType` property,
    /// which becomes both the declared type and the root of all paths.
    pub fn root(record: &'a Value) -> Result<Node<'a>> {
        let object = record
            .as_object()
            .ok_or_else(|| Error::invalid_record("record must be a JSON object"))?;
        let type_name = object
            .get("resourceType")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::invalid_record("record must carry a 'resourceType' property"))?;
        Ok(Node {
            type_name: type_name.to_string(),
            value: record,
            path: type_name.to_string(),
        })
    }

    /// The declared (or dynamically inferred) type name. Empty for complex
    /// elements whose concrete type is not recoverable from the record.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Path locating this node within the root record, e.g.
    /// `Patient.name[0].family`.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The raw JSON backing this node.
    pub fn json(&self) -> &'a Value {
        self.value
    }

    /// True only if the node carries a primitive value.
    pub fn has_value(&self) -> bool {
        matches!(
            self.value,
            Value::Bool(_) | Value::Number(_) | Value::String(_)
        )
    }

    /// The primitive value carried by this node, if any.
    pub fn primitive(&self) -> Option<Scalar> {
        match self.value {
            Value::Bool(b) => Some(Scalar::Bool(*b)),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(Scalar::Integer(i))
                } else {
                    n.as_f64().map(Scalar::Decimal)
                }
            }
            Value::String(s) => Some(Scalar::String(s.clone())),
            _ => None,
        }
    }

    /// Ordered sub-collection of children named `name`.
    ///
    /// Choice-typed fields are resolved by JSON key convention: a key
    /// `valueQuantity` answers `children("value")` and yields a node whose
    /// declared type is `Quantity`.
    pub fn children(&self, name: &str) -> Vec<Node<'a>> {
        let Some(object) = self.value.as_object() else {
            return Vec::new();
        };

        if let Some(child) = object.get(name) {
            return self.wrap_child(name, None, child);
        }

        for (key, child) in object {
            if let Some(rest) = key.strip_prefix(name) {
                if rest.chars().next().is_some_and(|c| c.is_ascii_uppercase()) {
                    return self.wrap_child(key, Some(rest.to_string()), child);
                }
            }
        }

        Vec::new()
    }

    /// Return this node if its declared or dynamic type matches `type_name`,
    /// otherwise nothing. Cast failure is "no result", never an error.
    pub fn cast_to(&self, type_name: &str) -> Option<Node<'a>> {
        if !self.type_name.is_empty() && self.type_name.eq_ignore_ascii_case(type_name) {
            Some(self.clone())
        } else {
            None
        }
    }

    fn wrap_child(&self, key: &str, declared_type: Option<String>, child: &'a Value) -> Vec<Node<'a>> {
        match child {
            Value::Null => Vec::new(),
            Value::Array(elements) => elements
                .iter()
                .enumerate()
                .filter(|(_, element)| Self::is_meaningful(element))
                .map(|(index, element)| Node {
                    type_name: declared_type
                        .clone()
                        .unwrap_or_else(|| Self::dynamic_type(element)),
                    value: element,
                    path: format!("{}.{}[{}]", self.path, key, index),
                })
                .collect(),
            _ if Self::is_meaningful(child) => vec![Node {
                type_name: declared_type.unwrap_or_else(|| Self::dynamic_type(child)),
                value: child,
                path: format!("{}.{}", self.path, key),
            }],
            _ => Vec::new(),
        }
    }

    // A node with no primitive value and no children is never constructed.
    fn is_meaningful(value: &Value) -> bool {
        match value {
            Value::Null => false,
            Value::Object(object) => !object.is_empty(),
            Value::Array(elements) => !elements.is_empty(),
            _ => true,
        }
    }

    fn dynamic_type(value: &Value) -> String {
        match value {
            Value::Bool(_) => "boolean".to_string(),
            Value::String(_) => "string".to_string(),
            Value::Number(n) if n.is_i64() || n.is_u64() => "integer".to_string(),
            Value::Number(_) => "decimal".to_string(),
            // Concrete complex types are not recoverable without a schema.
            _ => String::new(),
        }
    }
}

/// One element of a [`Collection`]: either a node backed by the record, or a
/// value computed during evaluation.
#[derive(Debug, Clone)]
pub enum Item<'a> {
    /// An element node of the record.
    Node(Node<'a>),
    /// A computed primitive with no backing node.
    Value(Scalar),
}

impl<'a> Item<'a> {
    /// The primitive value of this item, if it carries one.
    pub fn scalar(&self) -> Option<Scalar> {
        match self {
            Item::Node(node) => node.primitive(),
            Item::Value(scalar) => Some(scalar.clone()),
        }
    }

    /// True if this item carries a primitive value.
    pub fn has_value(&self) -> bool {
        match self {
            Item::Node(node) => node.has_value(),
            Item::Value(_) => true,
        }
    }

    /// The node behind this item, when it is record-backed.
    pub fn as_node(&self) -> Option<&Node<'a>> {
        match self {
            Item::Node(node) => Some(node),
            Item::Value(_) => None,
        }
    }
}

/// An ordered sequence of items; may be empty, a singleton, or multi-valued.
///
/// Order matches source document order except where an operation is
/// explicitly unordered.
#[derive(Debug, Clone, Default)]
pub struct Collection<'a> {
    items: Vec<Item<'a>>,
}

impl<'a> Collection<'a> {
    /// The empty collection.
    pub fn empty() -> Self {
        Self { items: Vec::new() }
    }

    /// A collection holding exactly one item.
    pub fn singleton(item: Item<'a>) -> Self {
        Self { items: vec![item] }
    }

    /// A singleton collection around a node.
    pub fn from_node(node: Node<'a>) -> Self {
        Self::singleton(Item::Node(node))
    }

    /// A singleton boolean value.
    pub fn boolean(value: bool) -> Self {
        Self::singleton(Item::Value(Scalar::Bool(value)))
    }

    /// Build a collection from items, preserving order.
    pub fn from_items(items: Vec<Item<'a>>) -> Self {
        Self { items }
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True when the collection has no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterate the items in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Item<'a>> {
        self.items.iter()
    }

    /// The first item, if any.
    pub fn first(&self) -> Option<&Item<'a>> {
        self.items.first()
    }

    /// Append an item.
    pub fn push(&mut self, item: Item<'a>) {
        self.items.push(item);
    }

    /// The one item of this collection, or a [`CardinalityError`] naming the
    /// requiring operation when the collection is empty or multi-valued.
    pub fn as_singleton(&self, context: &str) -> std::result::Result<&Item<'a>, CardinalityError> {
        if self.items.len() == 1 {
            Ok(&self.items[0])
        } else {
            Err(CardinalityError::new(context, self.items.len()))
        }
    }

    /// `Some(b)` iff the collection is exactly one boolean value.
    pub fn single_boolean(&self) -> Option<bool> {
        if self.items.len() != 1 {
            return None;
        }
        match self.items[0].scalar() {
            Some(Scalar::Bool(b)) => Some(b),
            _ => None,
        }
    }
}

impl<'a> IntoIterator for Collection<'a> {
    type Item = Item<'a>;
    type IntoIter = std::vec::IntoIter<Item<'a>>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

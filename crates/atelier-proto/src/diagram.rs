//! Document (diagram) snapshot types.
//!
//! The diagram is owned and edited outside the collaboration engine; the
//! engine only replicates it as an opaque full-value snapshot. The shape is
//! still typed here so inbound snapshots are validated before they replace
//! a guest's replica.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A node position on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Horizontal position
    pub x: f64,
    /// Vertical position
    pub y: f64,
}

/// Constraint flags on a column. All flags are tri-state: absent means
/// "unspecified", which older documents use interchangeably with `false`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnFlags {
    /// Column is part of the primary key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_key: Option<bool>,
    /// Column is NOT NULL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_null: Option<bool>,
    /// Column has a UNIQUE constraint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique: Option<bool>,
}

/// A table column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Column name
    pub name: String,
    /// SQL type as written by the user
    #[serde(rename = "type")]
    pub ty: String,
    /// Constraint flags, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flags: Option<ColumnFlags>,
}

/// A table in the diagram.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    /// Table name
    pub name: String,
    /// Columns in declaration order
    pub columns: Vec<Column>,
}

/// A foreign-key relation between two table columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relation {
    /// Referencing table
    pub source_table: String,
    /// Referencing column
    pub source_column: String,
    /// Referenced table
    pub target_table: String,
    /// Referenced column
    pub target_column: String,
}

/// The shared document: tables, relations, and optional canvas positions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagram {
    /// Document name
    pub name: String,
    /// Tables in the schema
    pub tables: Vec<Table>,
    /// Relations between tables
    pub relations: Vec<Relation>,
    /// Canvas positions keyed by table name; absent for documents that
    /// have never been laid out
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub positions: Option<BTreeMap<String, Position>>,
}

impl Diagram {
    /// Create an empty diagram with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), tables: Vec::new(), relations: Vec::new(), positions: None }
    }
}

//! Metadata maps returned for books.

use serde::Serialize;
use std::collections::BTreeMap;

/// A single metadata value; serialized without a type tag.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Text(String),
    List(Vec<String>),
    Integer(u64),
    Number(f64),
    Flag(bool),
}

impl MetadataValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            MetadataValue::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            MetadataValue::List(items) => Some(items),
            _ => None,
        }
    }
}

/// Field name -> value. Absent fields are simply missing.
pub type Metadata = BTreeMap<String, MetadataValue>;

//! Request payloads and merging of model output back into records.

use std::collections::HashMap;

use serde_json::{json, Map, Value};

use crate::store::Row;

/// A nested array of cells whose text attributes are translated in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellShape {
    pub field: &'static str,
    pub text_fields: &'static [&'static str],
}

/// How records of one content kind are sent to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadShape {
    /// One text per record, sent as a `{id: text}` object.
    Flat { field: &'static str },
    /// Several text fields per record, sent as an indexed array.
    Structured {
        fields: &'static [&'static str],
        cells: Option<CellShape>,
    },
}

impl PayloadShape {
    /// Source columns the translator reads.
    pub fn text_columns(&self) -> Vec<&'static str> {
        match self {
            PayloadShape::Flat { field } => vec![*field],
            PayloadShape::Structured { fields, cells } => {
                let mut columns = fields.to_vec();
                if let Some(cells) = cells {
                    columns.push(cells.field);
                }
                columns
            }
        }
    }
}

/// One source record handed to the translator.
#[derive(Debug, Clone, Copy)]
pub struct BatchItem<'a> {
    pub id: &'a str,
    pub row: &'a Row,
}

/// Cells of a record. Stores without a JSON column type hand them back as text.
pub fn cells_of(row: &Row, field: &str) -> Option<Vec<Value>> {
    match row.get(field)? {
        Value::Array(cells) => Some(cells.clone()),
        Value::String(raw) => match serde_json::from_str(raw) {
            Ok(Value::Array(cells)) => Some(cells),
            _ => None,
        },
        _ => None,
    }
}

pub fn build_payload(shape: &PayloadShape, items: &[BatchItem<'_>]) -> Value {
    match shape {
        PayloadShape::Flat { field } => {
            let mut entries = Map::new();
            for item in items {
                if let Some(text) = item.row.get(*field).and_then(Value::as_str) {
                    entries.insert(item.id.to_string(), Value::String(text.to_string()));
                }
            }
            Value::Object(entries)
        }
        PayloadShape::Structured { fields, cells } => {
            let entries = items
                .iter()
                .enumerate()
                .map(|(index, item)| {
                    let mut entry = Map::new();
                    entry.insert("index".to_string(), json!(index));
                    for field in fields.iter() {
                        if let Some(text) = item.row.get(*field).and_then(Value::as_str) {
                            entry.insert(field.to_string(), Value::String(text.to_string()));
                        }
                    }
                    if let Some(shape) = cells {
                        if let Some(cells) = cells_of(item.row, shape.field) {
                            entry.insert(
                                shape.field.to_string(),
                                Value::Array(cell_payload(&cells, shape.text_fields)),
                            );
                        }
                    }
                    Value::Object(entry)
                })
                .collect();
            Value::Array(entries)
        }
    }
}

fn cell_payload(cells: &[Value], text_fields: &[&str]) -> Vec<Value> {
    cells
        .iter()
        .enumerate()
        .map(|(index, cell)| {
            let mut entry = Map::new();
            entry.insert("index".to_string(), json!(index));
            for field in text_fields {
                if let Some(text) = cell.get(*field).and_then(Value::as_str) {
                    entry.insert(field.to_string(), Value::String(text.to_string()));
                }
            }
            Value::Object(entry)
        })
        .collect()
}

/// Matches response entries to request positions: by their `index` when
/// present, by array position otherwise.
fn index_entries(entries: &[Value]) -> HashMap<usize, &Value> {
    let mut by_index = HashMap::with_capacity(entries.len());
    for (position, entry) in entries.iter().enumerate() {
        let index = entry
            .get("index")
            .and_then(Value::as_u64)
            .map(|i| i as usize)
            .unwrap_or(position);
        by_index.entry(index).or_insert(entry);
    }
    by_index
}

fn translated_text(entry: &Value, field: &str) -> Option<Value> {
    entry
        .get(field)
        .and_then(Value::as_str)
        .filter(|text| !text.trim().is_empty())
        .map(|text| Value::String(text.to_string()))
}

/// Merges the model's output into per-item rows of translated fields.
///
/// `None` marks an item the response has no entry for. Within an entry, a
/// missing or empty field keeps the source value; non-text cell attributes
/// are always copied from the source.
pub fn merge_response(
    shape: &PayloadShape,
    items: &[BatchItem<'_>],
    response: &Value,
) -> Vec<Option<Row>> {
    match shape {
        PayloadShape::Flat { field } => items
            .iter()
            .map(|item| {
                let text = translated_text(response, item.id)?;
                let mut row = Row::new();
                row.insert(field.to_string(), text);
                Some(row)
            })
            .collect(),
        PayloadShape::Structured { fields, cells } => {
            let entries = match response.as_array() {
                Some(entries) => index_entries(entries),
                None => return vec![None; items.len()],
            };

            items
                .iter()
                .enumerate()
                .map(|(index, item)| {
                    let entry = entries.get(&index)?;
                    let mut row = Row::new();
                    for field in fields.iter() {
                        let value = translated_text(entry, field)
                            .or_else(|| item.row.get(*field).cloned())
                            .unwrap_or(Value::Null);
                        row.insert(field.to_string(), value);
                    }
                    if let Some(shape) = cells {
                        let merged = match cells_of(item.row, shape.field) {
                            Some(original) => Value::Array(merge_cells(
                                original,
                                entry.get(shape.field),
                                shape.text_fields,
                            )),
                            None => item.row.get(shape.field).cloned().unwrap_or(Value::Null),
                        };
                        row.insert(shape.field.to_string(), merged);
                    }
                    Some(row)
                })
                .collect()
        }
    }
}

fn merge_cells(original: Vec<Value>, translated: Option<&Value>, text_fields: &[&str]) -> Vec<Value> {
    let translated = match translated.and_then(Value::as_array) {
        Some(entries) => index_entries(entries),
        None => return original,
    };

    original
        .into_iter()
        .enumerate()
        .map(|(index, mut cell)| {
            if let (Some(entry), Some(attributes)) = (translated.get(&index), cell.as_object_mut()) {
                for field in text_fields {
                    if !attributes.get(*field).is_some_and(Value::is_string) {
                        continue;
                    }
                    if let Some(text) = translated_text(entry, field) {
                        attributes.insert(field.to_string(), text);
                    }
                }
            }
            cell
        })
        .collect()
}

//! In-Memory Repository
//!
//! The data-access layer behind the task queues: one table of JSON records
//! per resource, with search, equality filters and pagination.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use crate::error::RepoError;
use crate::keys::ListQuery;

/// A JSON object record without its `id`.
pub type Fields = Map<String, Value>;

#[derive(Debug, Default)]
struct Table {
    next_id: u64,
    records: BTreeMap<u64, Fields>,
}

// == Page ==
/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page {
    pub items: Vec<Value>,
    pub total: usize,
    pub page: u32,
    pub limit: u32,
}

// == Memory Repository ==
#[derive(Debug, Default)]
pub struct MemoryRepository {
    tables: RwLock<HashMap<String, Table>>,
}

impl MemoryRepository {
    /// Creates a repository with an empty table per resource name.
    pub fn new<I, S>(resources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tables = resources
            .into_iter()
            .map(|name| (name.into(), Table::default()))
            .collect();
        Self {
            tables: RwLock::new(tables),
        }
    }

    // == List ==
    /// Returns the requested page of records matching the search term and
    /// filters, ordered by id.
    pub async fn list(&self, resource: &str, query: &ListQuery) -> Result<Page, RepoError> {
        let tables = self.tables.read().await;
        let table = table(&tables, resource)?;

        let matching: Vec<(u64, &Fields)> = table
            .records
            .iter()
            .filter(|(_, fields)| matches_query(fields, query))
            .map(|(id, fields)| (*id, fields))
            .collect();

        let items = matching
            .iter()
            .skip(query.offset())
            .take(query.limit as usize)
            .map(|(id, fields)| to_record(*id, fields))
            .collect();

        Ok(Page {
            items,
            total: matching.len(),
            page: query.page,
            limit: query.limit,
        })
    }

    // == Get ==
    pub async fn get(&self, resource: &str, id: u64) -> Result<Value, RepoError> {
        let tables = self.tables.read().await;
        let fields = table(&tables, resource)?
            .records
            .get(&id)
            .ok_or_else(|| record_not_found(resource, id))?;
        Ok(to_record(id, fields))
    }

    // == Create ==
    /// Stores a new record and returns it with its assigned id.
    pub async fn create(&self, resource: &str, fields: Fields) -> Result<Value, RepoError> {
        validate(&fields)?;
        let mut tables = self.tables.write().await;
        let table = table_mut(&mut tables, resource)?;

        table.next_id += 1;
        let id = table.next_id;
        let record = to_record(id, &fields);
        table.records.insert(id, fields);
        Ok(record)
    }

    // == Update ==
    /// Merges `fields` into an existing record.
    pub async fn update(&self, resource: &str, id: u64, fields: Fields) -> Result<Value, RepoError> {
        validate(&fields)?;
        let mut tables = self.tables.write().await;
        let existing = table_mut(&mut tables, resource)?
            .records
            .get_mut(&id)
            .ok_or_else(|| record_not_found(resource, id))?;

        existing.extend(fields);
        Ok(to_record(id, existing))
    }

    // == Delete ==
    pub async fn delete(&self, resource: &str, id: u64) -> Result<(), RepoError> {
        let mut tables = self.tables.write().await;
        table_mut(&mut tables, resource)?
            .records
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| record_not_found(resource, id))
    }
}

fn table<'a>(tables: &'a HashMap<String, Table>, resource: &str) -> Result<&'a Table, RepoError> {
    tables
        .get(resource)
        .ok_or_else(|| RepoError::NotFound(format!("Unknown resource: {}", resource)))
}

fn table_mut<'a>(
    tables: &'a mut HashMap<String, Table>,
    resource: &str,
) -> Result<&'a mut Table, RepoError> {
    tables
        .get_mut(resource)
        .ok_or_else(|| RepoError::NotFound(format!("Unknown resource: {}", resource)))
}

fn record_not_found(resource: &str, id: u64) -> RepoError {
    RepoError::NotFound(format!("{} record {} does not exist", resource, id))
}

fn validate(fields: &Fields) -> Result<(), RepoError> {
    if fields.is_empty() {
        return Err(RepoError::Invalid("Record must have at least one field".to_string()));
    }
    if fields.contains_key("id") {
        return Err(RepoError::Invalid("Field 'id' is assigned by the server".to_string()));
    }
    Ok(())
}

fn to_record(id: u64, fields: &Fields) -> Value {
    let mut record = Map::with_capacity(fields.len() + 1);
    record.insert("id".to_string(), Value::from(id));
    record.extend(fields.iter().map(|(k, v)| (k.clone(), v.clone())));
    Value::Object(record)
}

/// Scalar rendering used by both search and filters.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn matches_query(fields: &Fields, query: &ListQuery) -> bool {
    let filters_match = query.filters.iter().all(|(name, expected)| {
        fields
            .get(name)
            .and_then(scalar_text)
            .is_some_and(|actual| actual == *expected)
    });

    let search_match = match &query.search {
        Some(term) => fields
            .values()
            .filter_map(scalar_text)
            .any(|text| text.to_lowercase().contains(term.as_str())),
        None => true,
    };

    filters_match && search_match
}

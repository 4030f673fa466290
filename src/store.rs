//! The document store the services read and write through.
//!
//! Backends only move raw BSON documents between named collections; the
//! typed view lives in [`Repository`]. Filters are a small query language
//! that each backend translates: MongoDB renders them to a query document,
//! the in-memory store evaluates them directly.
use std::cmp::Ordering;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use bson::{doc, oid::ObjectId, Bson, Document};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};

use crate::error::{StoreError, StoreResult};

/// A document type that lives in its own collection.
pub trait Entity: Serialize + DeserializeOwned + Send + Sync + 'static {
    const COLLECTION: &'static str;

    fn id(&self) -> ObjectId;

    /// Called before the document is written back with [`Repository::save`].
    fn touch(&mut self, _now: DateTime<Utc>) {}
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn find_by_id(&self, collection: &str, id: &ObjectId) -> StoreResult<Option<Document>>;

    async fn find(&self, collection: &str, filter: &Filter, query: &Query)
        -> StoreResult<Vec<Document>>;

    async fn create(&self, collection: &str, document: Document) -> StoreResult<()>;

    /// Replaces the stored document with the same `_id`. Writing back a
    /// document that no longer exists is a no-op.
    async fn save(&self, collection: &str, document: Document) -> StoreResult<()>;

    /// Returns whether a document was removed.
    async fn delete_one(&self, collection: &str, id: &ObjectId) -> StoreResult<bool>;
}

#[derive(Clone, Debug, PartialEq)]
pub enum Filter {
    All,
    /// Equal to the value, or for array fields, containing it.
    Eq(&'static str, Bson),
    Ne(&'static str, Bson),
    In(&'static str, Vec<Bson>),
    ContainsIgnoreCase(&'static str, String),
    And(Vec<Filter>),
    Or(Vec<Filter>),
}

impl Filter {
    pub fn eq(field: &'static str, value: impl Into<Bson>) -> Self {
        Self::Eq(field, value.into())
    }

    pub fn ne(field: &'static str, value: impl Into<Bson>) -> Self {
        Self::Ne(field, value.into())
    }

    pub fn is_in<I, V>(field: &'static str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Bson>,
    {
        Self::In(field, values.into_iter().map(Into::into).collect())
    }

    pub fn contains_ignore_case(field: &'static str, needle: impl Into<String>) -> Self {
        Self::ContainsIgnoreCase(field, needle.into())
    }

    pub fn to_document(&self) -> Document {
        match self {
            Filter::All => Document::new(),
            Filter::Eq(field, value) => doc! { *field: value.clone() },
            Filter::Ne(field, value) => doc! { *field: { "$ne": value.clone() } },
            Filter::In(field, values) => doc! { *field: { "$in": values.clone() } },
            Filter::ContainsIgnoreCase(field, needle) => {
                doc! { *field: { "$regex": escape_regex(needle), "$options": "i" } }
            }
            Filter::And(filters) if filters.is_empty() => Document::new(),
            Filter::And(filters) => {
                doc! { "$and": filters.iter().map(Filter::to_document).collect::<Vec<_>>() }
            }
            Filter::Or(filters) => {
                doc! { "$or": filters.iter().map(Filter::to_document).collect::<Vec<_>>() }
            }
        }
    }

    pub fn matches(&self, document: &Document) -> bool {
        match self {
            Filter::All => true,
            Filter::Eq(field, value) => field_values(document, field).any(|v| v == value),
            Filter::Ne(field, value) => !field_values(document, field).any(|v| v == value),
            Filter::In(field, values) => {
                field_values(document, field).any(|v| values.contains(v))
            }
            Filter::ContainsIgnoreCase(field, needle) => {
                let needle = needle.to_lowercase();
                field_values(document, field).any(|v| match v {
                    Bson::String(s) => s.to_lowercase().contains(&needle),
                    _ => false,
                })
            }
            Filter::And(filters) => filters.iter().all(|f| f.matches(document)),
            Filter::Or(filters) => filters.iter().any(|f| f.matches(document)),
        }
    }
}

// Array fields match element-wise, as in MongoDB.
fn field_values<'a>(
    document: &'a Document,
    field: &str,
) -> Box<dyn Iterator<Item = &'a Bson> + 'a> {
    match document.get(field) {
        Some(Bson::Array(items)) => Box::new(items.iter()),
        Some(value) => Box::new(std::iter::once(value)),
        None => Box::new(std::iter::empty()),
    }
}

fn escape_regex(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if "\\.+*?()|[]{}^$/".contains(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[derive(Clone, Debug, PartialEq)]
pub struct Sort {
    pub field: &'static str,
    pub descending: bool,
}

impl Sort {
    pub fn document(&self) -> Document {
        let direction = if self.descending { -1 } else { 1 };
        let field = self.field;
        doc! { field: direction }
    }

    pub fn compare(&self, a: &Document, b: &Document) -> Ordering {
        let ordering = compare_bson(a.get(self.field), b.get(self.field));
        if self.descending {
            ordering.reverse()
        } else {
            ordering
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Query {
    pub sort: Option<Sort>,
    pub limit: Option<i64>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn newest_first(mut self, field: &'static str) -> Self {
        self.sort = Some(Sort {
            field,
            descending: true,
        });
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }
}

fn compare_bson(a: Option<&Bson>, b: Option<&Bson>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(Bson::DateTime(a)), Some(Bson::DateTime(b))) => a.cmp(b),
        (Some(Bson::String(a)), Some(Bson::String(b))) => a.cmp(b),
        (Some(Bson::ObjectId(a)), Some(Bson::ObjectId(b))) => a.cmp(b),
        (Some(a), Some(b)) => match (as_number(a), as_number(b)) {
            (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
            _ => Ordering::Equal,
        },
    }
}

fn as_number(value: &Bson) -> Option<f64> {
    match value {
        Bson::Double(n) => Some(*n),
        Bson::Int32(n) => Some(f64::from(*n)),
        Bson::Int64(n) => Some(*n as f64),
        _ => None,
    }
}

/// Current time at the millisecond precision the store keeps.
pub fn timestamp_now() -> DateTime<Utc> {
    bson::DateTime::now().to_chrono()
}

pub fn to_store_precision(time: DateTime<Utc>) -> DateTime<Utc> {
    bson::DateTime::from_chrono(time).to_chrono()
}

/// Typed access to the collection of one [`Entity`].
pub struct Repository<T> {
    store: Arc<dyn DocumentStore>,
    entity: PhantomData<fn() -> T>,
}

impl<T> Clone for Repository<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            entity: PhantomData,
        }
    }
}

impl<T: Entity> Repository<T> {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            entity: PhantomData,
        }
    }

    pub async fn find_by_id(&self, id: &ObjectId) -> StoreResult<Option<T>> {
        match self.store.find_by_id(T::COLLECTION, id).await? {
            Some(document) => Ok(Some(bson::from_document(document)?)),
            None => Ok(None),
        }
    }

    pub async fn find(&self, filter: &Filter, query: &Query) -> StoreResult<Vec<T>> {
        self.store
            .find(T::COLLECTION, filter, query)
            .await?
            .into_iter()
            .map(|document| bson::from_document(document).map_err(StoreError::from))
            .collect()
    }

    pub async fn create(&self, entity: T) -> StoreResult<T> {
        self.store
            .create(T::COLLECTION, bson::to_document(&entity)?)
            .await?;
        Ok(entity)
    }

    pub async fn save(&self, mut entity: T) -> StoreResult<T> {
        entity.touch(timestamp_now());
        self.store
            .save(T::COLLECTION, bson::to_document(&entity)?)
            .await?;
        Ok(entity)
    }

    pub async fn delete_one(&self, entity: &T) -> StoreResult<bool> {
        self.store.delete_one(T::COLLECTION, &entity.id()).await
    }
}

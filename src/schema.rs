//! Shared tablet schemas.
//!
//! Many tablets of one table carry the same schema. [`TabletSchemaMap`] lets
//! every writer bound to such a tablet share a single [`SchemaRef`] keyed by
//! schema id, without keeping schemas alive once the last writer is gone.

use std::{
    collections::HashMap,
    sync::{Arc, Weak},
};

use arrow::datatypes::SchemaRef;
use parking_lot::Mutex;

/// Identifier of a tablet schema; tablets with equal ids must have equal schemas.
pub type SchemaId = i64;

const SHARD_SIZE: usize = 16;

/// Counters describing the content of a [`TabletSchemaMap`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SchemaMapStats {
    /// Number of live schemas stored in the map.
    pub num_items: usize,
    /// Approximate bytes occupied by the live schemas.
    pub memory_usage: usize,
}

#[derive(Debug)]
struct Item {
    schema: Weak<arrow::datatypes::Schema>,
    memory_usage: usize,
}

#[derive(Debug, Default)]
struct Shard {
    items: HashMap<SchemaId, Item>,
}

/// Thread-safe map from [`SchemaId`] to a shared Arrow schema.
#[derive(Debug)]
pub struct TabletSchemaMap {
    shards: Vec<Mutex<Shard>>,
}

impl Default for TabletSchemaMap {
    fn default() -> Self {
        Self::new()
    }
}

impl TabletSchemaMap {
    pub fn new() -> Self {
        Self {
            shards: (0..SHARD_SIZE).map(|_| Mutex::default()).collect(),
        }
    }

    fn shard(&self, id: SchemaId) -> &Mutex<Shard> {
        &self.shards[(id as u64 % SHARD_SIZE as u64) as usize]
    }

    /// Insert `schema` under `id` unless a live schema with that id already exists.
    ///
    /// Only the id is compared; callers must not register two different schemas
    /// under one id. Returns the stored schema and whether an insertion happened.
    pub fn emplace(&self, id: SchemaId, schema: SchemaRef) -> (SchemaRef, bool) {
        let mut shard = self.shard(id).lock();
        if let Some(existing) = shard.items.get(&id).and_then(|item| item.schema.upgrade()) {
            return (existing, false);
        }
        let memory_usage = schema_memory_usage(&schema);
        shard.items.insert(
            id,
            Item {
                schema: Arc::downgrade(&schema),
                memory_usage,
            },
        );
        (schema, true)
    }

    /// Remove the schema stored under `id`, if any.
    pub fn erase(&self, id: SchemaId) {
        self.shard(id).lock().items.remove(&id);
    }

    /// Whether a live schema is stored under `id`.
    pub fn contains(&self, id: SchemaId) -> bool {
        self.shard(id)
            .lock()
            .items
            .get(&id)
            .is_some_and(|item| item.schema.strong_count() > 0)
    }

    /// Walks every shard; avoid calling on hot paths.
    pub fn stats(&self) -> SchemaMapStats {
        let mut stats = SchemaMapStats::default();
        for shard in &self.shards {
            let mut shard = shard.lock();
            shard.items.retain(|_, item| item.schema.strong_count() > 0);
            stats.num_items += shard.items.len();
            stats.memory_usage += shard
                .items
                .values()
                .map(|item| item.memory_usage)
                .sum::<usize>();
        }
        stats
    }
}

fn schema_memory_usage(schema: &SchemaRef) -> usize {
    let fields: usize = schema
        .fields()
        .iter()
        .map(|field| std::mem::size_of_val(field.as_ref()) + field.name().len())
        .sum();
    std::mem::size_of_val(schema.as_ref()) + fields
}

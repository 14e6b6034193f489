//! The create entry point.

use std::sync::Arc;

use sqlentity_core::{
    Connection, Cx, EntitySchema, Error, Instance, Item, Outcome, Record, materialize,
};

use crate::Session;
use crate::cascade::Node;

/// Input of a create call: one item or an ordered batch.
#[derive(Debug, Clone)]
pub enum Payload {
    /// A single record or instance
    Single(Item),
    /// Items created in order
    Batch(Vec<Item>),
}

impl From<Item> for Payload {
    fn from(item: Item) -> Self {
        Payload::Single(item)
    }
}

impl From<Record> for Payload {
    fn from(record: Record) -> Self {
        Payload::Single(Item::Data(record))
    }
}

impl From<Instance> for Payload {
    fn from(instance: Instance) -> Self {
        Payload::Single(Item::Instance(instance))
    }
}

impl From<Vec<Item>> for Payload {
    fn from(items: Vec<Item>) -> Self {
        Payload::Batch(items)
    }
}

impl From<Vec<Record>> for Payload {
    fn from(records: Vec<Record>) -> Self {
        Payload::Batch(records.into_iter().map(Item::Data).collect())
    }
}

impl From<Vec<Instance>> for Payload {
    fn from(instances: Vec<Instance>) -> Self {
        Payload::Batch(instances.into_iter().map(Item::Instance).collect())
    }
}

/// Output of a create call, shaped like its [`Payload`].
#[derive(Debug, Clone)]
pub enum Created {
    /// Result of a single-item payload
    Single(Instance),
    /// Results of a batch payload, in input order
    Batch(Vec<Instance>),
}

impl Created {
    /// The single instance, or `None` for a batch result.
    pub fn into_single(self) -> Option<Instance> {
        match self {
            Created::Single(instance) => Some(instance),
            Created::Batch(_) => None,
        }
    }

    /// All created instances; a single result becomes a one-element list.
    pub fn into_batch(self) -> Vec<Instance> {
        match self {
            Created::Single(instance) => vec![instance],
            Created::Batch(instances) => instances,
        }
    }

    /// Number of top-level instances.
    pub fn len(&self) -> usize {
        match self {
            Created::Single(_) => 1,
            Created::Batch(instances) => instances.len(),
        }
    }

    /// Whether this is an empty batch.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<C: Connection> Session<'_, C> {
    /// Create one item or a batch of items of `schema`.
    ///
    /// Batch items are processed one at a time in input order. The first
    /// failure ends the call with that item's error; items created before
    /// it stay persisted.
    #[tracing::instrument(level = "info", skip(self, cx, schema, payload), fields(entity = schema.name()))]
    pub async fn create(
        &self,
        cx: &Cx,
        schema: &Arc<EntitySchema>,
        payload: Payload,
    ) -> Outcome<Created, Error> {
        match payload {
            Payload::Single(item) => self.create_item(cx, schema, item).await.map(Created::Single),
            Payload::Batch(items) => {
                tracing::info!(count = items.len(), "Creating batch");
                let total = items.len();
                let mut created = Vec::with_capacity(total);
                for item in items {
                    match self.create_item(cx, schema, item).await {
                        Outcome::Ok(instance) => created.push(instance),
                        Outcome::Err(e) => {
                            tracing::info!(
                                created = created.len(),
                                total,
                                error = %e,
                                "Batch stopped at first failure"
                            );
                            return Outcome::Err(e);
                        }
                        Outcome::Cancelled(r) => return Outcome::Cancelled(r),
                        Outcome::Panicked(p) => return Outcome::Panicked(p),
                    }
                }
                Outcome::Ok(Created::Batch(created))
            }
        }
    }

    /// Create a single item together with its nested associations.
    pub async fn create_item(
        &self,
        cx: &Cx,
        schema: &Arc<EntitySchema>,
        item: Item,
    ) -> Outcome<Instance, Error> {
        let node = match materialize(self.registry, schema, item)
            .and_then(|m| Node::build(self.registry, m, 0, self.config.max_cascade_depth))
        {
            Ok(node) => node,
            Err(e) => return Outcome::Err(e),
        };
        tracing::debug!(instances = node.size(), "Materialized");
        self.persist_node(cx, node).await
    }
}

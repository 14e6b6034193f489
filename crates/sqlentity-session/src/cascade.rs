//! Association cascade.
//!
//! A payload item is first expanded into a tree of materialized instances
//! (no I/O, so malformed or over-deep payloads fail before anything is
//! written). The tree is then persisted owner first, each related item
//! linked to its owner's identifier and persisted in input order.

use std::future::Future;
use std::pin::Pin;

use sqlentity_core::{
    Association, Connection, Cx, Error, Instance, Materialized, Outcome, QueryErrorKind,
    SchemaRegistry, ValidationError, ValidationErrorKind, materialize,
};

use crate::Session;

/// A materialized instance with its materialized related items.
#[derive(Debug)]
pub(crate) struct Node {
    instance: Instance,
    children: Vec<(Association, Vec<Node>)>,
}

impl Node {
    /// Expand `materialized` and everything nested under it.
    ///
    /// `depth` is the nesting level of `materialized` itself.
    pub(crate) fn build(
        registry: &SchemaRegistry,
        materialized: Materialized,
        depth: usize,
        max_depth: usize,
    ) -> Result<Self, Error> {
        let Materialized { instance, pending } = materialized;
        if !pending.is_empty() && depth >= max_depth {
            return Err(Error::Validation(ValidationError::single(
                pending[0].association.name.clone(),
                ValidationErrorKind::Association,
                format!("associations nest deeper than {max_depth} level(s)"),
            )));
        }

        let mut children = Vec::with_capacity(pending.len());
        for p in pending {
            let related = registry.require(&p.association.related)?;
            let mut nodes = Vec::with_capacity(p.items.len());
            for item in p.items {
                let child = materialize(registry, &related, item)?;
                nodes.push(Node::build(registry, child, depth + 1, max_depth)?);
            }
            children.push((p.association, nodes));
        }
        Ok(Self { instance, children })
    }

    /// Number of instances in the tree.
    pub(crate) fn size(&self) -> usize {
        1 + self
            .children
            .iter()
            .flat_map(|(_, nodes)| nodes)
            .map(Node::size)
            .sum::<usize>()
    }
}

type NodeFuture<'s> = Pin<Box<dyn Future<Output = Outcome<Instance, Error>> + Send + 's>>;

impl<C: Connection> Session<'_, C> {
    /// Persist a tree, owner first.
    ///
    /// A failing related item stops the cascade; the owner and every item
    /// persisted before it stay in the database.
    pub(crate) fn persist_node<'s>(&'s self, cx: &'s Cx, node: Node) -> NodeFuture<'s> {
        Box::pin(async move {
            let Node {
                mut instance,
                children,
            } = node;

            match self.save(cx, &mut instance).await {
                Outcome::Ok(()) => {}
                Outcome::Err(e) => return Outcome::Err(e),
                Outcome::Cancelled(r) => return Outcome::Cancelled(r),
                Outcome::Panicked(p) => return Outcome::Panicked(p),
            }
            if children.is_empty() {
                return Outcome::Ok(instance);
            }

            let Some(owner_id) = instance.identifier() else {
                return Outcome::Err(Error::query(
                    QueryErrorKind::Database,
                    format!("'{}' has no identifier to link to", instance.entity()),
                ));
            };

            for (association, nodes) in children {
                tracing::debug!(
                    owner = %association.owner,
                    relation = %association.name,
                    count = nodes.len(),
                    "Cascading"
                );
                let mut persisted = Vec::with_capacity(nodes.len());
                for mut child in nodes {
                    child.instance.link(&association.foreign_key, &owner_id);
                    match self.persist_node(cx, child).await {
                        Outcome::Ok(saved) => persisted.push(saved),
                        Outcome::Err(e) => {
                            tracing::debug!(
                                relation = %association.name,
                                persisted = persisted.len(),
                                error = %e,
                                "Cascade aborted"
                            );
                            return Outcome::Err(e);
                        }
                        Outcome::Cancelled(r) => return Outcome::Cancelled(r),
                        Outcome::Panicked(p) => return Outcome::Panicked(p),
                    }
                }
                instance.set_related(association.name, persisted);
            }
            Outcome::Ok(instance)
        })
    }
}

//! Database handle.
//!
//! A [`Database`] owns a connection, the frozen schema registry and the
//! pipeline configuration. Entity operations go through [`Model`] handles
//! obtained with [`Database::model`].
//!
//! # Example
//!
//! ```rust,ignore
//! use sqlentity::prelude::*;
//!
//! let db = Database::builder()
//!     .config(SessionConfig::new().max_cascade_depth(4))
//!     .build_with(conn, registry);
//! let pets = db.model("pet")?;
//! ```

use std::marker::PhantomData;
use std::sync::Arc;

use sqlentity_core::{Connection, Cx, Error, Outcome, Result, Row, SchemaRegistry, Value};
use sqlentity_session::{Session, SessionConfig};

use crate::model::Model;

/// A connection bound to a schema registry.
#[derive(Debug)]
pub struct Database<C: Connection> {
    connection: C,
    registry: Arc<SchemaRegistry>,
    config: SessionConfig,
}

impl<C: Connection> Database<C> {
    /// Create a database handle with the default configuration.
    pub fn new(connection: C, registry: impl Into<Arc<SchemaRegistry>>) -> Self {
        Self::with_config(connection, registry, SessionConfig::default())
    }

    /// Create a database handle with an explicit configuration.
    pub fn with_config(
        connection: C,
        registry: impl Into<Arc<SchemaRegistry>>,
        config: SessionConfig,
    ) -> Self {
        Self {
            connection,
            registry: registry.into(),
            config,
        }
    }

    /// Create a database builder.
    #[must_use]
    pub fn builder() -> DatabaseBuilder<C> {
        DatabaseBuilder::new()
    }

    /// Get a reference to the underlying connection.
    #[must_use]
    pub fn connection(&self) -> &C {
        &self.connection
    }

    /// The schema registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<SchemaRegistry> {
        &self.registry
    }

    /// The pipeline configuration.
    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Consume the handle and return the underlying connection.
    pub fn into_connection(self) -> C {
        self.connection
    }

    /// A handle for the entity registered as `name`.
    ///
    /// Fails with a schema error of kind `UnknownEntity` when no such entity
    /// was defined.
    pub fn model(&self, name: &str) -> Result<Model<'_, C>> {
        let schema = self.registry.require(name)?;
        Ok(Model::new(self, schema))
    }

    /// Run a statement template against the connection.
    ///
    /// `??` placeholders take identifiers and `?` placeholders take values.
    pub async fn exec_query(
        &self,
        cx: &Cx,
        sql: &str,
        params: &[Value],
    ) -> Outcome<Vec<Row>, Error> {
        tracing::debug!(sql, params = params.len(), "exec_query");
        self.connection.exec_query(cx, sql, params).await
    }

    pub(crate) fn session(&self) -> Session<'_, C> {
        Session::new(&self.connection, &self.registry, &self.config)
    }
}

/// Builder for [`Database`] handles.
#[derive(Debug)]
pub struct DatabaseBuilder<C: Connection> {
    config: SessionConfig,
    _marker: PhantomData<C>,
}

impl<C: Connection> Default for DatabaseBuilder<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Connection> DatabaseBuilder<C> {
    /// Create a new database builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: SessionConfig::default(),
            _marker: PhantomData,
        }
    }

    /// Replace the pipeline configuration.
    #[must_use]
    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Limit how deep nested association data may go.
    #[must_use]
    pub fn max_cascade_depth(mut self, depth: usize) -> Self {
        self.config = self.config.max_cascade_depth(depth);
        self
    }

    /// Turn instance validation before writes on or off.
    #[must_use]
    pub fn validate(mut self, enabled: bool) -> Self {
        self.config = self.config.validate(enabled);
        self
    }

    /// Build the handle for `connection` and `registry`.
    pub fn build_with(
        self,
        connection: C,
        registry: impl Into<Arc<SchemaRegistry>>,
    ) -> Database<C> {
        Database::with_config(connection, registry, self.config)
    }
}

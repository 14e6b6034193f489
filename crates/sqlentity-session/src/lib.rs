//! Creation and persistence pipeline for sqlentity.
//!
//! `sqlentity-session` turns create payloads into persisted instances:
//!
//! - **Orchestration**: a single item or an ordered batch, processed
//!   sequentially and stopping at the first failure.
//! - **Cascade**: nested association data is materialized up front, then
//!   persisted owner first with foreign keys pointing at the owner.
//! - **Persistence**: insert with insert-time defaults, update without them,
//!   and fetch by identifier.
//!
//! Nothing is rolled back on failure. Rows written before the failing item
//! remain in the database.
//!
//! # Example
//!
//! ```ignore
//! let session = Session::new(&conn, &registry, &config);
//! let pet = registry.require("pet")?;
//! let created = session.create(&cx, &pet, Record::new().into()).await;
//! ```

pub mod cascade;
pub mod config;
pub mod create;
pub mod persist;

pub use config::{DEFAULT_MAX_CASCADE_DEPTH, SessionConfig};
pub use create::{Created, Payload};

use sqlentity_core::{Connection, SchemaRegistry};

/// Borrowed view of everything one pipeline call needs.
///
/// Sessions are cheap to build and hold no state of their own; create one
/// per call or keep one around for as long as the borrows allow.
pub struct Session<'a, C: Connection> {
    conn: &'a C,
    registry: &'a SchemaRegistry,
    config: &'a SessionConfig,
}

impl<'a, C: Connection> Session<'a, C> {
    /// Create a new session.
    pub fn new(conn: &'a C, registry: &'a SchemaRegistry, config: &'a SessionConfig) -> Self {
        Self {
            conn,
            registry,
            config,
        }
    }

    /// The underlying connection.
    pub fn connection(&self) -> &'a C {
        self.conn
    }

    /// The schema registry.
    pub fn registry(&self) -> &'a SchemaRegistry {
        self.registry
    }

    /// The pipeline configuration.
    pub fn config(&self) -> &'a SessionConfig {
        self.config
    }
}

impl<C: Connection> std::fmt::Debug for Session<'_, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("dialect", &self.conn.dialect())
            .field("config", self.config)
            .finish_non_exhaustive()
    }
}

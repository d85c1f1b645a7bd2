//! Shared database handle and execution context.
//!
//! A [`Database`] bundles the store client, the database name, and the
//! access context. Handles are cheap to clone; every repository constructed
//! from the same handle reuses the same underlying connection. For runtimes
//! that want a single process-wide connection, [`Database::install`] and
//! [`Database::instance`] manage a global slot that is consulted lazily and
//! cleared only by an explicit [`Database::uninstall`].

use std::fmt;
use std::sync::{Arc, RwLock};

use crate::client::{StoreClient, StoreCollection};
use crate::error::{ModelError, ModelResult};

static INSTALLED: RwLock<Option<Database>> = RwLock::new(None);

/// Permission level requested from the access-control collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    /// Read-or-write requirement.
    Read,
    /// Write-only requirement.
    Write,
}

/// Authorization interface, implemented outside this crate.
pub trait AccessControl: Send + Sync {
    /// Whether an authenticated actor is attached to the current context.
    fn has_authenticated_actor(&self) -> bool;

    /// Whether the current actor holds `permission` on `group`.
    fn is_allowed(&self, group: &str, permission: Permission) -> bool;
}

/// Execution context the permission gate runs under.
#[derive(Clone, Default)]
pub enum AccessContext {
    /// CLI or other non-interactive execution; the gate is a no-op.
    #[default]
    NonInteractive,
    /// Interactive execution with an access-control collaborator attached.
    Interactive(Arc<dyn AccessControl>),
}

impl AccessContext {
    /// Runs the permission gate for `group` at `permission` level.
    ///
    /// Non-interactive contexts always pass. Interactive contexts require an
    /// authenticated actor holding the permission.
    pub fn check(&self, group: &str, permission: Permission) -> ModelResult<()> {
        match self {
            AccessContext::NonInteractive => Ok(()),
            AccessContext::Interactive(control) => {
                if control.has_authenticated_actor() && control.is_allowed(group, permission) {
                    Ok(())
                } else {
                    Err(ModelError::PermissionDenied(group.to_string()))
                }
            }
        }
    }
}

impl fmt::Debug for AccessContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessContext::NonInteractive => write!(f, "NonInteractive"),
            AccessContext::Interactive(_) => write!(f, "Interactive"),
        }
    }
}

/// Handle on one named database of a document store.
#[derive(Clone, Debug)]
pub struct Database {
    client: Arc<dyn StoreClient>,
    name: String,
    access: AccessContext,
}

impl Database {
    /// Creates a handle over a store client. The underlying connection is
    /// established lazily by the driver on first use.
    pub fn new(client: Arc<dyn StoreClient>, name: impl Into<String>) -> Self {
        Database {
            client,
            name: name.into(),
            access: AccessContext::NonInteractive,
        }
    }

    /// Attaches an interactive access-control context.
    pub fn with_access(mut self, control: Arc<dyn AccessControl>) -> Self {
        self.access = AccessContext::Interactive(control);
        self
    }

    /// Name of the selected database.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Access context repositories consult for permission checks.
    pub fn access(&self) -> &AccessContext {
        &self.access
    }

    /// Selects a collection handle within this database.
    pub fn collection(&self, name: &str) -> Box<dyn StoreCollection> {
        self.client.select_collection(&self.name, name)
    }

    /// Explicitly closes the underlying connection.
    pub async fn disconnect(&self) -> ModelResult<()> {
        self.client.disconnect().await
    }

    /// Installs a handle into the process-wide slot.
    pub fn install(database: Database) {
        let mut slot = INSTALLED
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = Some(database);
    }

    /// Returns a clone of the installed handle.
    pub fn instance() -> ModelResult<Database> {
        INSTALLED
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
            .ok_or_else(|| {
                ModelError::UnsupportedOperation(
                    "No database handle has been installed".to_string(),
                )
            })
    }

    /// Clears the process-wide slot. Does not disconnect the client.
    pub fn uninstall() {
        let mut slot = INSTALLED
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = None;
    }
}

/*!
The persistence facade.

[`WorkbenchStore`] is what the application talks to: load and save operations
for workspaces, options and the workbench state, on top of one open
[`Database`]. Open it once at startup with [`open_store`] and hand it to
whoever needs it. [`WorkbenchStore::close`] ends its lifetime.
*/

use crate::codec::{AspectRegistry, Codec, JsonCodec, WorkspaceCodec};
use crate::compression::{compressor_for_level, CompressionAdapter};
use crate::config::{StorageBackend, StoreConfig};
use crate::domain::{OptionEntry, WorkbenchState, Workspace, UNASSIGNED_ID};
use crate::identity::{IdentityAssigner, RandomIdentity};
use crate::storage::{LocalFileStorage, MemoryStorage, StorageAdapter};
use crate::store::{Collection, Credentials, Database, Document, Filter};
use crate::{PersistError, Result};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Collection holding [`Workspace`] documents
pub const WORKSPACES: &str = "workspaces";
/// Collection holding [`OptionEntry`] documents
pub const OPTIONS: &str = "options";
/// Collection holding the [`WorkbenchState`] singleton
pub const WORKBENCH_STATES: &str = "workbench_states";

/// Draws per new aggregate before giving up on finding a free identifier
pub const MAX_IDENTITY_ATTEMPTS: usize = 8;

// Fixed store credentials. They only tie the file to this application.
const STORE_USER: &str = "larder";
const STORE_PASSPHRASE: &str = "keepitfresh";

fn store_credentials() -> Credentials {
    Credentials::new(STORE_USER, STORE_PASSPHRASE)
}

/// Open the store described by `config`
///
/// # Errors
/// An invalid configuration, or [`PersistError::StoreOpen`] when the store
/// file cannot be read, created or authenticated.
pub fn open_store(config: &StoreConfig) -> Result<WorkbenchStore> {
    config.validate()?;

    let storage: Box<dyn StorageAdapter> = match config.backend {
        StorageBackend::Local => Box::new(LocalFileStorage::new()),
        StorageBackend::Memory => Box::new(MemoryStorage::new()),
    };
    let compressor = compressor_for_level(config.compression_level);

    info!(
        location = %config.location(),
        backend = ?config.backend,
        compression = compressor.algorithm_name(),
        "Opening store"
    );
    WorkbenchStore::open(storage, compressor, config.location())
}

/// Open `database.db` in the working directory
pub fn open_default_store() -> Result<WorkbenchStore> {
    open_store(&StoreConfig::default_local())
}

/// Load and save operations for every aggregate kind
pub struct WorkbenchStore {
    db: Arc<Database>,
    workspaces: Collection<Workspace, WorkspaceCodec>,
    options: Collection<OptionEntry, JsonCodec>,
    workbench_states: Collection<WorkbenchState, JsonCodec>,
    identity: Box<dyn IdentityAssigner>,
}

impl WorkbenchStore {
    /// Open or create the store at `location` on the given adapters
    pub fn open<L: Into<String>>(
        storage: Box<dyn StorageAdapter>,
        compressor: Box<dyn CompressionAdapter>,
        location: L,
    ) -> Result<Self> {
        let db = Database::open_or_create(storage, compressor, location, &store_credentials())?;
        Ok(Self::new(db))
    }

    pub fn new(db: Database) -> Self {
        let db = Arc::new(db);
        Self {
            workspaces: Collection::new(db.clone(), WORKSPACES, WorkspaceCodec::default()),
            options: Collection::new(db.clone(), OPTIONS, JsonCodec),
            workbench_states: Collection::new(db.clone(), WORKBENCH_STATES, JsonCodec),
            identity: Box::new(RandomIdentity::new()),
            db,
        }
    }

    /// Decode aspects with `registry` instead of the built-in one
    pub fn with_registry(mut self, registry: AspectRegistry) -> Self {
        self.workspaces = Collection::new(self.db.clone(), WORKSPACES, WorkspaceCodec::new(registry));
        self
    }

    /// Draw new identifiers from `identity`
    pub fn with_identity<I: IdentityAssigner + 'static>(mut self, identity: I) -> Self {
        self.identity = Box::new(identity);
        self
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// The stored workbench state, created and persisted on first access
    #[instrument(skip(self))]
    pub fn load_workbench_state(&self) -> Result<WorkbenchState> {
        let mut states = self.workbench_states.find_all()?;
        if states.len() > 1 {
            warn!(count = states.len(), "Several workbench states stored, using the first");
        }
        if !states.is_empty() {
            return Ok(states.swap_remove(0));
        }

        let state = WorkbenchState {
            id: self.assign_identity(&self.workbench_states)?,
            ..WorkbenchState::default()
        };
        self.workbench_states.insert(&state)?;
        info!(id = state.id, "Created workbench state");
        Ok(state)
    }

    /// Overwrite the stored workbench state
    ///
    /// # Errors
    /// [`PersistError::DocumentNotFound`] if `state` was not obtained from
    /// [`load_workbench_state`](Self::load_workbench_state).
    pub fn save_workbench_state(&self, state: &WorkbenchState) -> Result<()> {
        self.workbench_states.update(state)
    }

    /// Names of all stored workspaces, in store order
    pub fn list_workspace_names(&self) -> Result<Vec<String>> {
        self.db
            .find(WORKSPACES, &Filter::All)?
            .iter()
            .map(workspace_name)
            .collect()
    }

    /// The first workspace called `name`, with its active request repaired
    #[instrument(skip(self))]
    pub fn load_workspace_by_name(&self, name: &str) -> Result<Option<Workspace>> {
        let workspace = self.workspaces.find_first(&Filter::eq("name", name))?;
        if workspace.is_none() {
            debug!("No workspace with this name");
        }
        Ok(workspace)
    }

    /// Insert a new workspace or update a stored one
    ///
    /// A workspace with identifier 0 receives a fresh identifier and is
    /// inserted; the identifier is written back into `workspace`. Any other
    /// workspace replaces the stored record with the same identifier. Names
    /// are not checked for uniqueness.
    ///
    /// # Errors
    /// Storage failures, [`PersistError::IdentityExhausted`] when no free
    /// identifier could be drawn, and [`PersistError::DocumentNotFound`] when
    /// updating a workspace that is not stored. A failed insert leaves the
    /// identifier at 0.
    #[instrument(skip(self, workspace), fields(name = %workspace.name))]
    pub fn persist_workspace(&self, workspace: &mut Workspace) -> Result<()> {
        if workspace.is_persisted() {
            return self.workspaces.update(workspace);
        }

        workspace.id = self.assign_identity(&self.workspaces)?;
        if let Err(e) = self.workspaces.insert(workspace) {
            workspace.id = UNASSIGNED_ID;
            return Err(e);
        }
        info!(id = workspace.id, "Persisted new workspace");
        Ok(())
    }

    /// Remove every workspace called `name`; true if any was removed
    pub fn delete_workspace(&self, name: &str) -> Result<bool> {
        let removed = self.workspaces.remove_by(&Filter::eq("name", name))?;
        if removed > 0 {
            info!(name, removed, "Deleted workspace");
        }
        Ok(removed > 0)
    }

    /// All option entries, in store order
    pub fn load_options(&self) -> Result<Vec<OptionEntry>> {
        self.options.find_all()
    }

    /// Replace the stored options with `entries`
    ///
    /// Entries are renumbered `0..n-1` in order before they are written, and
    /// the new numbering is left in `entries`. The replacement is a single
    /// store write: on failure the previous options remain stored.
    pub fn store_options(&self, entries: &mut [OptionEntry]) -> Result<()> {
        for (index, entry) in entries.iter_mut().enumerate() {
            entry.id = u32::try_from(index)
                .map_err(|_| PersistError::validation("Too many option entries"))?;
        }
        let previous = self.options.replace_all(entries)?;
        debug!(previous, stored = entries.len(), "Replaced options");
        Ok(())
    }

    /// Close the underlying store
    pub fn close(self) -> Result<()> {
        info!(location = %self.db.location(), "Closing store");
        self.db.close()
    }

    /// A non-zero identifier not yet used in `collection`
    fn assign_identity<T, K: Codec<T>>(&self, collection: &Collection<T, K>) -> Result<i64> {
        for attempt in 1..=MAX_IDENTITY_ATTEMPTS {
            let id = self.identity.assign();
            if id == UNASSIGNED_ID {
                warn!(attempt, "Identity source returned the unassigned identifier");
                continue;
            }
            if !collection.contains_id(id)? {
                return Ok(id);
            }
            debug!(
                collection = collection.name(),
                id,
                attempt,
                "Identifier already in use, drawing again"
            );
        }
        Err(PersistError::IdentityExhausted {
            attempts: MAX_IDENTITY_ATTEMPTS,
        })
    }
}

impl std::fmt::Debug for WorkbenchStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkbenchStore")
            .field("db", &self.db)
            .field("registry", self.workspaces.codec().registry())
            .finish()
    }
}

fn workspace_name(document: &Document) -> Result<String> {
    document
        .get("name")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| PersistError::decode(WORKSPACES, "workspace document without a name"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compression::NoCompression;
    use crate::domain::Request;
    use crate::identity::MockIdentityAssigner;
    use serde_json::json;

    fn memory_store() -> WorkbenchStore {
        WorkbenchStore::open(
            Box::new(MemoryStorage::new()),
            Box::new(NoCompression::new()),
            "test.db",
        )
        .unwrap()
    }

    fn scripted_identity(ids: Vec<i64>) -> MockIdentityAssigner {
        let calls = ids.len();
        let mut ids = ids.into_iter();
        let mut mock = MockIdentityAssigner::new();
        mock.expect_assign()
            .times(calls)
            .returning(move || ids.next().unwrap_or(UNASSIGNED_ID));
        mock
    }

    #[test]
    fn test_persist_assigns_identity_then_updates() {
        let store = memory_store().with_identity(scripted_identity(vec![-9]));
        let mut workspace = Workspace::new("api");
        workspace.open_request(Request::with_id("r1", "ping"));

        store.persist_workspace(&mut workspace).unwrap();
        assert_eq!(workspace.id, -9);

        workspace.name = "api v2".to_string();
        store.persist_workspace(&mut workspace).unwrap();

        assert_eq!(store.list_workspace_names().unwrap(), vec!["api v2"]);
        assert_eq!(store.database().count(WORKSPACES).unwrap(), 1);
    }

    #[test]
    fn test_identity_redrawn_on_zero_and_collision() {
        let store = memory_store().with_identity(scripted_identity(vec![5, 0, 5, 6]));

        let mut first = Workspace::new("first");
        store.persist_workspace(&mut first).unwrap();
        let mut second = Workspace::new("second");
        store.persist_workspace(&mut second).unwrap();

        assert_eq!(first.id, 5);
        assert_eq!(second.id, 6);
    }

    #[test]
    fn test_identity_exhausted() {
        let mut draws = vec![3];
        draws.extend(std::iter::repeat(3).take(MAX_IDENTITY_ATTEMPTS));
        let store = memory_store().with_identity(scripted_identity(draws));

        let mut first = Workspace::new("first");
        store.persist_workspace(&mut first).unwrap();

        let mut second = Workspace::new("second");
        let result = store.persist_workspace(&mut second);
        assert!(matches!(
            result,
            Err(PersistError::IdentityExhausted { attempts }) if attempts == MAX_IDENTITY_ATTEMPTS
        ));
        assert_eq!(second.id, UNASSIGNED_ID);
        assert_eq!(store.list_workspace_names().unwrap(), vec!["first"]);
    }

    #[test]
    fn test_identity_checked_per_collection() {
        let store = memory_store().with_identity(scripted_identity(vec![9, 9]));

        let state = store.load_workbench_state().unwrap();
        let mut workspace = Workspace::new("api");
        store.persist_workspace(&mut workspace).unwrap();

        assert_eq!(state.id, 9);
        assert_eq!(workspace.id, 9);
        assert!(workspace.is_persisted());
    }

    #[test]
    fn test_update_of_unknown_workspace_fails() {
        let store = memory_store();
        let mut workspace = Workspace::new("ghost");
        workspace.id = 1234;

        assert!(matches!(
            store.persist_workspace(&mut workspace),
            Err(PersistError::DocumentNotFound { id: 1234, .. })
        ));
        assert!(store.list_workspace_names().unwrap().is_empty());
    }

    #[test]
    fn test_workbench_state_singleton() {
        let store = memory_store().with_identity(scripted_identity(vec![77]));

        let mut state = store.load_workbench_state().unwrap();
        assert_eq!(state.id, 77);
        assert_eq!(state.loaded_workspace, None);

        state.loaded_workspace = Some("api".to_string());
        store.save_workbench_state(&state).unwrap();

        assert_eq!(store.load_workbench_state().unwrap(), state);
        assert_eq!(store.database().count(WORKBENCH_STATES).unwrap(), 1);
    }

    #[test]
    fn test_save_workbench_state_requires_load() {
        let store = memory_store();
        let result = store.save_workbench_state(&WorkbenchState::default());
        assert!(matches!(result, Err(PersistError::DocumentNotFound { .. })));
    }

    #[test]
    fn test_store_options_renumbers() {
        let store = memory_store();
        let mut entries = vec![
            OptionEntry { id: 40, name: "theme".to_string(), value: json!("dark") },
            OptionEntry { id: 7, name: "timeout".to_string(), value: json!(30) },
        ];
        store.store_options(&mut entries).unwrap();
        assert_eq!(entries.iter().map(|e| e.id).collect::<Vec<_>>(), vec![0, 1]);

        let mut fewer = vec![OptionEntry::new("proxy", json!(null))];
        store.store_options(&mut fewer).unwrap();

        let loaded = store.load_options().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, 0);
        assert_eq!(loaded[0].name, "proxy");
    }

    #[test]
    fn test_workspace_without_name_is_decode_error() {
        let store = memory_store();
        let mut document = Document::new();
        document.insert("id".to_string(), json!(3));
        store.database().insert(WORKSPACES, vec![document]).unwrap();

        assert!(matches!(
            store.list_workspace_names(),
            Err(PersistError::Decode { .. })
        ));
    }

    #[test]
    fn test_close_rejects_further_use() {
        let store = memory_store();
        let db = store.db.clone();
        store.close().unwrap();
        assert!(db.is_closed());
        assert!(db.count(OPTIONS).is_err());
    }

    #[test]
    fn test_open_store_rejects_invalid_config() {
        let config = StoreConfig::in_memory().with_compression_level(12);
        assert!(matches!(open_store(&config), Err(PersistError::Validation(_))));
    }
}

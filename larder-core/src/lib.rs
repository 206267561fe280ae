/*!
# Larder Core

Local persistence for desktop workbench state.

Everything an application session needs to survive a restart lives in one
compressed store file: the user's workspaces with their open requests, the
application options, and the workbench state singleton. The crate provides:

- An embedded, file-backed document store with write-through atomic saves
  and integrity verification
- Codecs between domain records and stored documents, including lenient
  decoding of request aspects whose type this build no longer knows
- Post-load repair of the shared active-request reference in workspaces
- A facade ([`WorkbenchStore`]) with one load/save operation per aggregate

## Architecture

Byte storage and compression are adapters behind the [`StorageAdapter`] and
[`CompressionAdapter`] traits, so the store runs against a file on disk or
against memory in tests. The facade owns one [`Database`] for its whole
lifetime; there is no global handle.

## Usage

```rust,no_run
use larder_core::{open_store, Request, StoreConfig, Workspace};

let store = open_store(&StoreConfig::at_path("database.db"))?;

let mut workspace = Workspace::new("api");
workspace.open_request(Request::new("list users"));
store.persist_workspace(&mut workspace)?;

let loaded = store.load_workspace_by_name("api")?.expect("just stored");
assert!(loaded.active_request.unwrap().ptr_eq(&loaded.open_requests[0]));

store.close()?;
# Ok::<(), larder_core::PersistError>(())
```
*/

pub mod codec;
pub mod compression;
pub mod config;
pub mod domain;
pub mod error;
pub mod identity;
pub mod manager;
pub mod observability;
pub mod repair;
pub mod storage;
pub mod store;

pub use codec::{AspectRegistry, Codec, JsonCodec, WorkspaceCodec};
pub use compression::{CompressionAdapter, GzipCompressor, NoCompression};
pub use config::{StorageBackend, StoreConfig};
pub use domain::{
    AuthAspect, BodyAspect, HeaderAspect, HeaderEntry, OptionEntry, Request, RequestAspect,
    SharedRequest, WorkbenchState, Workspace,
};
pub use error::{PersistError, Result};
pub use identity::{IdentityAssigner, RandomIdentity};
pub use manager::{open_default_store, open_store, WorkbenchStore};
pub use repair::repair;
pub use storage::{LocalFileStorage, MemoryStorage, StorageAdapter};
pub use store::{Collection, Database, Filter, StoreHeader};

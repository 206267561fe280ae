/*!
Domain records persisted by the store.

Only the fields the persistence layer relies on are modelled here: the
workspace/request ownership structure, the open aspect family, and the two
settings records.
*/

pub mod aspect;
pub mod request;
pub mod settings;
pub mod workspace;

pub use aspect::{AuthAspect, BodyAspect, HeaderAspect, HeaderEntry, RequestAspect, UNKNOWN_ASPECT};
pub use request::{Request, SharedRequest};
pub use settings::{OptionEntry, WorkbenchState};
pub use workspace::{Workspace, UNASSIGNED_ID};

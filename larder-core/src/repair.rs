/*!
Post-load reference repair for workspaces.
*/

use crate::domain::Workspace;
use tracing::debug;

/// Point the active slot at the open request with the same identifier
///
/// Serialization stores the active request as a separate copy, so a freshly
/// decoded workspace holds two unrelated instances. When an open request with
/// the active request's identifier exists, the active slot is replaced by that
/// very handle. Otherwise the decoded copy is left in place. Idempotent.
pub fn repair(mut workspace: Workspace) -> Workspace {
    let Some(active) = workspace.active_request.take() else {
        return workspace;
    };

    let active_id = active.id();
    let shared = workspace
        .open_requests
        .iter()
        .find(|request| request.ptr_eq(&active) || request.borrow().id == active_id)
        .cloned();

    workspace.active_request = match shared {
        Some(handle) => Some(handle),
        None => {
            debug!(
                workspace = %workspace.name,
                request = %active_id,
                "Active request is not among open requests, keeping detached copy"
            );
            Some(active)
        }
    };
    workspace
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Request, SharedRequest};

    fn detached(id: &str, name: &str) -> SharedRequest {
        SharedRequest::new(Request::with_id(id, name))
    }

    #[test]
    fn test_active_copy_is_replaced_by_open_entry() {
        let mut workspace = Workspace::new("w");
        workspace.open_requests = vec![detached("a", "first"), detached("b", "second")];
        workspace.active_request = Some(detached("b", "second"));

        let repaired = repair(workspace);
        let active = repaired.active_request.as_ref().unwrap();
        assert!(active.ptr_eq(&repaired.open_requests[1]));

        active.borrow_mut().name = "renamed".to_string();
        assert_eq!(repaired.open_requests[1].borrow().name, "renamed");
    }

    #[test]
    fn test_first_match_wins_on_duplicate_ids() {
        let mut workspace = Workspace::new("w");
        workspace.open_requests = vec![detached("a", "one"), detached("a", "two")];
        workspace.active_request = Some(detached("a", "two"));

        let repaired = repair(workspace);
        assert!(repaired
            .active_request
            .as_ref()
            .unwrap()
            .ptr_eq(&repaired.open_requests[0]));
    }

    #[test]
    fn test_unmatched_active_request_is_kept() {
        let copy = detached("gone", "removed");
        let mut workspace = Workspace::new("w");
        workspace.open_requests = vec![detached("a", "first")];
        workspace.active_request = Some(copy.clone());

        let repaired = repair(workspace);
        let active = repaired.active_request.as_ref().unwrap();
        assert!(active.ptr_eq(&copy));
        assert!(!active.ptr_eq(&repaired.open_requests[0]));
    }

    #[test]
    fn test_empty_open_requests() {
        let copy = detached("a", "only");
        let mut workspace = Workspace::new("w");
        workspace.active_request = Some(copy.clone());

        let repaired = repair(workspace);
        assert!(repaired.active_request.as_ref().unwrap().ptr_eq(&copy));
    }

    #[test]
    fn test_no_active_request() {
        let mut workspace = Workspace::new("w");
        workspace.open_requests = vec![detached("a", "first")];
        assert!(repair(workspace).active_request.is_none());
    }

    #[test]
    fn test_repair_is_idempotent() {
        let mut workspace = Workspace::new("w");
        workspace.open_requests = vec![detached("a", "first"), detached("b", "second")];
        workspace.active_request = Some(detached("a", "first"));

        let once = repair(workspace);
        let first_target = once.active_request.clone().unwrap();
        let twice = repair(once);

        assert!(twice.active_request.as_ref().unwrap().ptr_eq(&first_target));
        assert!(twice.active_request.as_ref().unwrap().ptr_eq(&twice.open_requests[0]));
    }
}

/*!
The workspace aggregate.
*/

use super::request::{Request, SharedRequest};

/// Identifier of a workspace that has never been persisted
pub const UNASSIGNED_ID: i64 = 0;

/// A named set of open requests, one of which may be active
///
/// `open_requests` owns its entries. `active_request`, when set, should be a
/// clone of one of those handles; after a load this holds whenever the active
/// request's identifier appears in `open_requests`.
#[derive(Debug, Clone)]
pub struct Workspace {
    /// Permanent identifier, [`UNASSIGNED_ID`] until first persisted
    pub id: i64,
    pub name: String,
    pub open_requests: Vec<SharedRequest>,
    pub active_request: Option<SharedRequest>,
}

impl Workspace {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            id: UNASSIGNED_ID,
            name: name.into(),
            open_requests: Vec::new(),
            active_request: None,
        }
    }

    pub fn is_persisted(&self) -> bool {
        self.id != UNASSIGNED_ID
    }

    /// Open a request and make it the active one
    pub fn open_request(&mut self, request: Request) -> SharedRequest {
        let handle = SharedRequest::new(request);
        self.open_requests.push(handle.clone());
        self.active_request = Some(handle.clone());
        handle
    }

    pub fn find_request(&self, id: &str) -> Option<&SharedRequest> {
        self.open_requests.iter().find(|r| r.borrow().id == id)
    }

    /// Make the open request with `id` active; returns false if it is not open
    pub fn activate(&mut self, id: &str) -> bool {
        match self.find_request(id).cloned() {
            Some(handle) => {
                self.active_request = Some(handle);
                true
            }
            None => false,
        }
    }

    /// Close the open request with `id`
    ///
    /// If it was active, the last remaining open request becomes active.
    pub fn close_request(&mut self, id: &str) -> Option<SharedRequest> {
        let position = self
            .open_requests
            .iter()
            .position(|r| r.borrow().id == id)?;
        let closed = self.open_requests.remove(position);

        let was_active = self
            .active_request
            .as_ref()
            .map_or(false, |active| active.ptr_eq(&closed));
        if was_active {
            self.active_request = self.open_requests.last().cloned();
        }
        Some(closed)
    }
}

/*!
Requests and the shared handle through which a workspace refers to them.
*/

use super::aspect::RequestAspect;
use std::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;
use uuid::Uuid;

/// A request opened in a workspace
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    /// Identifier, unique within the owning workspace
    pub id: String,
    pub name: String,
    pub aspects: Vec<RequestAspect>,
}

impl Request {
    /// Create a request with a fresh random identifier
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), name)
    }

    pub fn with_id<I: Into<String>, S: Into<String>>(id: I, name: S) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            aspects: Vec::new(),
        }
    }

    pub fn with_aspect(mut self, aspect: RequestAspect) -> Self {
        self.aspects.push(aspect);
        self
    }
}

/// Shared, mutable handle to a [`Request`]
///
/// Cloning the handle does not copy the request. Two handles are the same
/// request when [`SharedRequest::ptr_eq`] holds, and a mutation through one
/// is visible through the other.
#[derive(Debug, Clone)]
pub struct SharedRequest(Rc<RefCell<Request>>);

impl SharedRequest {
    pub fn new(request: Request) -> Self {
        Self(Rc::new(RefCell::new(request)))
    }

    pub fn borrow(&self) -> Ref<'_, Request> {
        self.0.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, Request> {
        self.0.borrow_mut()
    }

    pub fn id(&self) -> String {
        self.0.borrow().id.clone()
    }

    /// Whether both handles point at the same request instance
    pub fn ptr_eq(&self, other: &SharedRequest) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl From<Request> for SharedRequest {
    fn from(request: Request) -> Self {
        SharedRequest::new(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_requests_get_distinct_ids() {
        let a = Request::new("list users");
        let b = Request::new("list users");
        assert_ne!(a.id, b.id);
        assert!(!a.id.is_empty());
    }

    #[test]
    fn test_cloned_handle_is_same_request() {
        let handle = SharedRequest::new(Request::with_id("r1", "ping"));
        let alias = handle.clone();
        assert!(handle.ptr_eq(&alias));

        alias.borrow_mut().name = "pong".to_string();
        assert_eq!(handle.borrow().name, "pong");
    }

    #[test]
    fn test_equal_values_are_not_identical() {
        let a = SharedRequest::new(Request::with_id("r1", "ping"));
        let b = SharedRequest::new(Request::with_id("r1", "ping"));
        assert_eq!(*a.borrow(), *b.borrow());
        assert!(!a.ptr_eq(&b));
    }
}

/*!
Workspace documents.
*/

use super::aspect::{encode_aspect, AspectRegistry};
use super::{into_document, Codec};
use crate::domain::{Request, SharedRequest, Workspace};
use crate::repair::repair;
use crate::store::Document;
use crate::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug_span;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WorkspaceRecord {
    id: i64,
    name: String,
    #[serde(default)]
    open_requests: Vec<RequestRecord>,
    #[serde(default)]
    active_request: Option<RequestRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
struct RequestRecord {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    aspects: Vec<Value>,
}

/// Codec for [`Workspace`] documents
///
/// The active request is written as its own copy next to the open requests.
/// Decoding resolves aspects through the codec's [`AspectRegistry`] and then
/// runs [`repair`] so the active slot shares identity with its open entry.
#[derive(Debug, Clone, Default)]
pub struct WorkspaceCodec {
    registry: AspectRegistry,
}

impl WorkspaceCodec {
    pub fn new(registry: AspectRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &AspectRegistry {
        &self.registry
    }

    fn encode_request(&self, request: &SharedRequest) -> Result<RequestRecord> {
        let request = request.borrow();
        let aspects = request
            .aspects
            .iter()
            .map(encode_aspect)
            .collect::<serde_json::Result<Vec<_>>>()?;
        Ok(RequestRecord {
            id: request.id.clone(),
            name: request.name.clone(),
            aspects,
        })
    }

    fn decode_request(&self, record: RequestRecord) -> Result<SharedRequest> {
        let aspects = record
            .aspects
            .into_iter()
            .map(|aspect| self.registry.decode(aspect))
            .collect::<serde_json::Result<Vec<_>>>()?;
        Ok(SharedRequest::new(Request {
            id: record.id,
            name: record.name,
            aspects,
        }))
    }
}

impl Codec<Workspace> for WorkspaceCodec {
    fn encode(&self, workspace: &Workspace) -> Result<Document> {
        let record = WorkspaceRecord {
            id: workspace.id,
            name: workspace.name.clone(),
            open_requests: workspace
                .open_requests
                .iter()
                .map(|request| self.encode_request(request))
                .collect::<Result<_>>()?,
            active_request: workspace
                .active_request
                .as_ref()
                .map(|request| self.encode_request(request))
                .transpose()?,
        };
        into_document(serde_json::to_value(record)?)
    }

    fn decode(&self, document: Document) -> Result<Workspace> {
        let record: WorkspaceRecord = serde_json::from_value(Value::Object(document))?;
        let span = debug_span!("decode_workspace", id = record.id, name = %record.name);
        let _enter = span.enter();

        let open_requests = record
            .open_requests
            .into_iter()
            .map(|request| self.decode_request(request))
            .collect::<Result<_>>()?;
        let active_request = record
            .active_request
            .map(|request| self.decode_request(request))
            .transpose()?;

        Ok(repair(Workspace {
            id: record.id,
            name: record.name,
            open_requests,
            active_request,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AuthAspect, BodyAspect, HeaderAspect, HeaderEntry, RequestAspect};
    use crate::PersistError;
    use serde_json::json;

    fn sample_workspace() -> Workspace {
        let mut workspace = Workspace::new("api");
        workspace.id = 41;
        workspace.open_request(
            Request::with_id("r1", "users").with_aspect(RequestAspect::Headers(HeaderAspect {
                entries: vec![HeaderEntry::new("Accept", "application/json")],
            })),
        );
        workspace.open_request(
            Request::with_id("r2", "login")
                .with_aspect(RequestAspect::Body(BodyAspect {
                    content_type: Some("application/json".to_string()),
                    body: "{}".to_string(),
                }))
                .with_aspect(RequestAspect::Auth(AuthAspect {
                    scheme: "basic".to_string(),
                    ..AuthAspect::default()
                })),
        );
        workspace
    }

    #[test]
    fn test_encoded_layout() {
        let document = WorkspaceCodec::default().encode(&sample_workspace()).unwrap();

        assert_eq!(document["id"], json!(41));
        assert_eq!(document["openRequests"].as_array().unwrap().len(), 2);
        assert_eq!(document["activeRequest"]["id"], json!("r2"));
        assert_eq!(
            document["openRequests"][1]["aspects"][0]["@type"],
            json!("body")
        );
        assert_eq!(
            document["openRequests"][1]["aspects"][0]["contentType"],
            json!("application/json")
        );
    }

    #[test]
    fn test_decode_restores_shared_active_request() {
        let codec = WorkspaceCodec::default();
        let original = sample_workspace();
        let decoded = codec.decode(codec.encode(&original).unwrap()).unwrap();

        assert_eq!(decoded.id, 41);
        assert_eq!(decoded.name, "api");
        let active = decoded.active_request.as_ref().unwrap();
        assert!(active.ptr_eq(&decoded.open_requests[1]));
        assert_eq!(
            *decoded.open_requests[1].borrow(),
            *original.open_requests[1].borrow()
        );
    }

    #[test]
    fn test_workspace_without_active_request() {
        let codec = WorkspaceCodec::default();
        let document = json!({"id": 9, "name": "empty"}).as_object().cloned().unwrap();
        let decoded = codec.decode(document).unwrap();

        assert!(decoded.open_requests.is_empty());
        assert!(decoded.active_request.is_none());
        assert!(codec.encode(&decoded).unwrap()["activeRequest"].is_null());
    }

    #[test]
    fn test_unknown_aspect_keeps_siblings() {
        let document = json!({
            "id": 5,
            "name": "legacy",
            "openRequests": [{
                "id": "r1",
                "name": "old",
                "aspects": [
                    {"@type": "scripting", "source": "print(1)"},
                    {"@type": "body", "body": "payload"}
                ]
            }],
            "activeRequest": {"id": "r1", "name": "old", "aspects": []}
        });
        let decoded = WorkspaceCodec::default()
            .decode(document.as_object().cloned().unwrap())
            .unwrap();

        let request = decoded.open_requests[0].borrow();
        assert_eq!(request.aspects[0], RequestAspect::Unknown);
        assert_eq!(
            request.aspects[1],
            RequestAspect::Body(BodyAspect {
                content_type: None,
                body: "payload".to_string(),
            })
        );
    }

    #[test]
    fn test_malformed_field_is_an_error() {
        let document = json!({"id": "not-a-number", "name": "bad"});
        let result = WorkspaceCodec::default().decode(document.as_object().cloned().unwrap());
        assert!(matches!(result, Err(PersistError::Json(_))));
    }

    #[test]
    fn test_aspect_without_discriminator_is_an_error() {
        let document = json!({
            "id": 5,
            "name": "bad",
            "openRequests": [{"id": "r1", "aspects": [{"body": "x"}]}]
        });
        let result = WorkspaceCodec::default().decode(document.as_object().cloned().unwrap());
        assert!(matches!(result, Err(PersistError::Json(_))));
    }
}

//! The request handed to the engine, built from an AdmissionReview

use kube::core::admission::{AdmissionRequest as ReviewRequest, AdmissionResponse};
use kube::core::{DynamicObject, Status, TypeMeta};

use crate::error::ReviewError;

/// `apiVersion` of the AdmissionReview envelope
pub const ADMISSION_REVIEW_API_VERSION: &str = "admission.k8s.io/v1";

/// `kind` of the AdmissionReview envelope
pub const ADMISSION_REVIEW_KIND: &str = "AdmissionReview";

/// One admission request, as the engine sees it
///
/// Carries the response skeleton for the request, so every answer echoes the
/// request's uid and envelope version.
#[derive(Debug, Clone)]
pub struct AdmissionRequest {
    /// Identifier echoed in the response
    pub uid: String,
    /// Namespace of the object, if namespaced
    pub namespace: Option<String>,
    /// Name of the object, if already known
    pub name: Option<String>,
    /// Operation being admitted (`Create`, `Update`, ...)
    pub operation: Option<String>,
    /// Raw serialized object (kind descriptor plus instance data)
    pub object: Vec<u8>,
    base: AdmissionResponse,
}

impl AdmissionRequest {
    /// Request for `object` with the given UID
    pub fn new(uid: impl Into<String>, object: impl Into<Vec<u8>>) -> Self {
        let uid = uid.into();
        let mut base = AdmissionResponse::invalid(String::new());
        base.types = TypeMeta {
            api_version: ADMISSION_REVIEW_API_VERSION.to_string(),
            kind: ADMISSION_REVIEW_KIND.to_string(),
        };
        base.uid = uid.clone();
        base.allowed = true;
        base.result = Status::default();

        Self {
            uid,
            namespace: None,
            name: None,
            operation: None,
            object: object.into(),
            base,
        }
    }

    /// Set the namespace
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Set the name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// `namespace/name` for log fields
    pub fn display_name(&self) -> String {
        format!(
            "{}/{}",
            self.namespace.as_deref().unwrap_or_default(),
            self.name.as_deref().unwrap_or_default()
        )
    }

    /// Allowing response for this request, without a patch
    pub fn response(&self) -> AdmissionResponse {
        self.base.clone()
    }
}

impl TryFrom<&ReviewRequest<DynamicObject>> for AdmissionRequest {
    type Error = ReviewError;

    fn try_from(req: &ReviewRequest<DynamicObject>) -> Result<Self, Self::Error> {
        let object = req
            .object
            .as_ref()
            .ok_or_else(|| ReviewError::decode("admission request has no object"))?;
        let object = serde_json::to_vec(object).map_err(|e| ReviewError::decode(e.to_string()))?;

        Ok(Self {
            uid: req.uid.clone(),
            namespace: req.namespace.clone(),
            name: (!req.name.is_empty()).then(|| req.name.clone()),
            operation: Some(format!("{:?}", req.operation)),
            object,
            base: AdmissionResponse::from(req),
        })
    }
}

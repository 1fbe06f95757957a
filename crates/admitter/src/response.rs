//! Building admission responses and the denial responder

use kube::core::admission::AdmissionResponse;
use tracing::error;

use crate::error::ReviewError;

/// Message used when an error renders to an empty string
pub const FALLBACK_DENIAL_MESSAGE: &str = "admission review failed";

/// Allow the request answered by `base`, applying `patch`
///
/// The patch type is set even when `patch` is an empty operation list.
pub fn allow_with_patch(
    base: AdmissionResponse,
    patch: json_patch::Patch,
) -> Result<AdmissionResponse, ReviewError> {
    base.with_patch(patch).map_err(|e| ReviewError::patch_build(e.to_string()))
}

/// Convert a review failure into a denial of the request answered by `base`
///
/// This is the single sink for every failure path: it cannot fail and always
/// yields a patch-free denial carrying a non-empty message.
pub fn to_denial(base: AdmissionResponse, err: &ReviewError) -> AdmissionResponse {
    error!(uid = %base.uid, category = err.category(), error = %err, "admission webhook error");
    let mut message = err.to_string();
    if message.is_empty() {
        message = FALLBACK_DENIAL_MESSAGE.to_string();
    }
    base.deny(message)
}

/// Read access to the decision carried by an [`AdmissionResponse`]
pub trait AdmissionResponseExt {
    /// Denial message, if this is a denial
    fn message(&self) -> Option<&str>;

    /// Decode the patch into operations, if the response carries one
    fn patch_operations(&self) -> Option<Result<json_patch::Patch, serde_json::Error>>;
}

impl AdmissionResponseExt for AdmissionResponse {
    fn message(&self) -> Option<&str> {
        (!self.allowed).then_some(self.result.message.as_str())
    }

    fn patch_operations(&self) -> Option<Result<json_patch::Patch, serde_json::Error>> {
        self.patch.as_deref().map(serde_json::from_slice)
    }
}

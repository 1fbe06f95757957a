//! Decoding of raw admission objects
//!
//! Two strategies share the [`TypeResolver`] contract:
//! - [`DynamicResolver`]: reads the kind descriptor from the payload and
//!   looks it up in a [`TypeCatalog`]
//! - [`StaticResolver`]: always decodes one predetermined kind

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use kube::core::GroupVersionKind;
use serde::Deserialize;

use crate::catalog::TypeCatalog;
use crate::error::ReviewError;
use crate::object::{AnyObject, Object, TypedObject};

/// Decodes raw request bytes into a reviewable object
///
/// Resolvers are built once and shared read-only across concurrent reviews.
pub trait TypeResolver: Send + Sync {
    /// Object type produced by this resolver
    type Object: Object;

    /// Decode `raw` into a fresh object
    fn decode(&self, raw: &[u8]) -> Result<Self::Object, ReviewError>;
}

/// `apiVersion` and `kind` of a payload, both optional
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KindHeader {
    #[serde(default)]
    api_version: Option<String>,
    #[serde(default)]
    kind: Option<String>,
}

impl KindHeader {
    fn read(raw: &[u8]) -> Result<Self, ReviewError> {
        serde_json::from_slice(raw).map_err(|e| ReviewError::decode(e.to_string()))
    }
}

/// Split an `apiVersion` into its group and version
///
/// The core group has no prefix: `v1` is group `""`, version `v1`.
pub fn split_api_version(api_version: &str) -> (&str, &str) {
    match api_version.split_once('/') {
        Some((group, version)) => (group, version),
        None => ("", api_version),
    }
}

/// Resolver for webhooks that receive many kinds
#[derive(Debug, Clone)]
pub struct DynamicResolver {
    catalog: Arc<TypeCatalog>,
}

impl DynamicResolver {
    /// Create a resolver over a prebuilt catalog
    pub fn new(catalog: Arc<TypeCatalog>) -> Self {
        Self { catalog }
    }

    /// Resolver over the built-in Kubernetes kinds
    pub fn kubernetes() -> Self {
        Self::new(Arc::new(TypeCatalog::kubernetes()))
    }

    /// The catalog used for lookups
    pub fn catalog(&self) -> &TypeCatalog {
        &self.catalog
    }
}

impl TypeResolver for DynamicResolver {
    type Object = AnyObject;

    fn decode(&self, raw: &[u8]) -> Result<AnyObject, ReviewError> {
        let header = KindHeader::read(raw)?;
        let (api_version, kind) = match (header.api_version, header.kind) {
            (Some(api_version), Some(kind)) if !api_version.is_empty() && !kind.is_empty() => {
                (api_version, kind)
            }
            _ => {
                return Err(ReviewError::decode(
                    "object has no apiVersion/kind, cannot resolve its type",
                ))
            }
        };

        let (group, version) = split_api_version(&api_version);
        let gvk = GroupVersionKind::gvk(group, version, &kind);
        let descriptor = format!("{api_version}/{kind}");

        let decode = self.catalog.lookup(&gvk).ok_or_else(|| {
            ReviewError::decode_for_kind(&descriptor, format!("no kind {descriptor} is registered"))
        })?;

        decode(raw).map_err(|e| ReviewError::decode_for_kind(descriptor, e.to_string()))
    }
}

/// Resolver for webhooks bound to a single kind `K`
///
/// The kind is fixed at compile time, so a successful decode always yields
/// exactly a `K`. Payloads naming another kind are rejected.
pub struct StaticResolver<K> {
    _kind: PhantomData<fn() -> K>,
}

impl<K: TypedObject> StaticResolver<K> {
    /// Create a resolver for `K`
    pub fn new() -> Self {
        Self { _kind: PhantomData }
    }

    /// Create a resolver for the type of `prototype`
    ///
    /// Only the type is captured; the value itself is not retained.
    pub fn from_prototype(_prototype: &K) -> Self {
        Self::new()
    }

    fn check_kind(header: &KindHeader) -> Result<(), ReviewError> {
        let expected_kind = K::kind(&());
        let expected_api_version = K::api_version(&());

        let kind_mismatch = header
            .kind
            .as_deref()
            .is_some_and(|kind| kind != expected_kind);
        let version_mismatch = header
            .api_version
            .as_deref()
            .is_some_and(|api_version| api_version != expected_api_version);

        if kind_mismatch || version_mismatch {
            let found = format!(
                "{}/{}",
                header.api_version.as_deref().unwrap_or_default(),
                header.kind.as_deref().unwrap_or_default()
            );
            return Err(ReviewError::decode_for_kind(
                &found,
                format!("expected {expected_api_version}/{expected_kind}, got {found}"),
            ));
        }
        Ok(())
    }
}

impl<K: TypedObject> Default for StaticResolver<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: TypedObject> Clone for StaticResolver<K> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<K: TypedObject> fmt::Debug for StaticResolver<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticResolver")
            .field("kind", &K::kind(&()))
            .field("api_version", &K::api_version(&()))
            .finish()
    }
}

impl<K: TypedObject> TypeResolver for StaticResolver<K> {
    type Object = K;

    fn decode(&self, raw: &[u8]) -> Result<K, ReviewError> {
        let header = KindHeader::read(raw)?;
        Self::check_kind(&header)?;
        serde_json::from_slice::<K>(raw).map_err(|e| ReviewError::decode(e.to_string()))
    }
}

//! Resource objects the engine can review
//!
//! [`Object`] is the capability every reviewable resource exposes: its
//! identity (kind descriptor plus name/namespace), its metadata, an explicit
//! deep copy, and a canonical JSON encoding.
//!
//! Two families implement it:
//! - every typed resource (k8s-openapi kinds, kube-derived CRDs) through
//!   [`TypedObject`]
//! - [`AnyObject`], the type-erased object produced by dynamic decoding

use std::any::Any;
use std::fmt;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::core::GroupVersionKind;
use kube::Resource;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Identity of a resource: its kind descriptor plus instance coordinates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectIdentity {
    /// `apiVersion` of the resource (e.g. `apps/v1`)
    pub api_version: String,
    /// `kind` of the resource (e.g. `Deployment`)
    pub kind: String,
    /// Namespace, when the object carries one
    pub namespace: Option<String>,
    /// Name, when the object carries one
    pub name: Option<String>,
}

impl ObjectIdentity {
    /// `apiVersion/kind` form used in log fields and error messages
    pub fn type_descriptor(&self) -> String {
        format!("{}/{}", self.api_version, self.kind)
    }

    /// Whether both identities describe the same kind
    pub fn same_kind(&self, other: &ObjectIdentity) -> bool {
        self.api_version == other.api_version && self.kind == other.kind
    }
}

impl fmt::Display for ObjectIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_descriptor())?;
        match (&self.namespace, &self.name) {
            (Some(ns), Some(name)) => write!(f, " {ns}/{name}"),
            (None, Some(name)) => write!(f, " {name}"),
            _ => Ok(()),
        }
    }
}

/// Capability shared by every resource the engine can review
pub trait Object: Send + Sync + 'static {
    /// Kind descriptor and instance coordinates
    fn identity(&self) -> ObjectIdentity;

    /// Standard object metadata
    fn metadata(&self) -> &ObjectMeta;

    /// Mutable access to the standard object metadata
    fn metadata_mut(&mut self) -> &mut ObjectMeta;

    /// Independent copy of this object
    ///
    /// The copy shares no mutable state with `self`: changing any nested
    /// container of one (labels, lists, maps, sub-objects) is never visible
    /// through the other.
    fn deep_copy(&self) -> Self
    where
        Self: Sized;

    /// Canonical JSON encoding
    ///
    /// Two objects of the same kind always encode their fields in the same
    /// order, which is what makes byte-level diffing meaningful.
    fn to_canonical_json(&self) -> Result<Vec<u8>, serde_json::Error>;
}

/// Statically typed resource: a kube [`Resource`] with serde support
///
/// Implemented automatically for every k8s-openapi kind and every type
/// derived with `kube::CustomResource`.
pub trait TypedObject:
    Resource<DynamicType = ()> + Serialize + DeserializeOwned + Clone + Send + Sync + 'static
{
}

impl<K> TypedObject for K where
    K: Resource<DynamicType = ()> + Serialize + DeserializeOwned + Clone + Send + Sync + 'static
{
}

/// Kind descriptor of a typed resource
pub fn gvk_of<K: TypedObject>() -> GroupVersionKind {
    GroupVersionKind::gvk(&K::group(&()), &K::version(&()), &K::kind(&()))
}

impl<K: TypedObject> Object for K {
    fn identity(&self) -> ObjectIdentity {
        let meta = self.meta();
        ObjectIdentity {
            api_version: K::api_version(&()).into_owned(),
            kind: K::kind(&()).into_owned(),
            namespace: meta.namespace.clone(),
            name: meta.name.clone(),
        }
    }

    fn metadata(&self) -> &ObjectMeta {
        self.meta()
    }

    fn metadata_mut(&mut self) -> &mut ObjectMeta {
        self.meta_mut()
    }

    fn deep_copy(&self) -> Self {
        // Typed resources own all of their data, so Clone is a deep copy.
        self.clone()
    }

    fn to_canonical_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

/// Object-safe view over a [`TypedObject`], used to erase the concrete type
trait ErasedObject: Send + Sync {
    fn erased_identity(&self) -> ObjectIdentity;
    fn erased_metadata(&self) -> &ObjectMeta;
    fn erased_metadata_mut(&mut self) -> &mut ObjectMeta;
    fn boxed_copy(&self) -> Box<dyn ErasedObject>;
    fn erased_json(&self) -> Result<Vec<u8>, serde_json::Error>;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<K: TypedObject> ErasedObject for K {
    fn erased_identity(&self) -> ObjectIdentity {
        Object::identity(self)
    }

    fn erased_metadata(&self) -> &ObjectMeta {
        self.meta()
    }

    fn erased_metadata_mut(&mut self) -> &mut ObjectMeta {
        self.meta_mut()
    }

    fn boxed_copy(&self) -> Box<dyn ErasedObject> {
        Box::new(self.deep_copy())
    }

    fn erased_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        Object::to_canonical_json(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A resource of any kind registered in a [`crate::TypeCatalog`]
///
/// Mutators recover the concrete type with [`AnyObject::downcast_mut`], or
/// work on the shared [`Object`] capability (labels, annotations, ...)
/// without knowing the kind at all.
pub struct AnyObject {
    inner: Box<dyn ErasedObject>,
}

impl AnyObject {
    /// Wrap a typed resource
    pub fn new<K: TypedObject>(object: K) -> Self {
        Self {
            inner: Box::new(object),
        }
    }

    /// Whether the wrapped resource is a `K`
    pub fn is<K: TypedObject>(&self) -> bool {
        self.inner.as_any().is::<K>()
    }

    /// Borrow the wrapped resource as a `K`
    pub fn downcast_ref<K: TypedObject>(&self) -> Option<&K> {
        self.inner.as_any().downcast_ref::<K>()
    }

    /// Mutably borrow the wrapped resource as a `K`
    pub fn downcast_mut<K: TypedObject>(&mut self) -> Option<&mut K> {
        self.inner.as_any_mut().downcast_mut::<K>()
    }
}

impl fmt::Debug for AnyObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnyObject")
            .field("identity", &self.inner.erased_identity())
            .finish_non_exhaustive()
    }
}

impl Clone for AnyObject {
    fn clone(&self) -> Self {
        self.deep_copy()
    }
}

impl Object for AnyObject {
    fn identity(&self) -> ObjectIdentity {
        self.inner.erased_identity()
    }

    fn metadata(&self) -> &ObjectMeta {
        self.inner.erased_metadata()
    }

    fn metadata_mut(&mut self) -> &mut ObjectMeta {
        self.inner.erased_metadata_mut()
    }

    fn deep_copy(&self) -> Self {
        Self {
            inner: self.inner.boxed_copy(),
        }
    }

    fn to_canonical_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        self.inner.erased_json()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::apps::v1::Deployment;
    use k8s_openapi::api::core::v1::{ConfigMap, Pod};
    use std::collections::BTreeMap;

    fn config_map(name: &str) -> ConfigMap {
        ConfigMap {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some("default".to_string()),
                labels: Some(BTreeMap::from([("tier".to_string(), "web".to_string())])),
                ..Default::default()
            },
            data: Some(BTreeMap::from([("key".to_string(), "value".to_string())])),
            ..Default::default()
        }
    }

    #[test]
    fn typed_identity_uses_kind_descriptor() {
        let cm = config_map("settings");
        let id = Object::identity(&cm);
        assert_eq!(id.api_version, "v1");
        assert_eq!(id.kind, "ConfigMap");
        assert_eq!(id.namespace.as_deref(), Some("default"));
        assert_eq!(id.name.as_deref(), Some("settings"));
        assert_eq!(id.to_string(), "v1/ConfigMap default/settings");
    }

    #[test]
    fn gvk_of_grouped_kind() {
        let gvk = gvk_of::<Deployment>();
        assert_eq!(gvk.group, "apps");
        assert_eq!(gvk.version, "v1");
        assert_eq!(gvk.kind, "Deployment");
    }

    /// Story: Mutating the copy never leaks into the diff baseline
    #[test]
    fn story_deep_copy_shares_no_nested_state() {
        let original = config_map("settings");
        let mut copy = original.deep_copy();

        copy.metadata
            .labels
            .get_or_insert_with(BTreeMap::new)
            .insert("tier".to_string(), "db".to_string());
        copy.data
            .get_or_insert_with(BTreeMap::new)
            .insert("extra".to_string(), "1".to_string());

        assert_eq!(original.metadata.labels.as_ref().unwrap()["tier"], "web");
        assert!(!original.data.as_ref().unwrap().contains_key("extra"));
    }

    #[test]
    fn any_object_deep_copy_is_independent() {
        let original = AnyObject::new(config_map("settings"));
        let mut copy = original.deep_copy();

        copy.downcast_mut::<ConfigMap>()
            .unwrap()
            .data
            .get_or_insert_with(BTreeMap::new)
            .insert("extra".to_string(), "1".to_string());

        let untouched = original.downcast_ref::<ConfigMap>().unwrap();
        assert!(!untouched.data.as_ref().unwrap().contains_key("extra"));
    }

    #[test]
    fn any_object_downcasts_only_to_its_kind() {
        let mut obj = AnyObject::new(config_map("settings"));
        assert!(obj.is::<ConfigMap>());
        assert!(!obj.is::<Pod>());
        assert!(obj.downcast_mut::<Pod>().is_none());
        assert_eq!(obj.identity().kind, "ConfigMap");
        assert!(format!("{obj:?}").contains("ConfigMap"));
    }

    #[test]
    fn erased_and_typed_encodings_match() {
        let cm = config_map("settings");
        let erased = AnyObject::new(cm.clone());
        assert_eq!(
            Object::to_canonical_json(&cm).unwrap(),
            erased.to_canonical_json().unwrap()
        );
    }

    #[test]
    fn same_kind_ignores_instance_coordinates() {
        let a = Object::identity(&config_map("a"));
        let b = Object::identity(&config_map("b"));
        assert!(a.same_kind(&b));
        assert!(!a.same_kind(&Object::identity(&Pod::default())));
    }
}

//! Catalog of kinds the dynamic resolver can decode
//!
//! The catalog is an explicit, immutable registry: it is built once at
//! startup, then shared read-only (usually through an `Arc`) by every review.
//! Nothing is registered globally.

use std::collections::HashMap;
use std::fmt;

use kube::core::GroupVersionKind;

use crate::object::{gvk_of, AnyObject, TypedObject};

/// Decodes raw JSON into a type-erased object of one registered kind
pub type DecodeFn = fn(&[u8]) -> Result<AnyObject, serde_json::Error>;

fn decode_as<K: TypedObject>(raw: &[u8]) -> Result<AnyObject, serde_json::Error> {
    serde_json::from_slice::<K>(raw).map(AnyObject::new)
}

/// Mapping from kind descriptor to object constructor
#[derive(Clone, Default)]
pub struct TypeCatalog {
    kinds: HashMap<GroupVersionKind, DecodeFn>,
}

impl TypeCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `K` under its own kind descriptor
    ///
    /// Registering the same kind twice keeps the last registration.
    pub fn register<K: TypedObject>(&mut self) -> &mut Self {
        self.kinds.insert(gvk_of::<K>(), decode_as::<K>);
        self
    }

    /// Builder form of [`TypeCatalog::register`]
    pub fn with<K: TypedObject>(mut self) -> Self {
        self.register::<K>();
        self
    }

    /// Constructor registered for `gvk`, if any
    pub fn lookup(&self, gvk: &GroupVersionKind) -> Option<DecodeFn> {
        self.kinds.get(gvk).copied()
    }

    /// Whether `gvk` is registered
    pub fn contains(&self, gvk: &GroupVersionKind) -> bool {
        self.kinds.contains_key(gvk)
    }

    /// Number of registered kinds
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    /// Whether no kind is registered
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    /// Catalog covering the built-in Kubernetes kinds
    ///
    /// Covers the workload, networking, configuration, RBAC, policy, storage,
    /// scheduling and cluster-administration kinds served by a stock API
    /// server. Custom resources can be added with [`TypeCatalog::register`].
    pub fn kubernetes() -> Self {
        use k8s_openapi::api::{
            admissionregistration, apps, autoscaling, batch, certificates, coordination, discovery,
            events, networking, node, policy, rbac, scheduling, storage,
        };
        use k8s_openapi::api::core::v1 as corev1;
        use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions;

        let mut catalog = Self::new();
        catalog
            // core/v1
            .register::<corev1::ConfigMap>()
            .register::<corev1::Endpoints>()
            .register::<corev1::Event>()
            .register::<corev1::LimitRange>()
            .register::<corev1::Namespace>()
            .register::<corev1::Node>()
            .register::<corev1::PersistentVolume>()
            .register::<corev1::PersistentVolumeClaim>()
            .register::<corev1::Pod>()
            .register::<corev1::PodTemplate>()
            .register::<corev1::ReplicationController>()
            .register::<corev1::ResourceQuota>()
            .register::<corev1::Secret>()
            .register::<corev1::Service>()
            .register::<corev1::ServiceAccount>()
            // apps/v1
            .register::<apps::v1::ControllerRevision>()
            .register::<apps::v1::DaemonSet>()
            .register::<apps::v1::Deployment>()
            .register::<apps::v1::ReplicaSet>()
            .register::<apps::v1::StatefulSet>()
            // batch/v1
            .register::<batch::v1::CronJob>()
            .register::<batch::v1::Job>()
            // autoscaling
            .register::<autoscaling::v1::HorizontalPodAutoscaler>()
            .register::<autoscaling::v2::HorizontalPodAutoscaler>()
            // networking.k8s.io/v1
            .register::<networking::v1::Ingress>()
            .register::<networking::v1::IngressClass>()
            .register::<networking::v1::NetworkPolicy>()
            // policy/v1
            .register::<policy::v1::PodDisruptionBudget>()
            // rbac.authorization.k8s.io/v1
            .register::<rbac::v1::ClusterRole>()
            .register::<rbac::v1::ClusterRoleBinding>()
            .register::<rbac::v1::Role>()
            .register::<rbac::v1::RoleBinding>()
            // storage.k8s.io/v1
            .register::<storage::v1::CSIDriver>()
            .register::<storage::v1::CSINode>()
            .register::<storage::v1::StorageClass>()
            .register::<storage::v1::VolumeAttachment>()
            // cluster administration
            .register::<scheduling::v1::PriorityClass>()
            .register::<coordination::v1::Lease>()
            .register::<discovery::v1::EndpointSlice>()
            .register::<events::v1::Event>()
            .register::<node::v1::RuntimeClass>()
            .register::<certificates::v1::CertificateSigningRequest>()
            .register::<admissionregistration::v1::MutatingWebhookConfiguration>()
            .register::<admissionregistration::v1::ValidatingWebhookConfiguration>()
            .register::<apiextensions::v1::CustomResourceDefinition>();
        catalog
    }
}

impl fmt::Debug for TypeCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeCatalog")
            .field("kinds", &self.kinds.len())
            .finish()
    }
}

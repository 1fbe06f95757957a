//! Mutators: the externally supplied transformation applied during review
//!
//! A [`Mutator`] receives an independent copy of the decoded object and may
//! change it in place or replace it wholesale (`*obj = new_value`). Whatever
//! the object looks like when `mutate` returns `Ok` is what the patch is
//! computed against.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::context::ReviewContext;
use crate::error::MutationError;
use crate::object::Object;

/// Transformation applied to objects of type `K`
#[async_trait]
pub trait Mutator<K: Send + 'static>: Send + Sync {
    /// Mutate `obj`; an error denies the admission request
    async fn mutate(&self, ctx: &ReviewContext, obj: &mut K) -> Result<(), MutationError>;

    /// Whether `mutate` does blocking work and needs a thread of its own
    fn is_blocking(&self) -> bool {
        false
    }
}

#[async_trait]
impl<K, M> Mutator<K> for Arc<M>
where
    K: Send + 'static,
    M: Mutator<K> + ?Sized,
{
    async fn mutate(&self, ctx: &ReviewContext, obj: &mut K) -> Result<(), MutationError> {
        (**self).mutate(ctx, obj).await
    }

    fn is_blocking(&self) -> bool {
        (**self).is_blocking()
    }
}

#[async_trait]
impl<K> Mutator<K> for Box<dyn Mutator<K>>
where
    K: Send + 'static,
{
    async fn mutate(&self, ctx: &ReviewContext, obj: &mut K) -> Result<(), MutationError> {
        (**self).mutate(ctx, obj).await
    }

    fn is_blocking(&self) -> bool {
        (**self).is_blocking()
    }
}

/// Mutator backed by a synchronous closure, see [`mutator_fn`]
///
/// The closure runs on the blocking thread pool, so it may do blocking I/O
/// without stalling the runtime or the review deadline.
#[derive(Clone)]
pub struct MutatorFn<F> {
    f: F,
}

/// Build a mutator from a synchronous closure
///
/// ```ignore
/// let scale = mutator_fn(|d: &mut Deployment| {
///     d.spec.get_or_insert_with(Default::default).replicas = Some(3);
///     Ok(())
/// });
/// ```
pub fn mutator_fn<K, F>(f: F) -> MutatorFn<F>
where
    K: Send + 'static,
    F: Fn(&mut K) -> Result<(), MutationError> + Send + Sync,
{
    MutatorFn { f }
}

#[async_trait]
impl<K, F> Mutator<K> for MutatorFn<F>
where
    K: Send + 'static,
    F: Fn(&mut K) -> Result<(), MutationError> + Send + Sync,
{
    async fn mutate(&self, _ctx: &ReviewContext, obj: &mut K) -> Result<(), MutationError> {
        (self.f)(obj)
    }

    fn is_blocking(&self) -> bool {
        true
    }
}

/// Runs mutators in order on the same object
///
/// The first failure stops the chain and denies the request; later mutators
/// see the changes made by earlier ones.
pub struct MutatorChain<K> {
    mutators: Vec<Box<dyn Mutator<K>>>,
}

impl<K: Send + 'static> MutatorChain<K> {
    /// Create an empty chain, which leaves objects unchanged
    pub fn new() -> Self {
        Self {
            mutators: Vec::new(),
        }
    }

    /// Append a mutator to the chain
    pub fn with(mut self, mutator: impl Mutator<K> + 'static) -> Self {
        self.mutators.push(Box::new(mutator));
        self
    }

    /// Number of mutators in the chain
    pub fn len(&self) -> usize {
        self.mutators.len()
    }

    /// Whether the chain is empty
    pub fn is_empty(&self) -> bool {
        self.mutators.is_empty()
    }
}

impl<K: Send + 'static> Default for MutatorChain<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<K: Send + 'static> Mutator<K> for MutatorChain<K> {
    async fn mutate(&self, ctx: &ReviewContext, obj: &mut K) -> Result<(), MutationError> {
        for mutator in &self.mutators {
            mutator.mutate(ctx, obj).await?;
        }
        Ok(())
    }

    fn is_blocking(&self) -> bool {
        self.mutators.iter().any(|m| m.is_blocking())
    }
}

/// Sets labels and annotations on objects of any kind
#[derive(Debug, Clone, Default)]
pub struct MetadataMutator {
    labels: BTreeMap<String, String>,
    annotations: BTreeMap<String, String>,
}

impl MetadataMutator {
    /// Create a mutator that changes nothing
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key=value` as a label
    pub fn label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Set `key=value` as an annotation
    pub fn annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.insert(key.into(), value.into());
        self
    }

    /// Whether the mutator has nothing to set
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty() && self.annotations.is_empty()
    }
}

#[async_trait]
impl<K: Object> Mutator<K> for MetadataMutator {
    async fn mutate(&self, _ctx: &ReviewContext, obj: &mut K) -> Result<(), MutationError> {
        let meta = obj.metadata_mut();
        if !self.labels.is_empty() {
            meta.labels
                .get_or_insert_with(BTreeMap::new)
                .extend(self.labels.clone());
        }
        if !self.annotations.is_empty() {
            meta.annotations
                .get_or_insert_with(BTreeMap::new)
                .extend(self.annotations.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::AnyObject;
    use k8s_openapi::api::core::v1::ConfigMap;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    fn config_map() -> ConfigMap {
        ConfigMap {
            metadata: ObjectMeta {
                name: Some("cfg".to_string()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn closure_mutator_changes_object() {
        let m = mutator_fn(|cm: &mut ConfigMap| {
            cm.data = Some(BTreeMap::from([("k".to_string(), "v".to_string())]));
            Ok(())
        });
        let mut cm = config_map();
        m.mutate(&ReviewContext::new(), &mut cm).await.unwrap();
        assert_eq!(cm.data.unwrap()["k"], "v");
    }

    #[tokio::test]
    async fn closure_mutator_may_replace_the_object() {
        let m = mutator_fn(|cm: &mut ConfigMap| {
            let mut replacement = config_map();
            replacement.metadata.name = Some("renamed".to_string());
            *cm = replacement;
            Ok(())
        });
        let mut cm = config_map();
        m.mutate(&ReviewContext::new(), &mut cm).await.unwrap();
        assert_eq!(cm.metadata.name.as_deref(), Some("renamed"));
    }

    /// Story: A chain stops at the first failing mutator
    #[tokio::test]
    async fn story_chain_stops_at_first_failure() {
        let chain: MutatorChain<ConfigMap> = MutatorChain::new()
            .with(MetadataMutator::new().label("step", "one"))
            .with(mutator_fn(|_: &mut ConfigMap| {
                Err(MutationError::new("quota exceeded"))
            }))
            .with(MetadataMutator::new().label("step", "three"));
        assert_eq!(chain.len(), 3);

        let mut cm = config_map();
        let err = chain
            .mutate(&ReviewContext::new(), &mut cm)
            .await
            .unwrap_err();

        assert_eq!(err.message(), "quota exceeded");
        // The first mutator ran, the third did not
        assert_eq!(cm.metadata.labels.unwrap()["step"], "one");
    }

    #[tokio::test]
    async fn empty_chain_is_a_no_op() {
        let chain: MutatorChain<ConfigMap> = MutatorChain::default();
        assert!(chain.is_empty());
        let mut cm = config_map();
        chain.mutate(&ReviewContext::new(), &mut cm).await.unwrap();
        assert_eq!(cm, config_map());
    }

    #[tokio::test]
    async fn metadata_mutator_merges_with_existing_labels() {
        let mut cm = config_map();
        cm.metadata.labels = Some(BTreeMap::from([("team".to_string(), "infra".to_string())]));

        let m = MetadataMutator::new()
            .label("managed-by", "admitter")
            .annotation("admitter.dev/mutated", "true");
        m.mutate(&ReviewContext::new(), &mut cm).await.unwrap();

        let labels = cm.metadata.labels.unwrap();
        assert_eq!(labels["team"], "infra");
        assert_eq!(labels["managed-by"], "admitter");
        assert_eq!(cm.metadata.annotations.unwrap()["admitter.dev/mutated"], "true");
    }

    #[tokio::test]
    async fn metadata_mutator_works_on_erased_objects() {
        let mut obj = AnyObject::new(config_map());
        let m = MetadataMutator::new().label("managed-by", "admitter");
        m.mutate(&ReviewContext::new(), &mut obj).await.unwrap();

        let cm = obj.downcast_ref::<ConfigMap>().unwrap();
        assert_eq!(cm.metadata.labels.as_ref().unwrap()["managed-by"], "admitter");
    }

    #[tokio::test]
    async fn empty_metadata_mutator_leaves_metadata_untouched() {
        let m = MetadataMutator::new();
        assert!(m.is_empty());
        let mut cm = config_map();
        m.mutate(&ReviewContext::new(), &mut cm).await.unwrap();
        assert!(cm.metadata.labels.is_none());
        assert!(cm.metadata.annotations.is_none());
    }

    #[tokio::test]
    async fn shared_mutator_through_arc() {
        let m: Arc<dyn Mutator<ConfigMap>> = Arc::new(MetadataMutator::new().label("a", "b"));
        let mut cm = config_map();
        m.mutate(&ReviewContext::new(), &mut cm).await.unwrap();
        assert!(cm.metadata.labels.is_some());
    }

    #[test]
    fn blocking_hint_follows_closures() {
        let closure = mutator_fn(|_: &mut ConfigMap| Ok(()));
        assert!(Mutator::<ConfigMap>::is_blocking(&closure));
        assert!(!Mutator::<ConfigMap>::is_blocking(&MetadataMutator::new()));

        let async_only: MutatorChain<ConfigMap> =
            MutatorChain::new().with(MetadataMutator::new().label("a", "b"));
        assert!(!async_only.is_blocking());
        assert!(async_only.with(closure).is_blocking());

        let shared: Arc<dyn Mutator<ConfigMap>> = Arc::new(mutator_fn(|_: &mut ConfigMap| Ok(())));
        assert!(Mutator::<ConfigMap>::is_blocking(&shared));
    }
}

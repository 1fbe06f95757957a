//! Mutating admission webhook engine
//!
//! The same flow runs for every resolver:
//! decode → deep copy → mutate → serialize both → diff → respond.
//! Any failure along the way ends the review with a denial.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use kube::core::admission::AdmissionResponse;
use tracing::debug;

use crate::context::ReviewContext;
use crate::error::{MutationError, ReviewError, MUTATED_SIDE, ORIGINAL_SIDE};
use crate::mutator::Mutator;
use crate::object::{AnyObject, Object, TypedObject};
use crate::patch::build_patch;
use crate::resolver::{DynamicResolver, StaticResolver, TypeResolver};
use crate::response::{allow_with_patch, to_denial};
use crate::review::AdmissionRequest;

/// Anything able to answer an admission request
///
/// Object safe, so transports can hold an `Arc<dyn Webhook>` regardless of
/// the resolver and mutator behind it.
#[async_trait]
pub trait Webhook: Send + Sync {
    /// Review one request; never fails, failures become denials
    async fn review(&self, ctx: &ReviewContext, request: &AdmissionRequest) -> AdmissionResponse;
}

/// Mutating webhook: applies a mutator and answers with the resulting patch
///
/// The webhook always allows the resource; it only denies when something
/// goes wrong (bad payload, mutator error, cancellation, ...).
#[derive(Debug)]
pub struct MutatingWebhook<R, M> {
    resolver: R,
    mutator: Arc<M>,
}

impl<M> MutatingWebhook<DynamicResolver, M>
where
    M: Mutator<AnyObject> + 'static,
{
    /// Webhook accepting every built-in Kubernetes kind
    pub fn dynamic(mutator: M) -> Self {
        Self::new(DynamicResolver::kubernetes(), mutator)
    }
}

impl<K, M> MutatingWebhook<StaticResolver<K>, M>
where
    K: TypedObject,
    M: Mutator<K> + 'static,
{
    /// Webhook bound to the single kind `K`
    pub fn for_kind(mutator: M) -> Self {
        Self::new(StaticResolver::new(), mutator)
    }
}

impl<R, M> MutatingWebhook<R, M>
where
    R: TypeResolver,
    M: Mutator<R::Object> + 'static,
{
    /// Create a webhook from a resolver and a mutator
    pub fn new(resolver: R, mutator: M) -> Self {
        Self {
            resolver,
            mutator: Arc::new(mutator),
        }
    }

    /// The resolver used to decode requests
    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    async fn mutate_and_diff(
        &self,
        ctx: &ReviewContext,
        request: &AdmissionRequest,
    ) -> Result<json_patch::Patch, ReviewError> {
        let original = self.resolver.decode(&request.object)?;

        // The original is the diff baseline and is never handed out mutably.
        let copy = original.deep_copy();
        let mutated = run_mutator(self.mutator.clone(), ctx, copy).await?;

        let expected = original.identity();
        let actual = mutated.identity();
        if !expected.same_kind(&actual) {
            return Err(ReviewError::type_assertion(
                expected.type_descriptor(),
                actual.type_descriptor(),
            ));
        }

        let before = original
            .to_canonical_json()
            .map_err(|e| ReviewError::serialization(ORIGINAL_SIDE, e.to_string()))?;
        let after = mutated
            .to_canonical_json()
            .map_err(|e| ReviewError::serialization(MUTATED_SIDE, e.to_string()))?;

        build_patch(&before, &after)
    }
}

#[async_trait]
impl<R, M> Webhook for MutatingWebhook<R, M>
where
    R: TypeResolver,
    M: Mutator<R::Object> + 'static,
{
    async fn review(&self, ctx: &ReviewContext, request: &AdmissionRequest) -> AdmissionResponse {
        debug!(
            uid = %request.uid,
            object = %request.display_name(),
            operation = ?request.operation,
            "reviewing request"
        );

        // Integrator Clone and serde impls run in here too; their panics deny.
        let outcome = AssertUnwindSafe(self.mutate_and_diff(ctx, request))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| {
                Err(ReviewError::internal(format!(
                    "review panicked: {}",
                    panic_message(panic.as_ref())
                )))
            });

        let response = outcome.and_then(|patch| {
            debug!(
                uid = %request.uid,
                object = %request.display_name(),
                patch = %serde_json::to_string(&patch).unwrap_or_default(),
                "json patch for request"
            );
            allow_with_patch(request.response(), patch)
        });

        match response {
            Ok(response) => response,
            Err(e) => to_denial(request.response(), &e),
        }
    }
}

/// Run the mutator on `obj`, bounded by the caller's cancellation and deadline
///
/// The mutation runs in its own task and owns its copy of the object, so a
/// mutator that never yields cannot hold the review past its deadline. Closure
/// mutators go to the blocking pool. The task is aborted once the review stops
/// waiting for it. A panicking mutator is reported as a mutation failure.
async fn run_mutator<K, M>(
    mutator: Arc<M>,
    ctx: &ReviewContext,
    mut obj: K,
) -> Result<K, ReviewError>
where
    K: Send + 'static,
    M: Mutator<K> + ?Sized + 'static,
{
    if ctx.is_cancelled() {
        return Err(ReviewError::Cancelled);
    }

    let blocking = (*mutator).is_blocking();
    let task_ctx = ctx.clone();
    let mutation = async move {
        mutator.mutate(&task_ctx, &mut obj).await?;
        Ok::<_, MutationError>(obj)
    };

    let mut task = if blocking {
        let runtime = tokio::runtime::Handle::current();
        tokio::task::spawn_blocking(move || runtime.block_on(mutation))
    } else {
        tokio::spawn(mutation)
    };

    let deadline = async {
        match ctx.deadline() {
            Some(deadline) => tokio::time::sleep_until(deadline).await,
            None => std::future::pending().await,
        }
    };

    let joined = tokio::select! {
        biased;
        _ = ctx.cancellation().cancelled() => {
            task.abort();
            return Err(ReviewError::Cancelled);
        }
        _ = deadline => {
            task.abort();
            return Err(ReviewError::DeadlineExceeded);
        }
        joined = &mut task => joined,
    };

    match joined {
        Ok(result) => result.map_err(ReviewError::from),
        Err(e) if e.is_panic() => {
            let panic = e.into_panic();
            Err(ReviewError::from(MutationError::new(format!(
                "mutator panicked: {}",
                panic_message(panic.as_ref())
            ))))
        }
        Err(_) => Err(ReviewError::Cancelled),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(msg) = panic.downcast_ref::<&'static str>() {
        *msg
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "unknown panic payload"
    }
}

//! Admitter - mutating admission review engine for Kubernetes webhooks
//!
//! A review decodes the admitted object, hands an independent copy to a
//! [`Mutator`], and answers with the JSON Patch that turns the original into
//! the mutated copy. Any failure on the way is turned into a denial; the
//! caller never sees a partial decision.
//!
//! Requests arrive and responses leave as `kube::core::admission` types; the
//! router converts between those and the engine's [`AdmissionRequest`].
//!
//! Objects are decoded either statically ([`StaticResolver`], one kind known
//! at compile time) or dynamically ([`DynamicResolver`], any kind registered
//! in a [`TypeCatalog`]). Both feed the same engine, [`MutatingWebhook`].
//!
//! ```ignore
//! use admitter::{mutator_fn, MutatingWebhook, ReviewContext, AdmissionRequest, Webhook};
//! use k8s_openapi::api::core::v1::Pod;
//!
//! let webhook = MutatingWebhook::for_kind(mutator_fn(|pod: &mut Pod| {
//!     pod.metadata.labels.get_or_insert_with(Default::default)
//!         .insert("team".into(), "platform".into());
//!     Ok(())
//! }));
//! let response = webhook.review(&ReviewContext::new(), &request).await;
//! ```

#![deny(missing_docs)]

pub mod catalog;
pub mod context;
pub mod error;
pub mod mutator;
pub mod object;
pub mod patch;
pub mod resolver;
pub mod response;
pub mod review;
pub mod router;
pub mod webhook;

pub use catalog::TypeCatalog;
pub use context::ReviewContext;
pub use error::{MutationError, ReviewError};
pub use mutator::{mutator_fn, MetadataMutator, Mutator, MutatorChain, MutatorFn};
pub use object::{AnyObject, Object, ObjectIdentity, TypedObject};
pub use patch::build_patch;
pub use resolver::{DynamicResolver, StaticResolver, TypeResolver};
pub use response::{allow_with_patch, to_denial, AdmissionResponseExt};
pub use review::AdmissionRequest;
pub use router::{webhook_router, WebhookRouterConfig};
pub use webhook::{MutatingWebhook, Webhook};

pub use kube::core::admission::{AdmissionResponse, AdmissionReview};

/// Result type for review operations
pub type Result<T, E = ReviewError> = std::result::Result<T, E>;

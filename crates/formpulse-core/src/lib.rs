//! FormPulse Core - Live analytics for form responses
//!
//! Collects structured responses and keeps every open dashboard current.
//!
//! ## Components
//! - [`visibility`]: decides per response which answers were shown and count
//! - [`analytics`]: turns the stored responses into a per-field [`Summary`]
//! - [`hub`]: per-form fan-out of freshly computed summaries to live viewers
//! - [`submission`]: accept, filter, persist, recompute, publish
//! - [`stream`]: the long-lived loop behind one subscriber connection
//!
//! ```text
//! answers ──► visibility ──► store ──► analytics ──► payload ──► hub ──► N streams
//! ```
//!
//! The hub is process-local. Two server instances keep independent topic
//! registries, and a viewer connected to one never sees publishes made on the
//! other.

#![warn(clippy::all)]

pub mod analytics;
pub mod answer;
pub mod error;
pub mod hub;
pub mod model;
pub mod store;
pub mod stream;
pub mod submission;
pub mod visibility;

pub use analytics::{compute_summary, FieldStats, MostCommon, SkippedField, Summary, Trends};
pub use answer::AnswerValue;
pub use error::{FormsError, Result};
pub use hub::{Hub, Subscription, DEFAULT_SUBSCRIBER_CAPACITY};
pub use model::*;
pub use store::{FormStore, InMemoryStore, StoreError};
pub use stream::{pump, StreamEvent};
pub use submission::{LiveUpdate, SubmissionService};
pub use visibility::{compute_visibility_map, is_visible};

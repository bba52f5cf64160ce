//! Periodic sampling of a managed-resource registry.
//!
//! A [`Sampler`] discovers the resources matching its filters, reads their
//! attributes on every [`Scheduler`] tick and flattens the values into one
//! [`Snapshot`](streamx_common::Snapshot) per resource. Each tick yields an
//! [`Activity`] holding those snapshots plus a statistics snapshot.
//! [`SampleListener`]s observe every step of the cycle, and conditions with
//! their actions run against every sample.

pub mod activity;
pub mod conditions;
pub mod config;
pub mod context;
pub mod error;
pub mod flatten;
pub mod handler;
pub mod listener;
pub mod registry;
pub mod sample;
pub mod sampler;
pub mod scheduler;

#[cfg(test)]
mod tests;

pub use activity::Activity;
pub use config::SamplerConfig;
pub use context::SampleContext;
pub use error::{RegistryError, RegistryErrorKind, Result, SampleError, StreamxError};
pub use handler::SampleHandler;
pub use listener::SampleListener;
pub use registry::{InMemoryRegistry, ResourceRegistry};
pub use sample::AttributeSample;
pub use sampler::Sampler;
pub use scheduler::{Scheduler, SchedulerState};

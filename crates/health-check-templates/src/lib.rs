//! The `CronjobTemplate` registry (C4): the trait, its `CronjobMaker`
//! decorator, low-level `CronJob`/`Container` builders, and the built-in
//! templates shipped compiled in.

pub mod builder;
pub mod builtin;
pub mod otel;
pub mod registry;

pub use registry::{CronjobMaker, CronjobTemplate, TemplateRegistry};

//! Plugin discovery (C2) and the ordered hook runner (C3) for the
//! health-check control plane.

pub mod hooks;
pub mod loader;
pub mod order;

pub use hooks::{
    check_if_allow, ignore_results, is_access_denial, until_not_null, BoxFuture, SideEffectHook,
    UntilNotNullHook,
};
pub use loader::LoadMode;
pub use order::{ordered, Sourced};

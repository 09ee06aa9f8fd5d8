//! The `CheckBackend` contract (spec.md §4.5): every operation a check
//! backend must support, independent of how it stores or schedules checks.
//!
//! The original's `Generic[AuthenticationObject]` becomes an associated
//! type — Rust has no free type parameter on a trait usable the same way at
//! the `dyn` boundary the `Aggregator` needs (REDESIGN FLAGS §9). List
//! operations return a `BoxStream` rather than a buffered `Vec`: a failure
//! partway through a listing (e.g. the orchestrator connection drops) is
//! observable by the caller instead of being hidden behind a fully buffered
//! return value.

use async_trait::async_trait;
use futures::stream::BoxStream;
use health_check_core::{CheckId, CheckTemplate, CheckTemplateId, DomainError, InCheckAttributes, OutCheck};

/// A lazily-produced sequence of results, the Rust stand-in for the
/// original's `AsyncIterable[T]`.
pub type CheckStream<'a, T> = BoxStream<'a, Result<T, DomainError>>;

/// Abstract contract every check backend satisfies (spec.md §4.5).
#[async_trait]
pub trait CheckBackend: Send + Sync {
    /// The tenant-identity type this backend's hooks were wired against.
    type Auth: Send + Sync;

    /// Lists every loaded check template, optionally restricted to `ids`.
    async fn get_check_templates(
        &self,
        auth: &Self::Auth,
        ids: Option<&[CheckTemplateId]>,
    ) -> CheckStream<'static, CheckTemplate>;

    /// Materialises a new check. Fails with `CheckTemplateIdError` if
    /// `template_id` is unknown, `JsonValidationError` if `template_args`
    /// doesn't validate against that template's schema, or
    /// `CronExpressionValidationError` if `schedule` is malformed.
    async fn create_check(
        &self,
        auth: &Self::Auth,
        input: InCheckAttributes,
    ) -> Result<OutCheck, DomainError>;

    /// Lists checks visible to `auth`, optionally restricted to `ids`.
    async fn get_checks(
        &self,
        auth: &Self::Auth,
        ids: Option<&[CheckId]>,
    ) -> CheckStream<'static, OutCheck>;

    /// Removes a check. Fails with `CheckIdError` if `id` is unknown.
    async fn remove_check(&self, auth: &Self::Auth, id: &CheckId) -> Result<(), DomainError>;

    /// Triggers an on-demand execution of a check. Fails with `CheckIdError`
    /// if `id` is unknown.
    async fn run_check(&self, auth: &Self::Auth, id: &CheckId) -> Result<(), DomainError>;

    /// Releases any resources the backend instance holds. Most backends have
    /// nothing to do here (their per-operation resources are scoped to the
    /// operation itself, see `orchestrator::OrchestratorSession`); `Remote`
    /// and `Aggregator` override it to release outbound HTTP clients.
    async fn aclose(&self) -> Result<(), DomainError> {
        Ok(())
    }
}

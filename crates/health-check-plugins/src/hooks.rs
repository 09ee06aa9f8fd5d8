//! The hook runner (spec.md §4.3, C3): three composition modes over a list
//! of callables, each `await`-ing any future to completion.
//!
//! Rust has no implicit awaitable coercion, so a hook is simply a boxed,
//! zero-argument async closure that already has its call-site arguments
//! captured (`auth_obj`, the resource being checked, ...) — the caller builds
//! a fresh `Vec` of these per request, which is also where hook-file
//! alphabetical ordering (`order::by_source`) is applied.

use health_check_core::DomainError;
use std::future::Future;
use std::pin::Pin;

/// A boxed future, the `Awaitable` stand-in.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A hook used in `until-not-null` mode: returns `Some(value)` to short
/// circuit, `None` to fall through to the next hook in the list.
pub type UntilNotNullHook<T> =
    Box<dyn Fn() -> BoxFuture<'static, Result<Option<T>, DomainError>> + Send + Sync>;

/// A hook used in `ignore-results` or `check-if-allow` mode: its return value
/// (if any) is discarded, only whether it raises matters.
pub type SideEffectHook = Box<dyn Fn() -> BoxFuture<'static, Result<(), DomainError>> + Send + Sync>;

/// Calls hooks in order, returning the first non-null result; `None` if every
/// hook returns `None`.
pub async fn until_not_null<T>(
    funcs: &[UntilNotNullHook<T>],
) -> Result<Option<T>, DomainError> {
    for func in funcs {
        if let Some(value) = func().await? {
            return Ok(Some(value));
        }
    }
    Ok(None)
}

/// Calls every hook in order; any raised error propagates immediately.
pub async fn ignore_results(funcs: &[SideEffectHook]) -> Result<(), DomainError> {
    for func in funcs {
        func().await?;
    }
    Ok(())
}

/// Calls every hook in order. If a hook raises an error matching `is_deny`,
/// returns `Ok(false)` immediately (access denied) without running the
/// remaining hooks. Any other error propagates. `Ok(true)` if every hook
/// completes without raising.
pub async fn check_if_allow(
    funcs: &[SideEffectHook],
    is_deny: impl Fn(&DomainError) -> bool,
) -> Result<bool, DomainError> {
    for func in funcs {
        if let Err(err) = func().await {
            if is_deny(&err) {
                return Ok(false);
            }
            return Err(err);
        }
    }
    Ok(true)
}

/// The default deny-set for `check-if-allow` stages guarding check/template
/// access (spec.md §4.3): Forbidden, CheckIdError, CheckTemplateIdError.
pub fn is_access_denial(err: &DomainError) -> bool {
    err.is_access_denial()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn hook_returning<T: Send + 'static>(value: Option<T>) -> UntilNotNullHook<T>
    where
        T: Clone,
    {
        Box::new(move || {
            let value = value.clone();
            Box::pin(async move { Ok(value) })
        })
    }

    #[tokio::test]
    async fn until_not_null_returns_first_non_null() {
        let funcs: Vec<UntilNotNullHook<&'static str>> =
            vec![hook_returning(None), hook_returning(Some("second")), hook_returning(Some("third"))];
        assert_eq!(until_not_null(&funcs).await.unwrap(), Some("second"));
    }

    #[tokio::test]
    async fn until_not_null_returns_none_if_all_null() {
        let funcs: Vec<UntilNotNullHook<&'static str>> = vec![hook_returning(None), hook_returning(None)];
        assert_eq!(until_not_null(&funcs).await.unwrap(), None);
    }

    #[tokio::test]
    async fn ignore_results_runs_all_hooks_in_order() {
        let order = Arc::new(AtomicUsize::new(0));
        let a = order.clone();
        let b = order.clone();
        let funcs: Vec<SideEffectHook> = vec![
            Box::new(move || {
                let a = a.clone();
                Box::pin(async move {
                    a.store(1, Ordering::SeqCst);
                    Ok(())
                })
            }),
            Box::new(move || {
                let b = b.clone();
                Box::pin(async move {
                    assert_eq!(b.load(Ordering::SeqCst), 1);
                    b.store(2, Ordering::SeqCst);
                    Ok(())
                })
            }),
        ];
        ignore_results(&funcs).await.unwrap();
        assert_eq!(order.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn ignore_results_propagates_errors() {
        let funcs: Vec<SideEffectHook> = vec![Box::new(|| {
            Box::pin(async { Err(DomainError::Internal) })
        })];
        assert!(ignore_results(&funcs).await.is_err());
    }

    #[tokio::test]
    async fn check_if_allow_denies_on_deny_set_match() {
        let funcs: Vec<SideEffectHook> = vec![Box::new(|| {
            Box::pin(async {
                Err(DomainError::Forbidden {
                    title: "nope".into(),
                    detail: "nope".into(),
                })
            })
        })];
        assert_eq!(check_if_allow(&funcs, is_access_denial).await.unwrap(), false);
    }

    #[tokio::test]
    async fn check_if_allow_propagates_other_errors() {
        let funcs: Vec<SideEffectHook> =
            vec![Box::new(|| Box::pin(async { Err(DomainError::Internal) }))];
        assert!(check_if_allow(&funcs, is_access_denial).await.is_err());
    }

    #[tokio::test]
    async fn check_if_allow_true_when_all_succeed() {
        let funcs: Vec<SideEffectHook> = vec![Box::new(|| Box::pin(async { Ok(()) }))];
        assert_eq!(check_if_allow(&funcs, is_access_denial).await.unwrap(), true);
    }
}

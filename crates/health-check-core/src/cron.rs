//! Structural cron-expression validation (spec.md §4.7, C7).
//!
//! The five field patterns are carried verbatim from
//! `check_backends/k8s_backend/__init__.py`'s `minute_pattern` ..
//! `day_of_week_pattern`, compiled once via `once_cell`.

use crate::error::DomainError;
use once_cell::sync::Lazy;
use regex::Regex;

const MINUTE: &str = r"(\*|[0-5]?\d)(/\d+)?([-,][0-5]?\d)*";
const HOUR: &str = r"(\*|[01]?\d|2[0-3])(/\d+)?([-,]([01]?\d|2[0-3]))*";
const DAY_OF_MONTH: &str = r"(\*|[1-9]|[12]\d|3[01])(/\d+)?([-,]([1-9]|[12]\d|3[01]))*";
const MONTH: &str = r"(\*|1[0-2]|0?[1-9])(/\d+)?([-,](1[0-2]|0?[1-9]))*";
const DAY_OF_WEEK: &str = r"(\*|[0-7])(/\d+)?([-,][0-7])*";

static CRON_REGEX: Lazy<Regex> = Lazy::new(|| {
    let pattern = format!(
        "^{MINUTE} {HOUR} {DAY_OF_MONTH} {MONTH} {DAY_OF_WEEK}$"
    );
    Regex::new(&pattern).expect("cron pattern is a valid regex")
});

/// Validates a five-field cron expression against the grammar in spec.md
/// §4.7. Returns `CronExpressionValidationError` (422) on mismatch.
pub fn validate_cron(expr: &str) -> Result<(), DomainError> {
    if CRON_REGEX.is_match(expr) {
        Ok(())
    } else {
        Err(DomainError::CronValidation {
            detail: "Invalid cron expression for use with Kubernetes".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_every_minute() {
        assert!(validate_cron("* * * * *").is_ok());
    }

    #[test]
    fn accepts_ranges_and_steps() {
        assert!(validate_cron("*/5 0-12 1,15 1-6 1-5").is_ok());
    }

    #[test]
    fn rejects_garbage() {
        assert!(validate_cron("not a cron").is_err());
    }

    #[test]
    fn rejects_out_of_range_hour() {
        assert!(validate_cron("0 24 * * *").is_err());
    }

    #[test]
    fn rejects_too_few_fields() {
        assert!(validate_cron("* * * *").is_err());
    }

    #[test]
    fn rejects_too_many_fields() {
        assert!(validate_cron("* * * * * *").is_err());
    }
}

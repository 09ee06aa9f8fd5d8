//! Hook ordering: "total order derived from the alphabetical order of the
//! plugin files [hooks] were loaded from" (spec.md §3).
//!
//! Built-in (compile-time-registered) hooks are tagged with a synthetic
//! source name so they interleave deterministically with anything loaded
//! from a plugin directory at the same ordinal position a real file would
//! occupy.

/// A value tagged with the name of the "file" it was loaded from, for
/// alphabetical-by-source ordering.
#[derive(Debug, Clone)]
pub struct Sourced<T> {
    pub source: String,
    pub value: T,
}

impl<T> Sourced<T> {
    pub fn new(source: impl Into<String>, value: T) -> Self {
        Self {
            source: source.into(),
            value,
        }
    }
}

/// Sorts by source name (stable) and discards the tag, yielding the ordered
/// hook list a stage invokes.
pub fn ordered<T>(mut items: Vec<Sourced<T>>) -> Vec<T> {
    items.sort_by(|a, b| a.source.cmp(&b.source));
    items.into_iter().map(|item| item.value).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orders_alphabetically_by_source() {
        let items = vec![
            Sourced::new("b_hooks", "second"),
            Sourced::new("a_hooks", "first"),
        ];
        assert_eq!(ordered(items), vec!["first", "second"]);
    }
}

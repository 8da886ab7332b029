//! Helpers for recording optional values as `tracing` fields.
use std::fmt;

use tracing::field::{display, DisplayValue};

/// An optional value rendered as itself, or as `unset` when absent.
pub struct OrUnset<'a, T>(Option<&'a T>);

impl<T: fmt::Display> fmt::Display for OrUnset<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(value) => fmt::Display::fmt(value, f),
            None => f.write_str("unset"),
        }
    }
}

/// Records an optional field, e.g. `info!(account = opt(&account), ..)`.
pub fn opt<T: fmt::Display>(value: &Option<T>) -> DisplayValue<OrUnset<'_, T>> {
    display(OrUnset(value.as_ref()))
}

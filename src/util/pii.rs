//! Redaction of identifiers in logs.
//!
//! Content source identifiers tell which remote participants a client is watching. With the
//! `pii` feature on, values wrapped in [`Pii`] format as `{REDACTED}` in both `Display` and
//! `Debug`. Use it for debug level logs and above, trace logs are not expected in production.

use core::fmt;

#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Pii<T>(pub T);

impl<T> Pii<T> {
    fn redacted(f: &mut fmt::Formatter<'_>) -> Option<fmt::Result> {
        if cfg!(feature = "pii") {
            Some(f.write_str("{REDACTED}"))
        } else {
            None
        }
    }
}

impl<T: fmt::Display> fmt::Display for Pii<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Self::redacted(f).unwrap_or_else(|| fmt::Display::fmt(&self.0, f))
    }
}

impl<T: fmt::Debug> fmt::Debug for Pii<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Self::redacted(f).unwrap_or_else(|| fmt::Debug::fmt(&self.0, f))
    }
}

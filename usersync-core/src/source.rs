//! The identity source seam: whatever yields the desired identity set.

use crate::error::SourceError;
use crate::types::{Identity, Provider};

/// A provider of desired identities.
///
/// Implementations return identities already filtered to those that carry a
/// public-key attribute. An `Ok(vec![])` is passed through; the driver is
/// the one that refuses to act on it.
pub trait IdentitySource {
    /// Which provider this source talks to, for reporting.
    fn provider(&self) -> Provider;

    /// Fetch the full desired set. Blocking.
    fn fetch(&self) -> Result<Vec<Identity>, SourceError>;
}

impl<S: IdentitySource + ?Sized> IdentitySource for Box<S> {
    fn provider(&self) -> Provider {
        (**self).provider()
    }

    fn fetch(&self) -> Result<Vec<Identity>, SourceError> {
        (**self).fetch()
    }
}

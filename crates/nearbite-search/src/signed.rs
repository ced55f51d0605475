use std::collections::HashSet;
use std::convert::Infallible;
use std::future::Future;

/// Source of the global "signed" flag for places.
pub trait SignedLookup: Send + Sync {
    type Error: std::fmt::Display + Send;

    /// Returns the subset of `place_ids` that are signed.
    fn signed_among(
        &self,
        place_ids: &[String],
    ) -> impl Future<Output = Result<HashSet<String>, Self::Error>> + Send;
}

/// Lookup that reports nothing as signed. Used when no store is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSignedLookup;

impl SignedLookup for NoSignedLookup {
    type Error = Infallible;

    async fn signed_among(&self, _place_ids: &[String]) -> Result<HashSet<String>, Infallible> {
        Ok(HashSet::new())
    }
}

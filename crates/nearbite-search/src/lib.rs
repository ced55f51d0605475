pub mod error;
pub mod fanout;
pub mod orchestrator;
pub mod signed;

#[cfg(test)]
mod test_support;

pub use error::{ScanError, Step};
pub use fanout::{enrich, DEFAULT_CONCURRENCY};
pub use orchestrator::{PageRequest, ScanOrchestrator};
pub use signed::{NoSignedLookup, SignedLookup};

//! Gridwatch Common Library
//!
//! The verification and collection engine shared by the browser scenarios:
//! value normalization and comparison, ordering checks, deadline-bounded
//! condition polling, and paginated record collection.

pub mod collect;
pub mod compare;
pub mod error;
pub mod order;
pub mod poll;
pub mod value;

// Re-export commonly used types
pub use collect::{
    collect, collect_with, CollectOptions, Collection, CollectionWarning, PageSource, Record,
    StopReason,
};
pub use compare::compare;
pub use error::{Error, Result};
pub use order::{verify_order, Direction, OrderReport, OrderingVerifier, OrderingViolation};
pub use poll::{poll_until, poll_with, PollOptions, PollResult};
pub use value::{normalize, normalize_as, parse_number, FieldKind, NormalizedValue};

/// Gridwatch version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

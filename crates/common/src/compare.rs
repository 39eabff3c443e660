//! Ordering of normalized values

use feruca::Collator;
use std::cell::RefCell;
use std::cmp::Ordering;

use crate::value::NormalizedValue;

thread_local! {
    // Root-locale collation; the collator caches weights between calls
    static COLLATOR: RefCell<Collator> = RefCell::new(Collator::default());
}

/// Compare two normalized values
///
/// Two numbers compare numerically. Any pair involving text compares the
/// textual forms of both sides with Unicode collation, falling back to
/// codepoint order for collation ties, so mixed pairs get a deterministic
/// but not total order.
pub fn compare(a: &NormalizedValue, b: &NormalizedValue) -> Ordering {
    match (a, b) {
        (NormalizedValue::Number(x), NormalizedValue::Number(y)) => {
            // Normalized numbers are always finite
            x.partial_cmp(y).unwrap_or(Ordering::Equal)
        }
        _ => compare_text(&a.as_text(), &b.as_text()),
    }
}

fn compare_text(a: &str, b: &str) -> Ordering {
    COLLATOR
        .with(|collator| collator.borrow_mut().collate(a, b))
        .then_with(|| a.cmp(b))
}

impl NormalizedValue {
    /// Shorthand for [`compare`]
    pub fn compare(&self, other: &NormalizedValue) -> Ordering {
        compare(self, other)
    }
}

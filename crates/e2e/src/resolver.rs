//! Element resolution over ordered lookup strategies
//!
//! Several UI elements can be reached in more than one way (an ARIA label,
//! a visible text, a structural class). A [`Resolver`] tries each strategy
//! in priority order and returns the first that matches anything.

use gridwatch_common::Error;
use std::fmt;
use tracing::debug;

use crate::driver::Page;
use crate::error::E2eResult;

/// One way of locating an element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Strategy {
    /// Plain Playwright/CSS selector
    Css(String),
    /// Element within `scope` whose text contains `text`, ignoring case
    Text { scope: String, text: String },
    /// `element` carrying `attribute="value"`
    Attribute {
        element: String,
        attribute: String,
        value: String,
    },
}

impl Strategy {
    pub fn css(selector: impl Into<String>) -> Self {
        Strategy::Css(selector.into())
    }

    pub fn text(scope: impl Into<String>, text: impl Into<String>) -> Self {
        Strategy::Text {
            scope: scope.into(),
            text: text.into(),
        }
    }

    pub fn attribute(
        element: impl Into<String>,
        attribute: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Strategy::Attribute {
            element: element.into(),
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    /// Selector string handed to the page
    pub fn selector(&self) -> String {
        match self {
            Strategy::Css(selector) => selector.clone(),
            Strategy::Text { scope, text } => {
                format!("{} >> text={}", scope, text)
            }
            Strategy::Attribute {
                element,
                attribute,
                value,
            } => format!("{}[{}={}]", element, attribute, quote(value)),
        }
    }
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.selector())
    }
}

/// Outcome of a successful resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub selector: String,
    /// Index of the winning strategy
    pub strategy: usize,
    pub count: usize,
}

/// Named, ordered set of lookup strategies
#[derive(Debug, Clone)]
pub struct Resolver {
    what: String,
    strategies: Vec<Strategy>,
}

impl Resolver {
    pub fn new(what: impl Into<String>) -> Self {
        Self {
            what: what.into(),
            strategies: Vec::new(),
        }
    }

    pub fn or(mut self, strategy: Strategy) -> Self {
        self.strategies.push(strategy);
        self
    }

    pub fn strategies(&self) -> &[Strategy] {
        &self.strategies
    }

    /// Try every strategy in order; the first with at least one match wins
    ///
    /// A strategy whose query errors is treated as a miss. When every
    /// strategy misses, the error lists all attempted selectors.
    pub async fn resolve(&self, page: &mut dyn Page) -> E2eResult<Resolved> {
        let mut tried = Vec::with_capacity(self.strategies.len());

        for (index, strategy) in self.strategies.iter().enumerate() {
            let selector = strategy.selector();
            match page.count(&selector).await {
                Ok(count) if count > 0 => {
                    debug!("Resolved {} via '{}' ({} match(es))", self.what, selector, count);
                    return Ok(Resolved {
                        selector,
                        strategy: index,
                        count,
                    });
                }
                Ok(_) => tried.push(selector),
                Err(e) => tried.push(format!("{} ({})", selector, e)),
            }
        }

        Err(Error::not_found("Element", &self.what, tried).into())
    }

    /// Like [`resolve`](Self::resolve) but a total miss is `None`
    pub async fn try_resolve(&self, page: &mut dyn Page) -> E2eResult<Option<Resolved>> {
        match self.resolve(page).await {
            Ok(resolved) => Ok(Some(resolved)),
            Err(crate::error::E2eError::Check(Error::NotFound { .. })) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

// =============================================================================
// Source Chain — ordered fallback over interchangeable upstream sources
// =============================================================================
//
// Sources are tried strictly in the order they were added. The first attempt
// that returns a value accepted by the validator wins; every other outcome
// (transport error, bad shape, timeout, rejected value) is logged and the
// next source is tried. No retries, no backoff, no racing.
// =============================================================================

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::SourceError;

/// One upstream that can produce a `T`.
#[async_trait]
pub trait Source<T>: Send + Sync {
    /// Short stable name used in logs and provenance fields.
    fn name(&self) -> &'static str;

    async fn fetch(&self) -> Result<T, SourceError>;
}

/// Outcome of running a whole chain.
#[derive(Debug)]
pub enum SourceResult<T> {
    Ok { value: T, source: &'static str },
    /// Every source failed; one reason per attempt, in order.
    Failed { reasons: Vec<String> },
}

impl<T> SourceResult<T> {
    /// The winning value and its source name, if any.
    #[cfg(test)]
    pub fn ok(self) -> Option<(T, &'static str)> {
        match self {
            Self::Ok { value, source } => Some((value, source)),
            Self::Failed { .. } => None,
        }
    }
}

type Validator<T> = Box<dyn Fn(&'static str, &T) -> Result<(), SourceError> + Send + Sync>;

/// Ordered list of sources plus the acceptance rule shared by all of them.
pub struct SourceChain<T> {
    label: &'static str,
    sources: Vec<Box<dyn Source<T>>>,
    validator: Validator<T>,
    attempt_timeout: Duration,
}

impl<T: Send + 'static> SourceChain<T> {
    /// Empty chain that accepts any value a source returns.
    pub fn new(label: &'static str, attempt_timeout: Duration) -> Self {
        Self {
            label,
            sources: Vec::new(),
            validator: Box::new(|_, _| Ok(())),
            attempt_timeout,
        }
    }

    /// Append a source at the lowest priority so far.
    pub fn with_source(mut self, source: impl Source<T> + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    /// Replace the acceptance rule. The validator receives the source name so
    /// it can build a precise [`SourceError`].
    pub fn with_validator(
        mut self,
        validator: impl Fn(&'static str, &T) -> Result<(), SourceError> + Send + Sync + 'static,
    ) -> Self {
        self.validator = Box::new(validator);
        self
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Names of the configured sources in priority order.
    #[cfg(test)]
    pub fn source_names(&self) -> Vec<&'static str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    /// Try every source in order and return the first accepted value.
    pub async fn run(&self) -> SourceResult<T> {
        let mut reasons = Vec::with_capacity(self.sources.len());

        for source in &self.sources {
            let name = source.name();

            let fetched = match tokio::time::timeout(self.attempt_timeout, source.fetch()).await {
                Ok(result) => result,
                Err(_) => Err(SourceError::Timeout {
                    source_name: name.to_string(),
                    timeout_ms: self.attempt_timeout.as_millis() as u64,
                }),
            };

            let accepted = fetched.and_then(|value| {
                (self.validator)(name, &value)?;
                Ok(value)
            });

            match accepted {
                Ok(value) => {
                    debug!(chain = self.label, source = name, "source accepted");
                    return SourceResult::Ok {
                        value,
                        source: name,
                    };
                }
                Err(e) => {
                    warn!(chain = self.label, source = name, error = %e, "source attempt failed");
                    reasons.push(e.to_string());
                }
            }
        }

        warn!(
            chain = self.label,
            attempts = reasons.len(),
            "all sources exhausted"
        );
        SourceResult::Failed { reasons }
    }
}

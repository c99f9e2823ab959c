use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;

use crate::error::AppError;
use crate::result::ApiResult;

/// ValidationFailure
///
/// One violated rule: the property it was declared for and its message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFailure {
    pub property: &'static str,
    pub message: String,
}

type Predicate<T> = Box<dyn Fn(&T) -> bool + Send + Sync>;

/// Rule
///
/// A pure predicate paired with the message reported when it does not hold.
pub struct Rule<T> {
    property: &'static str,
    predicate: Predicate<T>,
    message: &'static str,
}

impl<T> Rule<T> {
    fn check(&self, request: &T) -> Option<ValidationFailure> {
        if (self.predicate)(request) {
            None
        } else {
            Some(ValidationFailure {
                property: self.property,
                message: self.message.to_string(),
            })
        }
    }
}

/// RuleSet
///
/// An ordered list of rules for one request type. Every rule is evaluated;
/// failures come back in declaration order.
pub struct RuleSet<T> {
    rules: Vec<Rule<T>>,
}

impl<T> Default for RuleSet<T> {
    fn default() -> Self {
        Self { rules: Vec::new() }
    }
}

impl<T> RuleSet<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a rule: `predicate` must return true for the request to be valid.
    pub fn rule(
        mut self,
        property: &'static str,
        predicate: impl Fn(&T) -> bool + Send + Sync + 'static,
        message: &'static str,
    ) -> Self {
        self.rules.push(Rule {
            property,
            predicate: Box::new(predicate),
            message,
        });
        self
    }

    pub fn check(&self, request: &T) -> Vec<ValidationFailure> {
        self.rules.iter().filter_map(|rule| rule.check(request)).collect()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Validator
///
/// What the pipeline runs. Implemented by `RuleSet`.
#[async_trait]
pub trait Validator<T>: Send + Sync {
    async fn validate(&self, request: &T) -> Vec<ValidationFailure>;
}

#[async_trait]
impl<T: Sync> Validator<T> for RuleSet<T> {
    async fn validate(&self, request: &T) -> Vec<ValidationFailure> {
        self.check(request)
    }
}

/// ValidationPipeline
///
/// The stage between dispatch and the handler for one request type.
///
/// All registered validators run concurrently and are joined before anything
/// else happens. Their failures are merged in registration order (then rule
/// order inside each validator). Any failure short-circuits into a 400
/// `ApiResult` and the handler never runs. With no validators registered the
/// handler runs immediately.
pub struct ValidationPipeline<T> {
    validators: Vec<Arc<dyn Validator<T>>>,
}

impl<T> Default for ValidationPipeline<T> {
    fn default() -> Self {
        Self {
            validators: Vec::new(),
        }
    }
}

impl<T> Clone for ValidationPipeline<T> {
    fn clone(&self) -> Self {
        Self {
            validators: self.validators.clone(),
        }
    }
}

impl<T: Send + Sync + 'static> ValidationPipeline<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, validator: impl Validator<T> + 'static) -> Self {
        self.validators.push(Arc::new(validator));
        self
    }

    pub fn validator_count(&self) -> usize {
        self.validators.len()
    }

    /// Runs every validator and returns the merged failures.
    pub async fn validate(&self, request: &T) -> Vec<ValidationFailure> {
        if self.validators.is_empty() {
            return Vec::new();
        }

        // join_all keeps output order aligned with registration order.
        join_all(self.validators.iter().map(|v| v.validate(request)))
            .await
            .into_iter()
            .flatten()
            .collect()
    }

    /// dispatch
    ///
    /// Validates `request` and, only if it is valid, hands it to `handler`.
    ///
    /// # Errors
    /// Propagates the handler's `AppError` unchanged; validation itself never errors.
    pub async fn dispatch<R, F, Fut>(&self, request: T, handler: F) -> Result<ApiResult<R>, AppError>
    where
        F: FnOnce(T) -> Fut,
        Fut: Future<Output = Result<ApiResult<R>, AppError>>,
    {
        let failures = self.validate(&request).await;
        if !failures.is_empty() {
            tracing::debug!(count = failures.len(), "request rejected by validation");
            return Ok(ApiResult::from_failures(failures));
        }
        handler(request).await
    }
}

// --- Predicate helpers ---

/// True when the value has at least one non-whitespace character.
pub fn not_blank(value: &str) -> bool {
    !value.trim().is_empty()
}

/// True when the value fits in `max` characters.
pub fn within(value: &str, max: usize) -> bool {
    value.chars().count() <= max
}

/// Loose address check: exactly one `@` with text on both sides.
pub fn is_email(value: &str) -> bool {
    match value.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !domain.contains('@'),
        None => false,
    }
}

/// True for any UUID other than the nil UUID.
pub fn not_nil(id: &uuid::Uuid) -> bool {
    !id.is_nil()
}

//! Per-flag validation hooks.

use thiserror::Error;

use crate::context::Context;
use crate::error::BoxError;

use super::value::Value;

/// Checks a flag's value after all providers ran.
///
/// The value is passed in; implementations must not read their own flag back
/// through the context.
pub trait Validator: Send + Sync {
    fn validate(&self, ctx: &Context<'_>, value: &Value) -> Result<(), BoxError>;
}

/// Adapts a closure into a [`Validator`].
///
/// # Examples
///
/// ```
/// use cmdkit_core::{IntFlag, Value, ValidatorFn};
///
/// let port = IntFlag::new("port").with_validator(ValidatorFn::new(|_, value| match value {
///     Value::Int(port) if *port > 1024 => Ok(()),
///     _ => Err("port must be above 1024".into()),
/// }));
/// assert!(port.validator.is_some());
/// ```
pub struct ValidatorFn<F>(F);

impl<F> ValidatorFn<F>
where
    F: Fn(&Context<'_>, &Value) -> Result<(), BoxError> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> Validator for ValidatorFn<F>
where
    F: Fn(&Context<'_>, &Value) -> Result<(), BoxError> + Send + Sync,
{
    fn validate(&self, ctx: &Context<'_>, value: &Value) -> Result<(), BoxError> {
        (self.0)(ctx, value)
    }
}

/// Accepts only values equal to one of the listed items.
///
/// # Examples
///
/// ```
/// use cmdkit_core::{OneOf, StringFlag};
///
/// let level = StringFlag::new("log-level")
///     .with_value("info")
///     .with_validator(OneOf::new(["debug", "info", "warn"]));
/// assert!(level.validator.is_some());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct OneOf(Vec<Value>);

impl OneOf {
    pub fn new<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self(items.into_iter().map(Into::into).collect())
    }
}

/// Raised by [`OneOf`] for values outside the allowed set.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("unsupported value: {0}")]
pub struct UnsupportedValue(pub Value);

impl Validator for OneOf {
    fn validate(&self, _ctx: &Context<'_>, value: &Value) -> Result<(), BoxError> {
        if self.0.contains(value) {
            Ok(())
        } else {
            Err(Box::new(UnsupportedValue(value.clone())))
        }
    }
}

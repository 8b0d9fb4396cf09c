use crate::error::Error;

/// Result of a contained call.
///
/// `value` holds either the real result or the operation's sentinel. A
/// verified mutation can be successful and still carry the fault that the
/// remote client raised along the way.
#[derive(Debug, Clone)]
#[must_use]
pub struct Outcome<T> {
    value: T,
    success: bool,
    error: Option<Error>,
}

impl<T> Outcome<T> {
    pub fn ok(value: T) -> Self {
        Self {
            value,
            success: true,
            error: None,
        }
    }

    /// The call failed; `sentinel` stands in for the value.
    pub fn failed(sentinel: T, error: Error) -> Self {
        Self {
            value: sentinel,
            success: false,
            error: Some(error),
        }
    }

    /// The call raised, but a follow-up check showed the intended effect.
    pub fn verified(value: T, error: Error) -> Self {
        Self {
            value,
            success: true,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    pub fn into_value(self) -> T {
        self.value
    }

    pub fn into_parts(self) -> (T, bool, Option<Error>) {
        (self.value, self.success, self.error)
    }

    /// Drops the sentinel of a failed outcome in favour of its fault.
    pub fn into_result(self) -> Result<T, Error> {
        match (self.success, self.error) {
            (false, Some(error)) => Err(error),
            (false, None) => Err(Error::Remote("operation failed".to_owned())),
            (true, _) => Ok(self.value),
        }
    }
}

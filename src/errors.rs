//! Per-request error accumulator.
//!
//! Handlers and middleware record failures here instead of returning them.
//! Private errors are for operators: they end up in the access log and never
//! reach the client. Public errors are meant to be safe to show.

use std::fmt;

/// Who may see an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Private,
    Public,
}

/// One recorded failure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ChainError {
    pub fn private(message: impl fmt::Display) -> Self {
        Self { kind: ErrorKind::Private, message: message.to_string() }
    }

    pub fn public(message: impl fmt::Display) -> Self {
        Self { kind: ErrorKind::Public, message: message.to_string() }
    }
}

impl fmt::Display for ChainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Errors recorded while a request moved through the chain, in order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Errors(Vec<ChainError>);

impl Errors {
    pub fn new() -> Self { Self::default() }

    pub fn push(&mut self, error: ChainError) {
        self.0.push(error);
    }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }
    pub fn len(&self) -> usize { self.0.len() }

    pub fn iter(&self) -> impl Iterator<Item = &ChainError> {
        self.0.iter()
    }

    /// Only the errors of `kind`.
    pub fn by_kind(&self, kind: ErrorKind) -> Errors {
        Errors(self.0.iter().filter(|e| e.kind == kind).cloned().collect())
    }
}

impl Extend<ChainError> for Errors {
    fn extend<I: IntoIterator<Item = ChainError>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

impl IntoIterator for Errors {
    type Item = ChainError;
    type IntoIter = std::vec::IntoIter<ChainError>;

    fn into_iter(self) -> Self::IntoIter { self.0.into_iter() }
}

/// Messages joined with `"; "`. Empty when nothing was recorded.
impl fmt::Display for Errors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, e) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            fmt::Display::fmt(e, f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_renders_empty() {
        assert_eq!(Errors::new().to_string(), "");
    }

    #[test]
    fn single_error_renders_its_message() {
        let mut errors = Errors::new();
        errors.push(ChainError::private("db timeout"));
        assert_eq!(errors.to_string(), "db timeout");
    }

    #[test]
    fn filters_by_kind_and_keeps_order() {
        let mut errors = Errors::new();
        errors.push(ChainError::private("first"));
        errors.push(ChainError::public("shown to client"));
        errors.push(ChainError::private("second"));

        let private = errors.by_kind(ErrorKind::Private);
        assert_eq!(private.len(), 2);
        assert_eq!(private.to_string(), "first; second");
        assert_eq!(errors.by_kind(ErrorKind::Public).to_string(), "shown to client");
    }
}

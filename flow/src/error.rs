//! Error types and result definitions for pipeline operations.
//!
//! [`FlowError`] carries a classification, a static description, optional dynamic detail, an
//! optional source and the call site where it was raised. Failures of several units of execution
//! are aggregated into a single [`FlowError`] when the pipeline is awaited.

use std::backtrace::Backtrace;
use std::borrow::Cow;
use std::error;
use std::fmt;
use std::panic::Location;
use std::sync::Arc;

/// Result type for pipeline operations.
pub type FlowResult<T> = Result<T, FlowError>;

#[derive(Debug, Clone)]
struct ErrorPayload {
    kind: ErrorKind,
    description: Cow<'static, str>,
    detail: Option<Cow<'static, str>>,
    source: Option<Arc<dyn error::Error + Send + Sync>>,
    location: &'static Location<'static>,
    backtrace: Arc<Backtrace>,
}

/// Main error type of the pipeline.
#[derive(Debug, Clone)]
pub struct FlowError {
    repr: ErrorRepr,
}

#[derive(Debug, Clone)]
enum ErrorRepr {
    Single(ErrorPayload),
    /// Failures of several units of execution, e.g. multiple workers.
    Many {
        errors: Vec<FlowError>,
        location: &'static Location<'static>,
    },
}

/// Categories of errors raised by the pipeline.
#[derive(PartialEq, Eq, Copy, Clone, Debug, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    // Source errors
    SourceIoError,
    SourceRowMissing,

    // Remote errors
    RemoteUnavailable,
    RemoteProtocolError,

    // Lifecycle errors
    InvalidState,

    // Coordination errors
    ChannelClosed,
    IdAllocatorStopped,
    WorkerPanic,

    // Configuration errors
    ConfigError,

    Unknown,
}

impl FlowError {
    /// Returns the [`ErrorKind`] of this error, or of the first aggregated error.
    pub fn kind(&self) -> ErrorKind {
        match self.repr {
            ErrorRepr::Single(ref payload) => payload.kind,
            ErrorRepr::Many { ref errors, .. } => errors
                .first()
                .map(|err| err.kind())
                .unwrap_or(ErrorKind::Unknown),
        }
    }

    /// Returns every [`ErrorKind`] contained in this error, flattened.
    pub fn kinds(&self) -> Vec<ErrorKind> {
        match self.repr {
            ErrorRepr::Single(ref payload) => vec![payload.kind],
            ErrorRepr::Many { ref errors, .. } => {
                errors.iter().flat_map(|err| err.kinds()).collect()
            }
        }
    }

    /// Returns the dynamic detail, for aggregates the first one available.
    pub fn detail(&self) -> Option<&str> {
        match self.repr {
            ErrorRepr::Single(ref payload) => payload.detail.as_deref(),
            ErrorRepr::Many { ref errors, .. } => errors.iter().find_map(|e| e.detail()),
        }
    }

    /// Returns the aggregated errors, if this is an aggregate.
    pub fn errors(&self) -> Option<&[FlowError]> {
        match self.repr {
            ErrorRepr::Single(_) => None,
            ErrorRepr::Many { ref errors, .. } => Some(errors),
        }
    }

    /// Returns the captured backtrace of a single error.
    pub fn backtrace(&self) -> Option<&Backtrace> {
        match self.repr {
            ErrorRepr::Single(ref payload) => Some(payload.backtrace.as_ref()),
            ErrorRepr::Many { .. } => None,
        }
    }

    /// Returns the call site where this error was created.
    pub fn location(&self) -> &'static Location<'static> {
        match self.repr {
            ErrorRepr::Single(ref payload) => payload.location,
            ErrorRepr::Many { location, .. } => location,
        }
    }

    /// Attaches an originating error, exposed through [`error::Error::source`].
    ///
    /// Has no effect on aggregates, which forward their first error as source.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: error::Error + Send + Sync + 'static,
    {
        if let ErrorRepr::Single(ref mut payload) = self.repr {
            payload.source = Some(Arc::new(source));
        }

        self
    }

    #[track_caller]
    fn from_components(
        kind: ErrorKind,
        description: Cow<'static, str>,
        detail: Option<Cow<'static, str>>,
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    ) -> Self {
        FlowError {
            repr: ErrorRepr::Single(ErrorPayload {
                kind,
                description,
                detail,
                source,
                location: Location::caller(),
                backtrace: Arc::new(Backtrace::capture()),
            }),
        }
    }
}

impl PartialEq for FlowError {
    fn eq(&self, other: &FlowError) -> bool {
        match (&self.repr, &other.repr) {
            (ErrorRepr::Single(a), ErrorRepr::Single(b)) => a.kind == b.kind,
            (ErrorRepr::Many { errors: a, .. }, ErrorRepr::Many { errors: b, .. }) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for FlowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.repr {
            ErrorRepr::Single(payload) => {
                let location = payload.location;
                write!(
                    f,
                    "[{:?}] {} @ {}:{}:{}",
                    payload.kind,
                    payload.description,
                    location.file(),
                    location.line(),
                    location.column()
                )?;

                if let Some(detail) = payload.detail.as_deref() {
                    write_indented(f, "Detail", detail)?;
                }

                let backtrace = payload.backtrace.to_string();
                if !backtrace.trim().is_empty() {
                    write_indented(f, "Backtrace", &backtrace)?;
                }

                Ok(())
            }
            ErrorRepr::Many { errors, location } => {
                let count = errors.len();
                write!(
                    f,
                    "[Many] {} error{} aggregated @ {}:{}:{}",
                    count,
                    if count == 1 { "" } else { "s" },
                    location.file(),
                    location.line(),
                    location.column()
                )?;

                for (index, error) in errors.iter().enumerate() {
                    let rendered = error.to_string();
                    let mut lines = rendered.lines();
                    write!(f, "\n  {}. {}", index + 1, lines.next().unwrap_or_default())?;
                    for line in lines {
                        write!(f, "\n     {line}")?;
                    }
                }

                Ok(())
            }
        }
    }
}

impl error::Error for FlowError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match &self.repr {
            ErrorRepr::Single(payload) => payload
                .source
                .as_ref()
                .map(|source| source.as_ref() as &(dyn error::Error + 'static)),
            ErrorRepr::Many { errors, .. } => errors
                .first()
                .map(|error| error as &(dyn error::Error + 'static)),
        }
    }
}

/// Writes a titled block with every line indented under the title.
fn write_indented(f: &mut fmt::Formatter<'_>, title: &str, body: &str) -> fmt::Result {
    write!(f, "\n  {title}:")?;
    for line in body.lines() {
        if line.trim().is_empty() {
            write!(f, "\n    ")?;
        } else {
            write!(f, "\n    {line}")?;
        }
    }

    Ok(())
}

impl From<(ErrorKind, &'static str)> for FlowError {
    #[track_caller]
    fn from((kind, desc): (ErrorKind, &'static str)) -> FlowError {
        FlowError::from_components(kind, Cow::Borrowed(desc), None, None)
    }
}

impl<D> From<(ErrorKind, &'static str, D)> for FlowError
where
    D: Into<Cow<'static, str>>,
{
    #[track_caller]
    fn from((kind, desc, detail): (ErrorKind, &'static str, D)) -> FlowError {
        FlowError::from_components(kind, Cow::Borrowed(desc), Some(detail.into()), None)
    }
}

/// Aggregates errors, returning the error itself when there is exactly one.
impl<E> From<Vec<E>> for FlowError
where
    E: Into<FlowError>,
{
    #[track_caller]
    fn from(errors: Vec<E>) -> FlowError {
        let location = Location::caller();
        let mut errors: Vec<FlowError> = errors.into_iter().map(Into::into).collect();

        if errors.len() == 1 {
            if let Some(error) = errors.pop() {
                return error;
            }
        }

        FlowError {
            repr: ErrorRepr::Many { errors, location },
        }
    }
}

impl From<config::shared::ValidationError> for FlowError {
    #[track_caller]
    fn from(err: config::shared::ValidationError) -> FlowError {
        let detail = err.to_string();
        FlowError::from_components(
            ErrorKind::ConfigError,
            Cow::Borrowed("Invalid pipeline configuration"),
            Some(Cow::Owned(detail)),
            Some(Arc::new(err)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow_error;

    #[test]
    fn single_error_exposes_kind_and_detail() {
        let err = flow_error!(ErrorKind::SourceRowMissing, "Row not found", "row 12");

        assert_eq!(err.kind(), ErrorKind::SourceRowMissing);
        assert_eq!(err.detail(), Some("row 12"));
        assert!(err.errors().is_none());
        assert!(err.to_string().contains("Row not found"));
    }

    #[test]
    fn aggregate_of_one_is_unwrapped() {
        let err: FlowError = vec![flow_error!(ErrorKind::InvalidState, "Bad state")].into();

        assert!(err.errors().is_none());
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }

    #[test]
    fn aggregate_flattens_kinds() {
        let err: FlowError = vec![
            flow_error!(ErrorKind::RemoteUnavailable, "Remote down"),
            flow_error!(ErrorKind::WorkerPanic, "Worker panicked"),
        ]
        .into();

        assert_eq!(
            err.kinds(),
            vec![ErrorKind::RemoteUnavailable, ErrorKind::WorkerPanic]
        );
        assert_eq!(err.errors().map(|errors| errors.len()), Some(2));
        assert!(err.to_string().starts_with("[Many] 2 errors aggregated"));
    }

    #[test]
    fn validation_errors_keep_their_source() {
        let err = FlowError::from(config::shared::ValidationError::WorkersZero);

        assert_eq!(err.kind(), ErrorKind::ConfigError);
        assert!(err.detail().is_some());
        assert!(error::Error::source(&err).is_some());
    }
}

use core::error::Error;
use core::fmt::Debug;
use core::fmt::Display;
use std::backtrace::Backtrace;
use std::backtrace::BacktraceStatus;

/// The catch-all error type of the toolset. Anything that implements [`Error`]
/// (or a string) converts into it, so tools and tests can use `?` freely. A
/// backtrace is captured when the error is created.
pub struct PmcError {
    inner: Box<InnerPmcError>,
}

/// Boxed so that `Result<T, PmcError>` stays a single pointer wide.
struct InnerPmcError {
    error: Box<dyn Error + Send + Sync + 'static>,
    backtrace: Backtrace,
}

impl PmcError {
    /// Attempts to downcast the underlying error to the given type.
    pub fn downcast_ref<E: Error + 'static>(&self) -> Option<&E> {
        self.inner.error.downcast_ref::<E>()
    }

    /// Returns true iff the underlying error is of the given type.
    pub fn is<E: Error + 'static>(&self) -> bool {
        self.inner.error.is::<E>()
    }
}

// Written this way it also gives us From<&str> and From<String>.
impl<E> From<E> for PmcError
where
    Box<dyn Error + Send + Sync + 'static>: From<E>,
{
    #[cold]
    fn from(error: E) -> Self {
        PmcError {
            inner: Box::new(InnerPmcError {
                error: error.into(),
                backtrace: Backtrace::capture(),
            }),
        }
    }
}

impl Display for PmcError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        writeln!(f, "{}", self.inner.error)
    }
}

impl Debug for PmcError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        writeln!(f, "{:?}", self.inner.error)?;

        let backtrace = &self.inner.backtrace;
        if let BacktraceStatus::Captured = backtrace.status() {
            writeln!(f, "{backtrace}")?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Custom;

    impl Display for Custom {
        fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
            write!(f, "custom")
        }
    }

    impl Error for Custom {}

    #[test]
    fn test_downcast() {
        let error: PmcError = Custom.into();
        assert!(error.is::<Custom>());
        assert!(error.downcast_ref::<Custom>().is_some());

        let error: PmcError = "plain message".into();
        assert!(!error.is::<Custom>());
        assert_eq!(error.to_string(), "plain message\n");
    }
}

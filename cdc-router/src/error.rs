use std::backtrace::Backtrace;
use std::error::Error;
use std::fmt;

use cdc::error::CdcError;

fn should_render_backtrace() -> bool {
    matches!(
        std::env::var("RUST_BACKTRACE").as_deref(),
        Ok("1") | Ok("full")
    )
}

pub type RouterResult<T> = Result<T, RouterError>;

/// Captured backtrace wrapper for variants that do not carry their own.
pub struct CapturedBacktrace(Backtrace);

impl CapturedBacktrace {
    fn capture() -> Self {
        Self(Backtrace::capture())
    }
}

impl fmt::Debug for CapturedBacktrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error type of the router binary.
#[derive(Debug)]
pub enum RouterError {
    /// Routing error.
    Cdc(CdcError),
    Config(Box<dyn Error + Send + Sync>, CapturedBacktrace),
    Io(std::io::Error, CapturedBacktrace),
}

impl RouterError {
    pub fn category(&self) -> &'static str {
        match self {
            RouterError::Cdc(_) => "router error",
            RouterError::Config(_, _) => "configuration error",
            RouterError::Io(_, _) => "i/o error",
        }
    }

    pub fn backtrace(&self) -> Option<&Backtrace> {
        match self {
            RouterError::Cdc(err) => err.backtrace(),
            RouterError::Config(_, captured) => Some(&captured.0),
            RouterError::Io(_, captured) => Some(&captured.0),
        }
    }

    pub fn config<E: Error + Send + Sync + 'static>(err: E) -> Self {
        RouterError::Config(Box::new(err), CapturedBacktrace::capture())
    }

    /// Returns a report for terminal output, with the cause chain and, when `RUST_BACKTRACE`
    /// is set, the backtrace.
    pub fn render_report(&self) -> String {
        let mut out = String::new();
        out.push_str("router failed\n");
        out.push_str(&format!("category: {}\n", self.category()));
        out.push_str(&format!("error: {self}\n"));

        // Aggregated errors already render every member.
        if !matches!(self, RouterError::Cdc(err) if err.errors().is_some()) {
            let mut source = Error::source(self);
            let mut idx = 1usize;
            while let Some(err) = source {
                out.push_str(&format!("cause {idx}: {err}\n"));
                source = err.source();
                idx += 1;
            }
        }

        if should_render_backtrace()
            && let Some(backtrace) = self.backtrace()
        {
            out.push_str("backtrace:\n");
            out.push_str(&backtrace.to_string());
            if !out.ends_with('\n') {
                out.push('\n');
            }
        }

        out
    }
}

impl fmt::Display for RouterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouterError::Cdc(err) => write!(f, "{err}"),
            RouterError::Config(source, _) => write!(f, "configuration error: {source}"),
            RouterError::Io(source, _) => write!(f, "i/o error: {source}"),
        }
    }
}

impl Error for RouterError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            RouterError::Cdc(err) => err.source(),
            RouterError::Config(source, _) => Some(source.as_ref()),
            RouterError::Io(source, _) => Some(source),
        }
    }
}

impl From<std::io::Error> for RouterError {
    fn from(err: std::io::Error) -> Self {
        RouterError::Io(err, CapturedBacktrace::capture())
    }
}

impl From<CdcError> for RouterError {
    fn from(err: CdcError) -> Self {
        RouterError::Cdc(err)
    }
}

use std::fmt;

use thiserror::Error;
use trackable_ast::{SourceMap, Span};

use crate::utils::DisplayFn;

const TRACE_PREFIX: &str = "Trackable: ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Logging,
    Info,
    Warning,
    Error,
}

impl Severity {
    pub fn level(self) -> log::Level {
        match self {
            Self::Logging => log::Level::Trace,
            Self::Info => log::Level::Info,
            Self::Warning => log::Level::Warn,
            Self::Error => log::Level::Error,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Logging => f.write_str("logging"),
            Self::Info => f.write_str("info"),
            Self::Warning => f.write_str("warning"),
            Self::Error => f.write_str("error"),
        }
    }
}

#[derive(Debug, Error)]
pub enum Diagnostic {
    #[error("@{0} is not supported on data and inline classes!")]
    UnsupportedShape(String, Option<Span>),
    #[error("'{0}' is already declared on this class, no accessor was generated")]
    AccessorNameTaken(String, Option<Span>),
}

impl Diagnostic {
    pub fn severity(&self) -> Severity {
        match self {
            Self::UnsupportedShape(_, _) => Severity::Error,
            Self::AccessorNameTaken(_, _) => Severity::Warning,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Error
    }

    pub fn span(&self) -> Option<Span> {
        match self {
            Self::UnsupportedShape(_, span) | Self::AccessorNameTaken(_, span) => *span,
        }
    }
}

/// A single entry routed to the host's message collector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    severity: Severity,
    text: String,
    span: Option<Span>,
}

impl Message {
    pub fn new(severity: Severity, text: impl Into<String>, span: Option<Span>) -> Self {
        Self {
            severity,
            text: text.into(),
            span,
        }
    }

    #[inline]
    pub fn severity(&self) -> Severity {
        self.severity
    }

    #[inline]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[inline]
    pub fn span(&self) -> Option<Span> {
        self.span
    }

    #[inline]
    pub fn is_fatal(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn display<'a>(
        &'a self,
        sources: &'a SourceMap,
    ) -> Result<impl fmt::Display + 'a, UnknownSource> {
        let location = match self.span {
            Some(span) => {
                let file = sources.get(span.file).ok_or(UnknownSource(span))?;
                let start = file.lookup(span.start);
                let end = file.lookup(span.end);
                let line = file.line(start.line).ok_or(UnknownSource(span))?;
                Some((file.path(), start, end, line))
            }
            None => None,
        };

        Ok(DisplayFn::new(move |f: &mut fmt::Formatter<'_>| {
            if let Some((path, start, end, line)) = location {
                writeln!(f, "At {}:{}", path.display(), start)?;
                writeln!(f, "{}", line.trim_end())?;

                let pad = start.col;
                let underline_len = if start.line == end.line {
                    end.col.saturating_sub(start.col).max(1)
                } else {
                    3
                };
                writeln!(f, "{:>pad$}{:^>underline_len$}", "", "")?;
            }
            write!(f, "{}", self.text)
        }))
    }
}

impl From<&Diagnostic> for Message {
    fn from(diagnostic: &Diagnostic) -> Self {
        Self::new(
            diagnostic.severity(),
            diagnostic.to_string(),
            diagnostic.span(),
        )
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.severity, self.text)
    }
}

/// The host side sink for everything the plugin wants to say.
pub trait MessageCollector {
    fn log(&mut self, severity: Severity, message: &str, location: Option<Span>);

    fn trace(&mut self, message: &str) {
        self.log(Severity::Logging, &format!("{TRACE_PREFIX}{message}"), None);
    }

    fn diagnostic(&mut self, diagnostic: &Diagnostic) {
        self.log(
            diagnostic.severity(),
            &diagnostic.to_string(),
            diagnostic.span(),
        );
    }
}

/// Forwards messages straight to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogCollector;

impl MessageCollector for LogCollector {
    fn log(&mut self, severity: Severity, message: &str, location: Option<Span>) {
        match location {
            Some(span) => log::log!(severity.level(), "{message} ({span})"),
            None => log::log!(severity.level(), "{message}"),
        }
    }
}

#[derive(Debug)]
pub struct Reporter<A> {
    reported: Vec<A>,
}

impl<A> Reporter<A> {
    #[inline]
    pub fn report(&mut self, error: impl Into<A>) {
        self.reported.push(error.into());
    }

    #[inline]
    pub fn reported(&self) -> &[A] {
        &self.reported
    }

    #[inline]
    pub fn into_reported(self) -> Vec<A> {
        self.reported
    }
}

impl<E> Default for Reporter<E> {
    fn default() -> Self {
        Self {
            reported: Vec::new(),
        }
    }
}

impl MessageCollector for Reporter<Message> {
    fn log(&mut self, severity: Severity, message: &str, location: Option<Span>) {
        self.report(Message::new(severity, message, location));
    }
}

#[derive(Debug, Error)]
#[error("the source of a diagnostic could not be determined (span: {0})")]
pub struct UnknownSource(Span);

//! Contains the common [`ErrorKind`] trait used by all errors to display user-facing error
//! messages.
//!
//! Errors produced by the operator compiler are not tied to a source file. Instead, every
//! [`Error`] carries the text it is reported against, usually the signature of the operator at
//! fault (such as `Mat44 *(Mat44, Vec3)`), along with the regions of that text to highlight.

// lets `#[derive(ErrorKind)]` refer to this crate by name in its own tests
#[cfg(test)]
extern crate self as symop_error;

use ariadne::{Color, Report, Source};
use std::{any::Any, fmt::{self, Debug, Display}, io, ops::Range};

/// The color to use to highlight expressions.
pub const EXPR: Color = Color::RGB(52, 235, 152);

/// Represents any kind of error that can occur during some operation.
pub trait ErrorKind: Debug + Send + Sync {
    /// Returns `self` as [`Any`], so callers can inspect the concrete kind of an [`Error`].
    fn as_any(&self) -> &dyn Any;

    /// The one-line message describing this error.
    fn message(&self) -> String;

    /// Builds the report for this error.
    fn build_report<'a>(
        &self,
        src_id: &'a str,
        spans: &[Range<usize>],
    ) -> Report<(&'a str, Range<usize>)>;
}

/// An error associated with regions of some text that can be highlighted.
#[derive(Debug)]
pub struct Error {
    /// The text that the spans of this error point into.
    pub src: String,

    /// The regions of `src` that this error originated from.
    pub spans: Vec<Range<usize>>,

    /// The kind of error that occurred.
    pub kind: Box<dyn ErrorKind>,
}

impl Error {
    /// Creates a new error with the given source text, spans and kind.
    ///
    /// At least one span must be given; reports are anchored at the first one.
    pub fn new(
        src: impl Into<String>,
        spans: Vec<Range<usize>>,
        kind: impl ErrorKind + 'static,
    ) -> Self {
        Self { src: src.into(), spans, kind: Box::new(kind) }
    }

    /// Returns true if this error is of the given kind.
    pub fn is<K: ErrorKind + 'static>(&self) -> bool {
        self.kind.as_any().is::<K>()
    }

    /// Returns the kind of this error, if it is of the given kind.
    pub fn downcast_ref<K: ErrorKind + 'static>(&self) -> Option<&K> {
        self.kind.as_any().downcast_ref::<K>()
    }

    /// Build a report from this error kind.
    pub fn build_report<'a>(&self, src_id: &'a str) -> Report<(&'a str, Range<usize>)> {
        self.kind.build_report(src_id, &self.spans)
    }

    /// Writes the full report of this error into the given writer.
    pub fn write_report<W: io::Write>(&self, src_id: &str, writer: W) -> io::Result<()> {
        self.build_report(src_id).write((src_id, Source::from(&self.src)), writer)
    }

    /// Renders the full report of this error into a [`String`].
    pub fn report_to_string(&self, src_id: &str) -> String {
        let mut buf = Vec::new();
        // writing into a `Vec` cannot fail
        let _ = self.write_report(src_id, &mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    }

    /// Report this error to stderr.
    ///
    /// The `ariadne` crate's [`Report`] type does not have a `Display` implementation, so we can
    /// only use its `eprint` method to print to stderr.
    pub fn report_to_stderr(&self, src_id: &str) -> io::Result<()> {
        self.build_report(src_id).eprint((src_id, Source::from(&self.src)))
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind.message())
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;
    use symop_attrs::ErrorKind;

    #[derive(Debug, ErrorKind)]
    #[error(
        message = format!("nothing named `{}`", self.name),
        labels = ["this name"],
        help = "try another name",
    )]
    struct Missing {
        name: String,
    }

    #[derive(Debug, ErrorKind)]
    #[error(message = "unit error", labels = ["here"])]
    struct Unit;

    #[test]
    fn display_uses_message() {
        let err = Error::new("foo(bar)", vec![0..3], Missing { name: "foo".to_string() });
        assert_eq!(err.to_string(), "nothing named `foo`");
    }

    #[test]
    fn downcast_to_kind() {
        let err = Error::new("x", vec![0..1], Unit);
        assert!(err.is::<Unit>());
        assert!(!err.is::<Missing>());
        assert!(err.downcast_ref::<Missing>().is_none());
    }

    #[test]
    fn report_highlights_source() {
        let err = Error::new("foo(bar)", vec![0..3], Missing { name: "foo".to_string() });
        let report = err.report_to_string("signature");
        let plain = String::from_utf8(strip_ansi_escapes::strip(report)).unwrap();
        assert!(plain.contains("nothing named `foo`"));
        assert!(plain.contains("foo(bar)"));
        assert!(plain.contains("this name"));
        assert!(plain.contains("try another name"));
    }
}

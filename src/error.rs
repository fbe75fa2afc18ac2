//! Codec error types and the dynamically-scoped error sink.
//!
use std::cell::RefCell;
use std::fmt;

/// A CBOR codec `Result`, normally returning a codec [`Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The two families of error this codec can raise: failures detected while
/// walking a value to encode it, and failures detected while parsing bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// A negative length/code was passed to the header encoder.
    NegativeInfoCode,
    /// A length/code exceeded `u64::MAX` in the header encoder.
    OverflowInfoCode,
    /// A simple-value code fell in the disallowed 24..=31 range.
    IllegalSimpleType,
    /// The encoder was given a value it has no native emission, handler, or
    /// collection rule for.
    UnsupportedType,
    /// Header info code 28, 29, or 30 (reserved by RFC 7049).
    ReservedInfoCode,
    /// A streamed chunk's major type didn't match the stream it's in.
    IllegalChunkType,
    /// An indefinite-length marker appeared somewhere it isn't legal
    /// (integers, tags), or a chunk was itself indefinite-length.
    IllegalStream,
    /// An indefinite-length map ended on a key, with no paired value.
    MissingMapValue,
    /// A map contained the same key twice.
    DuplicateMapKey,
    /// A tag-258 set contained the same entry twice (`strict` mode only).
    DuplicateSetEntry,
    /// A registered tag read-handler raised while parsing its wrapped value.
    TagHandlingError,
    /// An unrecognized tag number was seen in `strict` mode.
    UnknownTag,
    /// An unrecognized simple-value code was seen in `strict` mode.
    UnknownSimpleValue,
    /// A lone `0xFF` break byte appeared outside of any stream.
    UnexpectedBreak,
    /// The byte source ended in the middle of a value.
    EndOfInput,
}

impl ErrorKind {
    /// Short machine-stable name, used in log fields and `Display`.
    pub fn as_str(&self) -> &'static str {
        use ErrorKind::*;
        match self {
            NegativeInfoCode => "negative-info-code",
            OverflowInfoCode => "overflow-info-code",
            IllegalSimpleType => "illegal-simple-type",
            UnsupportedType => "unsupported-type",
            ReservedInfoCode => "reserved-info-code",
            IllegalChunkType => "illegal-chunk-type",
            IllegalStream => "illegal-stream",
            MissingMapValue => "missing-map-value",
            DuplicateMapKey => "duplicate-map-key",
            DuplicateSetEntry => "duplicate-set-entry",
            TagHandlingError => "tag-handling-error",
            UnknownTag => "unknown-tag",
            UnknownSimpleValue => "unknown-simple-value",
            UnexpectedBreak => "unexpected-break",
            EndOfInput => "end-of-input",
        }
    }
}

/// A CBOR codec error: a `kind`, a human message, and optional structured
/// data describing what was detected (the offending byte, a duplicate key,
/// the handler's own error).
#[derive(Clone, Debug)]
pub struct Error {
    kind: ErrorKind,
    message: String,
    data: Option<Box<Value2>>,
}

/// Structured payload attached to some error kinds, kept separate from
/// `crate::value::Value` so this module has no dependency on it.
#[derive(Clone, Debug)]
pub enum Value2 {
    Byte(u8),
    Tag(u64),
    Text(String),
}

impl Error {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Error {
            kind,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(kind: ErrorKind, message: impl Into<String>, data: Value2) -> Self {
        Error {
            kind,
            message: message.into(),
            data: Some(Box::new(data)),
        }
    }

    /// Which of the two error families (and which specific kind) this is.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Structured data attached to the error, if any.
    pub fn data(&self) -> Option<&Value2> {
        self.data.as_deref()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.kind.as_str(), self.message)
    }
}

impl std::error::Error for Error {}

impl serde::ser::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::new(ErrorKind::UnsupportedType, msg.to_string())
    }
}

impl serde::de::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::new(ErrorKind::EndOfInput, msg.to_string())
    }
}

/// An installable error sink: given an error, either return a replacement
/// result (abort with it, or recover and keep going) or re-raise it.
///
/// This plays the role of the source library's dynamically-scoped error
/// handler (spec Design Notes, option (a)): a thread-local slot holding the
/// current sink, swapped in and restored via RAII so nested codec calls see
/// the outermost installed sink and a panic/early-return can't leave the
/// thread-local pointing at a sink that's gone out of scope.
pub trait ErrorSink {
    /// Called at the point an error is detected. The default sink simply
    /// returns `Err(err)` so it propagates via `?`.
    fn handle(&self, err: Error) -> Result<()>;
}

struct PropagatingSink;

impl ErrorSink for PropagatingSink {
    fn handle(&self, err: Error) -> Result<()> {
        Err(err)
    }
}

thread_local! {
    static SINK_STACK: RefCell<Vec<Box<dyn ErrorSink>>> = const { RefCell::new(Vec::new()) };
}

/// Report an error through the current dynamically-scoped sink. Core codec
/// code calls this instead of returning `Err` directly so an installed sink
/// gets a chance to recover; if the sink returns `Ok(())`, the *caller*
/// still receives the original `Err` (the sink decides policy, not control
/// flow), matching the source library's "sink to record, still raise by
/// default" behavior.
pub(crate) fn report(err: Error) -> Error {
    SINK_STACK.with(|stack| {
        if let Some(sink) = stack.borrow().last() {
            let _ = sink.handle(err.clone());
        } else {
            let _ = PropagatingSink.handle(err.clone());
        }
    });
    err
}

/// RAII guard returned by [`install_sink`]. Restores the previous sink (or
/// no sink) when dropped.
pub struct ErrorSinkGuard {
    _private: (),
}

impl Drop for ErrorSinkGuard {
    fn drop(&mut self) {
        SINK_STACK.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

/// Install an error sink for the current thread for the lifetime of the
/// returned guard. Nested `install_sink` calls stack; dropping an inner
/// guard uncovers the sink installed by the next-outer call.
pub fn install_sink(sink: impl ErrorSink + 'static) -> ErrorSinkGuard {
    SINK_STACK.with(|stack| {
        stack.borrow_mut().push(Box::new(sink));
    });
    ErrorSinkGuard { _private: () }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSink<'a>(&'a AtomicUsize);
    impl<'a> ErrorSink for CountingSink<'a> {
        fn handle(&self, _err: Error) -> Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn nested_sinks_restore_outer() {
        let outer_count = AtomicUsize::new(0);
        let inner_count = AtomicUsize::new(0);
        let _outer = install_sink(CountingSink(&outer_count));
        {
            let _inner = install_sink(CountingSink(&inner_count));
            report(Error::new(ErrorKind::UnknownTag, "x"));
        }
        report(Error::new(ErrorKind::UnknownTag, "y"));
        assert_eq!(inner_count.load(Ordering::SeqCst), 1);
        assert_eq!(outer_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn default_sink_propagates() {
        let err = report(Error::new(ErrorKind::EndOfInput, "eof"));
        assert_eq!(err.kind(), ErrorKind::EndOfInput);
    }
}

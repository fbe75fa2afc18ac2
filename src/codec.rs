//! The configurable codec object: tag registries, the dispatch function, and
//! the `canonical`/`strict` mode flags (spec §6's `construct-codec`).
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::tags::{self, DispatchKey, ReadHandler, WriteHandler};
use crate::value::Value;

/// A read-only, `Clone`-able codec configuration. Once built it carries no
/// interior mutability, matching the "treat as read-only after construction"
/// concurrency model (spec §5): many threads may share one `Codec` (wrap it
/// in an `Arc` to share without cloning the registries) and encode/decode
/// concurrently without synchronization.
#[derive(Clone)]
pub struct Codec {
    pub(crate) read_handlers: HashMap<u64, ReadHandler>,
    pub(crate) write_handlers: HashMap<DispatchKey, WriteHandler>,
    pub(crate) dispatch: Arc<dyn Fn(&Value) -> Option<DispatchKey> + Send + Sync>,
    pub(crate) set_tag: u64,
    pub(crate) canonical: bool,
    pub(crate) strict: bool,
}

impl fmt::Debug for Codec {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Codec")
            .field("read_handlers", &self.read_handlers.keys().collect::<Vec<_>>())
            .field("write_handlers", &self.write_handlers.keys().collect::<Vec<_>>())
            .field("set_tag", &self.set_tag)
            .field("canonical", &self.canonical)
            .field("strict", &self.strict)
            .finish()
    }
}

impl Codec {
    /// Start building a codec with no tag handlers registered and the
    /// RFC-default flags (`set_tag` 258, `canonical` and `strict` both
    /// false). Most callers want [`Codec::default`] instead, which also
    /// pre-registers the built-in tag handlers from spec §4.6.
    pub fn builder() -> CodecBuilder {
        CodecBuilder {
            read_handlers: HashMap::new(),
            write_handlers: HashMap::new(),
            dispatch: Arc::new(tags::default_dispatch),
            set_tag: 258,
            canonical: false,
            strict: false,
        }
    }

    pub fn canonical(&self) -> bool {
        self.canonical
    }

    pub fn strict(&self) -> bool {
        self.strict
    }

    pub fn set_tag(&self) -> u64 {
        self.set_tag
    }

    pub(crate) fn write_handler_for(&self, value: &Value) -> Option<&WriteHandler> {
        let key = (self.dispatch)(value)?;
        self.write_handlers.get(&key)
    }

    pub(crate) fn read_handler_for(&self, tag: u64) -> Option<&ReadHandler> {
        self.read_handlers.get(&tag)
    }
}

impl Default for Codec {
    /// The RFC-compliant, non-canonical, non-strict codec with the built-in
    /// tag handlers from spec §4.6 pre-registered (spec §4.9 / SPEC_FULL
    /// §6).
    fn default() -> Self {
        CodecBuilder::new().with_builtin_tags().build()
    }
}

/// Builds a [`Codec`]. Mirrors spec §6's `construct-codec(options)`: each
/// method sets one option and returns `self` for chaining, terminated by
/// [`CodecBuilder::build`].
pub struct CodecBuilder {
    read_handlers: HashMap<u64, ReadHandler>,
    write_handlers: HashMap<DispatchKey, WriteHandler>,
    dispatch: Arc<dyn Fn(&Value) -> Option<DispatchKey> + Send + Sync>,
    set_tag: u64,
    canonical: bool,
    strict: bool,
}

impl CodecBuilder {
    pub fn new() -> Self {
        Codec::builder()
    }

    /// Register the built-in tag 0/1/2/3/4/27/30/32/35/37/39/55799 handlers
    /// (spec §4.6). Tag 258 (sets) needs no registry entry: the decoder
    /// special-cases whatever tag [`CodecBuilder::set_tag`] configures.
    pub fn with_builtin_tags(mut self) -> Self {
        for (tag, handler) in tags::builtin_read_handlers() {
            self.read_handlers.insert(tag, handler);
        }
        for (key, handler) in tags::builtin_write_handlers() {
            self.write_handlers.insert(key, handler);
        }
        self
    }

    /// Register (or replace) a read-handler for `tag`.
    pub fn read_handler(mut self, tag: u64, handler: ReadHandler) -> Self {
        self.read_handlers.insert(tag, handler);
        self
    }

    /// Register (or replace) a write-handler for values that dispatch to
    /// `key`.
    pub fn write_handler(mut self, key: DispatchKey, handler: WriteHandler) -> Self {
        self.write_handlers.insert(key, handler);
        self
    }

    /// Override the dispatch function used to compute a write-handler
    /// lookup key from a value (spec §6: default is the value's own
    /// variant).
    pub fn dispatch(mut self, f: impl Fn(&Value) -> Option<DispatchKey> + Send + Sync + 'static) -> Self {
        self.dispatch = Arc::new(f);
        self
    }

    /// The tag number the decoder treats as a set, and the encoder wraps
    /// `Value::Set` under. Default 258.
    pub fn set_tag(mut self, tag: u64) -> Self {
        self.set_tag = tag;
        self
    }

    /// Sort map keys and set entries into canonical (shorter-then-lexical
    /// byte) order on encode. Default false.
    pub fn canonical(mut self, yes: bool) -> Self {
        self.canonical = yes;
        self
    }

    /// Reject unknown tags and unknown simple-value codes instead of
    /// passing them through opaquely. Default false.
    pub fn strict(mut self, yes: bool) -> Self {
        self.strict = yes;
        self
    }

    pub fn build(self) -> Codec {
        tracing::debug!(
            read_handlers = self.read_handlers.len(),
            write_handlers = self.write_handlers.len(),
            set_tag = self.set_tag,
            canonical = self.canonical,
            strict = self.strict,
            "codec built"
        );
        Codec {
            read_handlers: self.read_handlers,
            write_handlers: self.write_handlers,
            dispatch: self.dispatch,
            set_tag: self.set_tag,
            canonical: self.canonical,
            strict: self.strict,
        }
    }
}

impl Default for CodecBuilder {
    fn default() -> Self {
        Codec::builder()
    }
}

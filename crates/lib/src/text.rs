//! Rich-text mirror.
//!
//! A [`SyncedText`] starts detached, holding its content as an operation log, and is
//! bound to a shared text container when inserted into a synchronized collection (or
//! when remote content is wrapped). Once attached, the plain string and the operation
//! log are re-derived from the shared container after every change, local or remote.
//! Edits delegate straight to the shared container; the re-derivation runs from the
//! change subscription, so local and remote edits take the same path.
//!
//! Indices and lengths are measured in the document's offset units (UTF-8 bytes for a
//! default [`yrs::Doc`]); an embed counts as one unit. An edit whose range starts or
//! ends inside a multi-byte character is rejected.

use std::{
    collections::BTreeMap,
    fmt,
    sync::{Arc, OnceLock, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use handle_trait::Handle;
use tracing::{debug, trace};
use yrs::{
    Any, Doc, GetString, Hook, Observable, Origin, Out, ReadTxn, SharedRef, Subscription, Text,
    TextRef, Transact, TransactionMut,
    types::{
        Attrs,
        text::{Diff, YChange},
    },
};

use crate::{
    Result,
    sync::{ChangeOrigin, SyncContext, SyncError, WatchGuard, Watchers, shared_to_any},
};

/// Formatting attributes of a span of text.
pub type Attributes = BTreeMap<String, Any>;

/// Content of one operation-log entry.
#[derive(Debug, Clone, PartialEq)]
pub enum TextInsert {
    /// A run of characters
    Text(String),
    /// A single embedded value
    Embed(Any),
}

/// One entry of the derived operation log: inserted content plus its formatting.
#[derive(Debug, Clone, PartialEq)]
pub struct TextChunk {
    pub insert: TextInsert,
    pub attributes: Option<Attributes>,
}

impl TextChunk {
    /// Plain, unformatted text.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            insert: TextInsert::Text(text.into()),
            attributes: None,
        }
    }

    /// Text with formatting attributes.
    pub fn formatted(text: impl Into<String>, attributes: Attributes) -> Self {
        Self {
            insert: TextInsert::Text(text.into()),
            attributes: Some(attributes),
        }
    }

    /// An embedded value.
    pub fn embed(value: impl Into<Any>) -> Self {
        Self {
            insert: TextInsert::Embed(value.into()),
            attributes: None,
        }
    }
}

#[derive(Default)]
struct Derived {
    string: String,
    delta: Vec<TextChunk>,
    len: u32,
}

impl Derived {
    fn from_chunks(delta: Vec<TextChunk>) -> Self {
        let mut string = String::new();
        let mut len = 0u32;
        for chunk in &delta {
            match &chunk.insert {
                TextInsert::Text(s) => {
                    string.push_str(s);
                    len += s.len() as u32;
                }
                TextInsert::Embed(_) => len += 1,
            }
        }
        Self { string, delta, len }
    }

    fn from_shared<T: ReadTxn>(txn: &T, shared: &TextRef) -> Self {
        let delta = shared
            .diff(txn, YChange::identity)
            .into_iter()
            .map(|diff| chunk_from_diff(txn, diff))
            .collect();
        Self {
            string: shared.get_string(txn),
            delta,
            len: shared.len(txn),
        }
    }
}

fn chunk_from_diff<T: ReadTxn>(txn: &T, diff: Diff<YChange>) -> TextChunk {
    let insert = match diff.insert {
        Out::Any(Any::String(s)) => TextInsert::Text(s.to_string()),
        Out::Any(any) => TextInsert::Embed(any),
        shared => TextInsert::Embed(shared_to_any(txn, &shared)),
    };
    let attributes = diff.attributes.map(|attrs| {
        attrs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    });
    TextChunk { insert, attributes }
}

fn to_attrs(attributes: &Attributes) -> Attrs {
    attributes
        .iter()
        .map(|(k, v)| (Arc::from(k.as_str()), v.clone()))
        .collect()
}

struct Binding {
    doc: Doc,
    origin: Origin,
    hook: Hook<TextRef>,
    shared: TextRef,
    _subscription: Subscription,
}

struct TextInner {
    binding: OnceLock<Binding>,
    derived: RwLock<Derived>,
    watchers: Watchers,
}

/// Rich text that can live inside a synchronized collection.
///
/// Clones are handles to the same text. A text can be attached to one document
/// position only; inserting it a second time fails with
/// [`SyncError::UnsupportedReattachment`].
///
/// ```
/// # use ymirror::SyncedText;
/// let draft = SyncedText::new("hello");
/// assert_eq!(draft.string(), "hello");
/// assert!(!draft.is_attached());
/// ```
#[derive(Clone, Handle)]
pub struct SyncedText {
    inner: Arc<TextInner>,
}

impl SyncedText {
    /// Create detached text holding `initial`.
    pub fn new(initial: impl Into<String>) -> Self {
        let initial = initial.into();
        let delta = if initial.is_empty() {
            Vec::new()
        } else {
            vec![TextChunk::text(initial)]
        };
        Self::from_delta(delta)
    }

    /// Create detached text from an operation log.
    pub fn from_delta(delta: Vec<TextChunk>) -> Self {
        Self::with_derived(Derived::from_chunks(delta))
    }

    fn with_derived(derived: Derived) -> Self {
        Self {
            inner: Arc::new(TextInner {
                binding: OnceLock::new(),
                derived: RwLock::new(derived),
                watchers: Watchers::default(),
            }),
        }
    }

    /// Mirror existing shared text.
    pub(crate) fn wrap<T: ReadTxn>(ctx: &SyncContext, txn: &T, shared: TextRef) -> Self {
        let text = Self::with_derived(Derived::from_shared(txn, &shared));
        text.bind(ctx, shared);
        text
    }

    /// Write the detached content into the freshly created `shared` and bind to it.
    pub(crate) fn attach(&self, ctx: &SyncContext, txn: &mut TransactionMut, shared: TextRef) -> Result<()> {
        if self.is_attached() {
            return Err(SyncError::UnsupportedReattachment.into());
        }
        let chunks = self.delta();
        for chunk in &chunks {
            let at = shared.len(txn);
            match (&chunk.insert, &chunk.attributes) {
                (TextInsert::Text(s), Some(attributes)) => {
                    shared.insert_with_attributes(txn, at, s, to_attrs(attributes))
                }
                (TextInsert::Text(s), None) => shared.insert(txn, at, s),
                (TextInsert::Embed(any), attributes) => {
                    shared.insert_embed(txn, at, any.clone());
                    if let Some(attributes) = attributes {
                        shared.format(txn, at, 1, to_attrs(attributes));
                    }
                }
            }
        }
        *self.write() = Derived::from_shared(txn, &shared);
        if !self.bind(ctx, shared) {
            return Err(SyncError::UnsupportedReattachment.into());
        }
        trace!(chunks = chunks.len(), "attached rich text");
        Ok(())
    }

    fn bind(&self, ctx: &SyncContext, shared: TextRef) -> bool {
        let origin = ctx.next_origin();
        let weak = Arc::downgrade(&self.inner);
        let observed = shared.clone();
        let own = origin.clone();
        let subscription = shared.observe(move |txn, _event| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            *inner.derived.write().unwrap_or_else(PoisonError::into_inner) =
                Derived::from_shared(txn, &observed);
            let change = if txn.origin() == Some(&own) {
                ChangeOrigin::Local
            } else {
                ChangeOrigin::Remote
            };
            inner.watchers.notify(change);
        });
        self.inner
            .binding
            .set(Binding {
                doc: ctx.doc().clone(),
                origin,
                hook: shared.hook(),
                shared,
                _subscription: subscription,
            })
            .is_ok()
    }

    fn read(&self) -> RwLockReadGuard<'_, Derived> {
        self.inner.derived.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Derived> {
        self.inner.derived.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether this text is bound to a shared container
    pub fn is_attached(&self) -> bool {
        self.inner.binding.get().is_some()
    }

    /// The derived plain string
    pub fn string(&self) -> String {
        self.read().string.clone()
    }

    /// The derived operation log
    pub fn delta(&self) -> Vec<TextChunk> {
        self.read().delta.clone()
    }

    /// Length in document offset units
    pub fn len(&self) -> u32 {
        self.read().len
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The shared container, once attached
    pub fn shared(&self) -> Option<TextRef> {
        self.inner.binding.get().map(|binding| binding.shared.clone())
    }

    /// Run `callback` after every change to the derived views.
    pub fn watch<F>(&self, callback: F) -> WatchGuard
    where
        F: Fn(ChangeOrigin) + Send + Sync + 'static,
    {
        self.inner.watchers.subscribe(callback)
    }

    pub(crate) fn identity(&self) -> usize {
        Arc::as_ptr(&self.inner) as usize
    }

    fn edit(
        &self,
        op: &'static str,
        apply: impl FnOnce(&mut TransactionMut, &TextRef, u32) -> Result<()>,
    ) -> Result<()> {
        let binding = self.inner.binding.get().ok_or(SyncError::TextNotAttached)?;
        {
            let mut txn = binding.doc.transact_mut_with(binding.origin.clone());
            if binding.hook.get(&txn).is_none() {
                return Err(SyncError::Detached { container: "text" }.into());
            }
            let len = binding.shared.len(&txn);
            apply(&mut txn, &binding.shared, len)?;
        }
        debug!(op, len = self.len(), "applied local text edit");
        Ok(())
    }

    /// Insert `chunk` at `index`, optionally formatted.
    pub fn insert(&self, index: u32, chunk: &str, attributes: Option<Attributes>) -> Result<()> {
        self.edit("insert", |txn, shared, len| {
            check_range(&*txn, shared, index, 0, len)?;
            match attributes {
                Some(attributes) => {
                    shared.insert_with_attributes(txn, index, chunk, to_attrs(&attributes))
                }
                None => shared.insert(txn, index, chunk),
            }
            Ok(())
        })
    }

    /// Insert an embedded value at `index`, optionally formatted.
    pub fn insert_embed(&self, index: u32, embed: impl Into<Any>, attributes: Option<Attributes>) -> Result<()> {
        let embed = embed.into();
        self.edit("insert_embed", |txn, shared, len| {
            check_range(&*txn, shared, index, 0, len)?;
            shared.insert_embed(txn, index, embed);
            if let Some(attributes) = attributes {
                shared.format(txn, index, 1, to_attrs(&attributes));
            }
            Ok(())
        })
    }

    /// Apply formatting to `[index, index + length)`.
    pub fn format(&self, index: u32, length: u32, attributes: Attributes) -> Result<()> {
        self.edit("format", |txn, shared, len| {
            check_range(&*txn, shared, index, length, len)?;
            shared.format(txn, index, length, to_attrs(&attributes));
            Ok(())
        })
    }

    /// Delete `[index, index + length)`.
    pub fn delete(&self, index: u32, length: u32) -> Result<()> {
        self.edit("delete", |txn, shared, len| {
            check_range(&*txn, shared, index, length, len)?;
            if length > 0 {
                shared.remove_range(txn, index, length);
            }
            Ok(())
        })
    }
}

/// Validate `[index, index + length)` against the shared text: inside the length, and
/// with both ends on a character boundary.
fn check_range<T: ReadTxn>(txn: &T, shared: &TextRef, index: u32, length: u32, len: u32) -> Result<()> {
    let out_of_bounds = |offset: u64| SyncError::IndexOutOfBounds {
        index: offset as usize,
        len: len as usize,
    };
    let end = match index.checked_add(length) {
        Some(end) if end <= len => end,
        _ => return Err(out_of_bounds(u64::from(index) + u64::from(length)).into()),
    };
    let chunks = shared.diff(txn, YChange::identity);
    for offset in [index, end] {
        if !is_char_boundary(&chunks, offset) {
            return Err(out_of_bounds(u64::from(offset)).into());
        }
    }
    Ok(())
}

/// Whether `offset` falls between two characters. Embeds are one unit wide.
fn is_char_boundary(chunks: &[Diff<YChange>], offset: u32) -> bool {
    let mut start = 0u32;
    for chunk in chunks {
        if offset <= start {
            return true;
        }
        match &chunk.insert {
            Out::Any(Any::String(s)) => {
                let end = start + s.len() as u32;
                if offset < end {
                    return s.is_char_boundary((offset - start) as usize);
                }
                start = end;
            }
            _ => start += 1,
        }
    }
    true
}

impl PartialEq for SyncedText {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for SyncedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncedText")
            .field("attached", &self.is_attached())
            .field("string", &self.string())
            .finish()
    }
}

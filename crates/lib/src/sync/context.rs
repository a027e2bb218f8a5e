//! Document handle and transaction tagging shared by all synchronizers.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use yrs::{Doc, Origin, TransactionMut};

use crate::constants::ORIGIN_SEPARATOR;

static NEXT_ORIGIN: AtomicU64 = AtomicU64::new(1);

/// The document a synchronizer tree writes into, plus the prefix of its origins.
#[derive(Clone)]
pub(crate) struct SyncContext {
    doc: Doc,
    prefix: Arc<str>,
}

impl SyncContext {
    pub(crate) fn new(doc: Doc, prefix: &str) -> Self {
        Self {
            doc,
            prefix: Arc::from(prefix),
        }
    }

    pub(crate) fn doc(&self) -> &Doc {
        &self.doc
    }

    /// Allocate a fresh, process-unique transaction origin.
    pub(crate) fn next_origin(&self) -> Origin {
        let n = NEXT_ORIGIN.fetch_add(1, Ordering::Relaxed);
        Origin::from(format!("{}{ORIGIN_SEPARATOR}{n}", self.prefix).as_str())
    }

    /// Tag for a synchronizer created outside any transaction of this engine.
    pub(crate) fn fresh_tag(&self) -> OriginTag {
        OriginTag {
            own: self.next_origin(),
            seeded_by: None,
        }
    }

    /// Tag for a synchronizer seeded inside `txn`.
    ///
    /// The seeding writes carry the creator's origin, so they are filtered too.
    pub(crate) fn seeded_tag(&self, txn: &TransactionMut) -> OriginTag {
        OriginTag {
            own: self.next_origin(),
            seeded_by: txn.origin().cloned(),
        }
    }
}

/// The origins whose transactions a synchronizer has already applied to its mirror.
#[derive(Clone)]
pub(crate) struct OriginTag {
    own: Origin,
    seeded_by: Option<Origin>,
}

impl OriginTag {
    /// Origin stamped on every transaction the synchronizer opens.
    pub(crate) fn origin(&self) -> &Origin {
        &self.own
    }

    /// Whether `txn` was opened by the synchronizer itself (or by its creator while seeding it).
    pub(crate) fn is_local(&self, txn: &TransactionMut) -> bool {
        match txn.origin() {
            Some(origin) => origin == &self.own || self.seeded_by.as_ref() == Some(origin),
            None => false,
        }
    }
}

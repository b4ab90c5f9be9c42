//! Progress-callback trait for per-document and per-page events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to receive
//! events as the job walks its documents and their pages.
//!
//! Documents are processed sequentially and pages strictly in order, so
//! events for one job never interleave. The trait is still `Send + Sync`
//! because the job itself runs on a blocking worker thread.
//!
//! # Example
//!
//! ```rust
//! use edgequake_pdfconvert::{ConversionProgressCallback, ConversionConfig, PageKind};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct EmbeddedCounter {
//!     embedded: AtomicUsize,
//! }
//!
//! impl ConversionProgressCallback for EmbeddedCounter {
//!     fn on_page_complete(&self, _doc: &str, page: usize, total: usize, kind: PageKind) {
//!         if kind == PageKind::Embedded {
//!             self.embedded.fetch_add(1, Ordering::SeqCst);
//!             eprintln!("page {page}/{total} embedded as image");
//!         }
//!     }
//! }
//!
//! let counter = Arc::new(EmbeddedCounter { embedded: AtomicUsize::new(0) });
//!
//! let config = ConversionConfig::builder()
//!     .progress_callback(counter as Arc<dyn ConversionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::output::PageKind;
use crate::pipeline::strategy::Strategy;
use std::sync::Arc;

/// Called by the pipeline as it processes each document and page.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once before the first document is opened.
    fn on_job_start(&self, total_documents: usize) {
        let _ = total_documents;
    }

    /// Called when a document is about to be processed.
    ///
    /// # Arguments
    /// * `index` — 1-indexed position of the document in the job
    /// * `name`  — display name of the document
    fn on_document_start(&self, index: usize, name: &str) {
        let _ = (index, name);
    }

    /// Called once the strategy for a document is known and its page count
    /// has been read.
    fn on_strategy_selected(&self, name: &str, strategy: Strategy, total_pages: usize) {
        let _ = (name, strategy, total_pages);
    }

    /// Called after a page's outcome is final.
    ///
    /// # Arguments
    /// * `document` — display name of the document
    /// * `page`     — 1-indexed page number
    /// * `total`    — pages in the document
    /// * `kind`     — how the page ended up in the output
    fn on_page_complete(&self, document: &str, page: usize, total: usize, kind: PageKind) {
        let _ = (document, page, total, kind);
    }

    /// Called when a document produced its artifact.
    fn on_document_complete(&self, name: &str, strategy: Strategy) {
        let _ = (name, strategy);
    }

    /// Called when a document is dropped from the result set.
    fn on_document_error(&self, name: &str, error: &str) {
        let _ = (name, error);
    }

    /// Called once after every document has been attempted.
    fn on_job_complete(&self, total_documents: usize, succeeded: usize) {
        let _ = (total_documents, succeeded);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;

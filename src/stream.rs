//! Streaming conversion API: emit documents as they complete.
//!
//! ## Why stream?
//!
//! A job over dozens of scanned PDFs takes minutes. A stream lets callers
//! show each document's report the moment it is final and write its
//! artifact to disk instead of holding every document in memory until the
//! package is built.
//!
//! Unlike the eager [`crate::convert::convert`], which returns one packaged
//! artifact, [`convert_stream`] yields one [`DocumentConversion`] per input,
//! in input order, and never zips. Dropping the stream stops the job after
//! the document currently in flight.

use crate::config::ConversionConfig;
use crate::error::ConvertError;
use crate::output::{DocumentReport, OutputArtifact};
use futures::StreamExt;
use std::ops::ControlFlow;
use std::pin::Pin;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::Stream;
use tracing::{info, warn};

/// One finished document.
#[derive(Debug, Clone)]
pub struct DocumentConversion {
    pub report: DocumentReport,
    /// `None` when the document was dropped; see `report.error`.
    pub artifact: Option<OutputArtifact>,
}

/// A boxed stream of finished documents. A fatal job error (pdfium cannot
/// be bound, working directory cannot be created) ends the stream with `Err`.
pub type DocumentStream = Pin<Box<dyn Stream<Item = Result<DocumentConversion, ConvertError>> + Send>>;

/// Convert PDFs to Word documents, streaming each document as it is ready.
///
/// # Returns
/// - `Ok(DocumentStream)` once URL inputs are downloaded
/// - `Err(ConvertError)` if there are no inputs or a download fails
pub async fn convert_stream<I, S>(inputs: I, config: &ConversionConfig) -> Result<DocumentStream, ConvertError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let (resolved, jobs) = crate::convert::resolve_inputs(inputs, config).await?;
    info!("Starting streaming conversion of {} document(s)", jobs.len());

    // One slot: the worker never runs more than a document ahead of the reader.
    let (tx, rx) = mpsc::channel::<Result<DocumentConversion, ConvertError>>(1);
    let config = config.clone();

    tokio::spawn(async move {
        let sender = tx.clone();
        let outcome = crate::convert::run_blocking(&config, move |converter| {
            converter.convert_each(&jobs, |report, artifact| {
                match sender.blocking_send(Ok(DocumentConversion { report, artifact })) {
                    Ok(()) => ControlFlow::Continue(()),
                    Err(_) => ControlFlow::Break(()),
                }
            })
        })
        .await;

        if let Err(e) = outcome {
            warn!("Streaming job failed: {}", e);
            let _ = tx.send(Err(e)).await;
        }
        // Downloads stay on disk until the worker is done with them.
        drop(resolved);
    });

    Ok(ReceiverStream::new(rx).boxed())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn no_inputs_is_fatal() {
        let config = ConversionConfig::default();
        let result = convert_stream(Vec::<String>::new(), &config).await;
        assert!(matches!(result, Err(ConvertError::NoInputs)));
    }
}

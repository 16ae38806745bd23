//! The retrieval-augmented chat pipeline.
//!
//! [`Chat::respond`] retrieves the most relevant club documents, assembles
//! the prompt, and relays the model's output as a stream of text chunks.
//! Failures never end the stream with an error: whatever went wrong is
//! logged and the caller receives a single [`FALLBACK_MESSAGE`] chunk
//! before the stream closes.

use futures::stream::Stream;
use futures::StreamExt;
use std::sync::Arc;

use crate::llm::LanguageModel;
use crate::loader::strip_nulls;
use crate::prompt::Prompt;
use crate::store::VectorStore;

/// Sent in place of a model answer when retrieval or generation fails.
pub const FALLBACK_MESSAGE: &str = "I apologize, but I'm having trouble processing your request right now. Please try again or visit bccs.club for more information.";

/// Everything needed to answer one question.
pub struct Chat {
    store: Arc<VectorStore>,
    model: Arc<dyn LanguageModel>,
    top_k: usize,
    log_context: bool,
}

impl Chat {
    pub fn new(store: Arc<VectorStore>, model: Arc<dyn LanguageModel>, top_k: usize) -> Self {
        Self {
            store,
            model,
            top_k,
            log_context: false,
        }
    }

    /// Log the titles of retrieved documents at debug level.
    pub fn with_context_logging(mut self, enabled: bool) -> Self {
        self.log_context = enabled;
        self
    }

    pub fn store(&self) -> &VectorStore {
        &self.store
    }

    /// Answer `input`, yielding text chunks as the model produces them.
    ///
    /// Chunks never contain `'\0'` and are never empty. On any failure the
    /// stream yields [`FALLBACK_MESSAGE`] once and ends; chunks already
    /// yielded are not retracted.
    pub fn respond(&self, input: String) -> impl Stream<Item = String> + Send + 'static {
        let store = self.store.clone();
        let model = self.model.clone();
        let top_k = self.top_k;
        let log_context = self.log_context;

        async_stream::stream! {
            let retrieved = match store.query(&input, top_k).await {
                Ok(retrieved) => retrieved,
                Err(e) => {
                    tracing::error!(error = %e, "retrieval failed");
                    yield FALLBACK_MESSAGE.to_string();
                    return;
                }
            };

            if log_context {
                let titles: Vec<&str> = retrieved.iter().map(|r| r.document.title()).collect();
                tracing::debug!(?titles, "retrieved context");
            }

            let prompt = Prompt::assemble(
                retrieved.into_iter().map(|r| r.document).collect(),
                input,
            );

            let mut chunks = match model.stream(&prompt).await {
                Ok(chunks) => chunks,
                Err(e) => {
                    tracing::error!(error = %e, model = model.model_name(), "failed to start generation");
                    yield FALLBACK_MESSAGE.to_string();
                    return;
                }
            };

            while let Some(chunk) = chunks.next().await {
                match chunk {
                    Ok(text) => {
                        let text = strip_nulls(&text);
                        if !text.is_empty() {
                            yield text;
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = %e, model = model.model_name(), "generation failed mid-stream");
                        yield FALLBACK_MESSAGE.to_string();
                        return;
                    }
                }
            }
        }
    }
}

pub mod pdf;

use std::sync::Arc;

use chrono::Utc;

use crate::documents::DocumentStore;
use crate::error::AppError;
use crate::models::{Document, DocumentInfo, UploadResponse};
use self::pdf::{join_pages, TextExtractor};

/// Turns uploaded files into stored document text.
#[derive(Clone)]
pub struct Ingestor {
    extractor: Arc<dyn TextExtractor>,
    documents: Arc<dyn DocumentStore>,
}

impl Ingestor {
    pub fn new(extractor: Arc<dyn TextExtractor>, documents: Arc<dyn DocumentStore>) -> Self {
        Self {
            extractor,
            documents,
        }
    }

    pub async fn ingest(
        &self,
        session_id: &str,
        filename: String,
        bytes: Vec<u8>,
    ) -> Result<UploadResponse, AppError> {
        let extractor = self.extractor.clone();
        let pages = tokio::task::spawn_blocking(move || extractor.extract_pages(&bytes))
            .await
            .map_err(|err| AppError::Extraction(format!("extraction task panicked: {err}")))?
            .map_err(|err| AppError::Extraction(format!("{err:#}")))?;

        let text = join_pages(&pages);
        tracing::info!(
            session_id,
            filename = %filename,
            pages = pages.len(),
            characters = text.chars().count(),
            "PDF processed and stored"
        );

        self.documents.put(
            session_id,
            Document {
                filename: filename.clone(),
                text,
                uploaded_at: Utc::now(),
            },
        );

        Ok(UploadResponse {
            message: "File processed successfully".to_string(),
            filename,
        })
    }

    pub fn document_info(&self, session_id: &str) -> Result<DocumentInfo, AppError> {
        let document = self
            .documents
            .get(session_id)
            .ok_or_else(|| AppError::NotFound("Document not found".to_string()))?;

        Ok(DocumentInfo {
            session_id: session_id.to_string(),
            filename: document.filename.clone(),
            characters: document.text.chars().count(),
            uploaded_at: document.uploaded_at,
        })
    }

    pub fn delete_document(&self, session_id: &str) -> Result<(), AppError> {
        if self.documents.delete(session_id) {
            tracing::info!(session_id, "document deleted");
            Ok(())
        } else {
            Err(AppError::NotFound("Document not found".to_string()))
        }
    }
}

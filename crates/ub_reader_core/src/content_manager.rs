//! crates/ub_reader_core/src/content_manager.rs
//!
//! Treats a publication and its documents as one unit for import, export and deletion.

use crate::domain::{Document, Publication};
use crate::ports::PortResult;
use crate::repository::{DocumentRepository, PublicationRepository};
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Clone)]
pub struct ContentManager {
    publications: Arc<PublicationRepository>,
    documents: Arc<DocumentRepository>,
}

impl ContentManager {
    pub fn new(publications: Arc<PublicationRepository>, documents: Arc<DocumentRepository>) -> Self {
        Self {
            publications,
            documents,
        }
    }

    pub fn publications(&self) -> &PublicationRepository {
        &self.publications
    }

    pub fn documents(&self) -> &DocumentRepository {
        &self.documents
    }

    /// Stores the publication and then its documents inside one transaction over both
    /// collections. Any failure restores both and yields `false`, as does a document
    /// that names a different publication.
    pub async fn import_publication(&self, publication: Publication, documents: Vec<Document>) -> bool {
        let publication_id = publication.id.clone();
        if let Some(stray) = documents.iter().find(|d| d.publication_id != publication_id) {
            warn!(
                "Rejecting import of '{}': document '{}' belongs to '{}'",
                publication_id, stray.id, stray.publication_id
            );
            return false;
        }
        let count = documents.len();
        let scopes = [self.publications.collection(), self.documents.collection()];
        let tx = match self.publications.begin(&scopes).await {
            Ok(tx) => tx,
            Err(e) => {
                error!("Failed to start import of '{}': {}", publication_id, e);
                return false;
            }
        };

        match self.store(publication, documents).await {
            Ok(()) => match tx.commit().await {
                Ok(()) => {
                    info!("Imported publication '{}' with {} documents", publication_id, count);
                    true
                }
                Err(e) => {
                    error!("Failed to commit import of '{}': {}", publication_id, e);
                    false
                }
            },
            Err(e) => {
                error!("Import of '{}' failed: {}", publication_id, e);
                if let Err(abort_err) = tx.abort().await {
                    error!("Failed to roll back import of '{}': {}", publication_id, abort_err);
                }
                false
            }
        }
    }

    async fn store(&self, publication: Publication, documents: Vec<Document>) -> PortResult<()> {
        self.publications.create(publication).await?;
        self.documents.create_many(documents).await?;
        Ok(())
    }

    /// The publication with every document that belongs to it.
    pub async fn export_publication(&self, publication_id: &str) -> Option<(Publication, Vec<Document>)> {
        let result = async {
            let Some(publication) = self.publications.find_by_id(publication_id).await? else {
                return Ok(None);
            };
            let documents = self.documents.find_by_publication(publication_id).await?;
            PortResult::Ok(Some((publication, documents)))
        }
        .await;
        result.unwrap_or_else(|e| {
            error!("Failed to export publication '{}': {}", publication_id, e);
            None
        })
    }

    /// Removes a publication and its documents as one unit. `false` when it does not
    /// exist or anything failed.
    pub async fn delete_publication(&self, publication_id: &str) -> bool {
        let scopes = [self.publications.collection(), self.documents.collection()];
        let tx = match self.publications.begin(&scopes).await {
            Ok(tx) => tx,
            Err(e) => {
                error!("Failed to start deletion of '{}': {}", publication_id, e);
                return false;
            }
        };

        let result = async {
            let ids: Vec<String> = self
                .documents
                .find_by_publication(publication_id)
                .await?
                .into_iter()
                .map(|d| d.id)
                .collect();
            self.publications.delete(publication_id).await?;
            self.documents.delete_many(&ids).await?;
            PortResult::Ok(ids.len())
        }
        .await;

        match result {
            Ok(count) => match tx.commit().await {
                Ok(()) => {
                    info!("Deleted publication '{}' and {} documents", publication_id, count);
                    true
                }
                Err(e) => {
                    error!("Failed to commit deletion of '{}': {}", publication_id, e);
                    false
                }
            },
            Err(e) => {
                error!("Deletion of '{}' failed: {}", publication_id, e);
                if let Err(abort_err) = tx.abort().await {
                    error!("Failed to roll back deletion of '{}': {}", publication_id, abort_err);
                }
                false
            }
        }
    }

    pub async fn list_publications(&self) -> PortResult<Vec<Publication>> {
        self.publications.get_all().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DocumentType;
    use crate::kv::MemoryKeyValueStore;
    use crate::repository::{DOCUMENTS, PUBLICATIONS};
    use crate::storage::CollectionStore;

    fn manager() -> ContentManager {
        let kv = Arc::new(MemoryKeyValueStore::new());
        ContentManager::new(
            Arc::new(PublicationRepository::new(Arc::new(CollectionStore::new(
                kv.clone(),
                PUBLICATIONS,
            )))),
            Arc::new(DocumentRepository::new(Arc::new(CollectionStore::new(
                kv, DOCUMENTS,
            )))),
        )
    }

    fn document(publication_id: &str, number: u32) -> Document {
        Document {
            id: format!("{}-paper-{}", publication_id, number),
            doc_type: DocumentType::for_paper_number(number),
            publication_id: publication_id.to_string(),
            number,
            title: format!("Paper {}", number),
            author: None,
            sections: Vec::new(),
            metadata: Default::default(),
        }
    }

    #[tokio::test]
    async fn import_then_export_returns_the_same_unit() {
        let manager = manager();
        let publication = Publication::new("ub", "The Book");
        let documents = vec![document("ub", 0), document("ub", 1)];
        assert!(manager.import_publication(publication.clone(), documents.clone()).await);
        assert!(manager.import_publication(Publication::new("other", "Other"), vec![document("other", 1)]).await);

        let (exported, exported_docs) = manager.export_publication("ub").await.unwrap();
        assert_eq!(exported, publication);
        assert_eq!(exported_docs, documents);
        assert!(manager.export_publication("missing").await.is_none());
    }

    #[tokio::test]
    async fn failed_import_restores_both_collections() {
        let manager = manager();
        assert!(manager.import_publication(Publication::new("ub", "The Book"), vec![document("ub", 1)]).await);

        // The second document collides with the stored one, after the publication was written.
        let ok = manager
            .import_publication(
                Publication::new("ub-2", "Second"),
                vec![document("ub-2", 1), document("ub", 1)],
            )
            .await;
        assert!(!ok);
        assert!(manager.publications().find_by_id("ub-2").await.unwrap().is_none());
        assert_eq!(manager.documents().count().await.unwrap(), 1);
        assert_eq!(manager.list_publications().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn documents_of_another_publication_are_rejected() {
        let manager = manager();
        let ok = manager
            .import_publication(
                Publication::new("ub", "The Book"),
                vec![document("ub", 1), document("other", 2)],
            )
            .await;
        assert!(!ok);
        assert!(manager.export_publication("ub").await.is_none());
        assert_eq!(manager.documents().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn delete_removes_the_publication_and_its_documents() {
        let manager = manager();
        manager
            .import_publication(Publication::new("ub", "The Book"), vec![document("ub", 0), document("ub", 1)])
            .await;
        manager
            .import_publication(Publication::new("keep", "Kept"), vec![document("keep", 1)])
            .await;

        assert!(manager.delete_publication("ub").await);
        assert!(!manager.delete_publication("ub").await);
        assert_eq!(manager.documents().count().await.unwrap(), 1);
        assert_eq!(manager.list_publications().await.unwrap()[0].id, "keep");
    }
}

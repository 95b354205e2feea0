//! crates/ub_reader_core/src/repository.rs
//!
//! Typed repositories over the `StorageService` port. `BaseRepository` is plain CRUD;
//! `DocumentRepository` and `PublicationRepository` add entity-specific queries and, for
//! documents, the nested section/paragraph mutations.

use crate::domain::{Document, DocumentType, Paragraph, Publication, Section};
use crate::ports::{Entity, PortError, PortResult, Query, StorageService, Transaction};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::ops::Deref;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Collection holding publications.
pub const PUBLICATIONS: &str = "publications";
/// Collection holding documents with their sections and paragraphs.
pub const DOCUMENTS: &str = "documents";

//=========================================================================================
// Base Repository
//=========================================================================================

pub struct BaseRepository<T: Entity> {
    storage: Arc<dyn StorageService<T>>,
}

impl<T: Entity> Clone for BaseRepository<T> {
    fn clone(&self) -> Self {
        Self {
            storage: self.storage.clone(),
        }
    }
}

impl<T: Entity> BaseRepository<T> {
    pub fn new(storage: Arc<dyn StorageService<T>>) -> Self {
        Self { storage }
    }

    /// The collection name, usable as a transaction scope.
    pub fn collection(&self) -> &str {
        self.storage.collection()
    }

    pub async fn create(&self, item: T) -> PortResult<T> {
        self.storage.add_item(item).await
    }

    pub async fn create_many(&self, items: Vec<T>) -> PortResult<Vec<T>> {
        self.storage.add_items(items).await
    }

    /// Like `find_by_id`, but a missing item is an error.
    pub async fn get(&self, id: &str) -> PortResult<T> {
        self.storage
            .get_item(id)
            .await?
            .ok_or_else(|| PortError::NotFound(format!("{} '{}'", self.collection(), id)))
    }

    pub async fn find_by_id(&self, id: &str) -> PortResult<Option<T>> {
        self.storage.get_item(id).await
    }

    pub async fn get_all(&self) -> PortResult<Vec<T>> {
        self.storage.get_all_items().await
    }

    /// Linear scan; matches come back in insertion order.
    pub async fn find(
        &self,
        predicate: impl Fn(&T) -> bool + Send + Sync + 'static,
    ) -> PortResult<Vec<T>> {
        self.storage.query_items(&Query::filter(predicate)).await
    }

    pub async fn update(&self, id: &str, changes: Value) -> PortResult<T> {
        self.storage.update_item(id, changes).await
    }

    pub async fn delete(&self, id: &str) -> PortResult<()> {
        self.storage.delete_item(id).await
    }

    pub async fn delete_many(&self, ids: &[String]) -> PortResult<()> {
        self.storage.delete_items(ids).await
    }

    pub async fn count(&self) -> PortResult<usize> {
        self.storage.count_items().await
    }

    pub async fn begin(&self, scopes: &[&str]) -> PortResult<Box<dyn Transaction>> {
        self.storage.start_transaction(scopes).await
    }
}

/// Shallow-merges `changes` into `item`; fields named in `fixed` keep their value.
fn merge<T: Serialize + DeserializeOwned>(item: &T, changes: Value, fixed: &[&str]) -> PortResult<T> {
    let Value::Object(patch) = changes else {
        return Err(PortError::Invalid("changes must be a JSON object".to_string()));
    };
    let mut value = serde_json::to_value(item).map_err(|e| PortError::Invalid(e.to_string()))?;
    let Some(fields) = value.as_object_mut() else {
        return Err(PortError::Invalid("item is not an object".to_string()));
    };
    for (field, new_value) in patch {
        if !fixed.contains(&field.as_str()) {
            fields.insert(field, new_value);
        }
    }
    serde_json::from_value(value).map_err(|e| PortError::Invalid(format!("update rejected: {}", e)))
}

//=========================================================================================
// Document Repository
//=========================================================================================

pub struct DocumentRepository {
    base: BaseRepository<Document>,
    /// Serializes nested read-splice-write cycles.
    nested: Mutex<()>,
}

impl Deref for DocumentRepository {
    type Target = BaseRepository<Document>;

    fn deref(&self) -> &Self::Target {
        &self.base
    }
}

impl DocumentRepository {
    pub fn new(storage: Arc<dyn StorageService<Document>>) -> Self {
        Self {
            base: BaseRepository::new(storage),
            nested: Mutex::new(()),
        }
    }

    /// Stores a document with its sections and paragraphs in numeric order.
    pub async fn create(&self, mut document: Document) -> PortResult<Document> {
        normalize(&mut document)?;
        self.base.create(document).await
    }

    pub async fn create_many(&self, mut documents: Vec<Document>) -> PortResult<Vec<Document>> {
        for document in &mut documents {
            normalize(document)?;
        }
        self.base.create_many(documents).await
    }

    pub async fn find_by_type(&self, doc_type: DocumentType) -> PortResult<Vec<Document>> {
        self.find(move |d| d.doc_type == doc_type).await
    }

    pub async fn find_by_publication(&self, publication_id: &str) -> PortResult<Vec<Document>> {
        let publication_id = publication_id.to_string();
        self.find(move |d| d.publication_id == publication_id).await
    }

    pub async fn find_by_number(
        &self,
        publication_id: &str,
        number: u32,
    ) -> PortResult<Option<Document>> {
        let publication_id = publication_id.to_string();
        Ok(self
            .find(move |d| d.publication_id == publication_id && d.number == number)
            .await?
            .into_iter()
            .next())
    }

    pub async fn get_section(&self, document_id: &str, section_id: &str) -> PortResult<Section> {
        let document = self.get(document_id).await?;
        document
            .section(section_id)
            .cloned()
            .ok_or_else(|| section_not_found(document_id, section_id))
    }

    pub async fn get_paragraph(
        &self,
        document_id: &str,
        section_id: &str,
        paragraph_id: &str,
    ) -> PortResult<Paragraph> {
        let section = self.get_section(document_id, section_id).await?;
        section
            .paragraph(paragraph_id)
            .cloned()
            .ok_or_else(|| paragraph_not_found(section_id, paragraph_id))
    }

    /// Looks a paragraph up by id anywhere in the document.
    pub async fn find_paragraph(
        &self,
        document_id: &str,
        paragraph_id: &str,
    ) -> PortResult<Option<Paragraph>> {
        Ok(self
            .find_by_id(document_id)
            .await?
            .and_then(|d| d.find_paragraph(paragraph_id).cloned()))
    }

    pub async fn add_section(&self, document_id: &str, mut section: Section) -> PortResult<Section> {
        self.mutate(document_id, move |document| {
            if document.section(&section.id).is_some() {
                return Err(PortError::Conflict(format!(
                    "section '{}' already exists in document '{}'",
                    section.id, document.id
                )));
            }
            section.document_id = document.id.clone();
            adopt_paragraphs(&mut section)?;
            document.sections.push(section.clone());
            document.sort_sections();
            Ok(section)
        })
        .await
    }

    /// Merges `changes` into a section; its id, document id and paragraphs are kept.
    pub async fn update_section(
        &self,
        document_id: &str,
        section_id: &str,
        changes: Value,
    ) -> PortResult<Section> {
        let section_id = section_id.to_string();
        self.mutate(document_id, move |document| {
            let document_key = document.id.clone();
            let section = document
                .section_mut(&section_id)
                .ok_or_else(|| section_not_found(&document_key, &section_id))?;
            let updated: Section = merge(&*section, changes, &["id", "documentId", "paragraphs"])?;
            *section = updated.clone();
            document.sort_sections();
            Ok(updated)
        })
        .await
    }

    pub async fn remove_section(&self, document_id: &str, section_id: &str) -> PortResult<()> {
        let section_id = section_id.to_string();
        self.mutate(document_id, move |document| {
            let before = document.sections.len();
            document.sections.retain(|s| s.id != section_id);
            if document.sections.len() == before {
                return Err(section_not_found(&document.id, &section_id));
            }
            Ok(())
        })
        .await
    }

    pub async fn add_paragraph(
        &self,
        document_id: &str,
        section_id: &str,
        mut paragraph: Paragraph,
    ) -> PortResult<Section> {
        let section_id = section_id.to_string();
        self.mutate(document_id, move |document| {
            let document_key = document.id.clone();
            let section = document
                .section_mut(&section_id)
                .ok_or_else(|| section_not_found(&document_key, &section_id))?;
            if section.paragraph(&paragraph.id).is_some() {
                return Err(PortError::Conflict(format!(
                    "paragraph '{}' already exists in section '{}'",
                    paragraph.id, section_id
                )));
            }
            paragraph.document_id = document_key;
            paragraph.section_id = section_id.clone();
            section.paragraphs.push(paragraph);
            section.sort_paragraphs();
            Ok(section.clone())
        })
        .await
    }

    /// Merges `changes` into a paragraph; its id and parent ids are kept.
    pub async fn update_paragraph(
        &self,
        document_id: &str,
        section_id: &str,
        paragraph_id: &str,
        changes: Value,
    ) -> PortResult<Paragraph> {
        let section_id = section_id.to_string();
        let paragraph_id = paragraph_id.to_string();
        self.mutate(document_id, move |document| {
            let document_key = document.id.clone();
            let section = document
                .section_mut(&section_id)
                .ok_or_else(|| section_not_found(&document_key, &section_id))?;
            let paragraph = section
                .paragraphs
                .iter_mut()
                .find(|p| p.id == paragraph_id)
                .ok_or_else(|| paragraph_not_found(&section_id, &paragraph_id))?;
            let updated: Paragraph =
                merge(&*paragraph, changes, &["id", "documentId", "sectionId"])?;
            *paragraph = updated.clone();
            section.sort_paragraphs();
            Ok(updated)
        })
        .await
    }

    pub async fn remove_paragraph(
        &self,
        document_id: &str,
        section_id: &str,
        paragraph_id: &str,
    ) -> PortResult<()> {
        let section_id = section_id.to_string();
        let paragraph_id = paragraph_id.to_string();
        self.mutate(document_id, move |document| {
            let document_key = document.id.clone();
            let section = document
                .section_mut(&section_id)
                .ok_or_else(|| section_not_found(&document_key, &section_id))?;
            let before = section.paragraphs.len();
            section.paragraphs.retain(|p| p.id != paragraph_id);
            if section.paragraphs.len() == before {
                return Err(paragraph_not_found(&section_id, &paragraph_id));
            }
            Ok(())
        })
        .await
    }

    /// Applies top-level `changes` to a stored document. The result is normalized like a
    /// newly created one, so duplicate nested ids are rejected and the tree stays sorted.
    pub async fn update(&self, id: &str, changes: Value) -> PortResult<Document> {
        self.mutate(id, move |document| {
            let mut next: Document = merge(&*document, changes, &["id"])?;
            normalize(&mut next)?;
            *document = next;
            Ok(document.clone())
        })
        .await
    }

    /// Reads the whole document, lets `splice` edit it, and writes it back.
    async fn mutate<R, F>(&self, document_id: &str, splice: F) -> PortResult<R>
    where
        F: FnOnce(&mut Document) -> PortResult<R> + Send,
        R: Send,
    {
        let _guard = self.nested.lock().await;
        let mut document = self.base.get(document_id).await?;
        let result = splice(&mut document)?;
        let value = serde_json::to_value(&document).map_err(|e| PortError::Invalid(e.to_string()))?;
        self.base.update(document_id, value).await?;
        debug!("Document '{}' rewritten after nested change", document_id);
        Ok(result)
    }
}

/// Sorts a document's tree and rejects duplicate section or paragraph ids.
fn normalize(document: &mut Document) -> PortResult<()> {
    let mut seen = Vec::with_capacity(document.sections.len());
    for section in &mut document.sections {
        if seen.contains(&section.id) {
            return Err(PortError::Conflict(format!(
                "section '{}' appears twice in document '{}'",
                section.id, document.id
            )));
        }
        seen.push(section.id.clone());
        section.document_id = document.id.clone();
        adopt_paragraphs(section)?;
    }
    document.sort_sections();
    Ok(())
}

/// Points every paragraph at its section and rejects duplicate paragraph ids.
fn adopt_paragraphs(section: &mut Section) -> PortResult<()> {
    let mut seen = Vec::with_capacity(section.paragraphs.len());
    for paragraph in &mut section.paragraphs {
        if seen.contains(&paragraph.id) {
            return Err(PortError::Conflict(format!(
                "paragraph '{}' appears twice in section '{}'",
                paragraph.id, section.id
            )));
        }
        seen.push(paragraph.id.clone());
        paragraph.document_id = section.document_id.clone();
        paragraph.section_id = section.id.clone();
    }
    section.sort_paragraphs();
    Ok(())
}

fn section_not_found(document_id: &str, section_id: &str) -> PortError {
    PortError::NotFound(format!(
        "section '{}' in document '{}'",
        section_id, document_id
    ))
}

fn paragraph_not_found(section_id: &str, paragraph_id: &str) -> PortError {
    PortError::NotFound(format!(
        "paragraph '{}' in section '{}'",
        paragraph_id, section_id
    ))
}

//=========================================================================================
// Publication Repository
//=========================================================================================

#[derive(Clone)]
pub struct PublicationRepository {
    base: BaseRepository<Publication>,
}

impl Deref for PublicationRepository {
    type Target = BaseRepository<Publication>;

    fn deref(&self) -> &Self::Target {
        &self.base
    }
}

impl PublicationRepository {
    pub fn new(storage: Arc<dyn StorageService<Publication>>) -> Self {
        Self {
            base: BaseRepository::new(storage),
        }
    }

    pub async fn find_by_language(&self, language: &str) -> PortResult<Vec<Publication>> {
        let language = language.to_string();
        self.find(move |p| p.language == language).await
    }

    /// The newest edition in a version family: highest `version`, then latest update.
    pub async fn get_latest_version(&self, family_id: &str) -> PortResult<Option<Publication>> {
        let family_id = family_id.to_string();
        let editions = self.find(move |p| p.family() == family_id).await?;
        Ok(editions
            .into_iter()
            .max_by(|a, b| (a.version, a.updated_at).cmp(&(b.version, b.updated_at))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SectionNumber;
    use serde_json::json;
    use crate::kv::MemoryKeyValueStore;
    use crate::storage::CollectionStore;
    use chrono::{Duration, Utc};

    fn documents() -> DocumentRepository {
        let kv = Arc::new(MemoryKeyValueStore::new());
        DocumentRepository::new(Arc::new(CollectionStore::new(kv, DOCUMENTS)))
    }

    fn publications() -> PublicationRepository {
        let kv = Arc::new(MemoryKeyValueStore::new());
        PublicationRepository::new(Arc::new(CollectionStore::new(kv, PUBLICATIONS)))
    }

    fn section(doc: &str, id: &str, number: SectionNumber, paragraphs: &[u32]) -> Section {
        Section {
            id: id.to_string(),
            document_id: doc.to_string(),
            number,
            title: format!("Section {}", id),
            paragraphs: paragraphs
                .iter()
                .map(|n| Paragraph::new(format!("{}-p{}", id, n), doc, id, *n, format!("Text {}", n)))
                .collect(),
            format: None,
        }
    }

    fn document(id: &str, number: u32, sections: Vec<Section>) -> Document {
        Document {
            id: id.to_string(),
            doc_type: DocumentType::for_paper_number(number),
            publication_id: "ub".to_string(),
            number,
            title: format!("Paper {}", number),
            author: None,
            sections,
            metadata: Default::default(),
        }
    }

    #[tokio::test]
    async fn find_keeps_insertion_order() {
        let repo = documents();
        for n in [5, 0, 3, 8, 1] {
            repo.create(document(&format!("d{}", n), n, vec![])).await.unwrap();
        }
        let odd: Vec<_> = repo
            .find(|d| d.number % 2 == 1)
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.number)
            .collect();
        assert_eq!(odd, vec![5, 3, 1]);
        assert_eq!(repo.find_by_type(DocumentType::Foreword).await.unwrap().len(), 1);
        assert_eq!(repo.find_by_publication("ub").await.unwrap().len(), 5);
        assert_eq!(repo.find_by_number("ub", 8).await.unwrap().unwrap().id, "d8");
        assert!(repo.find_by_number("other", 8).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn get_reports_missing_items() {
        let repo = documents();
        assert!(repo.find_by_id("nope").await.unwrap().is_none());
        assert!(matches!(repo.get("nope").await.unwrap_err(), PortError::NotFound(_)));
        assert!(matches!(
            repo.get_section("nope", "s1").await.unwrap_err(),
            PortError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn create_sorts_sections_and_paragraphs() {
        let repo = documents();
        let doc = document(
            "d0",
            0,
            vec![
                section("d0", "b", SectionNumber::from("III"), &[2, 1]),
                section("d0", "z", SectionNumber::from("Epilogue"), &[]),
                section("d0", "a", SectionNumber::from("I"), &[]),
                section("d0", "c", SectionNumber::from("2"), &[]),
            ],
        );
        let stored = repo.create(doc).await.unwrap();
        let order: Vec<_> = stored.sections.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(order, vec!["a", "c", "b", "z"]);
        let numbers: Vec<_> = stored.sections[2].paragraphs.iter().map(|p| p.number).collect();
        assert_eq!(numbers, vec![1, 2]);
    }

    #[tokio::test]
    async fn added_paragraph_lands_in_numeric_order() {
        let repo = documents();
        repo.create(document("d1", 1, vec![section("d1", "s1", 1u32.into(), &[2, 3])]))
            .await
            .unwrap();

        repo.add_paragraph("d1", "s1", Paragraph::new("p1", "", "", 1, "First"))
            .await
            .unwrap();
        let stored = repo.get_section("d1", "s1").await.unwrap();
        let numbers: Vec<_> = stored.paragraphs.iter().map(|p| p.number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        let added = repo.get_paragraph("d1", "s1", "p1").await.unwrap();
        assert_eq!(added.document_id, "d1");
        assert_eq!(added.section_id, "s1");

        let err = repo
            .add_paragraph("d1", "s1", Paragraph::new("p1", "d1", "s1", 4, "Again"))
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::Conflict(_)));
    }

    #[tokio::test]
    async fn sections_can_be_added_updated_and_removed() {
        let repo = documents();
        repo.create(document("d1", 1, vec![section("d1", "s2", 2u32.into(), &[1])]))
            .await
            .unwrap();

        repo.add_section("d1", section("", "s1", 1u32.into(), &[]))
            .await
            .unwrap();
        assert!(matches!(
            repo.add_section("d1", section("d1", "s1", 9u32.into(), &[]))
                .await
                .unwrap_err(),
            PortError::Conflict(_)
        ));

        let updated = repo
            .update_section("d1", "s1", json!({ "number": 3, "title": "Moved", "id": "x" }))
            .await
            .unwrap();
        assert_eq!(updated.id, "s1");
        assert_eq!(updated.title, "Moved");
        let order: Vec<_> = repo
            .get("d1")
            .await
            .unwrap()
            .sections
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(order, vec!["s2", "s1"]);

        repo.remove_section("d1", "s2").await.unwrap();
        assert!(matches!(
            repo.remove_section("d1", "s2").await.unwrap_err(),
            PortError::NotFound(_)
        ));
        assert_eq!(repo.get("d1").await.unwrap().sections.len(), 1);
    }

    #[tokio::test]
    async fn paragraphs_can_be_updated_and_removed() {
        let repo = documents();
        repo.create(document("d1", 1, vec![section("d1", "s1", 1u32.into(), &[1, 2])]))
            .await
            .unwrap();

        let updated = repo
            .update_paragraph("d1", "s1", "s1-p1", json!({ "number": 5, "indented": true }))
            .await
            .unwrap();
        assert!(updated.indented);
        let numbers: Vec<_> = repo
            .get_section("d1", "s1")
            .await
            .unwrap()
            .paragraphs
            .iter()
            .map(|p| p.number)
            .collect();
        assert_eq!(numbers, vec![2, 5]);

        repo.remove_paragraph("d1", "s1", "s1-p2").await.unwrap();
        assert!(matches!(
            repo.get_paragraph("d1", "s1", "s1-p2").await.unwrap_err(),
            PortError::NotFound(_)
        ));
        assert!(repo.find_paragraph("d1", "s1-p1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn concurrent_nested_writes_are_not_lost() {
        let repo = Arc::new(documents());
        repo.create(document("d1", 1, vec![section("d1", "s1", 1u32.into(), &[])]))
            .await
            .unwrap();

        let mut tasks = Vec::new();
        for n in 1..=10u32 {
            let repo = repo.clone();
            tasks.push(tokio::spawn(async move {
                repo.add_paragraph("d1", "s1", Paragraph::new(format!("p{}", n), "", "", n, "t"))
                    .await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }
        assert_eq!(repo.get_section("d1", "s1").await.unwrap().paragraphs.len(), 10);
    }

    #[tokio::test]
    async fn document_updates_are_normalized() {
        let repo = documents();
        repo.create(document("d1", 1, vec![section("d1", "s1", 1u32.into(), &[1])]))
            .await
            .unwrap();

        let updated = repo
            .update(
                "d1",
                json!({
                    "id": "renamed",
                    "title": "Retitled",
                    "sections": [
                        section("d1", "s2", 2u32.into(), &[2, 1]),
                        section("d1", "s1", 1u32.into(), &[1]),
                    ]
                }),
            )
            .await
            .unwrap();
        assert_eq!(updated.id, "d1");
        assert_eq!(updated.title, "Retitled");
        let order: Vec<_> = updated.sections.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(order, vec!["s1", "s2"]);
        let numbers: Vec<_> = updated.sections[1].paragraphs.iter().map(|p| p.number).collect();
        assert_eq!(numbers, vec![1, 2]);

        let clash = json!({
            "sections": [
                section("d1", "s1", 1u32.into(), &[]),
                section("d1", "s1", 2u32.into(), &[]),
            ]
        });
        assert!(matches!(repo.update("d1", clash).await.unwrap_err(), PortError::Conflict(_)));
        assert_eq!(repo.get("d1").await.unwrap().sections.len(), 2);
    }

    #[tokio::test]
    async fn duplicate_nested_ids_are_rejected_on_create() {
        let repo = documents();
        let doc = document(
            "d1",
            1,
            vec![
                section("d1", "s1", 1u32.into(), &[]),
                section("d1", "s1", 2u32.into(), &[]),
            ],
        );
        assert!(matches!(repo.create(doc).await.unwrap_err(), PortError::Conflict(_)));
        assert_eq!(repo.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn latest_version_uses_the_family_not_an_id_prefix() {
        let repo = publications();
        let now = Utc::now();
        let mut v1 = Publication::new("ub", "UB");
        v1.updated_at = now - Duration::days(2);
        let mut v2 = Publication::new("ub-2", "UB second edition");
        v2.family_id = "ub".to_string();
        v2.version = 2;
        v2.updated_at = now - Duration::days(1);
        let mut reprint = Publication::new("ub-2b", "UB reprint");
        reprint.family_id = "ub".to_string();
        reprint.version = 2;
        reprint.updated_at = now;
        let mut extended = Publication::new("ub-extended", "Unrelated");
        extended.version = 9;
        extended.language = "fr".to_string();

        repo.create_many(vec![v1, v2, reprint, extended]).await.unwrap();
        let latest = repo.get_latest_version("ub").await.unwrap().unwrap();
        assert_eq!(latest.id, "ub-2b");
        assert!(repo.get_latest_version("missing").await.unwrap().is_none());
        assert_eq!(repo.find_by_language("fr").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn update_delete_and_count() {
        let repo = publications();
        repo.create(Publication::new("a", "A")).await.unwrap();
        repo.create(Publication::new("b", "B")).await.unwrap();
        let updated = repo.update("a", json!({ "title": "Renamed" })).await.unwrap();
        assert_eq!(updated.title, "Renamed");
        repo.delete_many(&["a".to_string(), "b".to_string()]).await.unwrap();
        assert_eq!(repo.count().await.unwrap(), 0);
        assert!(matches!(repo.delete("a").await.unwrap_err(), PortError::NotFound(_)));
    }
}

//! services/api/src/adapters/content_loader.rs
//!
//! Reads a publication from a content directory: `index.json` plus one JSON file per
//! paper. Paper files are read concurrently.

use futures::future::try_join_all;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use ub_reader_core::content::{parse_index, parse_paper};
use ub_reader_core::domain::{Document, Publication};
use ub_reader_core::ports::{PortError, PortResult};

pub const INDEX_FILE: &str = "index.json";

pub struct ContentLoader {
    root: PathBuf,
}

impl ContentLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Loads the publication and all of its papers. A missing or malformed file fails
    /// the whole load.
    pub async fn load(&self) -> PortResult<(Publication, Vec<Document>)> {
        let index = parse_index(&read(&self.root.join(INDEX_FILE)).await?)?;
        let publication = index.publication();
        let publication_id = index.id.as_str();

        let reads = index.papers.iter().map(|entry| {
            let path = self.root.join(entry.file_name());
            async move {
                let paper = parse_paper(&read(&path).await?)?;
                if paper.number != entry.number {
                    warn!(
                        "{} declares paper {} but the index lists it as {}",
                        path.display(),
                        paper.number,
                        entry.number
                    );
                }
                PortResult::Ok(paper.into_document(publication_id, Some(entry)))
            }
        });
        let documents = try_join_all(reads).await?;

        info!(
            "Loaded '{}' with {} documents from {}",
            publication.id,
            documents.len(),
            self.root.display()
        );
        Ok((publication, documents))
    }
}

async fn read(path: &Path) -> PortResult<String> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| PortError::Storage(format!("failed to read {}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("ub-reader-{}-{}", name, uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[tokio::test]
    async fn loads_every_listed_paper() {
        let dir = scratch_dir("load");
        std::fs::write(
            dir.join(INDEX_FILE),
            r#"{"id": "ub", "title": "The Book", "papers": [
                {"number": 0, "title": "Foreword"},
                {"number": 1, "title": "One", "partNumber": 1, "file": "one.json"}
            ]}"#,
        )
        .unwrap();
        std::fs::write(
            dir.join("paper-0.json"),
            r#"{"number": 0, "title": "Foreword", "sections": []}"#,
        )
        .unwrap();
        std::fs::write(
            dir.join("one.json"),
            r#"{"number": 1, "title": "One", "author": "A", "sections": [
                {"number": 1, "title": "S", "paragraphs": [{"number": 1, "text": "Hi"}]}
            ]}"#,
        )
        .unwrap();

        let (publication, documents) = ContentLoader::new(&dir).load().await.unwrap();
        assert_eq!(publication.id, "ub");
        assert_eq!(documents.len(), 2);
        assert_eq!(documents[1].metadata.part_number, Some(1));
        assert_eq!(documents[1].sections[0].paragraphs[0].id, "ub-paper-1-s1-p1");
        std::fs::remove_dir_all(dir).ok();
    }

    #[tokio::test]
    async fn a_missing_paper_fails_the_load() {
        let dir = scratch_dir("missing");
        std::fs::write(
            dir.join(INDEX_FILE),
            r#"{"id": "ub", "title": "The Book", "papers": [{"number": 3, "title": "Three"}]}"#,
        )
        .unwrap();
        let err = ContentLoader::new(&dir).load().await.unwrap_err();
        assert!(matches!(err, PortError::Storage(_)));
        std::fs::remove_dir_all(dir).ok();
    }
}

//! crates/ub_reader_core/src/content.rs
//!
//! The on-disk content format: an `index.json` describing a publication and its papers,
//! and one JSON file per paper shaped
//! `{number, title, author, sections:[{number, title, paragraphs:[{number, text}]}]}`.
//! Converts between that shape and the stored content tree.

use crate::domain::{
    Document, DocumentMetadata, DocumentType, ListType, Paragraph, Publication, Section,
    SectionFormat, SectionNumber,
};
use crate::ports::{PortError, PortResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentIndex {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub papers: Vec<IndexEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexEntry {
    pub number: u32,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part_number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part_title: Option<String>,
    /// Paper file relative to the index; `paper-{number}.json` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

impl IndexEntry {
    pub fn file_name(&self) -> String {
        self.file
            .clone()
            .unwrap_or_else(|| format!("paper-{}.json", self.number))
    }
}

impl ContentIndex {
    pub fn publication(&self) -> Publication {
        let mut publication = Publication::new(&self.id, &self.title);
        publication.description = self.description.clone();
        if let Some(language) = &self.language {
            publication.language = language.clone();
        }
        publication
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaperFile {
    pub number: u32,
    pub title: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub sections: Vec<SectionFile>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionFile {
    pub number: SectionNumber,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub paragraphs: Vec<ParagraphFile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<SectionFormat>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParagraphFile {
    pub number: u32,
    pub text: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub indented: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub list: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list_type: Option<ListType>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub table: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub topic_change: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<String>,
}

pub fn parse_index(raw: &str) -> PortResult<ContentIndex> {
    serde_json::from_str(raw).map_err(|e| PortError::Invalid(format!("content index: {}", e)))
}

pub fn parse_paper(raw: &str) -> PortResult<PaperFile> {
    serde_json::from_str(raw).map_err(|e| PortError::Invalid(format!("paper file: {}", e)))
}

pub fn document_id(publication_id: &str, number: u32) -> String {
    format!("{}-paper-{}", publication_id, number)
}

impl PaperFile {
    /// Builds the stored document. Ids are derived from the publication id and the
    /// paper, section and paragraph numbers.
    pub fn into_document(self, publication_id: &str, entry: Option<&IndexEntry>) -> Document {
        let id = document_id(publication_id, self.number);
        let sections = self
            .sections
            .into_iter()
            .map(|section| {
                let section_id = format!("{}-s{}", id, section.number);
                Section {
                    paragraphs: section
                        .paragraphs
                        .into_iter()
                        .map(|p| Paragraph {
                            id: format!("{}-p{}", section_id, p.number),
                            document_id: id.clone(),
                            section_id: section_id.clone(),
                            number: p.number,
                            text: p.text,
                            indented: p.indented,
                            list: p.list,
                            list_type: p.list_type,
                            table: p.table,
                            topic_change: p.topic_change,
                            references: p.references,
                        })
                        .collect(),
                    id: section_id,
                    document_id: id.clone(),
                    number: section.number,
                    title: section.title,
                    format: section.format,
                }
            })
            .collect();

        let mut document = Document {
            doc_type: DocumentType::for_paper_number(self.number),
            publication_id: publication_id.to_string(),
            number: self.number,
            title: self.title,
            author: self.author.or_else(|| entry.and_then(|e| e.author.clone())),
            sections,
            metadata: DocumentMetadata {
                part_number: entry.and_then(|e| e.part_number),
                part_title: entry.and_then(|e| e.part_title.clone()),
            },
            id,
        };
        document.sort_sections();
        for section in &mut document.sections {
            section.sort_paragraphs();
        }
        document
    }

    /// The content-file shape of a stored document.
    pub fn from_document(document: &Document) -> Self {
        Self {
            number: document.number,
            title: document.title.clone(),
            author: document.author.clone(),
            sections: document
                .sections
                .iter()
                .map(|s| SectionFile {
                    number: s.number.clone(),
                    title: s.title.clone(),
                    format: s.format.clone(),
                    paragraphs: s
                        .paragraphs
                        .iter()
                        .map(|p| ParagraphFile {
                            number: p.number,
                            text: p.text.clone(),
                            indented: p.indented,
                            list: p.list,
                            list_type: p.list_type,
                            table: p.table,
                            topic_change: p.topic_change,
                            references: p.references.clone(),
                        })
                        .collect(),
                })
                .collect(),
        }
    }
}

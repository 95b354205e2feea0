//! crates/ub_reader_core/src/domain.rs
//!
//! Defines the core data structures of the reader: the publication content tree
//! (publication → documents → sections → paragraphs) and the per-user records
//! (highlights, reading history, preferences, sign-in state).
//!
//! Field names serialize in camelCase so the persisted JSON matches the content
//! files and the key-value records one for one.

use crate::ports::Entity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

//=========================================================================================
// Content Tree
//=========================================================================================

/// A versioned edition of the text, owning a set of documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Publication {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default = "default_language")]
    pub language: String,
    /// Groups the editions of one publication; empty means "same as `id`".
    #[serde(default)]
    pub family_id: String,
    #[serde(default = "default_version")]
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_language() -> String {
    "en".to_string()
}

fn default_version() -> u32 {
    1
}

impl Publication {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        let id = id.into();
        let now = Utc::now();
        Self {
            family_id: id.clone(),
            id,
            title: title.into(),
            description: None,
            language: default_language(),
            version: default_version(),
            created_at: now,
            updated_at: now,
        }
    }

    /// The version family this publication belongs to.
    pub fn family(&self) -> &str {
        if self.family_id.is_empty() {
            &self.id
        } else {
            &self.family_id
        }
    }
}

impl Entity for Publication {
    fn id(&self) -> &str {
        &self.id
    }
}

/// The kind of a top-level document inside a publication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    Paper,
    Foreword,
    Appendix,
    Chapter,
}

impl DocumentType {
    /// Paper 0 of the text is its foreword; every other number is a paper.
    pub fn for_paper_number(number: u32) -> Self {
        if number == 0 {
            DocumentType::Foreword
        } else {
            DocumentType::Paper
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Paper => "paper",
            DocumentType::Foreword => "foreword",
            DocumentType::Appendix => "appendix",
            DocumentType::Chapter => "chapter",
        }
    }
}

impl FromStr for DocumentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "paper" => Ok(DocumentType::Paper),
            "foreword" => Ok(DocumentType::Foreword),
            "appendix" => Ok(DocumentType::Appendix),
            "chapter" => Ok(DocumentType::Chapter),
            other => Err(format!("unknown document type '{}'", other)),
        }
    }
}

/// Part information carried by a document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part_number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part_title: Option<String>,
}

/// A paper, foreword, appendix or chapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    #[serde(rename = "type")]
    pub doc_type: DocumentType,
    pub publication_id: String,
    pub number: u32,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default)]
    pub sections: Vec<Section>,
    #[serde(default)]
    pub metadata: DocumentMetadata,
}

impl Entity for Document {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Document {
    /// Restores the numeric ordering of sections. Stable for equal keys.
    pub fn sort_sections(&mut self) {
        self.sections
            .sort_by_key(|s| s.number.sort_key().unwrap_or(u32::MAX));
    }

    pub fn section(&self, section_id: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.id == section_id)
    }

    pub fn section_mut(&mut self, section_id: &str) -> Option<&mut Section> {
        self.sections.iter_mut().find(|s| s.id == section_id)
    }

    /// Looks a paragraph up anywhere in the document.
    pub fn find_paragraph(&self, paragraph_id: &str) -> Option<&Paragraph> {
        self.sections
            .iter()
            .flat_map(|s| s.paragraphs.iter())
            .find(|p| p.id == paragraph_id)
    }
}

/// A section number: numeric for papers, text (often Roman numerals) for forewords.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SectionNumber {
    Numeric(u32),
    Text(String),
}

impl SectionNumber {
    /// The numeric ordering key, decoding decimal strings and Roman numerals.
    pub fn sort_key(&self) -> Option<u32> {
        match self {
            SectionNumber::Numeric(n) => Some(*n),
            SectionNumber::Text(s) => {
                let trimmed = s.trim();
                trimmed
                    .parse::<u32>()
                    .ok()
                    .or_else(|| parse_roman(trimmed))
            }
        }
    }
}

impl From<u32> for SectionNumber {
    fn from(n: u32) -> Self {
        SectionNumber::Numeric(n)
    }
}

impl From<&str> for SectionNumber {
    fn from(s: &str) -> Self {
        SectionNumber::Text(s.to_string())
    }
}

impl fmt::Display for SectionNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SectionNumber::Numeric(n) => write!(f, "{}", n),
            SectionNumber::Text(s) => f.write_str(s),
        }
    }
}

/// Decodes an upper- or lower-case Roman numeral.
pub fn parse_roman(s: &str) -> Option<u32> {
    if s.is_empty() {
        return None;
    }
    let mut values = Vec::with_capacity(s.len());
    for c in s.chars() {
        let v = match c.to_ascii_uppercase() {
            'I' => 1,
            'V' => 5,
            'X' => 10,
            'L' => 50,
            'C' => 100,
            'D' => 500,
            'M' => 1000,
            _ => return None,
        };
        values.push(v);
    }
    // A digit followed by a larger one is subtracted (IV, XC, CM).
    let total: i64 = values
        .iter()
        .enumerate()
        .map(|(i, v)| match values.get(i + 1) {
            Some(next) if next > v => -(*v as i64),
            _ => *v as i64,
        })
        .sum();
    u32::try_from(total).ok().filter(|n| *n > 0)
}

/// Optional layout hints for a whole section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionFormat {
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub centered_title: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub table: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub id: String,
    /// Filled in by the repository when the section is stored.
    #[serde(default)]
    pub document_id: String,
    pub number: SectionNumber,
    pub title: String,
    #[serde(default)]
    pub paragraphs: Vec<Paragraph>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<SectionFormat>,
}

impl Section {
    /// Restores the numeric ordering of paragraphs. Stable for equal numbers.
    pub fn sort_paragraphs(&mut self) {
        self.paragraphs.sort_by_key(|p| p.number);
    }

    pub fn paragraph(&self, paragraph_id: &str) -> Option<&Paragraph> {
        self.paragraphs.iter().find(|p| p.id == paragraph_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListType {
    Ordered,
    Unordered,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paragraph {
    pub id: String,
    #[serde(default)]
    pub document_id: String,
    #[serde(default)]
    pub section_id: String,
    pub number: u32,
    /// Paragraph body; may carry inline markup such as `<em>` or `<span>`.
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

impl Paragraph {
    pub fn new(
        id: impl Into<String>,
        document_id: impl Into<String>,
        section_id: impl Into<String>,
        number: u32,
        text: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            document_id: document_id.into(),
            section_id: section_id.into(),
            number,
            text: text.into(),
            indented: false,
            list: false,
            list_type: None,
            table: false,
            topic_change: false,
            references: Vec::new(),
        }
    }
}

//=========================================================================================
// Highlights
//=========================================================================================

/// The closed set of highlight colours. `None` requests removal and is never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HighlightColor {
    Yellow,
    Green,
    Blue,
    Pink,
    Purple,
    Orange,
    Red,
    Lavender,
    None,
}

impl HighlightColor {
    /// Every display colour, in palette order.
    pub const PALETTE: [HighlightColor; 8] = [
        HighlightColor::Yellow,
        HighlightColor::Green,
        HighlightColor::Blue,
        HighlightColor::Pink,
        HighlightColor::Purple,
        HighlightColor::Orange,
        HighlightColor::Red,
        HighlightColor::Lavender,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HighlightColor::Yellow => "yellow",
            HighlightColor::Green => "green",
            HighlightColor::Blue => "blue",
            HighlightColor::Pink => "pink",
            HighlightColor::Purple => "purple",
            HighlightColor::Orange => "orange",
            HighlightColor::Red => "red",
            HighlightColor::Lavender => "lavender",
            HighlightColor::None => "none",
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, HighlightColor::None)
    }

    /// Background colour for light and dark reading themes.
    pub fn background(&self, dark: bool) -> &'static str {
        match (self, dark) {
            (HighlightColor::Yellow, false) => "#fff59d",
            (HighlightColor::Yellow, true) => "#8d7b00",
            (HighlightColor::Green, false) => "#c5e1a5",
            (HighlightColor::Green, true) => "#33691e",
            (HighlightColor::Blue, false) => "#90caf9",
            (HighlightColor::Blue, true) => "#0d47a1",
            (HighlightColor::Pink, false) => "#f8bbd0",
            (HighlightColor::Pink, true) => "#880e4f",
            (HighlightColor::Purple, false) => "#ce93d8",
            (HighlightColor::Purple, true) => "#4a148c",
            (HighlightColor::Orange, false) => "#ffcc80",
            (HighlightColor::Orange, true) => "#e65100",
            (HighlightColor::Red, false) => "#ef9a9a",
            (HighlightColor::Red, true) => "#b71c1c",
            (HighlightColor::Lavender, false) => "#e1d5f5",
            (HighlightColor::Lavender, true) => "#5e4b8b",
            (HighlightColor::None, _) => "transparent",
        }
    }
}

impl fmt::Display for HighlightColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HighlightColor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "yellow" => Ok(HighlightColor::Yellow),
            "green" => Ok(HighlightColor::Green),
            "blue" => Ok(HighlightColor::Blue),
            "pink" => Ok(HighlightColor::Pink),
            "purple" => Ok(HighlightColor::Purple),
            "orange" => Ok(HighlightColor::Orange),
            "red" => Ok(HighlightColor::Red),
            "lavender" => Ok(HighlightColor::Lavender),
            "none" => Ok(HighlightColor::None),
            other => Err(format!("unknown highlight color '{}'", other)),
        }
    }
}

/// Reading coordinates of a highlight; unknown keys survive a round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HighlightMetadata {
    pub paper_id: String,
    pub paragraph_id: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl HighlightMetadata {
    pub fn new(paper_id: impl Into<String>, paragraph_id: impl Into<String>) -> Self {
        Self {
            paper_id: paper_id.into(),
            paragraph_id: paragraph_id.into(),
            extra: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Highlight {
    pub id: String,
    pub text: String,
    pub color: HighlightColor,
    pub created_at: DateTime<Utc>,
    pub metadata: HighlightMetadata,
}

impl Entity for Highlight {
    fn id(&self) -> &str {
        &self.id
    }
}

//=========================================================================================
// User State
//=========================================================================================

/// One visited paper in the reading history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub paper_id: String,
    pub title: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
    Sepia,
    System,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TtsSettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,
    #[serde(default = "unit_rate")]
    pub rate: f32,
    #[serde(default = "unit_rate")]
    pub pitch: f32,
}

fn unit_rate() -> f32 {
    1.0
}

impl Default for TtsSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            voice: None,
            rate: 1.0,
            pitch: 1.0,
        }
    }
}

pub const MIN_FONT_SIZE: u8 = 10;
pub const MAX_FONT_SIZE: u8 = 32;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserPreferences {
    #[serde(deserialize_with = "font_size_in_range")]
    pub font_size: u8,
    pub theme: Theme,
    pub line_height: f32,
    pub show_highlights: bool,
    pub tts: TtsSettings,
}

/// Accepts any JSON number and pulls it into the font size range.
fn font_size_in_range<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let requested = f64::deserialize(deserializer)?;
    Ok(requested
        .round()
        .clamp(f64::from(MIN_FONT_SIZE), f64::from(MAX_FONT_SIZE)) as u8)
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            font_size: 16,
            theme: Theme::Light,
            line_height: 1.6,
            show_highlights: true,
            tts: TtsSettings::default(),
        }
    }
}

impl UserPreferences {
    /// Pulls out-of-range values back into their allowed bounds.
    pub fn clamped(mut self) -> Self {
        self.font_size = self.font_size.clamp(MIN_FONT_SIZE, MAX_FONT_SIZE);
        self.line_height = self.line_height.clamp(1.0, 3.0);
        self.tts.rate = self.tts.rate.clamp(0.5, 2.0);
        self.tts.pitch = self.tts.pitch.clamp(0.5, 2.0);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthProvider {
    Google,
    Github,
    Email,
}

impl AuthProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthProvider::Google => "google",
            AuthProvider::Github => "github",
            AuthProvider::Email => "email",
        }
    }
}

/// A signed-in reader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub provider: AuthProvider,
    pub email: String,
    pub display_name: String,
}

impl Entity for User {
    fn id(&self) -> &str {
        &self.id
    }
}

/// A server-side login session behind the `session` cookie.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSession {
    pub id: String,
    pub user: User,
    pub expires_at: DateTime<Utc>,
}

impl Entity for AuthSession {
    fn id(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roman_numerals_decode() {
        assert_eq!(parse_roman("I"), Some(1));
        assert_eq!(parse_roman("iv"), Some(4));
        assert_eq!(parse_roman("XII"), Some(12));
        assert_eq!(parse_roman("XIV"), Some(14));
        assert_eq!(parse_roman("MCMXCIV"), Some(1994));
        assert_eq!(parse_roman("Intro"), None);
        assert_eq!(parse_roman(""), None);
    }

    #[test]
    fn sections_sort_by_decoded_number() {
        let section = |id: &str, number: SectionNumber| Section {
            id: id.to_string(),
            document_id: "d".to_string(),
            number,
            title: id.to_string(),
            paragraphs: Vec::new(),
            format: None,
        };
        let mut doc = Document {
            id: "d".to_string(),
            doc_type: DocumentType::Foreword,
            publication_id: "ub".to_string(),
            number: 0,
            title: "Foreword".to_string(),
            author: None,
            sections: vec![
                section("iii", "III".into()),
                section("intro", "Intro".into()),
                section("i", "I".into()),
                section("ii", 2u32.into()),
            ],
            metadata: DocumentMetadata::default(),
        };
        doc.sort_sections();
        let ids: Vec<_> = doc.sections.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["i", "ii", "iii", "intro"]);
    }

    #[test]
    fn paragraph_serializes_without_default_flags() {
        let p = Paragraph::new("p1", "d1", "s1", 1, "In the beginning");
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "id": "p1",
                "documentId": "d1",
                "sectionId": "s1",
                "number": 1,
                "text": "In the beginning"
            })
        );
    }

    #[test]
    fn highlight_metadata_keeps_unknown_keys() {
        let json = serde_json::json!({
            "paperId": "ub-paper-1",
            "paragraphId": "ub-paper-1-s1-p2",
            "sectionId": "ub-paper-1-s1"
        });
        let meta: HighlightMetadata = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(meta.paper_id, "ub-paper-1");
        assert_eq!(meta.extra.get("sectionId"), Some(&Value::from("ub-paper-1-s1")));
        assert_eq!(serde_json::to_value(&meta).unwrap(), json);
    }

    #[test]
    fn preferences_fill_missing_fields_and_clamp() {
        let prefs: UserPreferences =
            serde_json::from_str(r#"{"fontSize": 80, "theme": "dark"}"#).unwrap();
        assert_eq!(prefs.theme, Theme::Dark);
        assert!(prefs.show_highlights);
        assert_eq!(prefs.clamped().font_size, MAX_FONT_SIZE);
    }

    #[test]
    fn font_sizes_outside_a_byte_are_clamped_on_read() {
        let large: UserPreferences = serde_json::from_str(r#"{"fontSize": 300}"#).unwrap();
        assert_eq!(large.font_size, MAX_FONT_SIZE);
        let negative: UserPreferences = serde_json::from_str(r#"{"fontSize": -4}"#).unwrap();
        assert_eq!(negative.font_size, MIN_FONT_SIZE);
        let fractional: UserPreferences = serde_json::from_str(r#"{"fontSize": 17.6}"#).unwrap();
        assert_eq!(fractional.font_size, 18);
        assert!(serde_json::from_str::<UserPreferences>(r#"{"fontSize": "big"}"#).is_err());
    }
}

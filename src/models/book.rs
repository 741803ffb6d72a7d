//! Book domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::caption::{normalize_lang, split_tags, CaptionMetadata};

/// A library entry backed by one document message in the tracked group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookRecord {
    pub id: i64,
    /// Chat the backing message lives in.
    pub tg_chat_id: String,
    /// Backing message id, unique together with the chat id.
    pub tg_message_id: i64,
    pub file_id: String,
    pub file_unique_id: Option<String>,
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
    pub file_size: Option<i64>,
    pub title: String,
    pub author: String,
    pub lang: String,
    /// Comma separated, as stored.
    pub tags: String,
    pub category: Option<String>,
    /// External cover URL set by an admin; wins over the thumbnail.
    pub cover: Option<String>,
    /// Thumbnail asset of the backing document.
    pub cover_file_id: Option<String>,
    pub source: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BookRecord {
    /// Tags as a list, in stored order.
    pub fn tag_list(&self) -> Vec<String> {
        split_tags(&self.tags)
    }

    /// Name to offer for downloads.
    pub fn download_name(&self) -> Option<&str> {
        self.file_name.as_deref().filter(|n| !n.trim().is_empty())
    }
}

/// A book observed in the tracked group, ready to be upserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBook {
    pub tg_chat_id: String,
    pub tg_message_id: i64,
    pub file_id: String,
    pub file_unique_id: Option<String>,
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
    pub file_size: Option<i64>,
    pub cover_file_id: Option<String>,
    pub metadata: CaptionMetadata,
}

/// Search filters for listing books. Blank values are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookFilter {
    /// Free text matched against title, author and tags.
    pub query: Option<String>,
    pub lang: Option<String>,
    pub category: Option<String>,
}

impl BookFilter {
    pub fn new(query: Option<&str>, lang: Option<&str>, category: Option<&str>) -> Self {
        Self {
            query: trimmed(query),
            lang: trimmed(lang),
            category: trimmed(category),
        }
    }
}

/// One page of search results.
#[derive(Debug, Clone, Serialize)]
pub struct BookPage {
    pub total: i64,
    pub items: Vec<BookRecord>,
}

/// Admin edit request. Absent fields are left alone; `null` clears.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookPatch {
    #[serde(default, deserialize_with = "double_option")]
    pub title: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub author: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub lang: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub tags: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub source: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub category: Option<Option<String>>,
    /// External cover URL override.
    #[serde(default, deserialize_with = "double_option")]
    pub cover: Option<Option<String>>,
}

/// Why a patch was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatchError {
    #[error("No fields to update")]
    Empty,
    #[error("{0} cannot be empty")]
    Blank(&'static str),
}

/// A validated, normalized set of column changes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookChanges {
    pub title: Option<String>,
    pub author: Option<String>,
    pub source: Option<String>,
    pub lang: Option<String>,
    pub tags: Option<String>,
    /// `Some(None)` clears the column.
    pub category: Option<Option<String>>,
    pub cover: Option<Option<String>>,
}

impl BookPatch {
    /// Validate and normalize the patch.
    ///
    /// `lang` is normalized to a recognized code (or cleared), `tags` are
    /// trimmed and otherwise stored exactly as sent, blank `category` and
    /// `cover` clear the column, and `title`, `author` and `source` must not
    /// be blank.
    pub fn into_changes(self) -> Result<BookChanges, PatchError> {
        let changes = BookChanges {
            title: required(self.title, "title")?,
            author: required(self.author, "author")?,
            source: required(self.source, "source")?,
            lang: self
                .lang
                .map(|v| v.as_deref().map(normalize_lang).unwrap_or_default()),
            tags: self
                .tags
                .map(|v| v.map(|t| t.trim().to_string()).unwrap_or_default()),
            category: self.category.map(|v| trimmed(v.as_deref())),
            cover: self.cover.map(|v| trimmed(v.as_deref())),
        };

        if changes.is_empty() {
            return Err(PatchError::Empty);
        }
        Ok(changes)
    }
}

impl BookChanges {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

fn required(
    value: Option<Option<String>>,
    field: &'static str,
) -> Result<Option<String>, PatchError> {
    match value {
        None => Ok(None),
        Some(v) => trimmed(v.as_deref())
            .map(Some)
            .ok_or(PatchError::Blank(field)),
    }
}

fn trimmed(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Distinguish a missing field (`None`) from an explicit `null` (`Some(None)`).
fn double_option<'de, D, T>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}

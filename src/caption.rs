//! Caption parsing for uploaded documents.
//!
//! Uploaders annotate a file with either one `Key: value` pair per line or a
//! single line of pairs separated by `|`:
//!
//! ```text
//! Title: Siddhartha
//! Author: Hermann Hesse
//! Lang: EN
//! Tags: novel, classic
//! ```
//!
//! ```text
//! Title: Siddhartha | Author: Hermann Hesse | Lang: EN | Tags: novel, classic
//! ```
//!
//! Parsing is total. Anything that is not a recognized pair is skipped and
//! missing fields fall back to defaults after the pairs have been read.

use serde::Serialize;

/// Author stored when the caption does not name one.
pub const DEFAULT_AUTHOR: &str = "Unknown";

/// Title stored when neither the caption nor the upload carries a name.
pub const UNTITLED: &str = "Untitled";

/// Recognized two-letter language codes and the spellings that map to them.
const LANGUAGES: &[(&str, &[&str])] = &[
    ("en", &["en", "eng", "english", "英文", "英语"]),
    (
        "zh",
        &["zh", "zh-cn", "zh-tw", "zh-hans", "zh-hant", "cn", "chinese", "中文"],
    ),
    ("th", &["th", "tha", "thai", "ไทย"]),
    ("ja", &["ja", "jp", "japanese", "日本語", "日文"]),
    ("ko", &["ko", "kr", "korean", "한국어"]),
    ("fr", &["fr", "french", "français"]),
    ("de", &["de", "german", "deutsch"]),
    ("es", &["es", "spanish", "español"]),
    ("ru", &["ru", "russian", "русский"]),
];

/// Keys understood in a caption.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptionKey {
    Title,
    Author,
    Lang,
    Tags,
    Category,
    Source,
}

impl CaptionKey {
    /// Match a key case-insensitively, ignoring surrounding whitespace.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "title" => Some(Self::Title),
            "author" => Some(Self::Author),
            "lang" => Some(Self::Lang),
            "tags" => Some(Self::Tags),
            "category" => Some(Self::Category),
            "source" => Some(Self::Source),
            _ => None,
        }
    }
}

/// Raw values found in a caption, before any defaulting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptionFields {
    pub title: Option<String>,
    pub author: Option<String>,
    pub lang: Option<String>,
    pub tags: Option<String>,
    pub category: Option<String>,
    pub source: Option<String>,
}

impl CaptionFields {
    fn set(&mut self, key: CaptionKey, value: String) {
        let slot = match key {
            CaptionKey::Title => &mut self.title,
            CaptionKey::Author => &mut self.author,
            CaptionKey::Lang => &mut self.lang,
            CaptionKey::Tags => &mut self.tags,
            CaptionKey::Category => &mut self.category,
            CaptionKey::Source => &mut self.source,
        };
        *slot = Some(value);
    }
}

/// Fallback values applied to fields the caption leaves out.
#[derive(Debug, Clone, Copy)]
pub struct CaptionDefaults<'a> {
    /// Original name of the uploaded file.
    pub file_name: Option<&'a str>,
    /// Display handle of whoever posted the file.
    pub sender: Option<&'a str>,
    /// Source label used when there is no sender handle either.
    pub source_label: &'a str,
}

/// Structured metadata for one uploaded file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaptionMetadata {
    pub title: String,
    pub author: String,
    /// Normalized two-letter code, or empty when unknown.
    pub lang: String,
    pub tags: Vec<String>,
    pub category: Option<String>,
    pub source: String,
}

impl CaptionMetadata {
    /// Tags in their stored, comma separated form.
    pub fn tags_joined(&self) -> String {
        join_tags(&self.tags)
    }
}

/// Read every recognized `Key: value` pair out of a caption.
///
/// A caption is treated as single-line when it contains `|` and no line
/// break. Later occurrences of a key replace earlier ones. Values that are
/// blank after trimming count as absent.
pub fn extract_fields(caption: &str) -> CaptionFields {
    let mut fields = CaptionFields::default();
    let caption = caption.strip_prefix('\u{feff}').unwrap_or(caption);

    let single_line = caption.contains('|') && !caption.contains('\n');
    let segments: Box<dyn Iterator<Item = &str>> = if single_line {
        Box::new(caption.split('|'))
    } else {
        Box::new(caption.lines())
    };

    for segment in segments {
        let Some((key, value)) = segment.split_once(':') else {
            continue;
        };
        let Some(key) = CaptionKey::parse(key) else {
            continue;
        };
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        fields.set(key, value.to_string());
    }

    fields
}

/// Parse a caption and apply the defaulting policy.
pub fn parse_caption(caption: &str, defaults: &CaptionDefaults<'_>) -> CaptionMetadata {
    let fields = extract_fields(caption);

    let title = fields
        .title
        .or_else(|| non_blank(defaults.file_name))
        .unwrap_or_else(|| UNTITLED.to_string());
    let author = fields.author.unwrap_or_else(|| DEFAULT_AUTHOR.to_string());
    let source = fields
        .source
        .or_else(|| non_blank(defaults.sender))
        .unwrap_or_else(|| defaults.source_label.to_string());

    CaptionMetadata {
        title,
        author,
        lang: fields.lang.as_deref().map(normalize_lang).unwrap_or_default(),
        tags: fields.tags.as_deref().map(split_tags).unwrap_or_default(),
        category: fields.category,
        source,
    }
}

/// Map a free-form language value onto a recognized two-letter code.
///
/// Matching is case-insensitive. Unrecognized values normalize to an empty
/// string.
pub fn normalize_lang(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    LANGUAGES
        .iter()
        .find(|(_, spellings)| spellings.contains(&lowered.as_str()))
        .map(|(code, _)| (*code).to_string())
        .unwrap_or_default()
}

/// Split a tag list on commas, trimming entries and dropping empty ones.
///
/// Order and duplicates are preserved. The full-width semicolon some input
/// methods produce is accepted as a separator too.
pub fn split_tags(raw: &str) -> Vec<String> {
    raw.split([',', '；'])
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

/// Join tags into their stored form.
pub fn join_tags(tags: &[String]) -> String {
    tags.join(", ")
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEFAULTS: CaptionDefaults<'static> = CaptionDefaults {
        file_name: Some("book.epub"),
        sender: Some("alice"),
        source_label: "telegram",
    };

    #[test]
    fn test_multi_line_caption() {
        let caption = "Title: Siddhartha\nAuthor: Hermann Hesse\nLang: EN\nTags: novel, classic\nCategory: Fiction\nSource: archive.org";
        let meta = parse_caption(caption, &DEFAULTS);

        assert_eq!(meta.title, "Siddhartha");
        assert_eq!(meta.author, "Hermann Hesse");
        assert_eq!(meta.lang, "en");
        assert_eq!(meta.tags, vec!["novel", "classic"]);
        assert_eq!(meta.category.as_deref(), Some("Fiction"));
        assert_eq!(meta.source, "archive.org");
    }

    #[test]
    fn test_single_line_caption() {
        let meta = parse_caption("Title: X | Author: Y | Lang: EN | Tags: a, b", &DEFAULTS);

        assert_eq!(meta.title, "X");
        assert_eq!(meta.author, "Y");
        assert_eq!(meta.lang, "en");
        assert_eq!(meta.tags, vec!["a", "b"]);
    }

    #[test]
    fn test_pipe_inside_multi_line_value_is_kept() {
        let meta = parse_caption("Title: Left | Right\nAuthor: Z", &DEFAULTS);
        assert_eq!(meta.title, "Left | Right");
        assert_eq!(meta.author, "Z");
    }

    #[test]
    fn test_keys_are_case_insensitive_and_unordered() {
        let meta = parse_caption("tags: x\nAUTHOR: Someone\n  title  :  Spaced  ", &DEFAULTS);
        assert_eq!(meta.title, "Spaced");
        assert_eq!(meta.author, "Someone");
        assert_eq!(meta.tags, vec!["x"]);
    }

    #[test]
    fn test_value_keeps_later_colons() {
        let meta = parse_caption("Title: Dune: Messiah", &DEFAULTS);
        assert_eq!(meta.title, "Dune: Messiah");
    }

    #[test]
    fn test_unrecognized_and_malformed_lines_ignored() {
        let caption = "just some words\nPublisher: Nobody\n: orphan value\nTitle: Kept";
        let fields = extract_fields(caption);
        assert_eq!(fields.title.as_deref(), Some("Kept"));
        assert_eq!(fields.author, None);
        assert_eq!(fields.source, None);
    }

    #[test]
    fn test_blank_values_are_absent() {
        let meta = parse_caption("Title:   \nAuthor:\nSource: \t", &DEFAULTS);
        assert_eq!(meta.title, "book.epub");
        assert_eq!(meta.author, DEFAULT_AUTHOR);
        assert_eq!(meta.source, "alice");
    }

    #[test]
    fn test_empty_caption_uses_defaults() {
        let meta = parse_caption("", &DEFAULTS);
        assert_eq!(meta.title, "book.epub");
        assert_eq!(meta.author, "Unknown");
        assert_eq!(meta.lang, "");
        assert!(meta.tags.is_empty());
        assert_eq!(meta.category, None);
        assert_eq!(meta.source, "alice");
    }

    #[test]
    fn test_empty_caption_without_sender_uses_source_label() {
        let defaults = CaptionDefaults {
            file_name: Some("a.pdf"),
            sender: None,
            source_label: "telegram",
        };
        assert_eq!(parse_caption("", &defaults).source, "telegram");

        let blank_sender = CaptionDefaults {
            sender: Some("  "),
            ..defaults
        };
        assert_eq!(parse_caption("", &blank_sender).source, "telegram");
    }

    #[test]
    fn test_missing_file_name_falls_back_to_untitled() {
        let defaults = CaptionDefaults {
            file_name: None,
            sender: None,
            source_label: "telegram",
        };
        assert_eq!(parse_caption("Author: A", &defaults).title, UNTITLED);
    }

    #[test]
    fn test_leading_byte_order_mark_is_ignored() {
        let meta = parse_caption("\u{feff}Title: X\nAuthor: Y", &DEFAULTS);
        assert_eq!(meta.title, "X");
        assert_eq!(meta.author, "Y");
    }

    #[test]
    fn test_later_key_wins() {
        let meta = parse_caption("Title: First\nTitle: Second", &DEFAULTS);
        assert_eq!(meta.title, "Second");
    }

    #[test]
    fn test_tags_keep_order_and_duplicates() {
        assert_eq!(split_tags("b, a,, b ,"), vec!["b", "a", "b"]);
        assert_eq!(split_tags("x；y"), vec!["x", "y"]);
        assert!(split_tags(" , ").is_empty());
    }

    #[test]
    fn test_normalize_lang() {
        assert_eq!(normalize_lang("EN"), "en");
        assert_eq!(normalize_lang(" English "), "en");
        assert_eq!(normalize_lang("zh-CN"), "zh");
        assert_eq!(normalize_lang("中文"), "zh");
        assert_eq!(normalize_lang("Thai"), "th");
        assert_eq!(normalize_lang("klingon"), "");
        assert_eq!(normalize_lang(""), "");
    }

    #[test]
    fn test_unrecognized_lang_stored_empty() {
        let meta = parse_caption("Lang: xx", &DEFAULTS);
        assert_eq!(meta.lang, "");
    }

    #[test]
    fn test_parsing_is_idempotent() {
        let caption = "Title: T\nAuthor: A\nLang: zh\nTags: one, two, one\nCategory: C";
        assert_eq!(
            parse_caption(caption, &DEFAULTS),
            parse_caption(caption, &DEFAULTS)
        );
    }

    #[test]
    fn test_tags_joined() {
        let meta = parse_caption("Tags: a,b ,  c", &DEFAULTS);
        assert_eq!(meta.tags_joined(), "a, b, c");
    }
}

//! Static document loading.
//!
//! Club knowledge lives in JSON files shaped like
//!
//! ```json
//! { "content": [ { "title": "Joining", "body": "..." }, ... ] }
//! ```
//!
//! Each entry of `content` becomes one [`Document`]. The document text is the
//! whole entry re-serialized as compact JSON so that every body field reaches
//! the model, and the entry's `title` becomes the document metadata.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::models::Document;

#[derive(Debug, Deserialize)]
struct SourceFile {
    content: Vec<serde_json::Value>,
}

/// Load every document from a single JSON file.
///
/// Invalid UTF-8 sequences are replaced rather than rejected, and null
/// characters are removed from the document text. A missing file, malformed
/// JSON, or an entry without a string `title` is an error.
pub fn load_documents(path: &Path) -> Result<Vec<Document>> {
    if !path.exists() {
        bail!("Document file does not exist: {}", path.display());
    }

    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read document file: {}", path.display()))?;
    let text = String::from_utf8_lossy(&bytes);

    let source: SourceFile = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse document file: {}", path.display()))?;

    let mut documents = Vec::with_capacity(source.content.len());
    for (index, mut entry) in source.content.into_iter().enumerate() {
        scrub_value(&mut entry);
        let title = entry
            .get("title")
            .and_then(|t| t.as_str())
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "{}: entry {} is missing a string 'title'",
                    path.display(),
                    index
                )
            })?
            .to_string();

        let content = serde_json::to_string(&entry)?;
        documents.push(Document::new(title, content));
    }

    tracing::info!(
        path = %path.display(),
        count = documents.len(),
        "loaded documents"
    );
    Ok(documents)
}

/// Load documents from several files, preserving file order.
pub fn load_all(paths: &[PathBuf]) -> Result<Vec<Document>> {
    let mut documents = Vec::new();
    for path in paths {
        documents.extend(load_documents(path)?);
    }
    Ok(documents)
}

/// Remove every `'\0'` from `text`.
pub fn strip_nulls(text: &str) -> String {
    text.replace('\0', "")
}

/// Strip null characters from every string (and key) inside `value`.
fn scrub_value(value: &mut serde_json::Value) {
    match value {
        serde_json::Value::String(s) => {
            if s.contains('\0') {
                *s = strip_nulls(s);
            }
        }
        serde_json::Value::Array(items) => items.iter_mut().for_each(scrub_value),
        serde_json::Value::Object(map) => {
            let entries = std::mem::take(map);
            for (key, mut item) in entries {
                scrub_value(&mut item);
                map.insert(strip_nulls(&key), item);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, bytes: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn test_loads_one_document_per_entry() {
        let tmp = TempDir::new().unwrap();
        let path = write(
            &tmp,
            "club.json",
            br#"{"content": [
                {"title": "Joining", "body": "Sign up at the club fair."},
                {"title": "Meetings", "body": "Thursdays at 12:30."}
            ]}"#,
        );

        let docs = load_documents(&path).unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].title(), "Joining");
        assert!(docs[0].content.contains("Sign up at the club fair."));
        assert!(docs[0].content.contains("\"title\":\"Joining\""));
        assert_eq!(docs[1].title(), "Meetings");
    }

    #[test]
    fn test_strips_null_characters() {
        let tmp = TempDir::new().unwrap();
        let path = write(
            &tmp,
            "club.json",
            br#"{"content": [{"title": "Nul\u0000l", "body": "a\u0000b"}]}"#,
        );

        let docs = load_documents(&path).unwrap();
        assert_eq!(docs[0].title(), "Null");
        assert!(!docs[0].content.contains('\0'));
        assert!(!docs[0].content.contains("\\u0000"));
        assert!(docs[0].content.contains("ab"));
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let tmp = TempDir::new().unwrap();
        let mut bytes = br#"{"content": [{"title": "Bad", "body": "x"#.to_vec();
        bytes.push(0xFF);
        bytes.extend_from_slice(br#"y"}]}"#);
        let path = write(&tmp, "club.json", &bytes);

        let docs = load_documents(&path).unwrap();
        assert!(docs[0].content.contains('\u{FFFD}'));
    }

    #[test]
    fn test_missing_file_is_error() {
        let tmp = TempDir::new().unwrap();
        let err = load_documents(&tmp.path().join("nope.json")).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn test_malformed_json_is_error() {
        let tmp = TempDir::new().unwrap();
        let path = write(&tmp, "club.json", b"{\"content\": [");
        assert!(load_documents(&path).is_err());

        let path = write(&tmp, "shape.json", br#"{"entries": []}"#);
        assert!(load_documents(&path).is_err());
    }

    #[test]
    fn test_entry_without_title_is_error() {
        let tmp = TempDir::new().unwrap();
        let path = write(&tmp, "club.json", br#"{"content": [{"body": "x"}]}"#);
        let err = load_documents(&path).unwrap_err();
        assert!(err.to_string().contains("title"));
    }

    #[test]
    fn test_load_all_preserves_order() {
        let tmp = TempDir::new().unwrap();
        let a = write(&tmp, "a.json", br#"{"content": [{"title": "A"}]}"#);
        let b = write(&tmp, "b.json", br#"{"content": [{"title": "B"}, {"title": "C"}]}"#);

        let docs = load_all(&[a, b]).unwrap();
        let titles: Vec<&str> = docs.iter().map(|d| d.title()).collect();
        assert_eq!(titles, vec!["A", "B", "C"]);
    }
}

//! Text extraction for the supported file kinds

use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::types::LoaderKind;

/// Extracts text from file bytes according to its [`LoaderKind`]
pub struct FileParser;

impl FileParser {
    /// Extract text; `None` for kinds that are not ingested
    pub fn parse(path: &str, kind: LoaderKind, data: &[u8]) -> Result<Option<String>> {
        match kind {
            LoaderKind::Text => Ok(Some(Self::parse_text(data))),
            LoaderKind::PageDocument => Self::parse_pdf(path, data).map(Some),
            LoaderKind::Skip => Ok(None),
        }
    }

    /// Decode UTF-8, replacing undecodable bytes
    fn parse_text(data: &[u8]) -> String {
        String::from_utf8_lossy(data).into_owned()
    }

    /// Extract PDF text page by page, falling back to whole-document extraction
    fn parse_pdf(path: &str, data: &[u8]) -> Result<String> {
        match Self::extract_pdf_pages(data) {
            Ok(pages) if pages.values().any(|p| !p.trim().is_empty()) => {
                tracing::debug!("Extracted {} pages from {}", pages.len(), path);
                Ok(pages.into_values().collect::<Vec<_>>().join("\n"))
            }
            Ok(_) => {
                tracing::debug!("Per-page extraction of {} produced no text, trying pdf-extract", path);
                Self::extract_pdf_whole(path, data)
            }
            Err(e) => {
                tracing::warn!("Per-page extraction of {} failed: {}, trying pdf-extract", path, e);
                Self::extract_pdf_whole(path, data)
            }
        }
    }

    /// Text of every page keyed by page number
    fn extract_pdf_pages(data: &[u8]) -> std::result::Result<BTreeMap<u32, String>, lopdf::Error> {
        let doc = lopdf::Document::load_mem(data)?;
        let mut pages = BTreeMap::new();

        for page_number in doc.get_pages().keys() {
            let text = doc.extract_text(&[*page_number])?;
            pages.insert(*page_number, clean_page_text(&text));
        }

        Ok(pages)
    }

    fn extract_pdf_whole(path: &str, data: &[u8]) -> Result<String> {
        // pdf-extract panics on some malformed font tables
        let content = recover_panic(path, || pdf_extract::extract_text_from_mem(data))?
            .map_err(|e| Error::file_parse(path, e.to_string()))?;
        let content = clean_page_text(&content);

        if content.trim().is_empty() {
            return Err(Error::file_parse(path, "No text content could be extracted from PDF"));
        }
        Ok(content)
    }
}

/// Run `extract`, turning a panic into a parse error for `path`.
///
/// Requires unwinding panics; the release profile must not set `panic = "abort"`.
fn recover_panic<T>(path: &str, extract: impl FnOnce() -> T) -> Result<T> {
    std::panic::catch_unwind(std::panic::AssertUnwindSafe(extract))
        .map_err(|_| Error::file_parse(path, "text extractor panicked"))
}

/// Strip NUL characters and blank lines left behind by PDF text extraction
fn clean_page_text(text: &str) -> String {
    text.replace('\0', "")
        .lines()
        .map(str::trim_end)
        .filter(|l| !l.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}


#[cfg(test)]
mod tests {
    use super::test_support::pdf_with_pages;
    use super::*;

    #[test]
    fn test_pdf_pages_are_joined_in_order() {
        let data = pdf_with_pages(&["The sky is blue.", "Grass is green."]);
        let text = FileParser::parse("p.pdf", LoaderKind::PageDocument, &data).unwrap().unwrap();

        let sky = text.find("The sky is blue.").unwrap();
        let grass = text.find("Grass is green.").unwrap();
        assert!(sky < grass);
    }

    #[test]
    fn test_extractor_panic_becomes_parse_error() {
        let result: Result<()> = recover_panic("bad.pdf", || panic!("malformed font table"));
        assert!(matches!(result, Err(Error::FileParse { ref path, .. }) if path == "bad.pdf"));
    }

    #[test]
    fn test_release_profile_keeps_unwinding() {
        let manifest: toml::Value = toml::from_str(include_str!("../../../../Cargo.toml")).unwrap();
        let panic = manifest
            .get("profile")
            .and_then(|p| p.get("release"))
            .and_then(|r| r.get("panic"))
            .and_then(|v| v.as_str());
        assert_ne!(panic, Some("abort"));
    }

    #[test]
    fn test_text_is_decoded_lossily() {
        let data = b"caf\xff\xfe ok";
        let text = FileParser::parse("a.txt", LoaderKind::Text, data).unwrap().unwrap();
        assert!(text.starts_with("caf"));
        assert!(text.ends_with(" ok"));
    }

    #[test]
    fn test_skip_kind_yields_nothing() {
        assert!(FileParser::parse("a.bin", LoaderKind::Skip, b"\x00\x01").unwrap().is_none());
    }

    #[test]
    fn test_garbage_pdf_is_a_parse_error() {
        let result = FileParser::parse("broken.pdf", LoaderKind::PageDocument, b"not a pdf");
        assert!(matches!(result, Err(Error::FileParse { .. })));
    }

    #[test]
    fn test_clean_page_text() {
        assert_eq!(clean_page_text("a\0b  \n\n   \nc"), "ab\nc");
    }
}

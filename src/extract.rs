use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result, bail};
use serde::Serialize;
use tracing::debug;

pub const MAX_PAGES_LIMIT: usize = 5;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    /// `pdftotext -layout`
    TextLayer,
    /// `lopdf` page text
    PageText,
}

impl ExtractionMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TextLayer => "text_layer",
            Self::PageText => "page_text",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExtractedText {
    pub pages: Vec<String>,
    pub method: ExtractionMethod,
}

impl ExtractedText {
    pub fn joined(&self) -> String {
        self.pages.join("\n")
    }
}

pub trait TextExtractor {
    /// Text of the first `max_pages` pages, or `None` when nothing readable
    /// comes out. Image-only and encrypted PDFs land here too.
    fn extract(&self, path: &Path, max_pages: usize) -> Option<ExtractedText>;
}

#[derive(Debug, Default, Clone)]
pub struct PdfTextExtractor;

impl TextExtractor for PdfTextExtractor {
    fn extract(&self, path: &Path, max_pages: usize) -> Option<ExtractedText> {
        let max_pages = clamp_pages(max_pages);

        match extract_pages_with_pdftotext(path, max_pages) {
            Ok(pages) if has_text(&pages) => {
                return Some(ExtractedText {
                    pages,
                    method: ExtractionMethod::TextLayer,
                });
            }
            Ok(_) => debug!(path = %path.display(), "pdftotext produced no text"),
            Err(err) => debug!(path = %path.display(), error = %err, "pdftotext failed"),
        }

        match extract_pages_with_lopdf(path, max_pages) {
            Ok(pages) if has_text(&pages) => Some(ExtractedText {
                pages,
                method: ExtractionMethod::PageText,
            }),
            Ok(_) => {
                debug!(path = %path.display(), "lopdf produced no text");
                None
            }
            Err(err) => {
                debug!(path = %path.display(), error = %err, "lopdf fallback failed");
                None
            }
        }
    }
}

pub fn clamp_pages(max_pages: usize) -> usize {
    max_pages.clamp(1, MAX_PAGES_LIMIT)
}

fn has_text(pages: &[String]) -> bool {
    pages.iter().any(|page| non_whitespace_char_count(page) > 0)
}

fn non_whitespace_char_count(text: &str) -> usize {
    text.chars()
        .filter(|character| !character.is_whitespace())
        .count()
}

fn extract_pages_with_pdftotext(pdf_path: &Path, max_pages: usize) -> Result<Vec<String>> {
    let output = Command::new("pdftotext")
        .arg("-layout")
        .arg("-enc")
        .arg("UTF-8")
        .arg("-f")
        .arg("1")
        .arg("-l")
        .arg(max_pages.to_string())
        .arg(pdf_path)
        .arg("-")
        .output()
        .with_context(|| format!("failed to execute pdftotext for {}", pdf_path.display()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!(
            "pdftotext returned non-zero exit status for {}: {}",
            pdf_path.display(),
            stderr.trim()
        );
    }

    let raw = String::from_utf8_lossy(&output.stdout);
    let mut pages: Vec<String> = raw
        .split('\u{000C}')
        .map(|chunk| chunk.replace('\u{0000}', ""))
        .collect();

    while let Some(last_page) = pages.last() {
        if last_page.trim().is_empty() {
            pages.pop();
            continue;
        }
        break;
    }

    Ok(pages)
}

fn extract_pages_with_lopdf(pdf_path: &Path, max_pages: usize) -> Result<Vec<String>> {
    let document = lopdf::Document::load(pdf_path)
        .with_context(|| format!("lopdf could not load {}", pdf_path.display()))?;
    if document.trailer.get(b"Encrypt").is_ok() {
        bail!("{} is encrypted", pdf_path.display());
    }

    let mut page_numbers = document.get_pages().keys().copied().collect::<Vec<u32>>();
    page_numbers.sort_unstable();
    page_numbers.truncate(max_pages);

    let mut pages = Vec::with_capacity(page_numbers.len());
    for page_number in page_numbers {
        let text = document.extract_text(&[page_number]).with_context(|| {
            format!(
                "lopdf could not extract page {} of {}",
                page_number,
                pdf_path.display()
            )
        })?;
        pages.push(text.replace('\u{0000}', ""));
    }

    Ok(pages)
}

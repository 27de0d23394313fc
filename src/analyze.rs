use tracing::{debug, info};

use crate::classify::Classifier;
use crate::extract::TextExtractor;
use crate::model::{AnalyzedDocument, Document};
use crate::normalize::HeaderNormalizer;

/// Extract → normalize → classify for one document.
pub struct Analyzer<'a> {
    extractor: &'a dyn TextExtractor,
    normalizer: &'a HeaderNormalizer,
    classifier: &'a Classifier,
    max_pages: usize,
}

impl<'a> Analyzer<'a> {
    pub fn new(
        extractor: &'a dyn TextExtractor,
        normalizer: &'a HeaderNormalizer,
        classifier: &'a Classifier,
        max_pages: usize,
    ) -> Self {
        Self {
            extractor,
            normalizer,
            classifier,
            max_pages,
        }
    }

    pub fn analyze(&self, document: Document) -> AnalyzedDocument {
        let extracted = self.extractor.extract(&document.path, self.max_pages);
        let header = extracted
            .as_ref()
            .and_then(|text| self.normalizer.normalize(&text.joined()));
        let classification = self.classifier.classify(header.as_deref());

        if extracted.is_none() {
            debug!(path = %document.path.display(), "no extractable text");
        }
        if classification.is_ambiguous() {
            let candidates = classification
                .candidates
                .iter()
                .map(|candidate| format!("{}={}", candidate.label, candidate.score))
                .collect::<Vec<String>>()
                .join(", ");
            info!(
                path = %document.path.display(),
                label = %classification.label,
                candidates = %candidates,
                "ambiguous header"
            );
        }

        AnalyzedDocument {
            document,
            method: extracted.map(|text| text.method),
            header,
            classification,
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::HashMap;
    use std::path::Path;

    use crate::extract::{ExtractedText, ExtractionMethod, TextExtractor};

    /// Canned page text keyed by file name; unknown files have no text.
    #[derive(Debug, Default)]
    pub struct StubExtractor {
        pages: HashMap<String, String>,
    }

    impl StubExtractor {
        pub fn with(mut self, file_name: &str, text: &str) -> Self {
            self.pages.insert(file_name.to_string(), text.to_string());
            self
        }
    }

    impl TextExtractor for StubExtractor {
        fn extract(&self, path: &Path, _max_pages: usize) -> Option<ExtractedText> {
            let name = path.file_name()?.to_string_lossy().into_owned();
            self.pages.get(&name).map(|text| ExtractedText {
                pages: vec![text.clone()],
                method: ExtractionMethod::TextLayer,
            })
        }
    }
}

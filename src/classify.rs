use std::fmt;

use serde::Serialize;

use crate::cli::{FallbackPolicy, ScoringPolicy};
use crate::keywords::KeywordTable;

pub const UNCLASSIFIED_FOLDER: &str = "Other";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Label {
    /// A label from the keyword table.
    System(String),
    /// First word of the header under the heuristic fallback.
    Speculative(String),
    Unclassified,
}

impl Label {
    /// Folder (and filename prefix) the label materializes into.
    pub fn folder_name(&self) -> &str {
        match self {
            Self::System(name) | Self::Speculative(name) => name,
            Self::Unclassified => UNCLASSIFIED_FOLDER,
        }
    }

    pub fn is_unclassified(&self) -> bool {
        matches!(self, Self::Unclassified)
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::System(name) | Self::Speculative(name) => f.write_str(name),
            Self::Unclassified => f.write_str("Unclassified"),
        }
    }
}

impl Serialize for Label {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchedRule {
    pub pattern: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Candidate {
    pub label: String,
    pub score: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassificationResult {
    pub label: Label,
    pub matched: Option<MatchedRule>,
    pub score: u32,
    /// Every label with at least one matching rule, in priority order.
    pub candidates: Vec<Candidate>,
}

impl ClassificationResult {
    fn unmatched(label: Label) -> Self {
        Self {
            label,
            matched: None,
            score: 0,
            candidates: Vec::new(),
        }
    }

    /// More than one distinct label matched the header.
    pub fn is_ambiguous(&self) -> bool {
        self.candidates.len() > 1
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ClassifierConfig {
    pub fallback: FallbackPolicy,
    pub scoring: ScoringPolicy,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            fallback: FallbackPolicy::Strict,
            scoring: ScoringPolicy::FirstMatch,
        }
    }
}

pub struct Classifier {
    table: KeywordTable,
    config: ClassifierConfig,
}

impl Classifier {
    pub fn new(table: KeywordTable, config: ClassifierConfig) -> Self {
        Self { table, config }
    }

    pub fn classify(&self, header: Option<&str>) -> ClassificationResult {
        let Some(header) = header.map(str::trim).filter(|value| !value.is_empty()) else {
            return ClassificationResult::unmatched(Label::Unclassified);
        };

        let lowered = header.to_lowercase();
        let hits = self.collect_hits(&lowered);

        let Some(winner) = self.pick_winner(&hits) else {
            return ClassificationResult::unmatched(self.fallback_label(header));
        };

        ClassificationResult {
            label: Label::System(winner.label.clone()),
            matched: Some(MatchedRule {
                pattern: winner.first_pattern.clone(),
                label: winner.label.clone(),
            }),
            score: winner.score,
            candidates: hits
                .iter()
                .map(|hit| Candidate {
                    label: hit.label.clone(),
                    score: hit.score,
                })
                .collect(),
        }
    }

    /// Per-label hits in priority order of each label's first matching rule.
    fn collect_hits(&self, lowered: &str) -> Vec<LabelHit> {
        let mut hits = Vec::<LabelHit>::new();
        for rule in self.table.rules() {
            let occurrences = rule.pattern.occurrences(lowered);
            if occurrences == 0 {
                continue;
            }

            let gained = rule.weight.saturating_mul(occurrences as u32);
            match hits.iter_mut().find(|hit| hit.label == rule.label) {
                Some(hit) => hit.score = hit.score.saturating_add(gained),
                None => hits.push(LabelHit {
                    label: rule.label.clone(),
                    first_pattern: rule.pattern.as_str().to_string(),
                    score: gained,
                }),
            }
        }
        hits
    }

    fn pick_winner<'a>(&self, hits: &'a [LabelHit]) -> Option<&'a LabelHit> {
        match self.config.scoring {
            ScoringPolicy::FirstMatch => hits.first(),
            // Ties keep the earlier label.
            ScoringPolicy::Weighted => hits.iter().fold(None, |best: Option<&LabelHit>, hit| {
                match best {
                    Some(current) if current.score >= hit.score => Some(current),
                    _ => Some(hit),
                }
            }),
        }
    }

    fn fallback_label(&self, header: &str) -> Label {
        match self.config.fallback {
            FallbackPolicy::Strict => Label::Unclassified,
            FallbackPolicy::Heuristic => first_word_label(header)
                .map(Label::Speculative)
                .unwrap_or(Label::Unclassified),
        }
    }
}

#[derive(Debug)]
struct LabelHit {
    label: String,
    first_pattern: String,
    score: u32,
}

/// First purely alphabetic token of two or more letters, title-cased.
fn first_word_label(header: &str) -> Option<String> {
    let first = header.split_whitespace().next()?;
    if first.chars().count() < 2 || !first.chars().all(char::is_alphabetic) {
        return None;
    }

    let mut chars = first.chars();
    let head = chars.next()?;
    Some(
        head.to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
    )
}

use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde::Deserialize;

use crate::error::{SortError, SortResult};

pub const TABLE_VERSION: u32 = 1;

const BUILTIN_TABLE: &str = include_str!("../keywords.toml");
const BUILTIN_TABLE_NAME: &str = "<builtin keywords.toml>";

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum RuleOrder {
    /// Rules are checked in file order.
    #[default]
    Curated,
    /// Longer patterns first; ties keep file order.
    LongestFirst,
}

#[derive(Debug, Deserialize)]
struct KeywordTableFile {
    version: u32,
    #[serde(default)]
    order: RuleOrder,
    #[serde(default, rename = "rule")]
    rules: Vec<RuleEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RuleEntry {
    keyword: Option<String>,
    regex: Option<String>,
    label: String,
    #[serde(default = "default_weight")]
    weight: u32,
}

fn default_weight() -> u32 {
    1
}

#[derive(Debug, Clone)]
pub enum Pattern {
    /// Lower-cased substring.
    Literal(String),
    /// Compiled case-insensitive; `source` keeps the text from the table.
    Regex { source: String, compiled: Regex },
}

impl Pattern {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Literal(keyword) => keyword,
            Self::Regex { source, .. } => source,
        }
    }

    /// Occurrences in an already lower-cased header.
    pub fn occurrences(&self, lowered: &str) -> usize {
        match self {
            Self::Literal(keyword) => lowered.matches(keyword.as_str()).count(),
            Self::Regex { compiled, .. } => compiled.find_iter(lowered).count(),
        }
    }

    fn specificity(&self) -> usize {
        self.as_str().chars().count()
    }
}

#[derive(Debug, Clone)]
pub struct KeywordRule {
    pub pattern: Pattern,
    pub label: String,
    pub weight: u32,
}

#[cfg(test)]
impl KeywordRule {
    pub fn literal(keyword: &str, label: &str) -> Self {
        Self {
            pattern: Pattern::Literal(keyword.to_lowercase()),
            label: label.to_string(),
            weight: 1,
        }
    }

    pub fn with_weight(mut self, weight: u32) -> Self {
        self.weight = weight;
        self
    }
}

/// Ordered pattern → label rules. Index order is priority order.
#[derive(Debug, Clone)]
pub struct KeywordTable {
    pub version: u32,
    pub order: RuleOrder,
    rules: Vec<KeywordRule>,
}

impl KeywordTable {
    #[cfg(test)]
    pub fn new(rules: Vec<KeywordRule>, order: RuleOrder) -> Self {
        let mut table = Self {
            version: TABLE_VERSION,
            order,
            rules,
        };
        table.apply_order();
        table
    }

    pub fn builtin() -> SortResult<Self> {
        Self::parse(BUILTIN_TABLE, Path::new(BUILTIN_TABLE_NAME))
    }

    pub fn load(path: &Path) -> SortResult<Self> {
        let raw = fs::read_to_string(path).map_err(|err| SortError::KeywordTable {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })?;
        Self::parse(&raw, path)
    }

    /// `--labels-file` when given, the built-in table otherwise.
    pub fn load_or_builtin(path: Option<&Path>) -> SortResult<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Self::builtin(),
        }
    }

    pub fn parse(raw: &str, origin: &Path) -> SortResult<Self> {
        let invalid = |reason: String| SortError::KeywordTable {
            path: PathBuf::from(origin),
            reason,
        };

        let file: KeywordTableFile = toml::from_str(raw).map_err(|err| invalid(err.to_string()))?;
        if file.version != TABLE_VERSION {
            return Err(invalid(format!(
                "unsupported table version {} (expected {})",
                file.version, TABLE_VERSION
            )));
        }

        let mut rules = Vec::with_capacity(file.rules.len());
        for (index, entry) in file.rules.into_iter().enumerate() {
            let label = entry.label.trim().to_string();
            if label.is_empty() {
                return Err(invalid(format!("rule {} has an empty label", index + 1)));
            }

            let pattern = match (entry.keyword, entry.regex) {
                (Some(keyword), None) => {
                    let keyword = keyword.trim().to_lowercase();
                    if keyword.is_empty() {
                        return Err(invalid(format!("rule {} has an empty keyword", index + 1)));
                    }
                    Pattern::Literal(keyword)
                }
                (None, Some(source)) => {
                    let compiled = Regex::new(&format!("(?i){source}")).map_err(|err| {
                        invalid(format!("rule {} has an invalid regex: {err}", index + 1))
                    })?;
                    Pattern::Regex { source, compiled }
                }
                _ => {
                    return Err(invalid(format!(
                        "rule {} needs exactly one of `keyword` or `regex`",
                        index + 1
                    )));
                }
            };

            rules.push(KeywordRule {
                pattern,
                label,
                weight: entry.weight,
            });
        }

        if rules.is_empty() {
            return Err(invalid("table has no rules".to_string()));
        }

        let mut table = Self {
            version: file.version,
            order: file.order,
            rules,
        };
        table.apply_order();
        Ok(table)
    }

    pub fn rules(&self) -> &[KeywordRule] {
        &self.rules
    }

    /// Distinct labels in priority order.
    pub fn labels(&self) -> Vec<&str> {
        let mut labels = Vec::<&str>::new();
        for rule in &self.rules {
            if !labels.contains(&rule.label.as_str()) {
                labels.push(&rule.label);
            }
        }
        labels
    }

    fn apply_order(&mut self) {
        if self.order == RuleOrder::LongestFirst {
            self.rules
                .sort_by_key(|rule| std::cmp::Reverse(rule.pattern.specificity()));
        }
    }
}

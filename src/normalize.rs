use anyhow::{Context, Result};
use regex::Regex;

#[derive(Debug, Clone, Copy)]
pub struct NormalizerConfig {
    pub min_header_chars: usize,
    pub max_header_chars: usize,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            min_header_chars: 5,
            max_header_chars: 200,
        }
    }
}

struct NoiseRule {
    name: &'static str,
    pattern: Regex,
}

/// Picks the header line out of extracted page text.
pub struct HeaderNormalizer {
    config: NormalizerConfig,
    noise_rules: Vec<NoiseRule>,
}

const NOISE_PATTERNS: &[(&str, &str)] = &[
    (
        "date",
        r"(?i)^(?:(?:sist\s+)?(?:oppdatert|endret|opprettet|publisert)\s*:?\s*)?\d{1,4}[./-]\d{1,2}[./-]\d{1,4}(?:\s*(?:kl\.?\s*)?\d{1,2}[:.]\d{2}(?:[:.]\d{2})?)?$",
    ),
    ("updated_stamp", r"(?i)^sist\s+oppdatert\b"),
    (
        "page_number",
        r"(?i)^(?:(?:side|page|s\.)\s*)?\d+(?:\s*(?:av|of|/)\s*\d+)?$",
    ),
    ("symbols_only", r"^[\d\W_]+$"),
    (
        "boilerplate",
        r"(?i)^(?:teksten under er for brukerstøtte|brukerstøttes fremgangsmåte|nøkkelord\s*:|har du en tilbakemelding|se også|problem eller behov|system/program/tjeneste|løsning/fremgangsmåte|trenger du fortsatt hjelp|meld inn sak til oss)",
    ),
    ("url", r"(?i)^(?:lenke\s*:\s*)?<?(?:https?://|www\.)\S+$"),
    (
        "email",
        r"(?i)^(?:e-?post\s*:?\s*)?[^\s@]+@[^\s@]+\.[a-z]{2,}$",
    ),
    (
        "scanner_filename",
        r"(?i)^(?:side_\d+|trim\(\d+\))(?:\.pdf)+$",
    ),
];

impl HeaderNormalizer {
    pub fn new(config: NormalizerConfig) -> Result<Self> {
        let noise_rules = NOISE_PATTERNS
            .iter()
            .map(|(name, pattern)| {
                Regex::new(pattern)
                    .with_context(|| format!("failed to compile {name} noise regex"))
                    .map(|pattern| NoiseRule { name, pattern })
            })
            .collect::<Result<Vec<NoiseRule>>>()?;

        Ok(Self {
            config,
            noise_rules,
        })
    }

    /// First line that is neither noise nor out of bounds, whitespace
    /// collapsed. `None` when nothing qualifies.
    pub fn normalize(&self, raw_text: &str) -> Option<String> {
        raw_text
            .lines()
            .map(collapse_whitespace)
            .filter(|line| !line.is_empty())
            .find(|line| self.noise_reason(line).is_none() && self.within_bounds(line))
    }

    /// Name of the first noise rule the line trips, if any.
    pub fn noise_reason(&self, line: &str) -> Option<&'static str> {
        self.noise_rules
            .iter()
            .find(|rule| rule.pattern.is_match(line))
            .map(|rule| rule.name)
    }

    fn within_bounds(&self, line: &str) -> bool {
        let chars = line.chars().count();
        chars >= self.config.min_header_chars && chars <= self.config.max_header_chars
    }
}

pub fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<&str>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalizer() -> HeaderNormalizer {
        HeaderNormalizer::new(NormalizerConfig::default()).unwrap()
    }

    #[test]
    fn date_line_is_skipped_for_the_next_line() {
        let text = "02.05.2023\nOutlook Legge til delt postkasse\nmer tekst";
        assert_eq!(
            normalizer().normalize(text).as_deref(),
            Some("Outlook Legge til delt postkasse")
        );
    }

    #[test]
    fn whitespace_runs_collapse_to_single_spaces() {
        let text = "   \n  Teams    Endre navn   på kanal  \n";
        assert_eq!(
            normalizer().normalize(text).as_deref(),
            Some("Teams Endre navn på kanal")
        );
    }

    #[test]
    fn noise_rules_cover_template_lines() {
        let n = normalizer();
        assert_eq!(n.noise_reason("Side 2 av 3"), Some("page_number"));
        assert_eq!(n.noise_reason("7"), Some("page_number"));
        assert_eq!(n.noise_reason("Sist oppdatert: 14.03.2024"), Some("date"));
        assert_eq!(n.noise_reason("Sist oppdatert av Kari"), Some("updated_stamp"));
        assert_eq!(n.noise_reason("-- * --"), Some("symbols_only"));
        assert_eq!(
            n.noise_reason("Teksten under er for brukerstøtte:"),
            Some("boilerplate")
        );
        assert_eq!(n.noise_reason("https://intranett.example.no/a"), Some("url"));
        assert_eq!(n.noise_reason("brukerstotte@example.no"), Some("email"));
        assert_eq!(n.noise_reason("side_123.pdf"), Some("scanner_filename"));
        assert_eq!(n.noise_reason("Teams Endre navn på kanal"), None);
    }

    #[test]
    fn short_and_long_lines_are_out_of_bounds() {
        let long = "x".repeat(201);
        let text = format!("Hei\n{long}\nSharePoint Dele en fil");
        assert_eq!(
            normalizer().normalize(&text).as_deref(),
            Some("SharePoint Dele en fil")
        );
    }

    #[test]
    fn nothing_left_yields_none() {
        assert_eq!(normalizer().normalize(""), None);
        assert_eq!(normalizer().normalize("12.12.2022\n3\nwww.example.no"), None);
    }
}

use std::io::{self, Write};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::classify::{Candidate, Classifier, ClassifierConfig, MatchedRule};
use crate::cli::InspectArgs;
use crate::dedup::describe;
use crate::extract::{PdfTextExtractor, TextExtractor};
use crate::keywords::KeywordTable;
use crate::materialize::file_name_for;
use crate::normalize::{HeaderNormalizer, NormalizerConfig, collapse_whitespace};

#[derive(Debug, Serialize)]
struct SkippedLine {
    line: String,
    reason: &'static str,
}

#[derive(Debug, Serialize)]
struct InspectReport {
    path: String,
    size: u64,
    content_hash: String,
    method: Option<&'static str>,
    skipped: Vec<SkippedLine>,
    header: Option<String>,
    label: String,
    folder: String,
    matched: Option<MatchedRule>,
    score: u32,
    candidates: Vec<Candidate>,
    file_name: String,
}

pub fn run(args: InspectArgs) -> Result<()> {
    let report = inspect(&args, &PdfTextExtractor)?;

    let mut output = io::BufWriter::new(io::stdout().lock());
    if args.json {
        serde_json::to_writer_pretty(&mut output, &report)
            .context("failed to serialize inspect json output")?;
        writeln!(output)?;
    } else {
        write_text(&mut output, &report)?;
    }
    output.flush()?;
    Ok(())
}

fn inspect(args: &InspectArgs, extractor: &dyn TextExtractor) -> Result<InspectReport> {
    let document = describe(&args.pdf)
        .with_context(|| format!("failed to read {}", args.pdf.display()))?;

    let table = KeywordTable::load_or_builtin(args.labels_file.as_deref())?;
    let classifier = Classifier::new(
        table,
        ClassifierConfig {
            fallback: args.fallback,
            scoring: args.scoring,
        },
    );
    let normalizer = HeaderNormalizer::new(NormalizerConfig::default())?;

    let extracted = extractor.extract(&document.path, args.max_pages);
    let text = extracted.as_ref().map(|text| text.joined()).unwrap_or_default();
    let header = normalizer.normalize(&text);
    let skipped = skipped_lines(&normalizer, &text, header.as_deref());
    let result = classifier.classify(header.as_deref());

    Ok(InspectReport {
        path: document.path.display().to_string(),
        size: document.size,
        content_hash: document.fingerprint.clone(),
        method: extracted.as_ref().map(|text| text.method.as_str()),
        skipped,
        file_name: file_name_for(&result.label, header.as_deref(), &document.path),
        header,
        label: result.label.to_string(),
        folder: result.label.folder_name().to_string(),
        matched: result.matched,
        score: result.score,
        candidates: result.candidates,
    })
}

/// Lines dropped before the header was found, with the rule that dropped them.
fn skipped_lines(normalizer: &HeaderNormalizer, text: &str, header: Option<&str>) -> Vec<SkippedLine> {
    text.lines()
        .map(collapse_whitespace)
        .filter(|line| !line.is_empty())
        .take_while(|line| Some(line.as_str()) != header)
        .map(|line| SkippedLine {
            reason: normalizer.noise_reason(&line).unwrap_or("length"),
            line,
        })
        .collect()
}

fn write_text(output: &mut impl Write, report: &InspectReport) -> Result<()> {
    writeln!(output, "File: {}", report.path)?;
    writeln!(output, "Size: {} bytes", report.size)?;
    writeln!(output, "Hash: {}", report.content_hash)?;
    writeln!(output, "Method: {}", report.method.unwrap_or("none (blank or image)"))?;
    for skipped in &report.skipped {
        writeln!(output, "Skipped [{}]: {}", skipped.reason, skipped.line)?;
    }
    writeln!(output, "Header: {}", report.header.as_deref().unwrap_or("(none)"))?;
    writeln!(output, "Label: {} (folder {})", report.label, report.folder)?;
    match &report.matched {
        Some(matched) => writeln!(output, "Rule: {} -> {}", matched.pattern, matched.label)?,
        None => writeln!(output, "Rule: (none)")?,
    }
    if report.candidates.len() > 1 {
        let candidates = report
            .candidates
            .iter()
            .map(|candidate| format!("{}={}", candidate.label, candidate.score))
            .collect::<Vec<String>>()
            .join(", ");
        writeln!(output, "Candidates: {candidates}")?;
    }
    writeln!(output, "File name: {}", report.file_name)?;
    Ok(())
}

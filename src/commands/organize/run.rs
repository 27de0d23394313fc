use super::*;

pub fn run(args: OrganizeArgs) -> Result<()> {
    run_with_extractor(args, &PdfTextExtractor)
}

pub(super) fn run_with_extractor(args: OrganizeArgs, extractor: &dyn TextExtractor) -> Result<()> {
    let started_ts = Utc::now();
    let started_at = now_utc_string();
    let run_id = format!("run-{}", utc_compact_string(started_ts));

    let table = KeywordTable::load_or_builtin(args.labels_file.as_deref())?;
    let keyword_table_version = table.version;
    info!(
        version = table.version,
        rules = table.rules().len(),
        labels = table.labels().len(),
        "keyword table loaded"
    );
    let classifier = Classifier::new(
        table,
        ClassifierConfig {
            fallback: args.fallback,
            scoring: args.scoring,
        },
    );
    let normalizer = HeaderNormalizer::new(NormalizerConfig::default())?;
    let analyzer = Analyzer::new(extractor, &normalizer, &classifier, args.max_pages);

    info!(
        source = %args.source.display(),
        dest = %args.dest.display(),
        run_id = %run_id,
        mode = args.mode.as_str(),
        dry_run = args.dry_run,
        "starting organize"
    );

    let plan = build_plan(&args.source, &args.dest, &analyzer, args.header_groups)?;
    info!(
        discovered = plan.discovered,
        to_place = plan.documents.len(),
        duplicates = plan.duplicates.len(),
        already_present = plan.already_present.len(),
        "plan ready"
    );
    log_preview(&plan);

    if plan.is_empty() {
        info!("nothing to do");
        return Ok(());
    }

    let prompt = format!(
        "Place {} file(s) under {} ({})?",
        plan.documents.len(),
        args.dest.display(),
        args.mode.as_str()
    );
    if !plan.documents.is_empty() && !confirm(args.yes, args.dry_run, &prompt)? {
        return Ok(());
    }

    if !args.dry_run {
        std::fs::create_dir_all(&args.dest).map_err(|source| SortError::Destination {
            path: args.dest.clone(),
            source,
        })?;
    }

    let mut materializer = Materializer::new(args.mode, args.dry_run);
    let outcome = apply_plan(
        plan,
        &mut materializer,
        &args.dest,
        args.alphabetical.as_deref(),
    )?;

    if !args.dry_run {
        let manifest_path = args
            .manifest
            .clone()
            .unwrap_or_else(|| args.dest.join(MANIFEST_FILE_NAME));
        append_rows(&manifest_path, &outcome.rows)?;
        info!(path = %manifest_path.display(), rows = outcome.rows.len(), "manifest updated");
    }

    log_summary(&outcome.summary, args.dry_run);

    if let Some(report_path) = args.report.as_deref() {
        let report = OrganizeRunReport {
            report_version: REPORT_VERSION,
            run_id,
            started_at,
            finished_at: now_utc_string(),
            source: args.source.display().to_string(),
            dest: args.dest.display().to_string(),
            mode: args.mode.as_str().to_string(),
            scoring: args.scoring.as_str().to_string(),
            dry_run: args.dry_run,
            keyword_table_version,
            summary: outcome.summary,
            records: outcome.records,
        };
        write_json_pretty(report_path, &report)?;
        info!(path = %report_path.display(), "wrote run report");
    }

    Ok(())
}

fn log_summary(summary: &RunSummary, dry_run: bool) {
    for (folder, count) in &summary.per_label {
        info!(folder = %folder, count, "label total");
    }
    info!(
        dry_run,
        discovered = summary.discovered,
        placed = summary.placed,
        planned = summary.planned,
        duplicates_suppressed = summary.duplicates_suppressed,
        already_present = summary.already_present,
        unclassified = summary.unclassified,
        blank_or_image = summary.blank_or_image,
        ambiguous = summary.ambiguous,
        header_groups = summary.header_groups,
        errors = summary.errors.len(),
        "organize complete"
    );
    for error in &summary.errors {
        warn!(path = %error.path, error = %error.message, "file not processed");
    }
}

use super::*;

#[derive(Debug, Default)]
pub(super) struct OrganizeOutcome {
    pub records: Vec<DestinationRecord>,
    pub rows: Vec<ManifestRow>,
    pub summary: RunSummary,
}

/// Places every planned document, mirrors it into the alphabetical view and
/// collects manifest rows. Per-file failures are recorded and skipped; a
/// fatal one ends the run.
pub(super) fn apply_plan(
    plan: OrganizePlan,
    materializer: &mut Materializer,
    dest: &Path,
    alphabetical: Option<&Path>,
) -> Result<OrganizeOutcome> {
    let mut outcome = OrganizeOutcome::default();
    let summary = &mut outcome.summary;
    summary.discovered = plan.discovered;
    summary.duplicates_suppressed = plan.duplicates.len();
    summary.already_present = plan.already_present.len();
    summary.header_groups = plan.header_groups.len();
    summary.errors = plan.errors;

    let mut alphabetical_index = alphabetical.map(FingerprintIndex::scan);

    for analyzed in &plan.documents {
        let label = analyzed.label();
        let file_name = file_name_for(label, analyzed.header.as_deref(), &analyzed.document.path);
        let folder = dest.join(label.folder_name());

        let placed = match materializer.place(&analyzed.document.path, &folder, &file_name) {
            Ok(placed) => placed,
            Err(err) => {
                warn!(path = %analyzed.document.path.display(), error = %err, "could not place file");
                outcome.summary.absorb(&analyzed.document.path, err)?;
                outcome
                    .rows
                    .push(ManifestRow::for_analyzed(analyzed, &file_name, Disposition::Failed));
                continue;
            }
        };
        let final_filename = file_name_string(&placed);

        let alphabetical_path = match (alphabetical, alphabetical_index.as_mut()) {
            (Some(out), Some(index)) => mirror_into(
                materializer,
                index,
                analyzed,
                &placed,
                out,
                &final_filename,
                &mut outcome.summary,
            )?,
            _ => None,
        };

        let disposition = if materializer.is_dry_run() {
            Disposition::Planned
        } else {
            Disposition::Placed
        };
        tally(&mut outcome.summary, analyzed, disposition);

        outcome
            .rows
            .push(ManifestRow::for_analyzed(analyzed, &final_filename, disposition));
        outcome.records.push(DestinationRecord {
            source: analyzed.document.path.clone(),
            label: label.clone(),
            final_filename,
            label_path: Some(placed),
            alphabetical_path,
            disposition,
        });
    }

    for skipped in &plan.duplicates {
        outcome.rows.push(ManifestRow::for_skipped(
            &skipped.document,
            &skipped.kept,
            Disposition::Duplicate,
        ));
    }
    for skipped in &plan.already_present {
        outcome.rows.push(ManifestRow::for_skipped(
            &skipped.document,
            &skipped.kept,
            Disposition::AlreadyPresent,
        ));
    }

    Ok(outcome)
}

fn mirror_into(
    materializer: &mut Materializer,
    index: &mut FingerprintIndex,
    analyzed: &AnalyzedDocument,
    placed: &Path,
    out: &Path,
    file_name: &str,
    summary: &mut RunSummary,
) -> SortResult<Option<PathBuf>> {
    let fingerprint = &analyzed.document.fingerprint;
    if let Some(existing) = index.get(fingerprint) {
        return Ok(Some(existing.to_path_buf()));
    }

    match materializer.mirror(placed, out, file_name) {
        Ok(mirrored) => {
            index.insert(fingerprint.clone(), mirrored.clone());
            Ok(Some(mirrored))
        }
        Err(err) => {
            warn!(path = %placed.display(), error = %err, "could not add to alphabetical view");
            summary.absorb(placed, err)?;
            Ok(None)
        }
    }
}

fn tally(summary: &mut RunSummary, analyzed: &AnalyzedDocument, disposition: Disposition) {
    match disposition {
        Disposition::Planned => summary.planned += 1,
        _ => summary.placed += 1,
    }
    if analyzed.label().is_unclassified() {
        summary.unclassified += 1;
    }
    if analyzed.blank_or_image() {
        summary.blank_or_image += 1;
    }
    if analyzed.classification.is_ambiguous() {
        summary.ambiguous += 1;
    }
    *summary
        .per_label
        .entry(analyzed.label().folder_name().to_string())
        .or_default() += 1;
}

//! End-of-run summary rendering.

use std::fmt::Write as _;

use super::stats::RunStatistics;

/// Renders statistics as indented JSON.
///
/// # Errors
///
/// Returns the serialisation error, which only occurs on a broken writer.
pub fn render_json(stats: &RunStatistics) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(stats)
}

/// Renders statistics for a terminal, failures listed last.
#[must_use]
pub fn render_human(stats: &RunStatistics, dry_run: bool) -> String {
    let mut out = String::new();
    let title = if dry_run {
        "Hansard ingestion summary (dry run, nothing written)"
    } else {
        "Hansard ingestion summary"
    };
    let _ = writeln!(out, "{title}");
    let _ = writeln!(out, "{}", "=".repeat(title.len()));

    let _ = writeln!(out, "Discovery");
    row(&mut out, "documents discovered", stats.documents_discovered);
    row(&mut out, "filtered by date", stats.filtered_by_date);

    let _ = writeln!(out, "Downloads");
    row(&mut out, "downloaded", stats.downloaded);
    row(&mut out, "re-downloaded", stats.redownloaded);
    row(&mut out, "pre-existing", stats.pre_existing);
    row(&mut out, "already present", stats.already_present);
    row(&mut out, "failed", stats.download_failed);

    let _ = writeln!(out, "Processing");
    row(&mut out, "documents processed", stats.documents_processed);
    row(&mut out, "no extractable text", stats.documents_no_text);
    row(&mut out, "errors", stats.processing_errors);
    row(&mut out, "statements inserted", stats.statements_inserted);
    row(&mut out, "duplicates skipped", stats.statements_duplicate_skipped);
    row(&mut out, "attributed (exact)", stats.statements_exact);
    row(&mut out, "attributed (fuzzy)", stats.statements_fuzzy);
    row(&mut out, "unattributed", stats.statements_unattributed);
    row(&mut out, "MPs identified", stats.mps_identified);

    if stats.failures.is_empty() {
        let _ = writeln!(out, "No failures.");
    } else {
        let _ = writeln!(out, "Failures ({})", stats.failures.len());
        for failure in &stats.failures {
            let _ = writeln!(out, "  - {}: {}", failure.source, failure.reason);
        }
    }
    out
}

fn row(out: &mut String, label: &str, value: u64) {
    let _ = writeln!(out, "  {label:<24}{value:>8}");
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::pipeline::stats::Failure;

    #[test]
    fn test_human_summary_lists_failures() {
        let stats = RunStatistics {
            downloaded: 2,
            statements_unattributed: 5,
            failures: vec![Failure {
                source: "http://x/b.pdf".to_string(),
                reason: "HTTP 404".to_string(),
            }],
            ..RunStatistics::default()
        };

        let text = render_human(&stats, false);
        assert!(text.contains("downloaded"));
        assert!(text.contains("unattributed"));
        assert!(text.contains("Failures (1)"));
        assert!(text.contains("http://x/b.pdf: HTTP 404"));
        assert!(render_human(&RunStatistics::default(), true).contains("dry run"));
    }

    #[test]
    fn test_json_summary_has_every_counter() {
        let json = render_json(&RunStatistics::default()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        for key in [
            "documents_discovered",
            "filtered_by_date",
            "downloaded",
            "redownloaded",
            "pre_existing",
            "already_present",
            "download_failed",
            "documents_processed",
            "processing_errors",
            "statements_inserted",
            "statements_duplicate_skipped",
            "statements_exact",
            "statements_fuzzy",
            "statements_unattributed",
            "documents_no_text",
            "mps_identified",
            "failures",
        ] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
    }
}

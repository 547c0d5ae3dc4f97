//! Output formatting for the CLI.

use crate::config::OutputFormat;
use crate::error::Result;
use colored::*;
use driftwatch_domain::{IndexUpdateReport, Verdict, VerificationResult};
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Modify, Style},
};

/// Longest reasoning shown in a table cell
const REASONING_WIDTH: usize = 72;

/// Output formatter.
pub struct Formatter {
    format: OutputFormat,
    color_enabled: bool,
}

impl Formatter {
    /// Create a new formatter.
    pub fn new(format: OutputFormat, color_enabled: bool) -> Self {
        Self {
            format,
            color_enabled,
        }
    }

    /// Format verification results.
    pub fn format_results(&self, results: &[VerificationResult]) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(results)?),
            OutputFormat::Table => Ok(self.format_results_table(results)),
            OutputFormat::Quiet => Ok(results
                .iter()
                .map(|r| format!("{} {}", r.claim_id, r.verdict.as_str()))
                .collect::<Vec<_>>()
                .join("\n")),
        }
    }

    fn format_results_table(&self, results: &[VerificationResult]) -> String {
        if results.is_empty() {
            return self.colorize("No results found.", "yellow");
        }

        let mut builder = Builder::default();
        builder.push_record(["Claim", "Verdict", "Tier", "Confidence", "Severity", "Reasoning"]);

        for result in results {
            let claim = result.claim_id.to_string();
            builder.push_record([
                claim[..8].to_string(), // Truncate ID for readability
                self.verdict(result.verdict),
                result.tier.number().to_string(),
                format!("{:.2}", result.confidence),
                result.severity.map(|s| s.as_str().to_string()).unwrap_or_default(),
                truncate(&result.reasoning, REASONING_WIDTH),
            ]);
        }

        let mut table = builder.build();
        table
            .with(Style::rounded())
            .with(Modify::new(Rows::first()).with(Alignment::center()));
        table.to_string()
    }

    /// Format a single result with its fix, if any.
    pub fn format_result(&self, result: &VerificationResult) -> Result<String> {
        let mut out = self.format_results(std::slice::from_ref(result))?;
        if matches!(self.format, OutputFormat::Table) {
            if let Some(fix) = &result.suggested_fix {
                out.push_str(&format!("\nSuggested fix: {}", fix));
            }
            if !result.evidence_files.is_empty() {
                out.push_str(&format!("\nEvidence: {}", result.evidence_files.join(", ")));
            }
        }
        Ok(out)
    }

    /// Format an index update report.
    pub fn format_report(&self, report: &IndexUpdateReport) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(report)?),
            OutputFormat::Quiet => Ok(format!(
                "{} {} {} {}",
                report.added,
                report.updated,
                report.removed,
                report.skipped.len()
            )),
            OutputFormat::Table => {
                let mut out = self.success(&format!(
                    "Index updated: {} added, {} updated, {} removed, {} skipped",
                    report.added,
                    report.updated,
                    report.removed,
                    report.skipped.len()
                ));
                let notable: Vec<_> = report
                    .skipped
                    .iter()
                    .filter(|s| !matches!(s.reason, driftwatch_domain::SkipReason::UnsupportedExtension))
                    .collect();
                if !notable.is_empty() {
                    let mut builder = Builder::default();
                    builder.push_record(["Skipped file", "Reason"]);
                    for skipped in notable {
                        builder.push_record([skipped.path.clone(), skipped.reason.to_string()]);
                    }
                    let mut table = builder.build();
                    table.with(Style::rounded());
                    out.push('\n');
                    out.push_str(&table.to_string());
                }
                Ok(out)
            }
        }
    }

    /// Format a success message.
    pub fn success(&self, message: &str) -> String {
        self.colorize(&format!("✓ {}", message), "green")
    }

    /// Format an info message.
    pub fn info(&self, message: &str) -> String {
        self.colorize(&format!("ℹ {}", message), "blue")
    }

    /// Format a warning message.
    pub fn warning(&self, message: &str) -> String {
        self.colorize(&format!("⚠ {}", message), "yellow")
    }

    fn verdict(&self, verdict: Verdict) -> String {
        let color = match verdict {
            Verdict::Verified => "green",
            Verdict::Drifted => "red",
            Verdict::Uncertain => "yellow",
        };
        self.colorize(verdict.as_str(), color)
    }

    /// Colorize text if color is enabled.
    fn colorize(&self, text: &str, color: &str) -> String {
        if !self.color_enabled {
            return text.to_string();
        }

        match color {
            "red" => text.red().to_string(),
            "green" => text.green().to_string(),
            "blue" => text.blue().to_string(),
            "yellow" => text.yellow().to_string(),
            _ => text.to_string(),
        }
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let cut: String = text.chars().take(max.saturating_sub(1)).collect();
    format!("{}…", cut)
}

#[cfg(test)]
mod tests {
    use super::*;
    use driftwatch_domain::{ClaimId, Severity, SkipReason, SkippedFile, VerificationTier};

    fn results() -> Vec<VerificationResult> {
        vec![
            VerificationResult::verified(ClaimId::new(), VerificationTier::Deterministic, 1.0, "`src/app.ts` exists")
                .with_evidence(["src/app.ts"]),
            VerificationResult::drifted(
                ClaimId::new(),
                VerificationTier::Deterministic,
                1.0,
                Severity::High,
                "Script `biuld` is not declared",
            )
            .with_fix("npm run build")
            .with_evidence(["package.json"]),
        ]
    }

    #[test]
    fn test_json_format() {
        let formatter = Formatter::new(OutputFormat::Json, false);
        let output = formatter.format_results(&results()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value.as_array().unwrap().len(), 2);
        assert!(output.contains("suggested_fix"));
    }

    #[test]
    fn test_quiet_format() {
        let formatter = Formatter::new(OutputFormat::Quiet, false);
        let output = formatter.format_results(&results()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].ends_with(" drifted"));
    }

    #[test]
    fn test_table_format() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let output = formatter.format_results(&results()).unwrap();
        assert!(output.contains("Verdict"));
        assert!(output.contains("verified"));
        assert!(output.contains("high"));
    }

    #[test]
    fn test_single_result_shows_fix() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let output = formatter.format_result(&results()[1]).unwrap();
        assert!(output.contains("Suggested fix: npm run build"));
        assert!(output.contains("Evidence: package.json"));
    }

    #[test]
    fn test_empty_results() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let output = formatter.format_results(&[]).unwrap();
        assert!(output.contains("No results found"));
    }

    #[test]
    fn test_report_lists_notable_skips() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let report = IndexUpdateReport {
            added: 3,
            skipped: vec![
                SkippedFile { path: "logo.png".into(), reason: SkipReason::UnsupportedExtension },
                SkippedFile { path: "src/broken.ts".into(), reason: SkipReason::SyntaxErrors },
            ],
            ..IndexUpdateReport::default()
        };
        let output = formatter.format_report(&report).unwrap();
        assert!(output.starts_with("✓ Index updated: 3 added"));
        assert!(output.contains("src/broken.ts"));
        assert!(!output.contains("logo.png"));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghij", 5), "abcd…");
    }
}

//! Turning a finished run into statistics and report files.

use crate::chart::{status_distribution, ChartRenderer, Histogram, PlottersRenderer, StatusSlice, HISTOGRAM_BUCKETS};
use crate::error::{DataError, Result};
use crate::i18n::{Language, Messages};
use crate::model::{Outcome, RunMetadata, RunRecord, TRANSPORT_FAILURE};
use chrono::SecondsFormat;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const REPORT_FILE: &str = "waf_test_report.txt";
pub const RESULTS_FILE: &str = "detailed_results.csv";
pub const HISTOGRAM_FILE: &str = "response_time_distribution.png";
pub const STATUS_FILE: &str = "status_distribution.png";

pub const STATUS_OK: i32 = 200;
pub const STATUS_BLOCKED: i32 = 403;

#[derive(Debug, Clone, PartialEq)]
pub struct RunStatistics {
    pub total: usize,
    pub success: usize,
    pub blocked: usize,
    pub error: usize,
    /// Responses with any other status code.
    pub other: usize,
    pub avg_latency_ms: f64,
}

impl RunStatistics {
    pub fn from_outcomes(outcomes: &[Outcome]) -> Self {
        let mut stats = Self {
            total: outcomes.len(),
            success: 0,
            blocked: 0,
            error: 0,
            other: 0,
            avg_latency_ms: 0.0,
        };

        let mut latency_sum = 0.0;
        for outcome in outcomes {
            match outcome.status {
                STATUS_OK => stats.success += 1,
                STATUS_BLOCKED => stats.blocked += 1,
                TRANSPORT_FAILURE => stats.error += 1,
                _ => stats.other += 1,
            }
            latency_sum += outcome.response_time;
        }
        if stats.total > 0 {
            stats.avg_latency_ms = latency_sum / stats.total as f64 * 1000.0;
        }
        stats
    }

    /// Share of `count` in the total, in percent.
    pub fn percent(&self, count: usize) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            count as f64 / self.total as f64 * 100.0
        }
    }
}

/// One CSV line of `detailed_results.csv`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutcomeRow {
    pub timestamp: String,
    pub status: i32,
    pub response_time: f64,
    pub params: String,
    pub headers: String,
    pub error: String,
}

impl From<&Outcome> for OutcomeRow {
    fn from(outcome: &Outcome) -> Self {
        Self {
            timestamp: outcome
                .timestamp
                .to_rfc3339_opts(SecondsFormat::Micros, false),
            status: outcome.status,
            response_time: outcome.response_time,
            params: outcome
                .params
                .as_ref()
                .map(|p| serde_json::to_string(p).unwrap_or_default())
                .unwrap_or_default(),
            headers: serde_json::to_string(&outcome.headers).unwrap_or_default(),
            error: outcome.error.clone().unwrap_or_default(),
        }
    }
}

/// Everything derived from a run, before anything touches the disk.
#[derive(Debug, Clone)]
pub struct Report {
    pub statistics: RunStatistics,
    pub text: String,
    pub rows: Vec<OutcomeRow>,
    pub histogram: Histogram,
    pub status_distribution: Vec<StatusSlice>,
}

/// Paths written by [`ReportBuilder::generate`].
#[derive(Debug, Clone)]
pub struct ReportArtifacts {
    pub statistics: RunStatistics,
    pub report: PathBuf,
    pub results: PathBuf,
    /// Charts that were rendered successfully.
    pub charts: Vec<PathBuf>,
}

pub struct ReportBuilder {
    output_dir: PathBuf,
    language: Language,
    renderer: Box<dyn ChartRenderer>,
}

impl ReportBuilder {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            language: Language::default(),
            renderer: Box::new(PlottersRenderer::new()),
        }
    }

    pub fn language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    pub fn renderer(mut self, renderer: Box<dyn ChartRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Compute statistics, the report text and chart data.
    pub fn build(&self, record: &RunRecord) -> std::result::Result<Report, DataError> {
        validate(&record.outcomes)?;

        let statistics = RunStatistics::from_outcomes(&record.outcomes);
        let text = render_text(&record.metadata, &statistics, self.language.messages());
        let rows = record.outcomes.iter().map(OutcomeRow::from).collect();
        let response_times: Vec<f64> = record.outcomes.iter().map(|o| o.response_time).collect();

        Ok(Report {
            statistics,
            text,
            rows,
            histogram: Histogram::from_values(&response_times, HISTOGRAM_BUCKETS),
            status_distribution: status_distribution(record.outcomes.iter().map(|o| o.status)),
        })
    }

    /// Build the report and write it to the output directory. Charts are
    /// best effort; nothing is written when the outcomes are unusable.
    pub fn generate(&self, record: &RunRecord) -> Result<ReportArtifacts> {
        let report = self.build(record)?;
        let messages = self.language.messages();

        fs::create_dir_all(&self.output_dir)?;

        let report_path = self.output_dir.join(REPORT_FILE);
        fs::write(&report_path, &report.text)?;

        let mut charts = Vec::with_capacity(2);
        let histogram_path = self.output_dir.join(HISTOGRAM_FILE);
        match self
            .renderer
            .render_histogram(&report.histogram, messages, &histogram_path)
        {
            Ok(()) => charts.push(histogram_path),
            Err(e) => warn!(error = %e, "skipping chart"),
        }
        let status_path = self.output_dir.join(STATUS_FILE);
        match self
            .renderer
            .render_status_pie(&report.status_distribution, messages, &status_path)
        {
            Ok(()) => charts.push(status_path),
            Err(e) => warn!(error = %e, "skipping chart"),
        }

        let results_path = self.output_dir.join(RESULTS_FILE);
        write_rows(&results_path, &report.rows)?;

        info!(
            dir = %self.output_dir.display(),
            total = report.statistics.total,
            charts = charts.len(),
            "report written"
        );

        Ok(ReportArtifacts {
            statistics: report.statistics,
            report: report_path,
            results: results_path,
            charts,
        })
    }
}

fn validate(outcomes: &[Outcome]) -> std::result::Result<(), DataError> {
    if outcomes.is_empty() {
        return Err(DataError::Empty);
    }
    for (index, outcome) in outcomes.iter().enumerate() {
        if outcome.status != TRANSPORT_FAILURE && !(100..=999).contains(&outcome.status) {
            return Err(DataError::Malformed {
                index,
                field: "status",
            });
        }
        if !outcome.response_time.is_finite() || outcome.response_time < 0.0 {
            return Err(DataError::Malformed {
                index,
                field: "response_time",
            });
        }
    }
    Ok(())
}

fn render_text(meta: &RunMetadata, stats: &RunStatistics, t: &Messages) -> String {
    let c = t.colon;
    let mut out = format!(
        "\n{title}\n{underline}\n\
         {test_time}{c}{started}\n\
         {duration}{c}{secs}{seconds}\n\
         {threads}{c}{thread_count}\n\
         \n\
         {statistics}{header_colon}\n\
         - {total_requests}{c}{total}\n",
        title = t.report_title,
        underline = "=".repeat(t.report_title.chars().count()),
        test_time = t.test_time,
        started = meta.started_at.format("%Y-%m-%d %H:%M:%S"),
        duration = t.duration,
        secs = meta.duration_secs,
        seconds = t.seconds,
        threads = t.threads,
        thread_count = meta.threads,
        statistics = t.statistics,
        header_colon = c.trim_end(),
        total_requests = t.total_requests,
        total = stats.total,
    );
    for (label, count) in [
        (t.successful_requests, stats.success),
        (t.blocked_requests, stats.blocked),
        (t.error_requests, stats.error),
        (t.other_requests, stats.other),
    ] {
        out.push_str(&format!("- {label}{c}{count} ({:.2}%)\n", stats.percent(count)));
    }
    out.push_str(&format!("- {}{c}{:.2}ms\n", t.avg_response_time, stats.avg_latency_ms));

    out
}

fn write_rows(path: &Path, rows: &[OutcomeRow]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, RenderError};
    use crate::model::{HeaderSet, ParamSet};
    use chrono::{Local, TimeZone};
    use std::time::Duration;

    fn metadata() -> RunMetadata {
        let started_at = Local.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
        RunMetadata {
            started_at,
            finished_at: started_at + chrono::Duration::seconds(10),
            duration_secs: 10,
            threads: 5,
        }
    }

    fn outcome(status: i32, millis: u64) -> Outcome {
        let elapsed = Duration::from_millis(millis);
        if status == TRANSPORT_FAILURE {
            Outcome::failure("connection reset", elapsed, None, HeaderSet::new())
        } else {
            Outcome::response(status as u16, elapsed, None, HeaderSet::new())
        }
    }

    fn record(outcomes: Vec<Outcome>) -> RunRecord {
        RunRecord {
            metadata: metadata(),
            outcomes,
        }
    }

    struct FailingRenderer;

    impl ChartRenderer for FailingRenderer {
        fn render_histogram(&self, _: &Histogram, _: &Messages, _: &Path) -> std::result::Result<(), RenderError> {
            Err(RenderError::new("histogram", "no backend"))
        }

        fn render_status_pie(&self, _: &[StatusSlice], _: &Messages, _: &Path) -> std::result::Result<(), RenderError> {
            Err(RenderError::new("pie", "no backend"))
        }
    }

    #[test]
    fn test_statistics_cycle() {
        let outcomes: Vec<Outcome> = (0..30)
            .map(|i| outcome([200, 403, TRANSPORT_FAILURE][i % 3], 10))
            .collect();
        let stats = RunStatistics::from_outcomes(&outcomes);
        assert_eq!(stats.total, 30);
        assert_eq!(stats.success, 10);
        assert_eq!(stats.blocked, 10);
        assert_eq!(stats.error, 10);
        assert_eq!(stats.other, 0);
        assert!((stats.avg_latency_ms - 10.0).abs() < 1e-6);

        let report = ReportBuilder::new(".").build(&record(outcomes)).unwrap();
        assert!(report.text.contains("- Total Requests: 30\n"));
        assert!(report.text.contains("- Successful Requests: 10 (33.33%)\n"));
        assert!(report.text.contains("- Blocked Requests: 10 (33.33%)\n"));
        assert!(report.text.contains("- Error Requests: 10 (33.33%)\n"));
        assert!(report.text.contains("- Average Response Time: 10.00ms\n"));
    }

    #[test]
    fn test_counts_add_up() {
        let outcomes: Vec<Outcome> = [200, 200, 404, 500, 403, TRANSPORT_FAILURE, 302]
            .into_iter()
            .map(|s| outcome(s, 5))
            .collect();
        let stats = RunStatistics::from_outcomes(&outcomes);
        assert_eq!(stats.total, stats.success + stats.blocked + stats.error + stats.other);
        assert_eq!(stats.other, 3);

        let sum: f64 = [stats.success, stats.blocked, stats.error, stats.other]
            .into_iter()
            .map(|c| stats.percent(c))
            .sum();
        assert!((sum - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_report_text_template() {
        let builder = ReportBuilder::new(".");
        let report = builder.build(&record(vec![outcome(200, 20), outcome(403, 40)])).unwrap();
        let expected = "\nWAF Test Report\n===============\nTest Time: 2024-05-01 12:30:00\nDuration: 10 seconds\nConcurrent Threads: 5\n\nStatistics Summary:\n- Total Requests: 2\n- Successful Requests: 1 (50.00%)\n- Blocked Requests: 1 (50.00%)\n- Error Requests: 0 (0.00%)\n- Other Responses: 0 (0.00%)\n- Average Response Time: 30.00ms\n";
        assert_eq!(report.text, expected);
    }

    #[test]
    fn test_report_text_zh_tw() {
        let builder = ReportBuilder::new(".").language(Language::ZhTw);
        let report = builder.build(&record(vec![outcome(200, 10)])).unwrap();
        assert!(report.text.starts_with("\nWAF測試報告\n=======\n"));
        assert!(report.text.contains("持續時間：10秒\n"));
        assert!(report.text.contains("- 成功請求：1 (100.00%)\n"));
    }

    #[test]
    fn test_build_is_deterministic() {
        let builder = ReportBuilder::new(".");
        let record = record(vec![outcome(200, 12), outcome(TRANSPORT_FAILURE, 30_000), outcome(503, 7)]);
        let first = builder.build(&record).unwrap();
        let second = builder.build(&record).unwrap();
        assert_eq!(first.text, second.text);
        assert_eq!(first.rows, second.rows);
    }

    #[test]
    fn test_empty_outcomes_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let builder = ReportBuilder::new(dir.path()).renderer(Box::new(FailingRenderer));
        let result = builder.generate(&record(Vec::new()));
        assert!(matches!(result, Err(Error::Data(DataError::Empty))));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_malformed_outcome_rejected() {
        let mut bad = outcome(200, 10);
        bad.response_time = f64::NAN;
        let result = ReportBuilder::new(".").build(&record(vec![outcome(200, 10), bad]));
        assert_eq!(
            result.unwrap_err(),
            DataError::Malformed {
                index: 1,
                field: "response_time"
            }
        );

        let mut bad = outcome(200, 10);
        bad.status = 42;
        let result = ReportBuilder::new(".").build(&record(vec![bad]));
        assert_eq!(
            result.unwrap_err(),
            DataError::Malformed {
                index: 0,
                field: "status"
            }
        );
    }

    #[test]
    fn test_rows() {
        let params = ParamSet::from([("q".to_string(), "<script>".to_string())]);
        let headers = HeaderSet::from([("User-Agent".to_string(), "WAF-Tester/1.0".to_string())]);
        let ok = Outcome::response(403, Duration::from_millis(15), Some(params), headers.clone());
        let failed = Outcome::failure("timed out", Duration::from_secs(30), None, headers);

        let row = OutcomeRow::from(&ok);
        assert_eq!(row.status, 403);
        assert_eq!(row.params, r#"{"q":"<script>"}"#);
        assert_eq!(row.headers, r#"{"User-Agent":"WAF-Tester/1.0"}"#);
        assert_eq!(row.error, "");

        let row = OutcomeRow::from(&failed);
        assert_eq!(row.status, TRANSPORT_FAILURE);
        assert_eq!(row.params, "");
        assert_eq!(row.error, "timed out");
    }

    #[test]
    fn test_generate_survives_chart_failure() {
        let dir = tempfile::tempdir().unwrap();
        let builder = ReportBuilder::new(dir.path()).renderer(Box::new(FailingRenderer));
        let outcomes = vec![outcome(200, 10), outcome(403, 20), outcome(TRANSPORT_FAILURE, 30)];

        let artifacts = builder.generate(&record(outcomes)).unwrap();
        assert!(artifacts.charts.is_empty());
        assert_eq!(artifacts.statistics.total, 3);
        assert!(artifacts.report.exists());
        assert!(!dir.path().join(HISTOGRAM_FILE).exists());

        let csv = fs::read_to_string(&artifacts.results).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("timestamp,status,response_time,params,headers,error")
        );
        assert_eq!(lines.count(), 3);
    }

    #[test]
    fn test_generate_overwrites_and_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let builder = ReportBuilder::new(dir.path()).renderer(Box::new(FailingRenderer));
        let record = record(vec![outcome(200, 10), outcome(200, 11)]);

        let first = builder.generate(&record).unwrap();
        let first_text = fs::read(&first.report).unwrap();
        let second = builder.generate(&record).unwrap();
        let second_text = fs::read(&second.report).unwrap();
        assert_eq!(first_text, second_text);
    }

    #[test]
    fn test_generate_with_charts() {
        let dir = tempfile::tempdir().unwrap();
        let builder = ReportBuilder::new(dir.path()).renderer(Box::new(PlottersRenderer::without_text()));
        let artifacts = builder
            .generate(&record(vec![outcome(200, 10), outcome(403, 25), outcome(200, 12)]))
            .unwrap();
        assert_eq!(artifacts.charts.len(), 2);
        assert!(dir.path().join(HISTOGRAM_FILE).exists());
        assert!(dir.path().join(STATUS_FILE).exists());
    }
}

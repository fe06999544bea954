use playlog_telemetry::{read_jsonl, Paths, RunRecord};

const RECENT_RUNS: usize = 20;

fn compute_stats(runs: &[RunRecord]) -> String {
    if runs.is_empty() {
        return "No runs to analyze.".to_string();
    }
    let total = runs.len();
    let saved: usize = runs.iter().map(|r| r.succeeded).sum();
    let unchanged: usize = runs.iter().map(|r| r.unchanged).sum();
    let no_data: usize = runs.iter().map(|r| r.no_data).sum();
    let failed: usize = runs.iter().map(|r| r.failed).sum();
    let rows: usize = runs.iter().map(|r| r.rows_written).sum();
    let avg_ms = runs
        .iter()
        .map(|r| r.duration().num_milliseconds())
        .sum::<i64>()
        / total as i64;

    format!(
        "Total runs: {}\n\
         Saved batches: {}\n\
         Unchanged: {}\n\
         No data: {}\n\
         Failed: {}\n\
         Rows written: {}\n\
         Avg cycle: {} ms",
        total, saved, unchanged, no_data, failed, rows, avg_ms
    )
}

fn format_run(run: &RunRecord) -> String {
    format!(
        "  {} | subjects:{} saved:{} unchanged:{} no_data:{} failed:{} rows:{}",
        run.started_at.format("%Y-%m-%d %H:%M"),
        run.subjects,
        run.succeeded,
        run.unchanged,
        run.no_data,
        run.failed,
        run.rows_written,
    )
}

pub fn run(stats: bool) -> anyhow::Result<()> {
    let paths = Paths::new()?;
    let runs: Vec<RunRecord> = read_jsonl(&paths.runs_file())?;

    if runs.is_empty() {
        println!("No collection history");
        return Ok(());
    }

    if stats {
        println!("{}", compute_stats(&runs));
        return Ok(());
    }

    let recent: Vec<_> = runs.iter().rev().take(RECENT_RUNS).collect();
    println!("Recent Runs (last {})", recent.len());
    println!("=====================");
    for run in recent {
        println!("{}", format_run(run));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn sample_runs() -> Vec<RunRecord> {
        let t0 = Utc.with_ymd_and_hms(2025, 5, 5, 9, 0, 0).unwrap();
        vec![
            RunRecord {
                run_id: "run-1".to_string(),
                started_at: t0,
                finished_at: t0 + chrono::Duration::milliseconds(400),
                subjects: 3,
                succeeded: 2,
                failed: 1,
                unchanged: 0,
                no_data: 0,
                rows_written: 120,
                failed_subjects: vec!["b".to_string()],
            },
            RunRecord {
                run_id: "run-2".to_string(),
                started_at: t0 + chrono::Duration::minutes(1),
                finished_at: t0 + chrono::Duration::minutes(1) + chrono::Duration::milliseconds(200),
                subjects: 3,
                succeeded: 0,
                failed: 0,
                unchanged: 2,
                no_data: 1,
                rows_written: 0,
                failed_subjects: vec![],
            },
        ]
    }

    #[test]
    fn test_stats_mode() {
        let stats = compute_stats(&sample_runs());
        assert!(stats.contains("Total runs: 2"));
        assert!(stats.contains("Rows written: 120"));
        assert!(stats.contains("Avg cycle: 300 ms"));
    }

    #[test]
    fn test_empty_stats() {
        assert_eq!(compute_stats(&[]), "No runs to analyze.");
    }

    #[test]
    fn test_format_run() {
        let line = format_run(&sample_runs()[1]);
        assert_eq!(
            line,
            "  2025-05-05 09:01 | subjects:3 saved:0 unchanged:2 no_data:1 failed:0 rows:0"
        );
    }

    #[test]
    fn test_old_records_without_new_fields_parse() {
        let line = r#"{"run_id":"r","started_at":"2025-01-01T00:00:00Z","finished_at":"2025-01-01T00:00:01Z","subjects":1,"succeeded":1,"failed":0}"#;
        let run: RunRecord = serde_json::from_str(line).unwrap();
        assert_eq!(run.unchanged, 0);
        assert!(run.failed_subjects.is_empty());
    }
}

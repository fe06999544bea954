//! Collection run records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of one polling cycle, one line in runs.jsonl
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub subjects: usize,
    pub succeeded: usize,
    pub failed: usize,
    #[serde(default)]
    pub unchanged: usize,
    #[serde(default)]
    pub no_data: usize,
    #[serde(default)]
    pub rows_written: usize,
    #[serde(default)]
    pub failed_subjects: Vec<String>,
}

impl RunRecord {
    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_record_roundtrip() {
        let now = Utc::now();
        let record = RunRecord {
            run_id: "20250101T000000".to_string(),
            started_at: now,
            finished_at: now + chrono::Duration::seconds(3),
            subjects: 4,
            succeeded: 3,
            failed: 1,
            unchanged: 1,
            no_data: 0,
            rows_written: 12,
            failed_subjects: vec!["76561198000000009".to_string()],
        };

        let json = serde_json::to_string(&record).unwrap();
        let parsed: RunRecord = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.run_id, record.run_id);
        assert_eq!(parsed.failed_subjects, record.failed_subjects);
        assert_eq!(parsed.duration().num_seconds(), 3);
    }

    #[test]
    fn test_run_record_backwards_compatible() {
        let old_json = r#"{"run_id":"r1","started_at":"2025-01-01T00:00:00Z","finished_at":"2025-01-01T00:00:02Z","subjects":2,"succeeded":2,"failed":0}"#;
        let parsed: RunRecord = serde_json::from_str(old_json).unwrap();
        assert_eq!(parsed.unchanged, 0);
        assert_eq!(parsed.rows_written, 0);
        assert!(parsed.failed_subjects.is_empty());
    }
}

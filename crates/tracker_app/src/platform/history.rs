use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracker_core::{FeatureKind, Phase};
use tracker_engine::{ensure_state_dir, write_atomically};
use tracker_logging::{tracker_error, tracker_info, tracker_warn};

const HISTORY_FILENAME: &str = ".tracker_history.ron";
const MAX_ENTRIES: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Completed { artifact_url: String },
    Failed { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub feature: String,
    pub job_id: Option<String>,
    pub outcome: Outcome,
    pub finished_utc: DateTime<Utc>,
}

impl HistoryEntry {
    /// Builds an entry for a terminal phase; `None` for anything else.
    pub fn from_phase(
        feature: FeatureKind,
        job_id: Option<&str>,
        phase: &Phase,
        finished_utc: DateTime<Utc>,
    ) -> Option<Self> {
        let outcome = match phase {
            Phase::Completed { artifact_url } => Outcome::Completed {
                artifact_url: artifact_url.clone(),
            },
            Phase::Failed { message } => Outcome::Failed {
                message: message.clone(),
            },
            _ => return None,
        };
        Some(Self {
            feature: feature.slug().to_string(),
            job_id: job_id.map(str::to_string),
            outcome,
            finished_utc,
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct PersistedHistory {
    entries: Vec<HistoryEntry>,
}

pub(crate) fn load_history(dir: &Path) -> Vec<HistoryEntry> {
    let path = dir.join(HISTORY_FILENAME);
    let content = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Vec::new();
        }
        Err(err) => {
            tracker_warn!("Failed to read job history from {:?}: {}", path, err);
            return Vec::new();
        }
    };

    match ron::from_str::<PersistedHistory>(&content) {
        Ok(history) => {
            tracker_info!("Loaded {} history entries from {:?}", history.entries.len(), path);
            history.entries
        }
        Err(err) => {
            tracker_warn!("Failed to parse job history from {:?}: {}", path, err);
            Vec::new()
        }
    }
}

/// Appends `entry`, keeping only the newest entries.
pub(crate) fn append_history(dir: &Path, entry: HistoryEntry) {
    if let Err(err) = ensure_state_dir(dir) {
        tracker_error!("Failed to ensure history dir {:?}: {}", dir, err);
        return;
    }

    let mut entries = load_history(dir);
    entries.push(entry);
    if entries.len() > MAX_ENTRIES {
        let excess = entries.len() - MAX_ENTRIES;
        entries.drain(..excess);
    }

    let pretty = ron::ser::PrettyConfig::new();
    let content = match ron::ser::to_string_pretty(&PersistedHistory { entries }, pretty) {
        Ok(text) => text,
        Err(err) => {
            tracker_error!("Failed to serialize job history: {}", err);
            return;
        }
    };

    if let Err(err) = write_atomically(dir, HISTORY_FILENAME, &content) {
        tracker_error!("Failed to write job history to {:?}: {}", dir, err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).single().unwrap()
    }

    fn completed(n: i64) -> HistoryEntry {
        HistoryEntry::from_phase(
            FeatureKind::TopicShort,
            Some(format!("job-{n}").as_str()),
            &Phase::Completed {
                artifact_url: format!("https://x/{n}.mp4"),
            },
            at(n),
        )
        .unwrap()
    }

    #[test]
    fn only_terminal_phases_make_entries() {
        assert!(HistoryEntry::from_phase(FeatureKind::MapTour, Some("t"), &Phase::Processing, at(0))
            .is_none());
        let failed = HistoryEntry::from_phase(
            FeatureKind::MapTour,
            None,
            &Phase::Failed {
                message: "render timeout".to_string(),
            },
            at(5),
        )
        .unwrap();
        assert_eq!(failed.feature, "map-tour");
        assert_eq!(
            failed.outcome,
            Outcome::Failed {
                message: "render timeout".to_string()
            }
        );
    }

    #[test]
    fn missing_file_is_empty_history() {
        let temp = TempDir::new().unwrap();
        assert!(load_history(temp.path()).is_empty());
    }

    #[test]
    fn appended_entries_load_back_in_order() {
        let temp = TempDir::new().unwrap();
        append_history(temp.path(), completed(1));
        append_history(temp.path(), completed(2));

        assert_eq!(load_history(temp.path()), vec![completed(1), completed(2)]);
    }

    #[test]
    fn history_keeps_newest_entries() {
        let temp = TempDir::new().unwrap();
        for n in 0..(MAX_ENTRIES as i64 + 3) {
            append_history(temp.path(), completed(n));
        }
        let entries = load_history(temp.path());
        assert_eq!(entries.len(), MAX_ENTRIES);
        assert_eq!(entries.first(), Some(&completed(3)));
    }

    #[test]
    fn corrupt_file_is_ignored() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(HISTORY_FILENAME), "not ron at all (").unwrap();
        assert!(load_history(temp.path()).is_empty());
    }
}

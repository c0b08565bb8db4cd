use std::fmt;
use std::time::Duration;

/// Product features that start long-running jobs on a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FeatureKind {
    Documentary,
    TopicShort,
    PyqExplanation,
    PalaceAnimation,
    MapTour,
}

impl FeatureKind {
    pub const ALL: [FeatureKind; 5] = [
        FeatureKind::Documentary,
        FeatureKind::TopicShort,
        FeatureKind::PyqExplanation,
        FeatureKind::PalaceAnimation,
        FeatureKind::MapTour,
    ];

    pub fn slug(self) -> &'static str {
        match self {
            FeatureKind::Documentary => "documentary",
            FeatureKind::TopicShort => "topic-short",
            FeatureKind::PyqExplanation => "pyq-explanation",
            FeatureKind::PalaceAnimation => "palace-animation",
            FeatureKind::MapTour => "map-tour",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        let slug = slug.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.slug().eq_ignore_ascii_case(slug))
    }
}

impl fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

/// What a feature needs from the user before a job may be submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputRule {
    Topic,
    QuestionId,
    ScriptId,
    TopicWithFacts { min_facts: usize },
}

/// Per-feature tuning for polling, retries and progress presentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureConfig {
    pub kind: FeatureKind,
    pub poll_interval: Duration,
    pub max_retries: u32,
    /// Synthetic progress added per poll tick when the backend reports none.
    pub progress_step: u8,
    pub input_rule: InputRule,
    /// Ordered `(threshold_percent, label)` pairs; the last threshold reached wins.
    pub stages: Vec<(u8, &'static str)>,
}

impl FeatureConfig {
    pub fn for_kind(kind: FeatureKind) -> Self {
        match kind {
            FeatureKind::Documentary => Self {
                kind,
                poll_interval: Duration::from_secs(10),
                max_retries: 3,
                progress_step: 4,
                input_rule: InputRule::ScriptId,
                stages: vec![
                    (0, "Preparing script"),
                    (20, "Generating narration"),
                    (45, "Rendering scenes"),
                    (80, "Stitching video"),
                ],
            },
            FeatureKind::TopicShort => Self {
                kind,
                poll_interval: Duration::from_secs(5),
                max_retries: 3,
                progress_step: 7,
                input_rule: InputRule::Topic,
                stages: vec![
                    (0, "Preparing script"),
                    (30, "Generating voiceover"),
                    (60, "Rendering video"),
                ],
            },
            FeatureKind::PyqExplanation => Self {
                kind,
                poll_interval: Duration::from_secs(3),
                max_retries: 3,
                progress_step: 5,
                input_rule: InputRule::QuestionId,
                stages: vec![
                    (0, "Analysing question"),
                    (25, "Writing explanation"),
                    (55, "Rendering video"),
                ],
            },
            FeatureKind::PalaceAnimation => Self {
                kind,
                poll_interval: Duration::from_secs(5),
                max_retries: 3,
                progress_step: 6,
                input_rule: InputRule::TopicWithFacts { min_facts: 3 },
                stages: vec![
                    (0, "Building memory palace"),
                    (35, "Animating rooms"),
                    (70, "Rendering video"),
                ],
            },
            FeatureKind::MapTour => Self {
                kind,
                poll_interval: Duration::from_secs(30),
                max_retries: 3,
                progress_step: 15,
                input_rule: InputRule::Topic,
                stages: vec![
                    (0, "Plotting locations"),
                    (40, "Recording tour"),
                    (75, "Rendering video"),
                ],
            },
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugs_round_trip_for_every_feature() {
        for kind in FeatureKind::ALL {
            assert_eq!(FeatureKind::from_slug(kind.slug()), Some(kind));
        }
        assert_eq!(FeatureKind::from_slug(" Map-Tour "), Some(FeatureKind::MapTour));
        assert_eq!(FeatureKind::from_slug("essay"), None);
    }

    #[test]
    fn default_intervals_stay_within_observed_range() {
        for kind in FeatureKind::ALL {
            let config = FeatureConfig::for_kind(kind);
            assert!(config.poll_interval >= Duration::from_secs(3));
            assert!(config.poll_interval <= Duration::from_secs(30));
            assert_eq!(config.stages.first().map(|(t, _)| *t), Some(0));
        }
    }
}

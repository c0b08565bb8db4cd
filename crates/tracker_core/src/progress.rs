use crate::{FeatureConfig, Phase};

/// Ceiling for synthesized progress while the backend has not confirmed completion.
pub const SYNTHETIC_CAP: u8 = 95;
/// Ceiling for any displayed value before a terminal state is observed.
pub const NON_TERMINAL_CAP: u8 = 99;

/// Monotonic progress estimate fed by poll ticks.
///
/// Backend-reported values are used as-is (clamped to 0..=100); without them the
/// estimate grows by a fixed step per tick up to [`SYNTHETIC_CAP`]. Only
/// [`ProgressTracker::complete`] reaches 100.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressTracker {
    step: u8,
    ticks: u32,
    displayed: u8,
}

impl ProgressTracker {
    pub fn new(step: u8) -> Self {
        Self {
            step,
            ticks: 0,
            displayed: 0,
        }
    }

    pub fn reset(&mut self) {
        self.ticks = 0;
        self.displayed = 0;
    }

    pub fn tick(&mut self, backend: Option<u8>) {
        self.ticks = self.ticks.saturating_add(1);
        let candidate = match backend {
            Some(percent) => percent.min(100),
            None => {
                let synthetic = u64::from(self.ticks) * u64::from(self.step);
                synthetic.min(u64::from(SYNTHETIC_CAP)) as u8
            }
        };
        self.displayed = self.displayed.max(candidate.min(NON_TERMINAL_CAP));
    }

    pub fn complete(&mut self) {
        self.displayed = 100;
    }

    pub fn percent(&self) -> u8 {
        self.displayed
    }

    pub fn ticks(&self) -> u32 {
        self.ticks
    }
}

/// Human label for the current phase; thresholds are cosmetic.
pub fn stage_label(config: &FeatureConfig, phase: &Phase, percent: u8) -> &'static str {
    match phase {
        Phase::Idle => "Ready",
        Phase::Submitting => "Starting",
        Phase::Queued => "Waiting in queue",
        Phase::Processing => config
            .stages
            .iter()
            .rev()
            .find(|(threshold, _)| percent >= *threshold)
            .map(|(_, label)| *label)
            .unwrap_or("Processing"),
        Phase::Completed { .. } => "Completed",
        Phase::Failed { .. } => "Failed",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FeatureKind;

    #[test]
    fn synthetic_progress_stops_below_completion() {
        let mut progress = ProgressTracker::new(30);
        for _ in 0..10 {
            progress.tick(None);
        }
        assert_eq!(progress.percent(), SYNTHETIC_CAP);
        progress.complete();
        assert_eq!(progress.percent(), 100);
    }

    #[test]
    fn backend_progress_never_moves_backwards() {
        let mut progress = ProgressTracker::new(5);
        progress.tick(Some(40));
        assert_eq!(progress.percent(), 40);
        progress.tick(Some(25));
        assert_eq!(progress.percent(), 40);
        progress.tick(None);
        assert_eq!(progress.percent(), 40);
    }

    #[test]
    fn backend_hundred_is_held_back_until_terminal() {
        let mut progress = ProgressTracker::new(5);
        progress.tick(Some(100));
        assert_eq!(progress.percent(), NON_TERMINAL_CAP);
    }

    #[test]
    fn processing_label_follows_thresholds() {
        let config = FeatureConfig::for_kind(FeatureKind::TopicShort);
        assert_eq!(stage_label(&config, &Phase::Processing, 0), "Preparing script");
        assert_eq!(stage_label(&config, &Phase::Processing, 30), "Generating voiceover");
        assert_eq!(stage_label(&config, &Phase::Processing, 94), "Rendering video");
        assert_eq!(stage_label(&config, &Phase::Queued, 50), "Waiting in queue");
    }
}

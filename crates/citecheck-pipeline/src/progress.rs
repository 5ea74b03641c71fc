//! Stage and percentage events emitted while a document is processed.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Extract,
    Analyze,
    ExtractNames,
    Verify,
    Cluster,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Extract => "extract",
            Self::Analyze => "analyze",
            Self::ExtractNames => "extract_names",
            Self::Verify => "verify",
            Self::Cluster => "cluster",
        }
    }

    /// Percent range the stage covers, `[start, end)`.
    pub fn range(&self) -> (u8, u8) {
        match self {
            Self::Extract => (0, 20),
            Self::Analyze => (20, 30),
            Self::ExtractNames => (30, 40),
            Self::Verify => (40, 90),
            Self::Cluster => (90, 100),
        }
    }

    /// Percent for `done` of `total` units inside this stage.
    pub fn percent(&self, done: usize, total: usize) -> u8 {
        let (start, end) = self.range();
        if total == 0 {
            return start;
        }
        let span = (end - start) as usize;
        start + (span * done.min(total) / total) as u8
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub stage: Stage,
    pub percent: u8,
    pub message: String,
}

impl ProgressEvent {
    pub fn new(stage: Stage, percent: u8, message: impl Into<String>) -> Self {
        Self {
            stage,
            percent: percent.min(100),
            message: message.into(),
        }
    }

    /// The event at the start of `stage`.
    pub fn start(stage: Stage, message: impl Into<String>) -> Self {
        Self::new(stage, stage.range().0, message)
    }

    pub fn is_final(&self) -> bool {
        self.percent >= 100
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_ranges_are_contiguous() {
        let stages = [
            Stage::Extract,
            Stage::Analyze,
            Stage::ExtractNames,
            Stage::Verify,
            Stage::Cluster,
        ];
        assert_eq!(stages[0].range().0, 0);
        for pair in stages.windows(2) {
            assert_eq!(pair[0].range().1, pair[1].range().0);
        }
        assert_eq!(stages[4].range().1, 100);
    }

    #[test]
    fn verify_percent_scales_with_clusters() {
        assert_eq!(Stage::Verify.percent(0, 4), 40);
        assert_eq!(Stage::Verify.percent(2, 4), 65);
        assert_eq!(Stage::Verify.percent(4, 4), 90);
        assert_eq!(Stage::Verify.percent(0, 0), 40);
    }

    #[test]
    fn stage_serializes_snake_case() {
        let event = ProgressEvent::start(Stage::ExtractNames, "reading case names");
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"extract_names\""));
        assert!(json.contains("\"percent\":30"));
    }
}

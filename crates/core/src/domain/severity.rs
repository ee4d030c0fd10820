use anyhow::ensure;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Qualitative pollen risk bands, in ascending order of risk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SeverityLevel {
    Low,
    Medium,
    High,
    #[serde(rename = "Very High")]
    VeryHigh,
    Severe,
}

impl SeverityLevel {
    pub const ALL: [SeverityLevel; 5] = [
        SeverityLevel::Low,
        SeverityLevel::Medium,
        SeverityLevel::High,
        SeverityLevel::VeryHigh,
        SeverityLevel::Severe,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SeverityLevel::Low => "Low",
            SeverityLevel::Medium => "Medium",
            SeverityLevel::High => "High",
            SeverityLevel::VeryHigh => "Very High",
            SeverityLevel::Severe => "Severe",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            SeverityLevel::Low => "Minimal cedar pollen.",
            SeverityLevel::Medium => {
                "Moderate cedar pollen. Sensitive people may notice mild symptoms."
            }
            SeverityLevel::High => {
                "High cedar pollen. Most allergy sufferers will notice symptoms outdoors."
            }
            SeverityLevel::VeryHigh => {
                "Very high cedar pollen. Limit time outdoors and keep windows closed."
            }
            SeverityLevel::Severe => {
                "Severe cedar pollen. Cedar fever conditions; stay indoors when you can."
            }
        }
    }

    /// Display color (hex) used by the rendering collaborators.
    pub fn color(self) -> &'static str {
        match self {
            SeverityLevel::Low => "#22C55E",
            SeverityLevel::Medium => "#EAB308",
            SeverityLevel::High => "#F97316",
            SeverityLevel::VeryHigh => "#EF4444",
            SeverityLevel::Severe => "#A855F7",
        }
    }

    /// Maps a level label as published upstream ("Very high", "HIGH", "Extreme", ...).
    /// Unknown labels yield `None`.
    pub fn from_published(label: &str) -> Option<Self> {
        let normalized = label.split_whitespace().collect::<Vec<_>>().join(" ");
        match normalized.to_ascii_lowercase().as_str() {
            "low" => Some(SeverityLevel::Low),
            "medium" | "moderate" => Some(SeverityLevel::Medium),
            "high" => Some(SeverityLevel::High),
            "very high" => Some(SeverityLevel::VeryHigh),
            "severe" | "extreme" => Some(SeverityLevel::Severe),
            _ => None,
        }
    }
}

impl fmt::Display for SeverityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lower bounds (inclusive, grains/m³) of every band above `Low`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeverityThresholds {
    pub medium: u32,
    pub high: u32,
    pub very_high: u32,
    pub severe: u32,
}

impl Default for SeverityThresholds {
    fn default() -> Self {
        Self {
            medium: 50,
            high: 500,
            very_high: 1500,
            severe: 5000,
        }
    }
}

impl SeverityThresholds {
    pub fn try_new(medium: u32, high: u32, very_high: u32, severe: u32) -> anyhow::Result<Self> {
        ensure!(medium > 0, "medium threshold must be positive");
        ensure!(
            medium < high && high < very_high && very_high < severe,
            "severity thresholds must be strictly increasing (got {medium},{high},{very_high},{severe})"
        );
        Ok(Self {
            medium,
            high,
            very_high,
            severe,
        })
    }

    /// Parses a comma-separated table, e.g. `"50,500,1500,5000"`.
    pub fn parse(table: &str) -> anyhow::Result<Self> {
        let values = table
            .split(',')
            .map(|part| part.trim().parse::<u32>())
            .collect::<Result<Vec<_>, _>>()?;
        ensure!(
            values.len() == 4,
            "severity table needs exactly 4 bounds (got {})",
            values.len()
        );
        Self::try_new(values[0], values[1], values[2], values[3])
    }

    pub fn classify(&self, count: u32) -> SeverityLevel {
        if count >= self.severe {
            SeverityLevel::Severe
        } else if count >= self.very_high {
            SeverityLevel::VeryHigh
        } else if count >= self.high {
            SeverityLevel::High
        } else if count >= self.medium {
            SeverityLevel::Medium
        } else {
            SeverityLevel::Low
        }
    }
}

/// Classifier bands plus the two cut-offs used for season statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollenThresholds {
    pub severity: SeverityThresholds,
    /// Days at or above this count extend the current streak.
    pub moderate: u32,
    /// Days at or above this count are "high days".
    pub high: u32,
}

impl Default for PollenThresholds {
    fn default() -> Self {
        Self {
            severity: SeverityThresholds::default(),
            moderate: 500,
            high: 1500,
        }
    }
}

/// Level of `count` under the configured table.
pub fn severity_level(thresholds: &SeverityThresholds, count: u32) -> SeverityLevel {
    thresholds.classify(count)
}

pub fn severity_description(level: SeverityLevel) -> &'static str {
    level.description()
}

pub fn severity_color(level: SeverityLevel) -> &'static str {
    level.color()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_uses_inclusive_lower_bounds() {
        let t = SeverityThresholds::default();
        assert_eq!(t.classify(0), SeverityLevel::Low);
        assert_eq!(t.classify(49), SeverityLevel::Low);
        assert_eq!(t.classify(50), SeverityLevel::Medium);
        assert_eq!(t.classify(500), SeverityLevel::High);
        assert_eq!(t.classify(1499), SeverityLevel::High);
        assert_eq!(t.classify(1500), SeverityLevel::VeryHigh);
        assert_eq!(t.classify(5000), SeverityLevel::Severe);
        assert_eq!(t.classify(u32::MAX), SeverityLevel::Severe);
    }

    #[test]
    fn classify_is_monotonic() {
        let t = SeverityThresholds::default();
        let mut prev = t.classify(0);
        for count in (0..=12_000).step_by(7) {
            let level = t.classify(count);
            assert!(level >= prev, "level dropped at count {count}");
            prev = level;
        }
    }

    #[test]
    fn levels_are_ordered_by_risk() {
        for pair in SeverityLevel::ALL.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn published_labels_are_case_and_space_insensitive() {
        assert_eq!(
            SeverityLevel::from_published("  Very   high "),
            Some(SeverityLevel::VeryHigh)
        );
        assert_eq!(SeverityLevel::from_published("HIGH"), Some(SeverityLevel::High));
        assert_eq!(
            SeverityLevel::from_published("Extreme"),
            Some(SeverityLevel::Severe)
        );
        assert_eq!(SeverityLevel::from_published("n/a"), None);
        assert_eq!(SeverityLevel::from_published(""), None);
    }

    #[test]
    fn serializes_with_display_labels() {
        let json = serde_json::to_string(&SeverityLevel::VeryHigh).unwrap();
        assert_eq!(json, "\"Very High\"");
        let back: SeverityLevel = serde_json::from_str("\"Medium\"").unwrap();
        assert_eq!(back, SeverityLevel::Medium);
    }

    #[test]
    fn accessors_follow_the_given_table() {
        assert_eq!(severity_level(&SeverityThresholds::default(), 1200), SeverityLevel::High);
        let custom = SeverityThresholds::parse("10,100,1000,10000").unwrap();
        assert_eq!(severity_level(&custom, 200), SeverityLevel::High);
        assert_eq!(severity_level(&custom, 1200), SeverityLevel::VeryHigh);
        assert_eq!(severity_description(SeverityLevel::Low), "Minimal cedar pollen.");
        assert_eq!(severity_color(SeverityLevel::Low), "#22C55E");
    }

    #[test]
    fn rejects_overlapping_tables() {
        assert!(SeverityThresholds::parse("50,500,1500").is_err());
        assert!(SeverityThresholds::parse("50,500,500,5000").is_err());
        assert!(SeverityThresholds::parse("0,500,1500,5000").is_err());
        assert!(SeverityThresholds::parse("a,b,c,d").is_err());
        assert_eq!(
            SeverityThresholds::parse("50, 500, 1500, 5000").unwrap(),
            SeverityThresholds::default()
        );
    }
}

//! Heuristic progress estimation.
//!
//! The backend exposes no real progress signal, so the percentage shown
//! to users is interpolated from the time elapsed since submission. A
//! curve only decorates the UI: it never reaches 100, which is reserved
//! for a job the backend reported as completed.

use std::time::Duration;

use serde::Serialize;

use crate::error::CoreError;

/// Highest percentage a curve may report while a job is still running.
pub const RUNNING_CEILING: u8 = 99;

/// Label shown before the first status query returns.
pub const QUEUED_LABEL: &str = "Queued";

/// Label shown once the backend reports completion.
pub const COMPLETED_LABEL: &str = "Completed";

/// A derived, non-authoritative progress reading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressEstimate {
    pub percent: u8,
    pub phase_label: String,
}

impl ProgressEstimate {
    pub fn queued() -> Self {
        Self {
            percent: 0,
            phase_label: QUEUED_LABEL.to_string(),
        }
    }

    pub fn completed() -> Self {
        Self {
            percent: 100,
            phase_label: COMPLETED_LABEL.to_string(),
        }
    }
}

/// Maps elapsed wall-clock time to a progress estimate.
///
/// Implementations must be non-decreasing in `elapsed` and must never
/// return more than [`RUNNING_CEILING`].
pub trait ProgressCurve: Send + Sync {
    fn estimate(&self, elapsed: Duration) -> ProgressEstimate;
}

/// A point on a [`PiecewiseLinearCurve`]: at `at`, the bar shows
/// `percent` and the phase named `label` begins.
#[derive(Debug, Clone, PartialEq)]
pub struct Breakpoint {
    pub at: Duration,
    pub percent: u8,
    pub label: String,
}

impl Breakpoint {
    pub fn new(at: Duration, percent: u8, label: impl Into<String>) -> Self {
        Self {
            at,
            percent,
            label: label.into(),
        }
    }
}

/// Linear interpolation between breakpoints, then an asymptotic tail
/// that halves the remaining distance to [`RUNNING_CEILING`] every
/// `tail_half_life`.
#[derive(Debug, Clone, PartialEq)]
pub struct PiecewiseLinearCurve {
    breakpoints: Vec<Breakpoint>,
    tail_half_life: Duration,
}

impl PiecewiseLinearCurve {
    /// Build a curve, checking that breakpoints are ordered in time,
    /// non-decreasing in percent and below the running ceiling.
    pub fn new(breakpoints: Vec<Breakpoint>, tail_half_life: Duration) -> Result<Self, CoreError> {
        if breakpoints.is_empty() {
            return Err(CoreError::Validation(
                "A progress curve needs at least one breakpoint".into(),
            ));
        }
        if tail_half_life.is_zero() {
            return Err(CoreError::Validation(
                "Tail half-life must be positive".into(),
            ));
        }
        for pair in breakpoints.windows(2) {
            if pair[1].at <= pair[0].at || pair[1].percent < pair[0].percent {
                return Err(CoreError::Validation(format!(
                    "Breakpoint '{}' must come after and not below '{}'",
                    pair[1].label, pair[0].label
                )));
            }
        }
        if let Some(bp) = breakpoints.iter().find(|bp| bp.percent > RUNNING_CEILING) {
            return Err(CoreError::Validation(format!(
                "Breakpoint '{}' exceeds {RUNNING_CEILING}%",
                bp.label
            )));
        }
        Ok(Self {
            breakpoints,
            tail_half_life,
        })
    }

    pub fn breakpoints(&self) -> &[Breakpoint] {
        &self.breakpoints
    }

    fn from_table(table: &[(u64, u8, &str)], tail_half_life_secs: u64) -> Self {
        Self {
            breakpoints: table
                .iter()
                .map(|&(secs, percent, label)| {
                    Breakpoint::new(Duration::from_secs(secs), percent, label)
                })
                .collect(),
            tail_half_life: Duration::from_secs(tail_half_life_secs),
        }
    }
}

impl ProgressCurve for PiecewiseLinearCurve {
    fn estimate(&self, elapsed: Duration) -> ProgressEstimate {
        let t = elapsed.as_secs_f64();
        // `new` guarantees at least one breakpoint; presets are non-empty too.
        let Some(last) = self.breakpoints.last() else {
            return ProgressEstimate::queued();
        };
        let first = &self.breakpoints[0];

        let (percent, label) = if t < first.at.as_secs_f64() {
            let span = first.at.as_secs_f64();
            (f64::from(first.percent) * t / span, first.label.as_str())
        } else if t >= last.at.as_secs_f64() {
            let dt = t - last.at.as_secs_f64();
            let remaining = f64::from(RUNNING_CEILING - last.percent);
            let covered = 1.0 - 0.5_f64.powf(dt / self.tail_half_life.as_secs_f64());
            (f64::from(last.percent) + remaining * covered, last.label.as_str())
        } else {
            let idx = self
                .breakpoints
                .windows(2)
                .position(|pair| t < pair[1].at.as_secs_f64())
                .unwrap_or(0);
            let (from, to) = (&self.breakpoints[idx], &self.breakpoints[idx + 1]);
            let span = (to.at - from.at).as_secs_f64();
            let ratio = (t - from.at.as_secs_f64()) / span;
            let percent =
                f64::from(from.percent) + f64::from(to.percent - from.percent) * ratio;
            (percent, from.label.as_str())
        };

        ProgressEstimate {
            percent: (percent.floor() as u8).min(RUNNING_CEILING),
            phase_label: label.to_string(),
        }
    }
}

/// Built-in curves used by the tool catalogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CurvePreset {
    /// Single-pass image filters; 90% by minute 5.
    QuickImage,
    /// Diffusion-based image generation; 90% by minute 7.
    StandardImage,
    /// Video generation; 90% by minute 25.
    Video,
}

impl CurvePreset {
    pub fn curve(self) -> PiecewiseLinearCurve {
        match self {
            Self::QuickImage => PiecewiseLinearCurve::from_table(
                &[
                    (0, 0, "Initializing"),
                    (10, 10, "Analyzing image"),
                    (60, 35, "Enhancing details"),
                    (180, 70, "Refining output"),
                    (300, 90, "Finalizing"),
                ],
                60,
            ),
            Self::StandardImage => PiecewiseLinearCurve::from_table(
                &[
                    (0, 0, "Initializing"),
                    (15, 10, "Analyzing input"),
                    (90, 40, "Generating"),
                    (240, 75, "Refining output"),
                    (420, 90, "Finalizing"),
                ],
                90,
            ),
            Self::Video => PiecewiseLinearCurve::from_table(
                &[
                    (0, 0, "Initializing"),
                    (30, 5, "Analyzing image"),
                    (120, 15, "Preparing motion"),
                    (600, 50, "Generating frames"),
                    (1200, 80, "Rendering video"),
                    (1500, 90, "Finalizing"),
                ],
                300,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRESETS: [CurvePreset; 3] = [
        CurvePreset::QuickImage,
        CurvePreset::StandardImage,
        CurvePreset::Video,
    ];

    fn at(curve: &PiecewiseLinearCurve, secs: u64) -> ProgressEstimate {
        curve.estimate(Duration::from_secs(secs))
    }

    #[test]
    fn presets_pass_validation() {
        for preset in PRESETS {
            let curve = preset.curve();
            assert!(
                PiecewiseLinearCurve::new(curve.breakpoints.clone(), curve.tail_half_life).is_ok(),
                "{preset:?} should be a valid curve"
            );
        }
    }

    #[test]
    fn quick_image_reaches_ninety_at_minute_five() {
        let curve = CurvePreset::QuickImage.curve();
        assert!(at(&curve, 299).percent < 90);
        assert_eq!(at(&curve, 300).percent, 90);
    }

    #[test]
    fn video_reaches_ninety_only_at_minute_twenty_five() {
        let curve = CurvePreset::Video.curve();
        assert!(at(&curve, 300).percent < 50);
        assert!(at(&curve, 1499).percent < 90);
        assert_eq!(at(&curve, 1500).percent, 90);
    }

    #[test]
    fn curves_are_monotonic_and_below_hundred() {
        for preset in PRESETS {
            let curve = preset.curve();
            let mut previous = 0;
            for secs in (0..=4 * 3600).step_by(5) {
                let estimate = at(&curve, secs);
                assert!(estimate.percent >= previous, "{preset:?} regressed at {secs}s");
                assert!(estimate.percent <= RUNNING_CEILING);
                previous = estimate.percent;
            }
        }
    }

    #[test]
    fn tail_approaches_ceiling() {
        let curve = CurvePreset::QuickImage.curve();
        assert_eq!(at(&curve, 300 + 60).percent, 94);
        assert_eq!(at(&curve, 24 * 3600).percent, RUNNING_CEILING);
    }

    #[test]
    fn interpolates_between_breakpoints() {
        let curve = CurvePreset::QuickImage.curve();
        let mid = at(&curve, 35);
        assert_eq!(mid.percent, 22);
        assert_eq!(mid.phase_label, "Analyzing image");
    }

    #[test]
    fn ramps_from_zero_before_first_breakpoint() {
        let curve = PiecewiseLinearCurve::new(
            vec![Breakpoint::new(Duration::from_secs(10), 20, "Warming up")],
            Duration::from_secs(10),
        )
        .unwrap();
        assert_eq!(at(&curve, 5).percent, 10);
        assert_eq!(at(&curve, 5).phase_label, "Warming up");
    }

    #[test]
    fn new_rejects_unordered_breakpoints() {
        let result = PiecewiseLinearCurve::new(
            vec![
                Breakpoint::new(Duration::from_secs(10), 20, "b"),
                Breakpoint::new(Duration::from_secs(5), 30, "a"),
            ],
            Duration::from_secs(10),
        );
        assert!(result.is_err());
    }

    #[test]
    fn new_rejects_breakpoint_at_hundred() {
        let result = PiecewiseLinearCurve::new(
            vec![Breakpoint::new(Duration::from_secs(10), 100, "done")],
            Duration::from_secs(10),
        );
        assert!(result.is_err());
    }

    #[test]
    fn completed_is_the_only_hundred() {
        assert_eq!(ProgressEstimate::completed().percent, 100);
        assert_eq!(ProgressEstimate::queued().percent, 0);
    }
}

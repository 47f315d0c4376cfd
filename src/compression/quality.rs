//! Quality arithmetic for the progressive search.
//!
//! Quality is exchanged with callers as an `f32` in `[0, 1]` but stepped
//! internally as whole hundredths, so repeated reductions land exactly on
//! 0.85, 0.80, 0.75 and so on.

/// Amount removed from quality on each search step.
pub const QUALITY_STEP: f32 = 0.05;

const STEP_HUNDREDTHS: u8 = 5;

/// Upper bound on quality reductions in a single search. Quality starts at
/// most at 1.0 and drops by 0.05, so 20 steps cover the whole range.
pub const MAX_QUALITY_STEPS: u32 = 20;

/// Encode quality in hundredths (0-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Quality(u8);

impl Quality {
    pub const MIN: Quality = Quality(0);
    pub const MAX: Quality = Quality(100);

    /// Build from a `[0, 1]` float, rounding to hundredths and clamping.
    pub fn from_f32(value: f32) -> Self {
        if value.is_nan() {
            return Self::MIN;
        }
        let hundredths = (value * 100.0).round().clamp(0.0, 100.0);
        Self(hundredths as u8)
    }

    pub fn from_hundredths(value: u8) -> Self {
        Self(value.min(100))
    }

    pub fn hundredths(self) -> u8 {
        self.0
    }

    pub fn as_f32(self) -> f32 {
        self.0 as f32 / 100.0
    }

    /// Quality on the 1-100 scale lossy encoders expect.
    pub fn percent(self) -> u8 {
        self.0.max(1)
    }

    /// One step lower, never below `floor`.
    pub fn step_down(self, floor: Quality) -> Quality {
        Quality(self.0.saturating_sub(STEP_HUNDREDTHS)).max(floor)
    }
}

/// Reduce quality by one step, rounded to two decimals.
///
/// No floor check: past zero this returns negative values, so callers
/// compare against their floor before using the result.
pub fn reduce_quality(quality: f32) -> f32 {
    ((quality - QUALITY_STEP) * 100.0).round() / 100.0
}

/// Whether the search should try another, lower quality.
///
/// Stops when there is no budget, when `size_bytes` is within the budget
/// (inclusive), or when quality has reached the floor.
pub fn should_continue(
    size_bytes: u64,
    max_size_bytes: Option<u64>,
    quality: f32,
    min_quality: f32,
) -> bool {
    let Some(max) = max_size_bytes else {
        return false;
    };
    if size_bytes <= max {
        return false;
    }
    quality > min_quality
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX_KB: u64 = 200;

    #[test]
    fn test_reduce_quality_two_decimals() {
        assert_eq!(reduce_quality(0.85), 0.80);
        assert_eq!(reduce_quality(0.90), 0.85);
        assert_eq!(reduce_quality(0.8), 0.75);
        assert_eq!(reduce_quality(0.7), 0.65);
    }

    #[test]
    fn test_reduce_quality_repeated_has_no_drift() {
        let mut q = 1.0;
        let expected = [0.95, 0.9, 0.85, 0.8, 0.75, 0.7, 0.65, 0.6, 0.55, 0.5];
        for want in expected {
            q = reduce_quality(q);
            assert_eq!(q, want);
        }
    }

    #[test]
    fn test_reduce_quality_can_go_negative() {
        assert!(reduce_quality(0.0) < 0.0);
        assert_eq!(reduce_quality(0.02), -0.03);
    }

    #[test]
    fn test_should_continue_without_budget() {
        for size in [0, 1, 10_000_000] {
            assert!(!should_continue(size, None, 0.9, 0.1));
            assert!(!should_continue(size, None, 0.1, 0.9));
        }
    }

    #[test]
    fn test_should_continue_budget_boundary_is_inclusive() {
        let max = MAX_KB * 1024;
        assert!(!should_continue(max, Some(max), 0.8, 0.5));
        assert!(should_continue(max + 1, Some(max), 0.8, 0.5));
    }

    #[test]
    fn test_should_continue_stops_at_floor() {
        let max = MAX_KB * 1024;
        for size in [max + 1, max * 2, max * 100] {
            assert!(!should_continue(size, Some(max), 0.6, 0.6));
            assert!(!should_continue(size, Some(max), 0.5, 0.6));
        }
    }

    #[test]
    fn test_quality_from_f32_rounds_and_clamps() {
        assert_eq!(Quality::from_f32(0.85).hundredths(), 85);
        assert_eq!(Quality::from_f32(0.854).hundredths(), 85);
        assert_eq!(Quality::from_f32(1.7).hundredths(), 100);
        assert_eq!(Quality::from_f32(-0.3).hundredths(), 0);
        assert_eq!(Quality::from_f32(f32::NAN), Quality::MIN);
    }

    #[test]
    fn test_quality_as_f32_is_exact() {
        assert_eq!(Quality::from_hundredths(85).as_f32(), 0.85);
        assert_eq!(Quality::from_hundredths(80).as_f32(), 0.8);
    }

    #[test]
    fn test_step_down_respects_floor() {
        let floor = Quality::from_hundredths(60);
        assert_eq!(Quality::from_hundredths(85).step_down(floor).hundredths(), 80);
        assert_eq!(Quality::from_hundredths(62).step_down(floor), floor);
        assert_eq!(Quality::from_hundredths(3).step_down(Quality::MIN), Quality::MIN);
    }

    #[test]
    fn test_step_down_matches_reduce_quality() {
        let mut q = Quality::MAX;
        let mut f = 1.0;
        while q > Quality::MIN {
            q = q.step_down(Quality::MIN);
            f = reduce_quality(f);
            assert_eq!(q.as_f32(), f);
        }
    }

    #[test]
    fn test_percent_is_never_zero() {
        assert_eq!(Quality::MIN.percent(), 1);
        assert_eq!(Quality::from_hundredths(85).percent(), 85);
    }
}

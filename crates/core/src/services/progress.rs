//! Progress engine.
//!
//! Pure functions from a completion count and a course's lesson total to a
//! percentage and the milestone the last write produced.

use serde::Serialize;

/// What a completion write achieved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Milestone {
    /// Nothing new was completed.
    None,
    /// A new lesson was completed and the course is not finished.
    LessonComplete,
    /// A new lesson was completed and every lesson is now done.
    CourseComplete,
}

/// Percentage and milestone after a completion write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProgressSnapshot {
    pub percentage: i32,
    pub milestone: Milestone,
}

/// Percentage of `total_lessons` covered by `completed`, in [0, 100].
///
/// Rounds half up, but stays at 99 until every lesson is done so that 100
/// always means complete. Counts above the total clamp to 100.
#[must_use]
pub fn percentage(completed: usize, total_lessons: u64) -> i32 {
    if total_lessons == 0 {
        return 0;
    }

    let completed = completed as u64;
    if completed >= total_lessons {
        return 100;
    }

    let rounded = (200 * completed + total_lessons) / (2 * total_lessons);
    rounded.min(99) as i32
}

/// Compute progress for a completion set of size `completed`.
///
/// `just_added` is true only when the write added a lesson that was not in
/// the set before.
#[must_use]
pub fn compute_progress(completed: usize, total_lessons: u64, just_added: bool) -> ProgressSnapshot {
    let percentage = percentage(completed, total_lessons);

    let milestone = if !just_added || total_lessons == 0 {
        Milestone::None
    } else if percentage == 100 {
        Milestone::CourseComplete
    } else {
        Milestone::LessonComplete
    };

    ProgressSnapshot {
        percentage,
        milestone,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_course() {
        assert_eq!(
            compute_progress(0, 0, false),
            ProgressSnapshot {
                percentage: 0,
                milestone: Milestone::None
            }
        );
        assert_eq!(compute_progress(3, 0, true).milestone, Milestone::None);
    }

    #[test]
    fn test_rounding() {
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(2, 3), 67);
        assert_eq!(percentage(1, 8), 13);
        assert_eq!(percentage(1, 4), 25);
    }

    #[test]
    fn test_hundred_only_when_complete() {
        assert_eq!(percentage(199, 200), 99);
        assert_eq!(percentage(200, 200), 100);
        assert_eq!(percentage(5, 4), 100);
    }

    #[test]
    fn test_bounds_hold_for_all_counts() {
        for total in 1..=25u64 {
            for completed in 0..=(total as usize + 2) {
                let p = percentage(completed, total);
                assert!((0..=100).contains(&p));
                assert_eq!(p == 100, completed as u64 >= total);
            }
        }
    }

    #[test]
    fn test_milestones() {
        assert_eq!(compute_progress(1, 4, true).milestone, Milestone::LessonComplete);
        assert_eq!(compute_progress(4, 4, true).milestone, Milestone::CourseComplete);
        assert_eq!(compute_progress(1, 4, false).milestone, Milestone::None);
        assert_eq!(compute_progress(4, 4, false).milestone, Milestone::None);
    }
}

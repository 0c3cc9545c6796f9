use crate::error::{OverlapRule, ValidationError};
use crate::model::{PartialTask, Schedulable, Task};
use log::debug;
use nucleo_matcher::pattern::{CaseMatching, Normalization, Pattern};
use nucleo_matcher::{Config, Matcher, Utf32Str};
use time::{Date, Month, OffsetDateTime};

/// Checks `candidate` against the horizon, its own range, the clock and every
/// other task in `existing`, stopping at the first failure.
pub fn validate<C: Schedulable + ?Sized>(
    candidate: &C,
    existing: &[Task],
    now: OffsetDateTime,
) -> Result<(), ValidationError> {
    let start = candidate.start_date();
    let due = candidate.due_date();

    if let Some(horizon) = horizon(now)
        && start > horizon
    {
        return Err(ValidationError::DateTooFarAhead);
    }

    if start >= due {
        return Err(ValidationError::EmptyDuration);
    }

    if start < now {
        return Err(ValidationError::StartInPast);
    }

    let own_id = candidate.task_id();
    for task in existing {
        if Some(task.id) == own_id {
            continue;
        }

        if let Some(rule) = overlap_rule(start, due, task) {
            debug!(
                "event=validate module=scheduler status=overlap task_id={} rule={:?}",
                task.id, rule
            );
            return Err(ValidationError::OverlapsExisting {
                rule,
                task_id: task.id,
            });
        }
    }

    Ok(())
}

fn overlap_rule(start: OffsetDateTime, due: OffsetDateTime, task: &Task) -> Option<OverlapRule> {
    let (task_start, task_due) = (task.start_date, task.due_date);

    if start >= task_start && start < task_due {
        return Some(OverlapRule::StartOverlap);
    }
    if due >= task_start && due < task_due {
        return Some(OverlapRule::EndOverlap);
    }
    if start <= task_start && due >= task_start && due >= task_due {
        return Some(OverlapRule::Containment);
    }
    None
}

/// Latest start accepted at `now`: one calendar month ahead.
fn horizon(now: OffsetDateTime) -> Option<OffsetDateTime> {
    shift_months(now.date(), 1).map(|date| now.replace_date(date))
}

/// Moves `date` by `months` calendar months, clamping the day to the length
/// of the target month. `None` when the result leaves the supported range.
pub fn shift_months(date: Date, months: i32) -> Option<Date> {
    let index = date.year() * 12 + i32::from(date.month() as u8) - 1 + months;
    let year = index.div_euclid(12);
    let month = Month::try_from((index.rem_euclid(12) + 1) as u8).ok()?;

    (1..=date.day())
        .rev()
        .find_map(|day| Date::from_calendar_date(year, month, day).ok())
}

/// Every field of `updated` that differs from `original`, plus the id.
pub fn diff(updated: &Task, original: &Task) -> PartialTask {
    let mut patch = PartialTask::new(updated.id);

    if updated.title != original.title {
        patch.title = Some(updated.title.clone());
    }
    if updated.description != original.description {
        patch.description = Some(updated.description.clone());
    }
    if updated.status != original.status {
        patch.status = Some(updated.status.clone());
    }
    if updated.color != original.color {
        patch.color = Some(updated.color.clone());
    }
    if updated.start_date != original.start_date {
        patch.start_date = Some(updated.start_date);
    }
    if updated.due_date != original.due_date {
        patch.due_date = Some(updated.due_date);
    }

    patch
}

pub fn sorted_future_tasks(tasks: &[Task], now: OffsetDateTime) -> Vec<Task> {
    let mut upcoming: Vec<Task> = tasks
        .iter()
        .filter(|task| task.due_date > now)
        .cloned()
        .collect();
    upcoming.sort_by_key(|task| task.due_date);
    upcoming
}

/// Fuzzy title search. A blank query returns `tasks` untouched.
pub fn search(tasks: &[Task], query: &str) -> Vec<Task> {
    if query.trim().is_empty() {
        return tasks.to_vec();
    }

    let mut matcher = Matcher::new(Config::DEFAULT);
    let pattern = Pattern::parse(query, CaseMatching::Ignore, Normalization::Smart);
    let mut buf = Vec::new();

    let mut scored: Vec<(u32, usize, &Task)> = tasks
        .iter()
        .enumerate()
        .filter_map(|(index, task)| {
            pattern
                .score(Utf32Str::new(&task.title, &mut buf), &mut matcher)
                .map(|score| (score, index, task))
        })
        .collect();

    // best score first, input order among equals
    scored.sort_by(|left, right| right.0.cmp(&left.0).then(left.1.cmp(&right.1)));
    scored.into_iter().map(|(_, _, task)| task.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::{diff, search, shift_months, sorted_future_tasks, validate};
    use crate::error::{OverlapRule, ValidationError};
    use crate::model::{Task, TaskDraft};
    use time::macros::{date, datetime};
    use time::{Duration, OffsetDateTime};

    const NOW: OffsetDateTime = datetime!(2026-10-16 08:00 UTC);

    fn task(id: i64, title: &str, start: OffsetDateTime, due: OffsetDateTime) -> Task {
        Task {
            id,
            title: title.to_string(),
            description: String::new(),
            status: "todo".to_string(),
            color: "#000ff3".to_string(),
            start_date: start,
            due_date: due,
        }
    }

    fn draft(start: OffsetDateTime, due: OffsetDateTime) -> TaskDraft {
        TaskDraft {
            title: "candidate".to_string(),
            description: String::new(),
            status: "todo".to_string(),
            color: "#000ff3".to_string(),
            start_date: start,
            due_date: due,
        }
    }

    fn existing() -> Vec<Task> {
        vec![task(
            1,
            "A",
            datetime!(2026-10-20 10:00 UTC),
            datetime!(2026-10-20 11:00 UTC),
        )]
    }

    fn overlap_rule(result: Result<(), ValidationError>) -> OverlapRule {
        match result {
            Err(ValidationError::OverlapsExisting { rule, task_id }) => {
                assert_eq!(task_id, 1);
                rule
            }
            other => panic!("expected overlap, got {other:?}"),
        }
    }

    #[test]
    fn rejects_empty_and_inverted_ranges() {
        let at = datetime!(2026-10-20 09:00 UTC);
        assert_eq!(
            validate(&draft(at, at), &[], NOW),
            Err(ValidationError::EmptyDuration)
        );
        assert_eq!(
            validate(&draft(at, at - Duration::minutes(30)), &[], NOW),
            Err(ValidationError::EmptyDuration)
        );
    }

    #[test]
    fn rejects_start_past_one_month_horizon() {
        let boundary = datetime!(2026-11-16 08:00 UTC);

        let inside = draft(boundary - Duration::seconds(1), boundary + Duration::hours(1));
        assert_eq!(validate(&inside, &[], NOW), Ok(()));

        let outside = draft(boundary + Duration::seconds(1), boundary + Duration::hours(1));
        assert_eq!(
            validate(&outside, &[], NOW),
            Err(ValidationError::DateTooFarAhead)
        );
    }

    #[test]
    fn horizon_check_runs_before_duration_check() {
        let far = datetime!(2027-01-01 10:00 UTC);
        assert_eq!(
            validate(&draft(far, far), &[], NOW),
            Err(ValidationError::DateTooFarAhead)
        );
    }

    #[test]
    fn rejects_start_in_the_past() {
        let start = NOW - Duration::minutes(1);
        assert_eq!(
            validate(&draft(start, NOW + Duration::hours(1)), &[], NOW),
            Err(ValidationError::StartInPast)
        );
        assert_eq!(validate(&draft(NOW, NOW + Duration::hours(1)), &[], NOW), Ok(()));
    }

    #[test]
    fn start_inside_existing_task_is_rejected() {
        let candidate = draft(
            datetime!(2026-10-20 10:30 UTC),
            datetime!(2026-10-20 10:45 UTC),
        );
        let rule = overlap_rule(validate(&candidate, &existing(), NOW));
        assert_eq!(rule, OverlapRule::StartOverlap);
    }

    #[test]
    fn end_inside_existing_task_is_rejected() {
        let candidate = draft(
            datetime!(2026-10-20 09:00 UTC),
            datetime!(2026-10-20 10:30 UTC),
        );
        let rule = overlap_rule(validate(&candidate, &existing(), NOW));
        assert_eq!(rule, OverlapRule::EndOverlap);
    }

    #[test]
    fn containing_an_existing_task_is_rejected() {
        let candidate = draft(
            datetime!(2026-10-20 09:00 UTC),
            datetime!(2026-10-20 12:00 UTC),
        );
        let rule = overlap_rule(validate(&candidate, &existing(), NOW));
        assert_eq!(rule, OverlapRule::Containment);
    }

    #[test]
    fn disjoint_and_back_to_back_candidates_are_accepted() {
        let later = draft(
            datetime!(2026-10-20 12:00 UTC),
            datetime!(2026-10-20 13:00 UTC),
        );
        assert_eq!(validate(&later, &existing(), NOW), Ok(()));

        let adjacent = draft(
            datetime!(2026-10-20 11:00 UTC),
            datetime!(2026-10-20 12:00 UTC),
        );
        assert_eq!(validate(&adjacent, &existing(), NOW), Ok(()));
    }

    // Open question: the end rule includes the existing start, so a candidate
    // ending exactly when another task begins is still rejected.
    #[test]
    fn candidate_ending_at_existing_start_is_rejected_by_end_rule() {
        let before = draft(
            datetime!(2026-10-20 09:00 UTC),
            datetime!(2026-10-20 10:00 UTC),
        );
        let rule = overlap_rule(validate(&before, &existing(), NOW));
        assert_eq!(rule, OverlapRule::EndOverlap);
    }

    // Open question: a candidate strictly inside an existing task has no rule
    // of its own, but the start rule already covers it.
    #[test]
    fn candidate_inside_existing_task_is_caught_by_start_rule() {
        let inside = draft(
            datetime!(2026-10-20 10:10 UTC),
            datetime!(2026-10-20 10:50 UTC),
        );
        let rule = overlap_rule(validate(&inside, &existing(), NOW));
        assert_eq!(rule, OverlapRule::StartOverlap);
    }

    #[test]
    fn edited_task_does_not_collide_with_itself() {
        let mut edited = existing()[0].clone();
        edited.due_date = datetime!(2026-10-20 11:30 UTC);
        assert_eq!(validate(&edited, &existing(), NOW), Ok(()));
    }

    #[test]
    fn shift_months_clamps_day() {
        assert_eq!(shift_months(date!(2026-01-31), 1), Some(date!(2026-02-28)));
        assert_eq!(shift_months(date!(2026-12-15), 1), Some(date!(2027-01-15)));
        assert_eq!(shift_months(date!(2026-01-15), -1), Some(date!(2025-12-15)));
    }

    #[test]
    fn diff_of_identical_tasks_is_noop() {
        let original = existing()[0].clone();
        let patch = diff(&original, &original);
        assert_eq!(patch.id, 1);
        assert!(patch.is_noop());
    }

    #[test]
    fn diff_reports_only_changed_fields() {
        let original = existing()[0].clone();
        let mut updated = original.clone();
        updated.title = "B".to_string();
        updated.due_date = datetime!(2026-10-20 11:15 UTC);

        let patch = diff(&updated, &original);
        assert_eq!(patch.id, 1);
        assert_eq!(patch.title.as_deref(), Some("B"));
        assert_eq!(patch.due_date, Some(datetime!(2026-10-20 11:15 UTC)));
        assert_eq!(patch.changed_fields(), vec!["Title", "DueDate"]);
    }

    #[test]
    fn sorted_future_tasks_drops_past_and_orders_by_due() {
        let t = NOW;
        let tasks = vec![
            task(1, "soon", t - Duration::hours(1), t + Duration::hours(1)),
            task(2, "past", t - Duration::hours(2), t - Duration::hours(1)),
            task(3, "later", t, t + Duration::hours(2)),
        ];

        let ids: Vec<i64> = sorted_future_tasks(&tasks, t)
            .iter()
            .map(|task| task.id)
            .collect();
        assert_eq!(ids, vec![1, 3]);

        let reversed: Vec<Task> = tasks.iter().rev().cloned().collect();
        let ids: Vec<i64> = sorted_future_tasks(&reversed, t)
            .iter()
            .map(|task| task.id)
            .collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn empty_search_returns_input_order() {
        let at = datetime!(2026-10-20 10:00 UTC);
        let tasks = vec![
            task(1, "History", at, at + Duration::hours(1)),
            task(2, "Math 101", at, at + Duration::hours(1)),
        ];
        assert_eq!(search(&tasks, ""), tasks);
        assert_eq!(search(&tasks, "   "), tasks);
    }

    #[test]
    fn search_ranks_matching_titles_first() {
        let at = datetime!(2026-10-20 10:00 UTC);
        let tasks = vec![
            task(1, "History", at, at + Duration::hours(1)),
            task(2, "Math 101", at, at + Duration::hours(1)),
        ];

        let found = search(&tasks, "Math");
        assert_eq!(found[0].id, 2);
        assert!(found.iter().all(|task| task.id != 1));

        let found = search(&tasks, "mth");
        assert_eq!(found.first().map(|task| task.id), Some(2));
    }
}

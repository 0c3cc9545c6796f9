//! Calendar toolbar state and the events visible through it.

use crate::error::AppError;
use crate::model::{Task, TaskId};
use crate::scheduler::shift_months;
use serde::{Deserialize, Serialize};
use time::macros::format_description;
use time::{Date, Duration, OffsetDateTime, UtcOffset};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalendarView {
    #[default]
    Week,
    Day,
    Month,
}

impl CalendarView {
    /// Order in which the toolbar button steps through the views.
    pub const CYCLE: [CalendarView; 3] = [CalendarView::Week, CalendarView::Day, CalendarView::Month];

    pub fn next(self) -> Self {
        let index = Self::CYCLE
            .iter()
            .position(|view| *view == self)
            .unwrap_or(0);
        Self::CYCLE[(index + 1) % Self::CYCLE.len()]
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Week => "week",
            Self::Day => "day",
            Self::Month => "month",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "week" => Some(Self::Week),
            "day" => Some(Self::Day),
            "month" => Some(Self::Month),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigate {
    Previous,
    Next,
    Today(Date),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Toolbar {
    pub view: CalendarView,
    pub date: Date,
}

impl Toolbar {
    pub fn new(view: CalendarView, date: Date) -> Self {
        Self { view, date }
    }

    pub fn cycle_view(&mut self) -> CalendarView {
        self.view = self.view.next();
        self.view
    }

    pub fn set_view(&mut self, view: CalendarView) {
        self.view = view;
    }

    pub fn navigate(&mut self, action: Navigate) -> Result<Date, AppError> {
        let target = match action {
            Navigate::Today(today) => Some(today),
            Navigate::Previous => self.step(-1),
            Navigate::Next => self.step(1),
        };
        self.date = target.ok_or_else(|| AppError::invalid_input("date out of range"))?;
        Ok(self.date)
    }

    fn step(&self, direction: i32) -> Option<Date> {
        match self.view {
            CalendarView::Day => self.date.checked_add(Duration::days(direction.into())),
            CalendarView::Week => self.date.checked_add(Duration::weeks(direction.into())),
            CalendarView::Month => shift_months(self.date, direction),
        }
    }

    /// Heading shown above the grid: `20 Tuesday` in day view, `October 2026`
    /// otherwise.
    pub fn label(&self) -> String {
        match self.view {
            CalendarView::Day => format!("{:02} {}", self.date.day(), self.date.weekday()),
            CalendarView::Week | CalendarView::Month => {
                format!("{} {}", self.date.month(), self.date.year())
            }
        }
    }

    /// Half-open range of instants covered by the current view.
    pub fn visible_range(
        &self,
        offset: UtcOffset,
    ) -> Result<(OffsetDateTime, OffsetDateTime), AppError> {
        let (first, last) = match self.view {
            CalendarView::Day => (Some(self.date), self.date.next_day()),
            CalendarView::Week => {
                let back = i64::from(self.date.weekday().number_days_from_sunday());
                let sunday = self.date.checked_sub(Duration::days(back));
                (sunday, sunday.and_then(|day| day.checked_add(Duration::weeks(1))))
            }
            CalendarView::Month => {
                let first = self.date.replace_day(1).ok();
                (first, first.and_then(|day| shift_months(day, 1)))
            }
        };

        match (first, last) {
            (Some(first), Some(last)) => Ok((
                first.midnight().assume_offset(offset),
                last.midnight().assume_offset(offset),
            )),
            _ => Err(AppError::invalid_input("date out of range")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarEvent {
    pub id: TaskId,
    pub title: String,
    pub status: String,
    pub color: String,
    pub start: OffsetDateTime,
    pub end: OffsetDateTime,
    pub start_label: String,
    pub end_label: String,
}

/// Tasks intersecting the toolbar's visible range, earliest first.
pub fn events(
    tasks: &[Task],
    toolbar: &Toolbar,
    offset: UtcOffset,
) -> Result<Vec<CalendarEvent>, AppError> {
    let (range_start, range_end) = toolbar.visible_range(offset)?;

    let mut visible: Vec<&Task> = tasks
        .iter()
        .filter(|task| task.start_date < range_end && task.due_date > range_start)
        .collect();
    visible.sort_by_key(|task| task.start_date);

    visible
        .into_iter()
        .map(|task| {
            let start = task.start_date.to_offset(offset);
            let end = task.due_date.to_offset(offset);
            Ok(CalendarEvent {
                id: task.id,
                title: task.title.clone(),
                status: task.status.clone(),
                color: task.color.clone(),
                start,
                end,
                start_label: time_label(start)?,
                end_label: time_label(end)?,
            })
        })
        .collect()
}

/// `10:00 AM` style clock label.
pub fn time_label(value: OffsetDateTime) -> Result<String, AppError> {
    value
        .format(format_description!(
            "[hour repr:12 padding:none]:[minute] [period]"
        ))
        .map_err(|err| AppError::invalid_data(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::{CalendarView, Navigate, Toolbar, events, time_label};
    use crate::model::Task;
    use time::macros::{date, datetime};
    use time::{OffsetDateTime, UtcOffset};

    fn task(id: i64, start: OffsetDateTime, due: OffsetDateTime) -> Task {
        Task {
            id,
            title: format!("task {id}"),
            description: String::new(),
            status: "todo".to_string(),
            color: "#000ff3".to_string(),
            start_date: start,
            due_date: due,
        }
    }

    #[test]
    fn cycle_steps_week_day_month() {
        let mut toolbar = Toolbar::new(CalendarView::default(), date!(2026-10-20));
        assert_eq!(toolbar.view, CalendarView::Week);
        assert_eq!(toolbar.cycle_view(), CalendarView::Day);
        assert_eq!(toolbar.cycle_view(), CalendarView::Month);
        assert_eq!(toolbar.cycle_view(), CalendarView::Week);
    }

    #[test]
    fn navigation_moves_by_view_unit() {
        let mut toolbar = Toolbar::new(CalendarView::Week, date!(2026-10-20));
        assert_eq!(toolbar.navigate(Navigate::Next).unwrap(), date!(2026-10-27));

        toolbar.set_view(CalendarView::Day);
        assert_eq!(toolbar.navigate(Navigate::Previous).unwrap(), date!(2026-10-26));

        toolbar.set_view(CalendarView::Month);
        toolbar.navigate(Navigate::Today(date!(2026-01-31))).unwrap();
        assert_eq!(toolbar.navigate(Navigate::Next).unwrap(), date!(2026-02-28));
    }

    #[test]
    fn label_depends_on_view() {
        let mut toolbar = Toolbar::new(CalendarView::Day, date!(2026-10-20));
        assert_eq!(toolbar.label(), "20 Tuesday");
        toolbar.set_view(CalendarView::Month);
        assert_eq!(toolbar.label(), "October 2026");
    }

    #[test]
    fn week_range_starts_on_sunday() {
        let toolbar = Toolbar::new(CalendarView::Week, date!(2026-10-20));
        let (start, end) = toolbar.visible_range(UtcOffset::UTC).unwrap();
        assert_eq!(start, datetime!(2026-10-18 00:00 UTC));
        assert_eq!(end, datetime!(2026-10-25 00:00 UTC));
    }

    #[test]
    fn events_are_filtered_to_range_and_sorted() {
        let tasks = vec![
            task(1, datetime!(2026-10-21 14:00 UTC), datetime!(2026-10-21 15:30 UTC)),
            task(2, datetime!(2026-10-19 09:00 UTC), datetime!(2026-10-19 10:00 UTC)),
            task(3, datetime!(2026-10-26 09:00 UTC), datetime!(2026-10-26 10:00 UTC)),
        ];
        let toolbar = Toolbar::new(CalendarView::Week, date!(2026-10-20));

        let visible = events(&tasks, &toolbar, UtcOffset::UTC).unwrap();
        let ids: Vec<i64> = visible.iter().map(|event| event.id).collect();

        assert_eq!(ids, vec![2, 1]);
        assert_eq!(visible[1].start_label, "2:00 PM");
        assert_eq!(visible[1].end_label, "3:30 PM");
    }

    #[test]
    fn time_label_uses_twelve_hour_clock() {
        assert_eq!(time_label(datetime!(2026-10-20 00:05 UTC)).unwrap(), "12:05 AM");
        assert_eq!(time_label(datetime!(2026-10-20 10:00 UTC)).unwrap(), "10:00 AM");
    }

    #[test]
    fn view_names_parse_back() {
        for view in CalendarView::CYCLE {
            assert_eq!(CalendarView::parse(view.name()), Some(view));
        }
        assert_eq!(CalendarView::parse("year"), None);
    }
}

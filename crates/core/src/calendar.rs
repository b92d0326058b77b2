//! Calendar events built from project timelines and task deadlines.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::task::TaskStatus;

/// What an event stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// A project running from its start to its end date.
    Project,
    /// A task deadline.
    Task,
}

/// One calendar entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    /// Project or task id.
    pub id: Uuid,
    /// Project name or task title.
    pub title: String,
    /// Start.
    pub start: DateTime<Utc>,
    /// End; equal to `start` for tasks.
    pub end: DateTime<Utc>,
    /// Event kind.
    #[serde(rename = "type")]
    pub kind: EventKind,
    /// Status of the underlying record.
    pub status: String,
    /// Owning project.
    pub project_id: Uuid,
}

impl CalendarEvent {
    /// Project timeline event. Projects without both dates are not scheduled.
    #[must_use]
    pub fn project(
        id: Uuid,
        name: String,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        status: &str,
    ) -> Option<Self> {
        let (start, end) = (start?, end?);
        Some(Self {
            id,
            title: name,
            start: midnight(start),
            end: midnight(end),
            kind: EventKind::Project,
            status: status.to_string(),
            project_id: id,
        })
    }

    /// Task deadline event.
    #[must_use]
    pub fn task(
        id: Uuid,
        title: String,
        deadline: DateTime<Utc>,
        status: TaskStatus,
        project_id: Uuid,
    ) -> Self {
        Self {
            id,
            title,
            start: deadline,
            end: deadline,
            kind: EventKind::Task,
            status: status.as_str().to_string(),
            project_id,
        }
    }

    /// Whether the event touches the closed window `[from, to]`.
    #[must_use]
    pub fn overlaps(&self, from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> bool {
        from.is_none_or(|from| self.end >= from) && to.is_none_or(|to| self.start <= to)
    }
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// Keeps events inside the window and orders them by start, projects first on ties.
#[must_use]
pub fn timeline(
    events: impl IntoIterator<Item = CalendarEvent>,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
) -> Vec<CalendarEvent> {
    let mut events: Vec<_> = events
        .into_iter()
        .filter(|event| event.overlaps(from, to))
        .collect();
    events.sort_by(|a, b| {
        a.start
            .cmp(&b.start)
            .then_with(|| (a.kind == EventKind::Task).cmp(&(b.kind == EventKind::Task)))
            .then_with(|| a.title.cmp(&b.title))
    });
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn day(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    #[test]
    fn test_project_needs_both_dates() {
        let id = Uuid::new_v4();
        assert!(CalendarEvent::project(id, "A".into(), day(2024, 1, 1), None, "ACTIVE").is_none());
        assert!(CalendarEvent::project(id, "A".into(), None, day(2024, 1, 1), "ACTIVE").is_none());

        let event =
            CalendarEvent::project(id, "A".into(), day(2024, 1, 1), day(2024, 3, 31), "ACTIVE")
                .unwrap();
        assert_eq!(event.start, at(2024, 1, 1));
        assert_eq!(event.end, at(2024, 3, 31));
        assert_eq!(event.project_id, id);
    }

    #[test]
    fn test_task_event_is_a_point() {
        let deadline = at(2024, 5, 10);
        let event = CalendarEvent::task(
            Uuid::new_v4(),
            "Ship".into(),
            deadline,
            TaskStatus::InProgress,
            Uuid::new_v4(),
        );
        assert_eq!(event.start, event.end);
        assert_eq!(event.status, "IN_PROGRESS");

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "task");
        assert!(json.get("projectId").is_some());
    }

    #[test]
    fn test_window_keeps_overlapping_events() {
        let project = CalendarEvent::project(
            Uuid::new_v4(),
            "Long".into(),
            day(2024, 1, 1),
            day(2024, 12, 31),
            "ACTIVE",
        )
        .unwrap();
        let early = CalendarEvent::task(
            Uuid::new_v4(),
            "Early".into(),
            at(2023, 12, 1),
            TaskStatus::Done,
            Uuid::new_v4(),
        );

        let events = timeline(
            [project.clone(), early],
            Some(at(2024, 6, 1)),
            Some(at(2024, 6, 30)),
        );
        assert_eq!(events, vec![project]);
    }

    #[test]
    fn test_projects_sort_before_tasks_on_same_start() {
        let start = at(2024, 2, 1);
        let task = CalendarEvent::task(
            Uuid::new_v4(),
            "A task".into(),
            start,
            TaskStatus::Todo,
            Uuid::new_v4(),
        );
        let project = CalendarEvent::project(
            Uuid::new_v4(),
            "Z project".into(),
            day(2024, 2, 1),
            day(2024, 2, 28),
            "PLANNING",
        )
        .unwrap();

        let events = timeline([task, project], None, None);
        assert_eq!(events[0].kind, EventKind::Project);
        assert_eq!(events[1].kind, EventKind::Task);
    }
}

/// Display lines for tasks
///
/// ```text
/// [Хобби] Купить молоко (до 20.10.2026 18:00)   ПРОСРОЧЕНО!
/// ```
///
/// Lines are for showing only. Callers identify tasks by [`TaskLine::id`],
/// never by parsing the text back.

use chrono::NaiveDateTime;
use serde::Serialize;
use std::fmt;

use crate::models::task::Task;

/// Format of the deadline suffix and of deadlines typed by the user
pub const DEADLINE_FORMAT: &str = "%d.%m.%Y %H:%M";

/// Appended to open tasks whose deadline has passed
pub const OVERDUE_MARKER: &str = "   ПРОСРОЧЕНО!";

/// A rendered task together with its stable id
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskLine {
    pub id: i64,
    pub text: String,
}

impl fmt::Display for TaskLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

fn base(task: &Task) -> String {
    let mut text = format!("[{}] {}", task.category, task.description);
    if let Some(deadline) = task.deadline {
        text.push_str(&format!(" (до {})", deadline.format(DEADLINE_FORMAT)));
    }
    text
}

/// Line for the open-task list: deadline suffix plus overdue marker
pub fn open_line(task: &Task, now: NaiveDateTime) -> TaskLine {
    let mut text = base(task);
    if task.is_overdue(now) {
        text.push_str(OVERDUE_MARKER);
    }
    TaskLine { id: task.id, text }
}

/// Line for search results: deadline suffix, never the overdue marker
pub fn search_line(task: &Task) -> TaskLine {
    TaskLine {
        id: task.id,
        text: base(task),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, day)
            .and_then(|d| d.and_hms_opt(hour, minute, 0))
            .expect("valid date")
    }

    fn task(deadline: Option<NaiveDateTime>) -> Task {
        Task {
            id: 42,
            user_id: 1,
            description: "Buy milk".to_string(),
            completed: false,
            created_at: Utc::now(),
            completed_at: None,
            deadline,
            category: "Hobby".to_string(),
        }
    }

    #[test]
    fn test_open_line_future_deadline() {
        let line = open_line(&task(Some(at(20, 18, 5))), at(19, 12, 0));
        assert_eq!(line.text, "[Hobby] Buy milk (до 20.10.2026 18:05)");
        assert_eq!(line.id, 42);
    }

    #[test]
    fn test_open_line_past_deadline_is_overdue() {
        let line = open_line(&task(Some(at(1, 9, 0))), at(19, 12, 0));
        assert_eq!(line.text, "[Hobby] Buy milk (до 01.10.2026 09:00)   ПРОСРОЧЕНО!");
    }

    #[test]
    fn test_open_line_deadline_equal_to_now_is_not_overdue() {
        let line = open_line(&task(Some(at(19, 12, 0))), at(19, 12, 0));
        assert!(!line.text.ends_with(OVERDUE_MARKER));
    }

    #[test]
    fn test_open_line_without_deadline() {
        let line = open_line(&task(None), at(19, 12, 0));
        assert_eq!(line.text, "[Hobby] Buy milk");
    }

    #[test]
    fn test_search_line_never_overdue() {
        let line = search_line(&task(Some(at(1, 9, 0))));
        assert_eq!(line.text, "[Hobby] Buy milk (до 01.10.2026 09:00)");
        assert_eq!(line.to_string(), line.text);
    }
}

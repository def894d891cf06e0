use std::cmp::Ordering;

use serde::Serialize;

use crate::task::Task;

/// Due date ascending, then priority (high first), then id.
///
/// Dates are compared as `YYYY-MM-DD` strings, which orders them
/// chronologically as long as they stay zero-padded.
pub fn compare(a: &Task, b: &Task) -> Ordering {
    a.due_date
        .cmp(&b.due_date)
        .then_with(|| a.priority.rank().cmp(&b.priority.rank()))
        .then_with(|| a.id.cmp(&b.id))
}

pub fn is_overdue(due_date: &str, today: &str) -> bool {
    due_date < today
}

pub fn sorted(tasks: &[Task]) -> Vec<Task> {
    let mut out = tasks.to_vec();
    out.sort_by(compare);
    out
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counts {
    pub todo: usize,
    pub done: usize,
    pub overdue: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Row {
    pub task: Task,
    pub overdue: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Board {
    pub pending: Vec<Row>,
    pub done: Vec<Row>,
    pub counts: Counts,
}

#[tracing::instrument(skip(tasks), fields(total = tasks.len()))]
pub fn classify(tasks: &[Task], today: &str) -> Board {
    let mut board = Board::default();

    for task in sorted(tasks) {
        if task.done {
            board.done.push(Row {
                task,
                overdue: false,
            });
        } else {
            let overdue = is_overdue(&task.due_date, today);
            if overdue {
                board.counts.overdue += 1;
            }
            board.pending.push(Row { task, overdue });
        }
    }

    board.counts.todo = board.pending.len();
    board.counts.done = board.done.len();
    board
}

pub fn counts(tasks: &[Task], today: &str) -> Counts {
    let mut counts = Counts::default();
    for task in tasks {
        if task.done {
            counts.done += 1;
        } else {
            counts.todo += 1;
            if is_overdue(&task.due_date, today) {
                counts.overdue += 1;
            }
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Priority;

    fn task(id: &str, due: &str, priority: Priority, done: bool) -> Task {
        Task {
            id: id.to_string(),
            title: format!("task {id}"),
            due_date: due.to_string(),
            priority,
            done,
        }
    }

    #[test]
    fn earlier_due_date_wins_over_priority() {
        let a = task("z", "2025-05-01", Priority::Low, false);
        let b = task("a", "2025-06-01", Priority::High, false);
        assert_eq!(compare(&a, &b), Ordering::Less);
        assert_eq!(compare(&b, &a), Ordering::Greater);
    }

    #[test]
    fn same_day_orders_by_priority_then_id() {
        let high = task("c", "2025-05-01", Priority::High, false);
        let medium = task("a", "2025-05-01", Priority::Medium, false);
        let low = task("b", "2025-05-01", Priority::Low, false);
        assert_eq!(compare(&high, &medium), Ordering::Less);
        assert_eq!(compare(&medium, &low), Ordering::Less);

        let twin = task("d", "2025-05-01", Priority::High, false);
        assert_eq!(compare(&high, &twin), Ordering::Less);
        assert_eq!(compare(&twin, &high), Ordering::Greater);
        assert_eq!(compare(&high, &high.clone()), Ordering::Equal);
    }

    #[test]
    fn sorts_earlier_date_first() {
        let tasks = vec![
            task("1", "2025-06-01", Priority::Low, false),
            task("2", "2025-05-01", Priority::High, false),
        ];
        let ordered = sorted(&tasks);
        assert_eq!(ordered[0].due_date, "2025-05-01");
    }

    #[test]
    fn sort_is_deterministic_regardless_of_input_order() {
        let mut tasks = vec![
            task("b", "2025-01-01", Priority::Medium, false),
            task("a", "2025-01-01", Priority::Medium, false),
            task("c", "2024-12-31", Priority::Low, false),
        ];
        let first = sorted(&tasks);
        tasks.reverse();
        assert_eq!(sorted(&tasks), first);
        let ids: Vec<&str> = first.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn overdue_is_strictly_before_today() {
        assert!(is_overdue("2025-01-01", "2025-01-02"));
        assert!(!is_overdue("2025-01-02", "2025-01-02"));
        assert!(!is_overdue("2025-01-03", "2025-01-02"));
        assert!(is_overdue("2024-12-31", "2025-01-01"));
    }

    #[test]
    fn classify_partitions_and_counts() {
        let tasks = vec![
            task("1", "2025-01-10", Priority::Low, false),
            task("2", "2025-01-01", Priority::High, false),
            task("3", "2024-12-01", Priority::Medium, true),
            task("4", "2025-01-05", Priority::Medium, false),
            task("5", "2025-02-01", Priority::Medium, true),
        ];
        let board = classify(&tasks, "2025-01-06");

        let pending: Vec<&str> = board.pending.iter().map(|r| r.task.id.as_str()).collect();
        let done: Vec<&str> = board.done.iter().map(|r| r.task.id.as_str()).collect();
        assert_eq!(pending, vec!["2", "4", "1"]);
        assert_eq!(done, vec!["3", "5"]);

        assert_eq!(
            board.counts,
            Counts {
                todo: 3,
                done: 2,
                overdue: 2
            }
        );
        assert!(board.done.iter().all(|row| !row.overdue));
        assert_eq!(counts(&tasks, "2025-01-06"), board.counts);
    }
}

use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    /// Sort rank: high sorts first.
    pub fn rank(self) -> u8 {
        match self {
            Priority::High => 0,
            Priority::Medium => 1,
            Priority::Low => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }

    /// Lenient read used for persisted records: anything that is not one of
    /// the three names becomes `Medium`.
    pub fn from_stored(raw: Option<&str>) -> Self {
        match raw {
            Some("high") => Priority::High,
            Some("low") => Priority::Low,
            _ => Priority::Medium,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" | "h" => Ok(Priority::High),
            "medium" | "m" => Ok(Priority::Medium),
            "low" | "l" => Ok(Priority::Low),
            other => Err(anyhow!("invalid priority: {other} (expected high, medium or low)")),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Task {
    pub id: String,

    pub title: String,

    #[serde(rename = "dueDate")]
    pub due_date: String,

    #[serde(default)]
    pub priority: Priority,

    #[serde(default)]
    pub done: bool,
}

impl Task {
    pub fn new_pending(title: String, due_date: String, priority: Priority) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title,
            due_date,
            priority,
            done: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_rank_orders_high_first() {
        assert!(Priority::High.rank() < Priority::Medium.rank());
        assert!(Priority::Medium.rank() < Priority::Low.rank());
    }

    #[test]
    fn stored_priority_falls_back_to_medium() {
        assert_eq!(Priority::from_stored(Some("high")), Priority::High);
        assert_eq!(Priority::from_stored(Some("low")), Priority::Low);
        assert_eq!(Priority::from_stored(Some("HIGH")), Priority::Medium);
        assert_eq!(Priority::from_stored(Some("urgent")), Priority::Medium);
        assert_eq!(Priority::from_stored(None), Priority::Medium);
    }

    #[test]
    fn serializes_with_wire_field_names() {
        let task = Task {
            id: "a1".to_string(),
            title: "Pay rent".to_string(),
            due_date: "2025-06-01".to_string(),
            priority: Priority::High,
            done: false,
        };
        let json = serde_json::to_value(&task).expect("serialize");
        assert_eq!(json["dueDate"], "2025-06-01");
        assert_eq!(json["priority"], "high");
        assert_eq!(json["done"], false);
    }

    #[test]
    fn new_pending_tasks_get_distinct_ids() {
        let a = Task::new_pending("a".into(), "2025-01-01".into(), Priority::Low);
        let b = Task::new_pending("a".into(), "2025-01-01".into(), Priority::Low);
        assert_ne!(a.id, b.id);
        assert!(!a.done);
    }
}

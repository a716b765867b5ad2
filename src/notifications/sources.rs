//! Community event sources that feed the notification list: buddy check-ins
//! and global alerts.

use super::feed::NotificationFeed;
use super::types::{Notification, NotificationCategory, NotificationPayload, NotificationTarget};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("{field} must not be blank")]
    BlankField { field: &'static str },
}

fn require(value: &str, field: &'static str) -> Result<(), SourceError> {
    if value.trim().is_empty() {
        Err(SourceError::BlankField { field })
    } else {
        Ok(())
    }
}

/// Mood recorded during a buddy check-in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mood {
    Great,
    Good,
    Okay,
    Low,
    Distressed,
}

impl Mood {
    pub fn is_concerning(self) -> bool {
        matches!(self, Mood::Low | Mood::Distressed)
    }

    pub fn label(self) -> &'static str {
        match self {
            Mood::Great => "great",
            Mood::Good => "good",
            Mood::Okay => "okay",
            Mood::Low => "low",
            Mood::Distressed => "distressed",
        }
    }
}

/// Result of checking in on a buddy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckInReport {
    pub buddy_id: String,
    pub buddy_name: String,
    pub mood: Mood,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub needs_support: bool,
}

impl CheckInReport {
    /// Flagged check-ins need someone's attention
    pub fn is_flagged(&self) -> bool {
        self.needs_support || self.mood.is_concerning()
    }

    fn payload(&self) -> NotificationPayload {
        let title = if self.needs_support {
            format!("{} needs support", self.buddy_name)
        } else {
            format!("{} is feeling {}", self.buddy_name, self.mood.label())
        };
        NotificationPayload::new(title, self.notes.trim())
            .with_target(NotificationTarget::Buddy {
                buddy_id: self.buddy_id.clone(),
            })
            .with_data(json!({
                "mood": self.mood,
                "needs_support": self.needs_support,
            }))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    Emergency,
    Weather,
    Community,
    Safety,
    Resource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertPriority {
    Low,
    Medium,
    High,
    Critical,
}

/// Community-wide alert
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertBroadcast {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: AlertKind,
    pub priority: AlertPriority,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub affected_areas: Vec<String>,
}

impl AlertBroadcast {
    fn payload(&self) -> NotificationPayload {
        NotificationPayload::new(self.title.trim(), self.message.trim())
            .with_target(NotificationTarget::Alert {
                alert_id: self.id.clone(),
            })
            .with_data(json!({
                "type": self.kind,
                "priority": self.priority,
                "affected_areas": self.affected_areas,
            }))
    }
}

impl NotificationFeed {
    /// Raise a `check_in_flag` notification when the report is flagged.
    /// Unflagged reports produce nothing.
    pub fn record_check_in(
        &self,
        report: &CheckInReport,
    ) -> Result<Option<Notification>, SourceError> {
        require(&report.buddy_id, "buddy_id")?;
        require(&report.buddy_name, "buddy_name")?;

        if !report.is_flagged() {
            tracing::debug!(
                buddy_id = %report.buddy_id,
                mood = report.mood.label(),
                "Check-in not flagged"
            );
            return Ok(None);
        }
        Ok(Some(self.add_notification(
            NotificationCategory::CheckInFlag,
            report.payload(),
        )))
    }

    /// Every alert becomes an `alert` notification
    pub fn broadcast_alert(&self, alert: &AlertBroadcast) -> Result<Notification, SourceError> {
        require(&alert.id, "id")?;
        require(&alert.title, "title")?;
        require(&alert.message, "message")?;

        if alert.priority >= AlertPriority::High {
            tracing::warn!(alert_id = %alert.id, priority = ?alert.priority, "High priority alert");
        }
        Ok(self.add_notification(NotificationCategory::Alert, alert.payload()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(mood: Mood, needs_support: bool) -> CheckInReport {
        CheckInReport {
            buddy_id: "b-1".into(),
            buddy_name: "Lola Nena".into(),
            mood,
            notes: " Missed her meds ".into(),
            needs_support,
        }
    }

    #[test]
    fn test_check_in_flagging_rules() {
        assert!(!report(Mood::Good, false).is_flagged());
        assert!(!report(Mood::Okay, false).is_flagged());
        assert!(report(Mood::Low, false).is_flagged());
        assert!(report(Mood::Distressed, false).is_flagged());
        assert!(report(Mood::Great, true).is_flagged());
    }

    #[test]
    fn test_flagged_check_in_adds_notification() {
        let feed = NotificationFeed::default();

        assert_eq!(feed.record_check_in(&report(Mood::Good, false)), Ok(None));
        assert!(feed.is_empty());

        let n = feed
            .record_check_in(&report(Mood::Okay, true))
            .unwrap()
            .unwrap();
        assert_eq!(n.category, NotificationCategory::CheckInFlag);
        assert_eq!(n.payload.title, "Lola Nena needs support");
        assert_eq!(n.payload.body, "Missed her meds");
        assert_eq!(
            n.payload.target,
            Some(NotificationTarget::Buddy {
                buddy_id: "b-1".into()
            })
        );
        assert_eq!(feed.unread_count(), 1);
    }

    #[test]
    fn test_check_in_requires_buddy() {
        let feed = NotificationFeed::default();
        let mut bad = report(Mood::Low, true);
        bad.buddy_id = "  ".into();
        assert_eq!(
            feed.record_check_in(&bad),
            Err(SourceError::BlankField { field: "buddy_id" })
        );
        assert!(feed.is_empty());
    }

    #[test]
    fn test_alert_becomes_notification() {
        let feed = NotificationFeed::default();
        let alert: AlertBroadcast = serde_json::from_value(serde_json::json!({
            "id": "a-7",
            "type": "weather",
            "priority": "critical",
            "title": "Signal No. 3",
            "message": "Evacuate low-lying barangays",
            "affected_areas": ["Marikina", "Pasig"]
        }))
        .unwrap();

        let n = feed.broadcast_alert(&alert).unwrap();
        assert_eq!(n.category, NotificationCategory::Alert);
        assert_eq!(n.payload.data["priority"], "critical");
        assert_eq!(n.payload.data["affected_areas"][1], "Pasig");
        assert_eq!(
            n.payload.target,
            Some(NotificationTarget::Alert {
                alert_id: "a-7".into()
            })
        );
    }

    #[test]
    fn test_alert_requires_title() {
        let feed = NotificationFeed::default();
        let alert = AlertBroadcast {
            id: "a-1".into(),
            kind: AlertKind::Safety,
            priority: AlertPriority::Low,
            title: String::new(),
            message: "m".into(),
            affected_areas: vec![],
        };
        assert_eq!(
            feed.broadcast_alert(&alert),
            Err(SourceError::BlankField { field: "title" })
        );
    }
}

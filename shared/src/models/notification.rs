//! Notification Model
//!
//! The core records every notification decision here before handing it to
//! the dispatcher; channel delivery itself lives outside this repo.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "db", derive(sqlx::Type), sqlx(rename_all = "snake_case"))]
pub enum NotificationStatus {
    Pending,
    Sent,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Notification {
    pub id: i64,
    pub store_id: i64,
    pub event_type: String,
    pub title: String,
    pub message: String,
    /// Related object reference, e.g. ("rule_application", "<id>").
    pub object_type: Option<String>,
    pub object_id: Option<String>,
    pub status: NotificationStatus,
    pub error_message: Option<String>,
    pub created_at: i64,
    pub sent_at: Option<i64>,
}

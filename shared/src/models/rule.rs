//! Rule and RuleApplication Models

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Inventory condition that activates rule matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    OutOfStock,
    LowStock,
    BackInStock,
}

impl TriggerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerKind::OutOfStock => "out_of_stock",
            TriggerKind::LowStock => "low_stock",
            TriggerKind::BackInStock => "back_in_stock",
        }
    }
}

impl fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed set of actions a rule can perform on a product.
///
/// Rules persist the action as text; parsing happens at application time so
/// an unknown string marks that one application failed instead of poisoning
/// list queries. Adding a variant forces every `match` to be revisited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    HideProduct,
    ShowProduct,
    ScheduleReturn,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::HideProduct => "hide_product",
            ActionKind::ShowProduct => "show_product",
            ActionKind::ScheduleReturn => "schedule_return",
        }
    }
}

impl FromStr for ActionKind {
    type Err = UnsupportedAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hide_product" => Ok(ActionKind::HideProduct),
            "show_product" => Ok(ActionKind::ShowProduct),
            "schedule_return" => Ok(ActionKind::ScheduleReturn),
            other => Err(UnsupportedAction(other.to_string())),
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Action string stored on a rule that no handler exists for.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported action type: {0}")]
pub struct UnsupportedAction(pub String);

/// A business rule owned by a store. Immutable during a single application
/// cycle; the state machine only ever reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Rule {
    pub id: i64,
    pub store_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub trigger_type: String,
    /// Threshold quantity for low-stock triggers (0 for out-of-stock).
    pub threshold: i64,
    pub action_type: String,
    pub delay_minutes: i64,
    pub auto_restore: bool,
    pub restore_after_days: i64,
    pub product_type_filter: Option<String>,
    pub vendor_filter: Option<String>,
    pub send_notification: bool,
    pub is_active: bool,
    /// Higher number = higher priority.
    pub priority: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Rule {
    /// Parse the stored action string into the closed action set.
    pub fn action(&self) -> Result<ActionKind, UnsupportedAction> {
        self.action_type.parse()
    }
}

/// Create rule payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleDraft {
    pub store_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub trigger_type: TriggerKind,
    pub threshold: i64,
    pub action_type: ActionKind,
    pub delay_minutes: i64,
    pub auto_restore: bool,
    pub restore_after_days: i64,
    pub product_type_filter: Option<String>,
    pub vendor_filter: Option<String>,
    pub send_notification: bool,
    pub priority: i64,
}

impl RuleDraft {
    /// Minimal draft: out-of-stock trigger, no delay, no filters.
    pub fn new(store_id: i64, name: impl Into<String>, action: ActionKind) -> Self {
        Self {
            store_id,
            name: name.into(),
            description: None,
            trigger_type: TriggerKind::OutOfStock,
            threshold: 0,
            action_type: action,
            delay_minutes: 0,
            auto_restore: false,
            restore_after_days: 0,
            product_type_filter: None,
            vendor_filter: None,
            send_notification: false,
            priority: 0,
        }
    }
}

/// Lifecycle states of a rule application work item.
///
/// `pending -> applied -> reversed`, with `pending -> failed`. Terminal
/// states are never re-entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "db", derive(sqlx::Type), sqlx(rename_all = "snake_case"))]
pub enum ApplicationStatus {
    Pending,
    Applied,
    Reversed,
    Failed,
}

/// The work-item record tracking one rule's lifecycle against one product.
///
/// At most one `pending` row may exist per `(rule_id, product_id)`, the
/// dedup key enforced by a partial unique index.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct RuleApplication {
    pub id: i64,
    pub rule_id: i64,
    pub product_id: i64,
    pub status: ApplicationStatus,
    pub triggered_at: i64,
    pub scheduled_for: i64,
    pub applied_at: Option<i64>,
    pub restore_scheduled_for: Option<i64>,
    pub restored_at: Option<i64>,
    pub notes: Option<String>,
}

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CallPriority {
    #[sea_orm(string_value = "high")]
    High,
    #[sea_orm(string_value = "medium")]
    Medium,
    #[sea_orm(string_value = "low")]
    Low,
}

impl CallPriority {
    /// Higher is more urgent
    pub fn rank(self) -> u8 {
        match self {
            CallPriority::High => 3,
            CallPriority::Medium => 2,
            CallPriority::Low => 1,
        }
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CallStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "contacted")]
    Contacted,
    #[sea_orm(string_value = "resolved")]
    Resolved,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl CallStatus {
    /// Requests that still need the seller's attention
    pub fn is_open(self) -> bool {
        matches!(self, CallStatus::Pending | CallStatus::Contacted)
    }

    pub fn can_transition_to(self, next: CallStatus) -> bool {
        use CallStatus::*;
        matches!(
            (self, next),
            (Pending, Contacted)
                | (Pending, Resolved)
                | (Pending, Cancelled)
                | (Contacted, Resolved)
                | (Contacted, Cancelled)
        )
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CallSource {
    #[sea_orm(string_value = "website")]
    Website,
    #[sea_orm(string_value = "chatbot")]
    Chatbot,
    #[sea_orm(string_value = "product_page")]
    ProductPage,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "call_requests")]
#[schema(as = CallRequest)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    /// Ten digit mobile number without country code
    pub phone: String,
    pub reason: String,
    pub message: Option<String>,
    pub preferred_time: Option<String>,
    pub source: CallSource,
    pub product_id: Option<Uuid>,
    pub priority: CallPriority,
    pub status: CallStatus,
    pub notes: Option<String>,
    pub contacted_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_rank_orders_high_first() {
        assert!(CallPriority::High.rank() > CallPriority::Medium.rank());
        assert!(CallPriority::Medium.rank() > CallPriority::Low.rank());
    }

    #[test]
    fn resolved_on_first_contact_is_allowed() {
        assert!(CallStatus::Pending.can_transition_to(CallStatus::Resolved));
        assert!(!CallStatus::Resolved.can_transition_to(CallStatus::Contacted));
        assert!(!CallStatus::Cancelled.can_transition_to(CallStatus::Pending));
        assert!(!CallStatus::Contacted.can_transition_to(CallStatus::Pending));
    }
}

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
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
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ShipmentStatus {
    #[sea_orm(string_value = "created")]
    Created,
    #[sea_orm(string_value = "in_transit")]
    InTransit,
    #[sea_orm(string_value = "delivered")]
    Delivered,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl ShipmentStatus {
    /// A shipment still moving the parcel; an order may hold at most one.
    pub fn is_active(self) -> bool {
        matches!(self, ShipmentStatus::Created | ShipmentStatus::InTransit)
    }

    pub fn can_transition_to(self, next: ShipmentStatus) -> bool {
        use ShipmentStatus::*;
        matches!(
            (self, next),
            (Created, InTransit)
                | (Created, Delivered)
                | (Created, Cancelled)
                | (InTransit, Delivered)
                | (InTransit, Cancelled)
        )
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "shipments")]
#[schema(as = Shipment)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub order_id: Uuid,

    /// Courier aggregator the shipment was booked with
    pub provider: String,
    pub provider_order_id: Option<String>,
    pub provider_shipment_id: Option<String>,
    pub awb_code: Option<String>,
    pub courier_id: Option<i64>,
    pub courier_name: Option<String>,

    pub status: ShipmentStatus,

    pub weight_kg: f64,
    pub chargeable_weight_kg: f64,
    pub length_cm: f64,
    pub breadth_cm: f64,
    pub height_cm: f64,
    /// Package measurements fell back to defaults for at least one item
    pub estimated: bool,

    pub freight_charge: Option<Decimal>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::order::Entity",
        from = "Column::OrderId",
        to = "super::order::Column::Id"
    )]
    Order,
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Order.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::ShipmentStatus::*;

    #[test]
    fn only_open_shipments_are_active() {
        assert!(Created.is_active());
        assert!(InTransit.is_active());
        assert!(!Delivered.is_active());
        assert!(!Cancelled.is_active());
    }

    #[test]
    fn delivered_and_cancelled_are_final() {
        assert!(InTransit.can_transition_to(Delivered));
        assert!(!Delivered.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(InTransit));
        assert!(!InTransit.can_transition_to(Created));
    }
}

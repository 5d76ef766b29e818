use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Catalog product. `specifications` holds free-text label/value pairs
/// ("Weight" => "8.5 kg") that shipping reads package measurements from.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "products")]
#[schema(as = Product)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Stock keeping unit, unique across the catalog
    #[sea_orm(unique)]
    pub sku: String,

    pub name: String,

    pub description: Option<String>,

    pub category: String,

    /// Selling price
    pub price: Decimal,

    /// Maximum retail price shown struck through on the storefront
    pub mrp: Option<Decimal>,

    pub stock_quantity: i32,

    #[schema(value_type = Object)]
    pub specifications: Json,

    #[schema(value_type = Vec<String>)]
    pub image_urls: Json,

    pub is_active: bool,

    pub is_featured: bool,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_item::Entity")]
    OrderItems,
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Specification pairs as (label, value) with non-string values stringified
    pub fn specification_pairs(&self) -> Vec<(String, String)> {
        match self.specifications.as_object() {
            Some(map) => map
                .iter()
                .map(|(k, v)| {
                    let value = match v {
                        serde_json::Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    (k.clone(), value)
                })
                .collect(),
            None => Vec::new(),
        }
    }
}

use crate::{
    db::DbPool,
    entities::{
        call_request::{self, CallPriority, CallStatus},
        notification,
        order::{self, OrderStatus},
        product,
        service_booking::{self, BookingStatus},
    },
    errors::ServiceError,
};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, EntityTrait, Iterable, PaginatorTrait, QueryFilter, QuerySelect};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;

/// Headline numbers for the seller dashboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DashboardSummary {
    pub total_products: u64,
    pub active_products: u64,
    pub low_stock_products: u64,
    pub total_orders: u64,
    pub pending_orders: u64,
    pub orders_by_status: BTreeMap<String, u64>,
    /// Sum of non-cancelled order totals
    pub revenue: Decimal,
    pub currency: String,
    pub bookings_by_status: BTreeMap<String, u64>,
    pub open_call_requests: u64,
    pub high_priority_call_requests: u64,
    pub unread_notifications: u64,
}

#[derive(Clone)]
pub struct DashboardService {
    db_pool: Arc<DbPool>,
    low_stock_threshold: i32,
    currency: String,
}

impl DashboardService {
    pub fn new(db_pool: Arc<DbPool>, low_stock_threshold: i32, currency: String) -> Self {
        Self {
            db_pool,
            low_stock_threshold,
            currency,
        }
    }

    #[instrument(skip(self))]
    pub async fn summary(&self) -> Result<DashboardSummary, ServiceError> {
        let db = &*self.db_pool;

        let total_products = product::Entity::find().count(db).await?;
        let active_products = product::Entity::find()
            .filter(product::Column::IsActive.eq(true))
            .count(db)
            .await?;
        let low_stock_products = product::Entity::find()
            .filter(product::Column::IsActive.eq(true))
            .filter(product::Column::StockQuantity.lte(self.low_stock_threshold))
            .count(db)
            .await?;

        let mut orders_by_status = BTreeMap::new();
        let mut total_orders = 0;
        for status in OrderStatus::iter() {
            let count = order::Entity::find()
                .filter(order::Column::Status.eq(status))
                .count(db)
                .await?;
            total_orders += count;
            orders_by_status.insert(status.to_string(), count);
        }
        let pending_orders = orders_by_status
            .get(&OrderStatus::Pending.to_string())
            .copied()
            .unwrap_or(0);

        // Summed in Rust; SQLite has no exact decimal aggregate
        let totals: Vec<Decimal> = order::Entity::find()
            .select_only()
            .column(order::Column::Total)
            .filter(order::Column::Status.ne(OrderStatus::Cancelled))
            .into_tuple()
            .all(db)
            .await?;
        let revenue = totals.into_iter().sum();

        let mut bookings_by_status = BTreeMap::new();
        for status in BookingStatus::iter() {
            let count = service_booking::Entity::find()
                .filter(service_booking::Column::Status.eq(status))
                .count(db)
                .await?;
            bookings_by_status.insert(status.to_string(), count);
        }

        let open_calls = || {
            call_request::Entity::find().filter(
                call_request::Column::Status.is_in([CallStatus::Pending, CallStatus::Contacted]),
            )
        };
        let open_call_requests = open_calls().count(db).await?;
        let high_priority_call_requests = open_calls()
            .filter(call_request::Column::Priority.eq(CallPriority::High))
            .count(db)
            .await?;

        let unread_notifications = notification::Entity::find()
            .filter(notification::Column::IsRead.eq(false))
            .count(db)
            .await?;

        Ok(DashboardSummary {
            total_products,
            active_products,
            low_stock_products,
            total_orders,
            pending_orders,
            orders_by_status,
            revenue,
            currency: self.currency.clone(),
            bookings_by_status,
            open_call_requests,
            high_priority_call_requests,
            unread_notifications,
        })
    }
}

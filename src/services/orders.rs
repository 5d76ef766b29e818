use crate::{
    config::AppConfig,
    db::DbPool,
    entities::{
        order::{
            self, ActiveModel as OrderActiveModel, Entity as OrderEntity, Model as OrderModel,
            OrderStatus, PaymentMethod, PaymentStatus,
        },
        order_item::{self, Entity as OrderItemEntity, Model as OrderItemModel},
        product::Entity as ProductEntity,
        shipment::{self, ShipmentStatus},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        clean_optional, generate_reference, normalize_phone, products::shift_stock,
        validate_pincode_field, PageLimits,
    },
    PaginatedResponse,
};
use chrono::{DateTime, Utc};
use metrics::counter;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

/// Most units of a single product accepted on one order
const MAX_LINE_QUANTITY: i32 = 100;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct OrderItemRequest {
    pub product_id: Uuid,
    #[validate(range(min = 1, max = 100, message = "Quantity must be between 1 and 100"))]
    pub quantity: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateOrderRequest {
    #[validate(length(min = 2, max = 100, message = "Name must be between 2 and 100 characters"))]
    pub customer_name: String,
    #[validate(email(message = "Invalid email address"))]
    pub customer_email: String,
    pub customer_phone: String,
    #[validate(length(min = 5, max = 255, message = "Address is required"))]
    pub address_line1: String,
    #[validate(length(max = 255))]
    pub address_line2: Option<String>,
    #[validate(length(min = 2, max = 100))]
    pub city: String,
    #[validate(length(min = 2, max = 100))]
    pub state: String,
    #[validate(custom = "validate_pincode_field")]
    pub pincode: String,
    pub payment_method: PaymentMethod,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
    #[validate(length(min = 1, message = "An order needs at least one item"))]
    #[validate]
    pub items: Vec<OrderItemRequest>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
    /// Stored as the cancellation reason when cancelling
    #[validate(length(max = 500))]
    pub note: Option<String>,
    /// Manual tracking details when shipping outside the courier integration
    #[validate(length(min = 1, max = 64))]
    pub tracking_number: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub courier_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CancelOrderRequest {
    #[validate(length(min = 3, max = 500, message = "A cancellation reason is required"))]
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdatePaymentRequest {
    pub payment_status: PaymentStatus,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct OrderListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub status: Option<OrderStatus>,
    pub customer_email: Option<String>,
    /// Order number or customer name fragment
    pub search: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct CustomerListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    /// Name, email or phone fragment
    pub search: Option<String>,
}

/// Order with its lines
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderDetails {
    #[serde(flatten)]
    pub order: OrderModel,
    pub items: Vec<OrderItemModel>,
}

/// Customer aggregated from the orders placed under one email address
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CustomerSummary {
    pub email: String,
    pub name: String,
    pub phone: String,
    pub order_count: u64,
    /// Sum of non-cancelled order totals
    pub total_spent: Decimal,
    pub last_order_at: DateTime<Utc>,
}

/// Checkout pricing rules
#[derive(Debug, Clone)]
pub struct CheckoutSettings {
    pub currency: String,
    pub free_shipping_threshold: Decimal,
    pub standard_shipping_fee: Decimal,
    pub low_stock_threshold: i32,
}

impl CheckoutSettings {
    pub fn from_config(cfg: &AppConfig) -> Self {
        Self {
            currency: cfg.currency.clone(),
            free_shipping_threshold: cfg.free_shipping_threshold,
            standard_shipping_fee: cfg.standard_shipping_fee,
            low_stock_threshold: cfg.low_stock_threshold,
        }
    }

    pub fn shipping_fee_for(&self, subtotal: Decimal) -> Decimal {
        if subtotal >= self.free_shipping_threshold {
            Decimal::ZERO
        } else {
            self.standard_shipping_fee
        }
    }
}

/// Moves an order to `next` on `conn`, enforcing the lifecycle. `apply`
/// sets any extra columns. Delivering a cash-on-delivery order settles it.
pub(crate) async fn transition_order<C, F>(
    conn: &C,
    order: OrderModel,
    next: OrderStatus,
    apply: F,
) -> Result<OrderModel, ServiceError>
where
    C: ConnectionTrait,
    F: FnOnce(&mut OrderActiveModel),
{
    if order.status == next {
        return Err(ServiceError::InvalidStatus(format!(
            "Order {} is already {}",
            order.order_number, next
        )));
    }
    if !order.status.can_transition_to(next) {
        return Err(ServiceError::InvalidStatus(format!(
            "Order {} cannot move from {} to {}",
            order.order_number, order.status, next
        )));
    }

    let settle_cod = next == OrderStatus::Delivered
        && order.payment_method == PaymentMethod::Cod
        && order.payment_status == PaymentStatus::Pending;

    let mut model: OrderActiveModel = order.into();
    model.status = Set(next);
    if settle_cod {
        model.payment_status = Set(PaymentStatus::Paid);
    }
    apply(&mut model);
    model.updated_at = Set(Utc::now());

    Ok(model.update(conn).await?)
}

/// Shipments of the order still with the courier
pub(crate) async fn active_shipments<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
) -> Result<u64, ServiceError> {
    Ok(shipment::Entity::find()
        .filter(shipment::Column::OrderId.eq(order_id))
        .filter(shipment::Column::Status.is_in([ShipmentStatus::Created, ShipmentStatus::InTransit]))
        .count(conn)
        .await?)
}

/// Checkout, order lifecycle and the seller's customer view
#[derive(Clone)]
pub struct OrderService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    settings: CheckoutSettings,
    page_limits: PageLimits,
}

impl OrderService {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        settings: CheckoutSettings,
        page_limits: PageLimits,
    ) -> Self {
        Self {
            db_pool,
            event_sender,
            settings,
            page_limits,
        }
    }

    /// Places an order. Prices come from the catalog and stock is taken in
    /// the same transaction as the order rows.
    #[instrument(skip(self, request), fields(items = request.items.len()))]
    pub async fn create_order(
        &self,
        request: CreateOrderRequest,
    ) -> Result<OrderDetails, ServiceError> {
        request.validate()?;
        let phone = normalize_phone(&request.customer_phone)?;

        // Merge repeated lines for the same product
        let mut quantities: BTreeMap<Uuid, i32> = BTreeMap::new();
        for item in &request.items {
            *quantities.entry(item.product_id).or_insert(0) += item.quantity;
        }
        if let Some((product_id, _)) = quantities.iter().find(|(_, q)| **q > MAX_LINE_QUANTITY) {
            return Err(ServiceError::ValidationError(format!(
                "At most {} units of product {} per order",
                MAX_LINE_QUANTITY, product_id
            )));
        }

        let now = Utc::now();
        let order_id = Uuid::new_v4();
        let txn = self.db_pool.begin().await.map_err(|e| {
            error!(error = %e, "Failed to begin order transaction");
            ServiceError::db_error(e)
        })?;

        let mut subtotal = Decimal::ZERO;
        let mut lines = Vec::with_capacity(quantities.len());
        let mut crossed_threshold = Vec::new();

        for (product_id, quantity) in &quantities {
            let product = ProductEntity::find_by_id(*product_id)
                .one(&txn)
                .await?
                .filter(|p| p.is_active)
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("Product {} is not available", product_id))
                })?;

            if product.stock_quantity < *quantity {
                return Err(ServiceError::InsufficientStock(format!(
                    "Only {} unit(s) of {} left",
                    product.stock_quantity, product.name
                )));
            }

            let remaining = product.stock_quantity - quantity;
            if product.stock_quantity > self.settings.low_stock_threshold
                && remaining <= self.settings.low_stock_threshold
            {
                crossed_threshold.push(Event::LowStock {
                    product_id: product.id,
                    name: product.name.clone(),
                    sku: product.sku.clone(),
                    stock_quantity: remaining,
                });
            }

            let line_total = product.price * Decimal::from(*quantity);
            subtotal += line_total;
            lines.push(order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                product_id: Set(product.id),
                product_name: Set(product.name.clone()),
                sku: Set(product.sku.clone()),
                unit_price: Set(product.price),
                quantity: Set(*quantity),
                line_total: Set(line_total),
            });

            // Guarded decrement; a concurrent checkout that got there first fails it
            if !shift_stock(&txn, product.id, -*quantity).await? {
                return Err(ServiceError::InsufficientStock(format!(
                    "{} sold out while placing the order",
                    product.name
                )));
            }
        }

        let shipping_fee = self.settings.shipping_fee_for(subtotal);
        let order = OrderActiveModel {
            id: Set(order_id),
            order_number: Set(generate_reference("ORD", now)),
            customer_name: Set(request.customer_name.trim().to_string()),
            customer_email: Set(request.customer_email.trim().to_lowercase()),
            customer_phone: Set(phone),
            address_line1: Set(request.address_line1.trim().to_string()),
            address_line2: Set(clean_optional(request.address_line2)),
            city: Set(request.city.trim().to_string()),
            state: Set(request.state.trim().to_string()),
            pincode: Set(request.pincode.trim().to_string()),
            status: Set(OrderStatus::Pending),
            payment_method: Set(request.payment_method),
            payment_status: Set(PaymentStatus::Pending),
            subtotal: Set(subtotal),
            shipping_fee: Set(shipping_fee),
            total: Set(subtotal + shipping_fee),
            currency: Set(self.settings.currency.clone()),
            notes: Set(clean_optional(request.notes)),
            tracking_number: Set(None),
            courier_name: Set(None),
            cancellation_reason: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to insert order");
            ServiceError::db_error(e)
        })?;

        let mut items = Vec::with_capacity(lines.len());
        for line in lines {
            items.push(line.insert(&txn).await?);
        }

        txn.commit().await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to commit order");
            ServiceError::db_error(e)
        })?;

        counter!("aquacare_orders.created", 1, "payment_method" => order.payment_method.to_string());
        info!(
            order_id = %order.id,
            order_number = %order.order_number,
            total = %order.total,
            "Order created"
        );

        self.event_sender
            .send_or_log(Event::OrderCreated(order.id))
            .await;
        for event in crossed_threshold {
            self.event_sender.send_or_log(event).await;
        }

        Ok(OrderDetails { order, items })
    }

    #[instrument(skip(self))]
    pub async fn get_order(&self, order_id: Uuid) -> Result<OrderModel, ServiceError> {
        OrderEntity::find_by_id(order_id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))
    }

    #[instrument(skip(self))]
    pub async fn get_order_by_number(
        &self,
        order_number: &str,
    ) -> Result<OrderModel, ServiceError> {
        let order_number = order_number.trim().to_uppercase();
        OrderEntity::find()
            .filter(order::Column::OrderNumber.eq(order_number.as_str()))
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_number)))
    }

    #[instrument(skip(self))]
    pub async fn get_order_items(
        &self,
        order_id: Uuid,
    ) -> Result<Vec<OrderItemModel>, ServiceError> {
        self.get_order(order_id).await?;
        let items = OrderItemEntity::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .order_by_asc(order_item::Column::ProductName)
            .all(&*self.db_pool)
            .await?;
        Ok(items)
    }

    pub async fn get_order_details(&self, order_id: Uuid) -> Result<OrderDetails, ServiceError> {
        let order = self.get_order(order_id).await?;
        let items = self.get_order_items(order_id).await?;
        Ok(OrderDetails { order, items })
    }

    #[instrument(skip(self, query))]
    pub async fn list_orders(
        &self,
        query: OrderListQuery,
    ) -> Result<PaginatedResponse<OrderModel>, ServiceError> {
        let (page, limit) = self.page_limits.resolve(query.page, query.limit);
        let mut select = OrderEntity::find();

        if let Some(status) = query.status {
            select = select.filter(order::Column::Status.eq(status));
        }
        if let Some(email) = query
            .customer_email
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
        {
            select = select.filter(order::Column::CustomerEmail.eq(email.to_lowercase()));
        }
        if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            select = select.filter(
                Condition::any()
                    .add(order::Column::OrderNumber.contains(search.to_uppercase()))
                    .add(order::Column::CustomerName.contains(search)),
            );
        }
        if let Some(from) = query.from {
            select = select.filter(order::Column::CreatedAt.gte(from));
        }
        if let Some(to) = query.to {
            select = select.filter(order::Column::CreatedAt.lte(to));
        }

        let paginator = select
            .order_by_desc(order::Column::CreatedAt)
            .order_by_asc(order::Column::Id)
            .paginate(&*self.db_pool, limit);
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page - 1).await?;

        Ok(PaginatedResponse::new(items, total, page, limit))
    }

    /// Seller status update. Cancelling goes through [`Self::cancel_order`]
    /// so stock is returned; withdrawing a shipment is the only way back
    /// from shipped.
    #[instrument(skip(self, request), fields(status = %request.status))]
    pub async fn update_status(
        &self,
        order_id: Uuid,
        request: UpdateOrderStatusRequest,
    ) -> Result<OrderModel, ServiceError> {
        request.validate()?;

        if request.status == OrderStatus::Cancelled {
            let reason = clean_optional(request.note)
                .unwrap_or_else(|| "Cancelled by seller".to_string());
            return self.cancel_order(order_id, CancelOrderRequest { reason }).await;
        }

        let existing = self.get_order(order_id).await?;
        if existing.status == OrderStatus::Shipped && request.status == OrderStatus::Processing {
            return Err(ServiceError::InvalidStatus(
                "Cancel the active shipment to move a shipped order back to processing"
                    .to_string(),
            ));
        }

        // A booked parcel drives shipped/delivered through the shipment endpoints
        if matches!(request.status, OrderStatus::Shipped | OrderStatus::Delivered)
            && active_shipments(&*self.db_pool, order_id).await? > 0
        {
            return Err(ServiceError::Conflict(format!(
                "Order {} has an active courier shipment; update the shipment instead",
                existing.order_number
            )));
        }

        let old_status = existing.status;
        let tracking_number = clean_optional(request.tracking_number);
        let courier_name = clean_optional(request.courier_name);
        let next = request.status;

        let updated = transition_order(&*self.db_pool, existing, next, |model| {
            if next == OrderStatus::Shipped {
                if let Some(tracking) = tracking_number {
                    model.tracking_number = Set(Some(tracking));
                }
                if let Some(courier) = courier_name {
                    model.courier_name = Set(Some(courier));
                }
            }
        })
        .await?;

        info!(
            order_id = %order_id,
            from = %old_status,
            to = %updated.status,
            "Order status updated"
        );
        self.event_sender
            .send_or_log(Event::OrderStatusChanged {
                order_id,
                old_status,
                new_status: updated.status,
            })
            .await;

        Ok(updated)
    }

    /// Cancels the order and returns every line to stock. Paid orders are
    /// flagged for refund.
    #[instrument(skip(self, request))]
    pub async fn cancel_order(
        &self,
        order_id: Uuid,
        request: CancelOrderRequest,
    ) -> Result<OrderModel, ServiceError> {
        request.validate()?;
        let txn = self.db_pool.begin().await?;

        let existing = OrderEntity::find_by_id(order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        if active_shipments(&txn, order_id).await? > 0 {
            return Err(ServiceError::Conflict(format!(
                "Order {} has an active shipment; cancel the shipment first",
                existing.order_number
            )));
        }

        let items = OrderItemEntity::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .all(&txn)
            .await?;

        let old_status = existing.status;
        let refund = existing.payment_status == PaymentStatus::Paid;
        let reason = request.reason.trim().to_string();

        let updated = transition_order(&txn, existing, OrderStatus::Cancelled, |model| {
            model.cancellation_reason = Set(Some(reason));
            if refund {
                model.payment_status = Set(PaymentStatus::Refunded);
            }
        })
        .await?;

        for item in &items {
            if !shift_stock(&txn, item.product_id, item.quantity).await? {
                warn!(
                    product_id = %item.product_id,
                    quantity = item.quantity,
                    "Cannot restock missing or saturated product"
                );
            }
        }

        txn.commit().await?;

        counter!("aquacare_orders.cancelled", 1);
        info!(order_id = %order_id, refund, restocked_lines = items.len(), "Order cancelled");
        self.event_sender
            .send_or_log(Event::OrderStatusChanged {
                order_id,
                old_status,
                new_status: OrderStatus::Cancelled,
            })
            .await;

        Ok(updated)
    }

    #[instrument(skip(self, request), fields(payment_status = %request.payment_status))]
    pub async fn update_payment_status(
        &self,
        order_id: Uuid,
        request: UpdatePaymentRequest,
    ) -> Result<OrderModel, ServiceError> {
        let existing = self.get_order(order_id).await?;
        let current = existing.payment_status;
        let next = request.payment_status;

        let allowed = match (current, next) {
            (PaymentStatus::Pending, PaymentStatus::Paid) => {
                existing.status != OrderStatus::Cancelled
            }
            (PaymentStatus::Paid, PaymentStatus::Refunded) => true,
            _ => false,
        };
        if !allowed {
            return Err(ServiceError::InvalidStatus(format!(
                "Payment for order {} cannot move from {} to {}",
                existing.order_number, current, next
            )));
        }

        let mut model: OrderActiveModel = existing.into();
        model.payment_status = Set(next);
        model.updated_at = Set(Utc::now());
        let updated = model.update(&*self.db_pool).await?;

        info!(order_id = %order_id, from = %current, to = %next, "Payment status updated");
        Ok(updated)
    }

    /// Customers derived from orders, most recent buyer first. The database
    /// groups and pages the emails; only the page's orders are loaded.
    #[instrument(skip(self, query))]
    pub async fn list_customers(
        &self,
        query: CustomerListQuery,
    ) -> Result<PaginatedResponse<CustomerSummary>, ServiceError> {
        let (page, limit) = self.page_limits.resolve(query.page, query.limit);
        let db = &*self.db_pool;

        let search = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|search| {
                Condition::any()
                    .add(order::Column::CustomerName.contains(search))
                    .add(order::Column::CustomerEmail.contains(search.to_lowercase()))
                    .add(order::Column::CustomerPhone.contains(search))
            });

        let mut grouped = OrderEntity::find()
            .select_only()
            .column(order::Column::CustomerEmail)
            .column_as(order::Column::Id.count(), "order_count")
            .group_by(order::Column::CustomerEmail)
            .order_by_desc(order::Column::CreatedAt.max())
            .order_by_asc(order::Column::CustomerEmail);
        if let Some(condition) = search.clone() {
            grouped = grouped.filter(condition);
        }
        let paginator = grouped.into_tuple::<(String, i64)>().paginate(db, limit);
        let total = paginator.num_items().await?;
        let emails: Vec<String> = paginator
            .fetch_page(page - 1)
            .await?
            .into_iter()
            .map(|(email, _)| email)
            .collect();

        if emails.is_empty() {
            return Ok(PaginatedResponse::new(Vec::new(), total, page, limit));
        }
        let mut select = OrderEntity::find().filter(order::Column::CustomerEmail.is_in(emails));
        if let Some(condition) = search {
            select = select.filter(condition);
        }
        let orders = select.all(db).await?;

        Ok(PaginatedResponse::new(
            summarize_customers(&orders),
            total,
            page,
            limit,
        ))
    }
}

/// Groups orders by customer email. Name and phone come from the newest
/// order; the result is sorted by last order, newest first.
pub fn summarize_customers(orders: &[OrderModel]) -> Vec<CustomerSummary> {
    let mut by_email: HashMap<&str, CustomerSummary> = HashMap::new();

    for order in orders {
        let spent = if order.status == OrderStatus::Cancelled {
            Decimal::ZERO
        } else {
            order.total
        };

        by_email
            .entry(order.customer_email.as_str())
            .and_modify(|c| {
                c.order_count += 1;
                c.total_spent += spent;
                if order.created_at > c.last_order_at {
                    c.last_order_at = order.created_at;
                    c.name = order.customer_name.clone();
                    c.phone = order.customer_phone.clone();
                }
            })
            .or_insert_with(|| CustomerSummary {
                email: order.customer_email.clone(),
                name: order.customer_name.clone(),
                phone: order.customer_phone.clone(),
                order_count: 1,
                total_spent: spent,
                last_order_at: order.created_at,
            });
    }

    let mut customers: Vec<CustomerSummary> = by_email.into_values().collect();
    customers.sort_by(|a, b| {
        b.last_order_at
            .cmp(&a.last_order_at)
            .then_with(|| a.email.cmp(&b.email))
    });
    customers
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn settings() -> CheckoutSettings {
        CheckoutSettings {
            currency: "INR".into(),
            free_shipping_threshold: dec!(1000),
            standard_shipping_fee: dec!(99),
            low_stock_threshold: 5,
        }
    }

    fn order(email: &str, name: &str, total: Decimal, status: OrderStatus, age_days: i64) -> OrderModel {
        let created = Utc::now() - Duration::days(age_days);
        OrderModel {
            id: Uuid::new_v4(),
            order_number: generate_reference("ORD", created),
            customer_name: name.into(),
            customer_email: email.into(),
            customer_phone: "9876543210".into(),
            address_line1: "12 MG Road".into(),
            address_line2: None,
            city: "Pune".into(),
            state: "Maharashtra".into(),
            pincode: "411001".into(),
            status,
            payment_method: PaymentMethod::Cod,
            payment_status: PaymentStatus::Pending,
            subtotal: total,
            shipping_fee: Decimal::ZERO,
            total,
            currency: "INR".into(),
            notes: None,
            tracking_number: None,
            courier_name: None,
            cancellation_reason: None,
            created_at: created,
            updated_at: created,
        }
    }

    #[test]
    fn free_shipping_applies_at_threshold() {
        let s = settings();
        assert_eq!(s.shipping_fee_for(dec!(999.99)), dec!(99));
        assert_eq!(s.shipping_fee_for(dec!(1000)), Decimal::ZERO);
        assert_eq!(s.shipping_fee_for(dec!(15999)), Decimal::ZERO);
    }

    #[test]
    fn customers_are_grouped_by_email_and_ignore_cancelled_spend() {
        let orders = vec![
            order("asha@example.com", "Asha R", dec!(12999), OrderStatus::Delivered, 10),
            order("asha@example.com", "Asha Rao", dec!(499), OrderStatus::Cancelled, 1),
            order("vikram@example.com", "Vikram", dec!(8999), OrderStatus::Pending, 3),
        ];

        let customers = summarize_customers(&orders);
        assert_eq!(customers.len(), 2);
        assert_eq!(customers[0].email, "asha@example.com");
        assert_eq!(customers[0].name, "Asha Rao");
        assert_eq!(customers[0].order_count, 2);
        assert_eq!(customers[0].total_spent, dec!(12999));
        assert_eq!(customers[1].email, "vikram@example.com");
    }

    #[test]
    fn create_request_requires_items_and_valid_fields() {
        let request = CreateOrderRequest {
            customer_name: "A".into(),
            customer_email: "not-an-email".into(),
            customer_phone: "9876543210".into(),
            address_line1: "12 MG Road".into(),
            address_line2: None,
            city: "Pune".into(),
            state: "Maharashtra".into(),
            pincode: "011001".into(),
            payment_method: PaymentMethod::Prepaid,
            notes: None,
            items: vec![],
        };
        let errors = request.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("customer_name"));
        assert!(fields.contains_key("customer_email"));
        assert!(fields.contains_key("pincode"));
        assert!(fields.contains_key("items"));
    }
}

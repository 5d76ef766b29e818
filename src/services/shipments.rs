use crate::{
    db::DbPool,
    entities::{
        order::{self, Entity as OrderEntity, Model as OrderModel, OrderStatus},
        order_item::{self, Entity as OrderItemEntity},
        product::Entity as ProductEntity,
        shipment::{
            self, ActiveModel as ShipmentActiveModel, Entity as ShipmentEntity,
            Model as ShipmentModel, ShipmentStatus,
        },
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        courier::{
            CourierClient, CourierRate, CreatedShipment, RateRequest, ShipmentItem, ShipmentRequest,
        },
        is_valid_pincode,
        orders::{active_shipments, transition_order},
        packaging::{ItemMeasurements, PackageCalculator, PackageDetails},
        validate_pincode_field, PageLimits,
    },
    PaginatedResponse,
};
use chrono::Utc;
use metrics::counter;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

/// Parcel and courier options for a delivery
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ShippingQuote {
    pub pickup_pincode: String,
    pub delivery_pincode: String,
    pub cod: bool,
    pub package: PackageDetails,
    /// Cheapest first
    pub rates: Vec<CourierRate>,
    pub cheapest: Option<CourierRate>,
}

#[derive(Debug, Clone, Deserialize, Validate, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct ShippingEstimateQuery {
    pub product_id: Uuid,
    #[serde(default = "default_quantity")]
    #[validate(range(min = 1, max = 100))]
    pub quantity: u32,
    #[validate(custom = "validate_pincode_field")]
    pub pincode: String,
    #[serde(default)]
    pub cod: bool,
}

fn default_quantity() -> u32 {
    1
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CreateShipmentRequest {
    /// Courier from the quote; the cheapest serviceable courier when absent
    pub courier_id: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct ShipmentListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub status: Option<ShipmentStatus>,
}

/// Order-to-shipment flow: package calculation, courier selection and the
/// shipment lifecycle
#[derive(Clone)]
pub struct ShipmentService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    courier: Arc<dyn CourierClient>,
    packaging: PackageCalculator,
    pickup_pincode: String,
    page_limits: PageLimits,
}

impl ShipmentService {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        courier: Arc<dyn CourierClient>,
        packaging: PackageCalculator,
        pickup_pincode: String,
        page_limits: PageLimits,
    ) -> Self {
        Self {
            db_pool,
            event_sender,
            courier,
            packaging,
            pickup_pincode,
            page_limits,
        }
    }

    pub fn courier_provider(&self) -> &'static str {
        self.courier.provider()
    }

    /// Package and rates for an existing order
    #[instrument(skip(self))]
    pub async fn quote_order(&self, order_id: Uuid) -> Result<ShippingQuote, ServiceError> {
        let order = self.load_order(order_id).await?;
        let package = self.package_for_order(&*self.db_pool, order_id).await?;
        self.quote(&order.pincode, package, order.payment_method.is_cod(), order.subtotal)
            .await
    }

    /// Storefront estimate for buying `quantity` of one product
    #[instrument(skip(self, query), fields(pincode = %query.pincode))]
    pub async fn estimate(
        &self,
        query: ShippingEstimateQuery,
    ) -> Result<ShippingQuote, ServiceError> {
        query.validate()?;
        let product = ProductEntity::find_by_id(query.product_id)
            .one(&*self.db_pool)
            .await?
            .filter(|p| p.is_active)
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Product {} not found", query.product_id))
            })?;

        let unit = self.packaging.measure_product(&product);
        let package = self.packaging.aggregate(&[(unit, query.quantity)]);
        let declared_value = product.price * Decimal::from(query.quantity);
        self.quote(query.pincode.trim(), package, query.cod, declared_value)
            .await
    }

    async fn quote(
        &self,
        delivery_pincode: &str,
        package: PackageDetails,
        cod: bool,
        declared_value: Decimal,
    ) -> Result<ShippingQuote, ServiceError> {
        if !is_valid_pincode(delivery_pincode) {
            return Err(ServiceError::ValidationError(format!(
                "Invalid delivery pincode {}",
                delivery_pincode
            )));
        }

        let mut rates = self
            .courier
            .fetch_rates(&RateRequest {
                pickup_pincode: self.pickup_pincode.clone(),
                delivery_pincode: delivery_pincode.to_string(),
                weight_kg: package.chargeable_weight_kg,
                length_cm: package.length_cm,
                breadth_cm: package.breadth_cm,
                height_cm: package.height_cm,
                cod,
                declared_value,
            })
            .await?;
        if cod {
            rates.retain(|r| r.cod_available);
        }
        sort_rates(&mut rates);

        Ok(ShippingQuote {
            pickup_pincode: self.pickup_pincode.clone(),
            delivery_pincode: delivery_pincode.to_string(),
            cod,
            cheapest: rates.first().cloned(),
            rates,
            package,
        })
    }

    /// Books the order with the courier. With an AWB the order is shipped;
    /// without one it waits in processing until the AWB is assigned.
    #[instrument(skip(self, request), fields(courier_id = ?request.courier_id))]
    pub async fn create_shipment(
        &self,
        order_id: Uuid,
        request: CreateShipmentRequest,
    ) -> Result<ShipmentModel, ServiceError> {
        let order = self.load_order(order_id).await?;
        if !order.status.is_shippable() {
            return Err(ServiceError::InvalidStatus(format!(
                "Order {} is {} and cannot be shipped",
                order.order_number, order.status
            )));
        }
        self.ensure_no_active_shipment(&*self.db_pool, &order).await?;

        let items = OrderItemEntity::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .order_by_asc(order_item::Column::ProductName)
            .all(&*self.db_pool)
            .await?;
        let package = self.package_for_order(&*self.db_pool, order_id).await?;
        let quote = self
            .quote(
                &order.pincode,
                package.clone(),
                order.payment_method.is_cod(),
                order.subtotal,
            )
            .await?;
        let rate = choose_rate(&quote.rates, request.courier_id)?;

        let created = self
            .courier
            .create_shipment(&ShipmentRequest {
                order_number: order.order_number.clone(),
                order_date: order.created_at,
                customer_name: order.customer_name.clone(),
                customer_email: order.customer_email.clone(),
                customer_phone: order.customer_phone.clone(),
                address_line1: order.address_line1.clone(),
                address_line2: order.address_line2.clone(),
                city: order.city.clone(),
                state: order.state.clone(),
                pincode: order.pincode.clone(),
                payment_method: order.payment_method,
                sub_total: order.subtotal,
                items: items
                    .iter()
                    .map(|item| ShipmentItem {
                        name: item.product_name.clone(),
                        sku: item.sku.clone(),
                        units: item.quantity,
                        selling_price: item.unit_price,
                    })
                    .collect(),
                weight_kg: package.chargeable_weight_kg,
                length_cm: package.length_cm,
                breadth_cm: package.breadth_cm,
                height_cm: package.height_cm,
                courier_id: Some(rate.courier_id),
            })
            .await
            .map_err(|e| {
                counter!("aquacare_shipments.booking_failed", 1);
                e
            })?;

        let (shipment, old_status, next) = self
            .record_booking(&order, &created, &rate, &package)
            .await
            .map_err(|e| {
                error!(
                    order_id = %order_id,
                    provider_order_id = %created.provider_order_id,
                    error = %e,
                    "Courier booking could not be recorded; cancel it with the provider"
                );
                e
            })?;

        counter!("aquacare_shipments.created", 1, "with_awb" => created.awb_code.is_some().to_string());
        info!(
            shipment_id = %shipment.id,
            order_id = %order_id,
            courier = shipment.courier_name.as_deref().unwrap_or("-"),
            awb = shipment.awb_code.as_deref().unwrap_or("-"),
            "Shipment created"
        );
        if shipment.awb_code.is_none() {
            warn!(shipment_id = %shipment.id, "Shipment booked without AWB");
        }

        self.event_sender
            .send_or_log(Event::ShipmentCreated {
                shipment_id: shipment.id,
                order_id,
            })
            .await;
        if let Some(next) = next {
            self.event_sender
                .send_or_log(Event::OrderStatusChanged {
                    order_id,
                    old_status,
                    new_status: next,
                })
                .await;
        }

        Ok(shipment)
    }

    #[instrument(skip(self))]
    pub async fn get_shipment(&self, shipment_id: Uuid) -> Result<ShipmentModel, ServiceError> {
        ShipmentEntity::find_by_id(shipment_id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Shipment {} not found", shipment_id)))
    }

    #[instrument(skip(self, query))]
    pub async fn list_shipments(
        &self,
        query: ShipmentListQuery,
    ) -> Result<PaginatedResponse<ShipmentModel>, ServiceError> {
        let (page, limit) = self.page_limits.resolve(query.page, query.limit);
        let mut select = ShipmentEntity::find();
        if let Some(status) = query.status {
            select = select.filter(shipment::Column::Status.eq(status));
        }

        let paginator = select
            .order_by_desc(shipment::Column::CreatedAt)
            .order_by_asc(shipment::Column::Id)
            .paginate(&*self.db_pool, limit);
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page - 1).await?;
        Ok(PaginatedResponse::new(items, total, page, limit))
    }

    #[instrument(skip(self))]
    pub async fn shipments_for_order(
        &self,
        order_id: Uuid,
    ) -> Result<Vec<ShipmentModel>, ServiceError> {
        self.load_order(order_id).await?;
        let shipments = ShipmentEntity::find()
            .filter(shipment::Column::OrderId.eq(order_id))
            .order_by_desc(shipment::Column::CreatedAt)
            .all(&*self.db_pool)
            .await?;
        Ok(shipments)
    }

    #[instrument(skip(self))]
    pub async fn mark_in_transit(&self, shipment_id: Uuid) -> Result<ShipmentModel, ServiceError> {
        let existing = self.get_shipment(shipment_id).await?;
        let updated = transition_shipment(&*self.db_pool, existing, ShipmentStatus::InTransit)
            .await?;
        info!(shipment_id = %shipment_id, "Shipment in transit");
        Ok(updated)
    }

    /// Marks the parcel delivered and completes the order
    #[instrument(skip(self))]
    pub async fn mark_delivered(&self, shipment_id: Uuid) -> Result<ShipmentModel, ServiceError> {
        let txn = self.db_pool.begin().await?;
        let existing = ShipmentEntity::find_by_id(shipment_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Shipment {} not found", shipment_id)))?;
        let order_id = existing.order_id;
        let updated = transition_shipment(&txn, existing, ShipmentStatus::Delivered).await?;

        let mut order = OrderEntity::find_by_id(order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;
        let old_status = order.status;
        if old_status != OrderStatus::Delivered {
            if order.status.is_shippable() {
                order = transition_order(&txn, order, OrderStatus::Shipped, |_| {}).await?;
            }
            transition_order(&txn, order, OrderStatus::Delivered, |_| {}).await?;
        }
        txn.commit().await?;

        info!(shipment_id = %shipment_id, order_id = %order_id, "Shipment delivered");
        if old_status != OrderStatus::Delivered {
            self.event_sender
                .send_or_log(Event::OrderStatusChanged {
                    order_id,
                    old_status,
                    new_status: OrderStatus::Delivered,
                })
                .await;
        }
        Ok(updated)
    }

    /// Withdraws the shipment; the order returns to processing so it can be
    /// booked again.
    #[instrument(skip(self))]
    pub async fn cancel_shipment(&self, shipment_id: Uuid) -> Result<ShipmentModel, ServiceError> {
        let txn = self.db_pool.begin().await?;
        let existing = ShipmentEntity::find_by_id(shipment_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Shipment {} not found", shipment_id)))?;
        let order_id = existing.order_id;
        let order = OrderEntity::find_by_id(order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;
        if order.status == OrderStatus::Delivered {
            return Err(ServiceError::InvalidStatus(format!(
                "Order {} is already delivered; its shipment cannot be cancelled",
                order.order_number
            )));
        }
        let updated = transition_shipment(&txn, existing, ShipmentStatus::Cancelled).await?;

        let clear_tracking = |model: &mut order::ActiveModel| {
            model.tracking_number = Set(None);
            model.courier_name = Set(None);
        };
        let order = match order.status {
            OrderStatus::Shipped => {
                transition_order(&txn, order, OrderStatus::Processing, clear_tracking).await?
            }
            _ => {
                let mut model: order::ActiveModel = order.into();
                clear_tracking(&mut model);
                model.updated_at = Set(Utc::now());
                model.update(&txn).await?
            }
        };
        txn.commit().await?;

        counter!("aquacare_shipments.cancelled", 1);
        info!(shipment_id = %shipment_id, order_id = %order_id, "Shipment cancelled");
        self.event_sender
            .send_or_log(Event::ShipmentCancelled {
                shipment_id,
                order_id,
                order_status: order.status,
            })
            .await;
        Ok(updated)
    }

    /// Stores a booking the courier has accepted and moves the order along.
    /// Returns the shipment, the order's previous status and its new one if
    /// it changed.
    async fn record_booking(
        &self,
        booked: &OrderModel,
        created: &CreatedShipment,
        rate: &CourierRate,
        package: &PackageDetails,
    ) -> Result<(ShipmentModel, OrderStatus, Option<OrderStatus>), ServiceError> {
        let order_id = booked.id;
        let txn = self.db_pool.begin().await?;
        // The courier call can take seconds; re-read the order under the transaction.
        let order = OrderEntity::find_by_id(order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;
        if !order.status.is_shippable() {
            return Err(ServiceError::Conflict(format!(
                "Order {} became {} while it was being booked",
                order.order_number, order.status
            )));
        }
        self.ensure_no_active_shipment(&txn, &order).await?;

        let now = Utc::now();
        let courier_name = created
            .courier_name
            .clone()
            .unwrap_or_else(|| rate.courier_name.clone());
        let shipment = ShipmentActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order_id),
            provider: Set(self.courier.provider().to_string()),
            provider_order_id: Set(Some(created.provider_order_id.clone())),
            provider_shipment_id: Set(Some(created.provider_shipment_id.clone())),
            awb_code: Set(created.awb_code.clone()),
            courier_id: Set(created.courier_id.or(Some(rate.courier_id))),
            courier_name: Set(Some(courier_name.clone())),
            status: Set(ShipmentStatus::Created),
            weight_kg: Set(package.weight_kg),
            chargeable_weight_kg: Set(package.chargeable_weight_kg),
            length_cm: Set(package.length_cm),
            breadth_cm: Set(package.breadth_cm),
            height_cm: Set(package.height_cm),
            estimated: Set(package.estimated),
            freight_charge: Set(Some(rate.rate)),
            created_at: Set(now),
            updated_at: Set(now),
            delivered_at: Set(None),
            cancelled_at: Set(None),
        }
        .insert(&txn)
        .await?;

        let old_status = order.status;
        let next = match created.awb_code {
            Some(_) => Some(OrderStatus::Shipped),
            None if order.status != OrderStatus::Processing => Some(OrderStatus::Processing),
            None => None,
        };
        if let Some(next) = next {
            let awb = created.awb_code.clone();
            transition_order(&txn, order, next, |model| {
                model.courier_name = Set(Some(courier_name));
                if awb.is_some() {
                    model.tracking_number = Set(awb);
                }
            })
            .await?;
        }
        txn.commit().await?;
        Ok((shipment, old_status, next))
    }

    async fn load_order(&self, order_id: Uuid) -> Result<OrderModel, ServiceError> {
        OrderEntity::find_by_id(order_id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))
    }

    async fn ensure_no_active_shipment<C: ConnectionTrait>(
        &self,
        conn: &C,
        order: &OrderModel,
    ) -> Result<(), ServiceError> {
        if active_shipments(conn, order.id).await? > 0 {
            return Err(ServiceError::Conflict(format!(
                "Order {} already has an active shipment",
                order.order_number
            )));
        }
        Ok(())
    }

    async fn package_for_order<C: ConnectionTrait>(
        &self,
        conn: &C,
        order_id: Uuid,
    ) -> Result<PackageDetails, ServiceError> {
        let items = OrderItemEntity::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .find_also_related(ProductEntity)
            .all(conn)
            .await?;
        if items.is_empty() {
            return Err(ServiceError::InvalidOperation(format!(
                "Order {} has no items to ship",
                order_id
            )));
        }

        let lines: Vec<(ItemMeasurements, u32)> = items
            .iter()
            .map(|(item, product)| {
                let unit = match product {
                    Some(product) => self.packaging.measure_product(product),
                    None => self.packaging.measure(&[]),
                };
                (unit, u32::try_from(item.quantity).unwrap_or(0))
            })
            .collect();
        Ok(self.packaging.aggregate(&lines))
    }
}

async fn transition_shipment<C: ConnectionTrait>(
    conn: &C,
    shipment: ShipmentModel,
    next: ShipmentStatus,
) -> Result<ShipmentModel, ServiceError> {
    if !shipment.status.can_transition_to(next) {
        return Err(ServiceError::InvalidStatus(format!(
            "Shipment {} cannot move from {} to {}",
            shipment.id, shipment.status, next
        )));
    }

    let now = Utc::now();
    let mut model: ShipmentActiveModel = shipment.into();
    model.status = Set(next);
    match next {
        ShipmentStatus::Delivered => model.delivered_at = Set(Some(now)),
        ShipmentStatus::Cancelled => model.cancelled_at = Set(Some(now)),
        _ => {}
    }
    model.updated_at = Set(now);
    Ok(model.update(conn).await?)
}

/// Cheapest first; faster delivery breaks ties
fn sort_rates(rates: &mut [CourierRate]) {
    rates.sort_by(|a, b| {
        a.rate.cmp(&b.rate).then_with(|| {
            a.estimated_delivery_days
                .unwrap_or(u32::MAX)
                .cmp(&b.estimated_delivery_days.unwrap_or(u32::MAX))
        })
    });
}

fn choose_rate(rates: &[CourierRate], requested: Option<i64>) -> Result<CourierRate, ServiceError> {
    match requested {
        Some(courier_id) => rates
            .iter()
            .find(|r| r.courier_id == courier_id)
            .cloned()
            .ok_or_else(|| {
                ServiceError::ValidationError(format!(
                    "Courier {} does not serve this delivery",
                    courier_id
                ))
            }),
        None => rates.first().cloned().ok_or_else(|| {
            ServiceError::ExternalServiceError(
                "No courier can serve this delivery pincode".to_string(),
            )
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn rate(id: i64, amount: Decimal, days: Option<u32>) -> CourierRate {
        CourierRate {
            courier_id: id,
            courier_name: format!("Courier {}", id),
            rate: amount,
            estimated_delivery_days: days,
            etd: None,
            cod_available: true,
        }
    }

    #[test]
    fn rates_sort_cheapest_then_fastest() {
        let mut rates = vec![
            rate(1, dec!(180), Some(2)),
            rate(2, dec!(120), Some(5)),
            rate(3, dec!(120), Some(3)),
            rate(4, dec!(95), None),
        ];
        sort_rates(&mut rates);
        let ids: Vec<i64> = rates.iter().map(|r| r.courier_id).collect();
        assert_eq!(ids, vec![4, 3, 2, 1]);
    }

    #[test]
    fn requested_courier_must_be_in_quote() {
        let rates = vec![rate(1, dec!(120), None), rate(2, dec!(150), None)];
        assert_eq!(choose_rate(&rates, Some(2)).unwrap().courier_id, 2);
        assert_eq!(choose_rate(&rates, None).unwrap().courier_id, 1);
        assert!(matches!(
            choose_rate(&rates, Some(9)),
            Err(ServiceError::ValidationError(_))
        ));
        assert!(matches!(
            choose_rate(&[], None),
            Err(ServiceError::ExternalServiceError(_))
        ));
    }
}

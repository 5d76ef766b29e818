//! Seller-dashboard notifications and transactional email.
//!
//! [`NotificationDispatcher`] consumes domain events off the event channel,
//! records an in-app notification for each one and sends the matching
//! customer / seller emails through a [`Mailer`].

pub mod mailer;
pub mod templates;

pub use mailer::{mailer_from_config, EmailMessage, LogMailer, Mailer, SmtpMailer};

use async_trait::async_trait;
use chrono::Utc;
use metrics::counter;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::{
    db::DbPool,
    entities::{
        call_request::{self, CallPriority},
        notification::{
            self, ActiveModel as NotificationActiveModel, Entity as NotificationEntity,
            Model as NotificationModel, NotificationKind, NotificationPriority,
        },
        order::{self, OrderStatus},
        order_item,
        service_booking,
        shipment,
    },
    errors::ServiceError,
    events::{Event, EventHandler},
    services::PageLimits,
    PaginatedResponse,
};

#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct NotificationListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    #[serde(default)]
    pub unread_only: bool,
    pub kind: Option<NotificationKind>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UnreadCount {
    pub unread: u64,
}

/// In-app notifications shown on the seller dashboard
#[derive(Clone)]
pub struct NotificationService {
    db_pool: Arc<DbPool>,
    page_limits: PageLimits,
}

impl NotificationService {
    pub fn new(db_pool: Arc<DbPool>, page_limits: PageLimits) -> Self {
        Self {
            db_pool,
            page_limits,
        }
    }

    pub async fn create(
        &self,
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
        reference_id: Option<Uuid>,
        priority: NotificationPriority,
    ) -> Result<NotificationModel, ServiceError> {
        let created = NotificationActiveModel {
            id: Set(Uuid::new_v4()),
            kind: Set(kind),
            title: Set(title.into()),
            message: Set(message.into()),
            reference_id: Set(reference_id),
            priority: Set(priority),
            is_read: Set(false),
            created_at: Set(Utc::now()),
            read_at: Set(None),
        }
        .insert(&*self.db_pool)
        .await?;

        counter!("aquacare_notifications.created", 1, "kind" => kind.to_string());
        debug!(notification_id = %created.id, kind = %kind, "Notification recorded");
        Ok(created)
    }

    /// Newest first
    #[instrument(skip(self, query))]
    pub async fn list(
        &self,
        query: NotificationListQuery,
    ) -> Result<PaginatedResponse<NotificationModel>, ServiceError> {
        let (page, limit) = self.page_limits.resolve(query.page, query.limit);
        let mut select = NotificationEntity::find();
        if query.unread_only {
            select = select.filter(notification::Column::IsRead.eq(false));
        }
        if let Some(kind) = query.kind {
            select = select.filter(notification::Column::Kind.eq(kind));
        }

        let paginator = select
            .order_by_desc(notification::Column::CreatedAt)
            .order_by_asc(notification::Column::Id)
            .paginate(&*self.db_pool, limit);
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page - 1).await?;
        Ok(PaginatedResponse::new(items, total, page, limit))
    }

    pub async fn unread_count(&self) -> Result<u64, ServiceError> {
        Ok(NotificationEntity::find()
            .filter(notification::Column::IsRead.eq(false))
            .count(&*self.db_pool)
            .await?)
    }

    /// Marking an already read notification keeps its original `read_at`
    #[instrument(skip(self))]
    pub async fn mark_read(&self, id: Uuid) -> Result<NotificationModel, ServiceError> {
        let existing = NotificationEntity::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Notification {} not found", id)))?;
        if existing.is_read {
            return Ok(existing);
        }

        let mut model: NotificationActiveModel = existing.into();
        model.is_read = Set(true);
        model.read_at = Set(Some(Utc::now()));
        Ok(model.update(&*self.db_pool).await?)
    }

    /// Returns how many notifications changed
    #[instrument(skip(self))]
    pub async fn mark_all_read(&self) -> Result<u64, ServiceError> {
        let result = NotificationEntity::update_many()
            .col_expr(notification::Column::IsRead, Expr::value(true))
            .col_expr(notification::Column::ReadAt, Expr::value(Some(Utc::now())))
            .filter(notification::Column::IsRead.eq(false))
            .exec(&*self.db_pool)
            .await?;
        info!(updated = result.rows_affected, "Notifications marked read");
        Ok(result.rows_affected)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let result = NotificationEntity::delete_by_id(id)
            .exec(&*self.db_pool)
            .await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!("Notification {} not found", id)));
        }
        Ok(())
    }
}

/// Turns domain events into dashboard notifications and emails
pub struct NotificationDispatcher {
    db_pool: Arc<DbPool>,
    notifications: NotificationService,
    mailer: Arc<dyn Mailer>,
    admin_email: Option<String>,
}

impl NotificationDispatcher {
    pub fn new(
        db_pool: Arc<DbPool>,
        notifications: NotificationService,
        mailer: Arc<dyn Mailer>,
        admin_email: Option<String>,
    ) -> Self {
        Self {
            db_pool,
            notifications,
            mailer,
            admin_email,
        }
    }

    /// Sends on a separate task so a slow SMTP server does not hold up the
    /// event loop. Failures are logged and counted, never returned.
    async fn deliver(&self, message: EmailMessage) {
        let mailer = Arc::clone(&self.mailer);
        tokio::spawn(async move {
            let subject = message.subject.clone();
            match mailer.send(message).await {
                Ok(()) => {
                    counter!("aquacare_email.sent", 1);
                }
                Err(e) => {
                    counter!("aquacare_email.failed", 1);
                    warn!(error = %e, subject = %subject, "Email delivery failed");
                }
            }
        });
    }

    async fn deliver_to_admin<F>(&self, build: F)
    where
        F: FnOnce(&str) -> EmailMessage,
    {
        match self.admin_email.as_deref() {
            Some(admin) => self.deliver(build(admin)).await,
            None => debug!("No admin email configured, skipping seller alert"),
        }
    }

    async fn load_order(&self, order_id: Uuid) -> Result<order::Model, ServiceError> {
        order::Entity::find_by_id(order_id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))
    }

    async fn dispatch(&self, event: Event) -> Result<(), ServiceError> {
        match event {
            Event::ProductCreated(product_id) => {
                debug!(product_id = %product_id, "Product created, nothing to notify");
            }

            Event::LowStock {
                product_id,
                name,
                sku,
                stock_quantity,
            } => {
                let priority = if stock_quantity == 0 {
                    NotificationPriority::High
                } else {
                    NotificationPriority::Normal
                };
                let message = if stock_quantity == 0 {
                    format!("{} ({}) is out of stock", name, sku)
                } else {
                    format!("{} ({}) is down to {} unit(s)", name, sku, stock_quantity)
                };
                self.notifications
                    .create(
                        NotificationKind::LowStock,
                        "Low stock",
                        message,
                        Some(product_id),
                        priority,
                    )
                    .await?;
            }

            Event::OrderCreated(order_id) => {
                let order = self.load_order(order_id).await?;
                let items = order_item::Entity::find()
                    .filter(order_item::Column::OrderId.eq(order_id))
                    .all(&*self.db_pool)
                    .await?;

                self.notifications
                    .create(
                        NotificationKind::NewOrder,
                        format!("New order {}", order.order_number),
                        format!(
                            "{} placed an order for {} {}",
                            order.customer_name,
                            order.currency,
                            order.total.round_dp(2)
                        ),
                        Some(order.id),
                        NotificationPriority::High,
                    )
                    .await?;

                self.deliver(templates::order_confirmation(&order, &items))
                    .await;
                self.deliver_to_admin(|admin| templates::new_order_alert(admin, &order, &items))
                    .await;
            }

            Event::OrderStatusChanged {
                order_id,
                old_status,
                new_status,
            } => {
                let order = self.load_order(order_id).await?;
                let priority = if new_status == OrderStatus::Cancelled {
                    NotificationPriority::High
                } else {
                    NotificationPriority::Normal
                };
                self.notifications
                    .create(
                        NotificationKind::OrderStatus,
                        format!("Order {} {}", order.order_number, new_status),
                        format!("Status changed from {} to {}", old_status, new_status),
                        Some(order.id),
                        priority,
                    )
                    .await?;

                if let Some(email) = templates::order_status_update(&order) {
                    self.deliver(email).await;
                }
            }

            Event::ShipmentCreated {
                shipment_id,
                order_id,
            } => {
                let order = self.load_order(order_id).await?;
                let shipment = shipment::Entity::find_by_id(shipment_id)
                    .one(&*self.db_pool)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!("Shipment {} not found", shipment_id))
                    })?;

                let message = match &shipment.awb_code {
                    Some(awb) => format!(
                        "Order {} booked with {} (AWB {})",
                        order.order_number,
                        shipment.courier_name.as_deref().unwrap_or("courier"),
                        awb
                    ),
                    None => format!(
                        "Order {} booked with {}; AWB pending",
                        order.order_number,
                        shipment.courier_name.as_deref().unwrap_or("courier")
                    ),
                };
                self.notifications
                    .create(
                        NotificationKind::Shipment,
                        "Shipment created",
                        message,
                        Some(shipment.id),
                        NotificationPriority::Normal,
                    )
                    .await?;

                self.deliver(templates::shipment_dispatched(&order, &shipment))
                    .await;
            }

            Event::ShipmentCancelled {
                shipment_id,
                order_id,
                order_status,
            } => {
                let order = self.load_order(order_id).await?;
                let message = match order_status {
                    OrderStatus::Processing => format!(
                        "Shipment for order {} was cancelled; the order is back in processing",
                        order.order_number
                    ),
                    status => format!(
                        "Shipment for order {} was cancelled; the order is {}",
                        order.order_number, status
                    ),
                };
                self.notifications
                    .create(
                        NotificationKind::Shipment,
                        "Shipment cancelled",
                        message,
                        Some(shipment_id),
                        NotificationPriority::High,
                    )
                    .await?;
            }

            Event::BookingCreated(booking_id) => {
                let booking = service_booking::Entity::find_by_id(booking_id)
                    .one(&*self.db_pool)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!("Booking {} not found", booking_id))
                    })?;

                self.notifications
                    .create(
                        NotificationKind::Booking,
                        format!("New {} booking", booking.service_type.label().to_lowercase()),
                        format!(
                            "{} ({}) for {} ({})",
                            booking.customer_name,
                            booking.customer_phone,
                            booking.preferred_date.format("%d %b %Y"),
                            booking.time_slot
                        ),
                        Some(booking.id),
                        NotificationPriority::Normal,
                    )
                    .await?;

                if let Some(email) = booking.customer_email.as_deref() {
                    self.deliver(templates::booking_received(&booking, email))
                        .await;
                }
                self.deliver_to_admin(|admin| templates::new_booking_alert(admin, &booking))
                    .await;
            }

            Event::BookingStatusChanged {
                booking_id,
                old_status,
                new_status,
            } => {
                let booking = service_booking::Entity::find_by_id(booking_id)
                    .one(&*self.db_pool)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!("Booking {} not found", booking_id))
                    })?;

                self.notifications
                    .create(
                        NotificationKind::Booking,
                        format!("Booking {} {}", booking.booking_number, new_status),
                        format!("Status changed from {} to {}", old_status, new_status),
                        Some(booking.id),
                        NotificationPriority::Normal,
                    )
                    .await?;

                if let Some(email) = booking.customer_email.as_deref() {
                    self.deliver(templates::booking_status_update(&booking, email))
                        .await;
                }
            }

            Event::CallRequestCreated(request_id) => {
                let request = call_request::Entity::find_by_id(request_id)
                    .one(&*self.db_pool)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!("Call request {} not found", request_id))
                    })?;

                let urgent = request.priority == CallPriority::High;
                self.notifications
                    .create(
                        NotificationKind::CallRequest,
                        format!("{} priority call back", request.priority),
                        format!("{} ({}): {}", request.name, request.phone, request.reason),
                        Some(request.id),
                        if urgent {
                            NotificationPriority::High
                        } else {
                            NotificationPriority::Normal
                        },
                    )
                    .await?;

                if urgent {
                    self.deliver_to_admin(|admin| templates::urgent_call_alert(admin, &request))
                        .await;
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl EventHandler for NotificationDispatcher {
    async fn handle_event(&self, event: Event) -> Result<(), String> {
        let name = event.name();
        self.dispatch(event).await.map_err(|e| {
            warn!(event = name, error = %e, "Notification dispatch failed");
            e.to_string()
        })
    }
}

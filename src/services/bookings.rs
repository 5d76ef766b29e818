use crate::{
    db::DbPool,
    entities::{
        order::Entity as OrderEntity,
        product::Entity as ProductEntity,
        service_booking::{
            self, ActiveModel as BookingActiveModel, BookingStatus, Entity as BookingEntity,
            Model as BookingModel, ServiceType, TimeSlot,
        },
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        clean_optional, generate_reference, normalize_phone, validate_phone_field,
        validate_pincode_field, PageLimits,
    },
    PaginatedResponse,
};
use chrono::{NaiveDate, Utc};
use metrics::counter;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateBookingRequest {
    #[validate(length(min = 2, max = 100, message = "Name must be between 2 and 100 characters"))]
    pub customer_name: String,
    #[validate(custom = "validate_phone_field")]
    pub customer_phone: String,
    #[validate(email(message = "Invalid email address"))]
    pub customer_email: Option<String>,
    #[validate(length(min = 5, max = 500, message = "Address is required"))]
    pub address: String,
    #[validate(custom = "validate_pincode_field")]
    pub pincode: String,
    pub service_type: ServiceType,
    pub product_id: Option<Uuid>,
    pub order_id: Option<Uuid>,
    pub preferred_date: NaiveDate,
    pub time_slot: TimeSlot,
    #[validate(length(max = 2000))]
    pub issue_description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateBookingStatusRequest {
    pub status: BookingStatus,
    #[validate(length(min = 2, max = 100))]
    pub technician_name: Option<String>,
    #[validate(custom = "validate_phone_field")]
    pub technician_phone: Option<String>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    /// Required when cancelling
    #[validate(length(max = 500))]
    pub cancellation_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct AssignTechnicianRequest {
    #[validate(length(min = 2, max = 100))]
    pub technician_name: String,
    #[validate(custom = "validate_phone_field")]
    pub technician_phone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CancelBookingRequest {
    #[validate(length(min = 3, max = 500, message = "A cancellation reason is required"))]
    pub reason: String,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct BookingListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub status: Option<BookingStatus>,
    pub service_type: Option<ServiceType>,
    /// Earliest preferred date
    pub from: Option<NaiveDate>,
    /// Latest preferred date
    pub to: Option<NaiveDate>,
    pub phone: Option<String>,
}

/// Installation, repair and maintenance visits
#[derive(Clone)]
pub struct BookingService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    page_limits: PageLimits,
}

impl BookingService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>, page_limits: PageLimits) -> Self {
        Self {
            db_pool,
            event_sender,
            page_limits,
        }
    }

    #[instrument(skip(self, request), fields(service_type = %request.service_type))]
    pub async fn create_booking(
        &self,
        request: CreateBookingRequest,
    ) -> Result<BookingModel, ServiceError> {
        request.validate()?;
        let now = Utc::now();

        if request.preferred_date < now.date_naive() {
            return Err(ServiceError::ValidationError(format!(
                "Preferred date {} is in the past",
                request.preferred_date
            )));
        }

        let db = &*self.db_pool;
        if let Some(product_id) = request.product_id {
            if ProductEntity::find_by_id(product_id).one(db).await?.is_none() {
                return Err(ServiceError::NotFound(format!("Product {} not found", product_id)));
            }
        }
        if let Some(order_id) = request.order_id {
            if OrderEntity::find_by_id(order_id).one(db).await?.is_none() {
                return Err(ServiceError::NotFound(format!("Order {} not found", order_id)));
            }
        }

        let booking = BookingActiveModel {
            id: Set(Uuid::new_v4()),
            booking_number: Set(generate_reference("SRV", now)),
            customer_name: Set(request.customer_name.trim().to_string()),
            customer_phone: Set(normalize_phone(&request.customer_phone)?),
            customer_email: Set(clean_optional(request.customer_email).map(|e| e.to_lowercase())),
            address: Set(request.address.trim().to_string()),
            pincode: Set(request.pincode.trim().to_string()),
            service_type: Set(request.service_type),
            product_id: Set(request.product_id),
            order_id: Set(request.order_id),
            preferred_date: Set(request.preferred_date),
            time_slot: Set(request.time_slot),
            issue_description: Set(clean_optional(request.issue_description)),
            status: Set(BookingStatus::Pending),
            technician_name: Set(None),
            technician_phone: Set(None),
            notes: Set(None),
            cancellation_reason: Set(None),
            confirmed_at: Set(None),
            started_at: Set(None),
            completed_at: Set(None),
            cancelled_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await?;

        counter!("aquacare_bookings.created", 1, "service_type" => booking.service_type.to_string());
        info!(
            booking_id = %booking.id,
            booking_number = %booking.booking_number,
            date = %booking.preferred_date,
            "Service booking created"
        );
        self.event_sender
            .send_or_log(Event::BookingCreated(booking.id))
            .await;

        Ok(booking)
    }

    #[instrument(skip(self))]
    pub async fn get_booking(&self, booking_id: Uuid) -> Result<BookingModel, ServiceError> {
        BookingEntity::find_by_id(booking_id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Booking {} not found", booking_id)))
    }

    #[instrument(skip(self, query))]
    pub async fn list_bookings(
        &self,
        query: BookingListQuery,
    ) -> Result<PaginatedResponse<BookingModel>, ServiceError> {
        let (page, limit) = self.page_limits.resolve(query.page, query.limit);
        let mut select = BookingEntity::find();

        if let Some(status) = query.status {
            select = select.filter(service_booking::Column::Status.eq(status));
        }
        if let Some(service_type) = query.service_type {
            select = select.filter(service_booking::Column::ServiceType.eq(service_type));
        }
        if let Some(from) = query.from {
            select = select.filter(service_booking::Column::PreferredDate.gte(from));
        }
        if let Some(to) = query.to {
            select = select.filter(service_booking::Column::PreferredDate.lte(to));
        }
        if let Some(phone) = query.phone.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
            // Full numbers are matched in normalized form, fragments as typed
            let phone = normalize_phone(phone).unwrap_or_else(|_| phone.to_string());
            select = select.filter(service_booking::Column::CustomerPhone.contains(phone.as_str()));
        }

        let paginator = select
            .order_by_asc(service_booking::Column::PreferredDate)
            .order_by_asc(service_booking::Column::CreatedAt)
            .paginate(&*self.db_pool, limit);
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page - 1).await?;
        Ok(PaginatedResponse::new(items, total, page, limit))
    }

    /// Moves the booking through its lifecycle, stamping the matching timestamp
    #[instrument(skip(self, request), fields(status = %request.status))]
    pub async fn update_status(
        &self,
        booking_id: Uuid,
        request: UpdateBookingStatusRequest,
    ) -> Result<BookingModel, ServiceError> {
        request.validate()?;
        let existing = self.get_booking(booking_id).await?;
        let old_status = existing.status;
        let next = request.status;

        if old_status == next {
            return Err(ServiceError::InvalidStatus(format!(
                "Booking {} is already {}",
                existing.booking_number, next
            )));
        }
        if !old_status.can_transition_to(next) {
            return Err(ServiceError::InvalidStatus(format!(
                "Booking {} cannot move from {} to {}",
                existing.booking_number, old_status, next
            )));
        }

        let cancellation_reason = clean_optional(request.cancellation_reason);
        if next == BookingStatus::Cancelled && cancellation_reason.is_none() {
            return Err(ServiceError::ValidationError(
                "A cancellation reason is required".to_string(),
            ));
        }

        let now = Utc::now();
        let mut model: BookingActiveModel = existing.into();
        model.status = Set(next);
        match next {
            BookingStatus::Confirmed => model.confirmed_at = Set(Some(now)),
            BookingStatus::InProgress => model.started_at = Set(Some(now)),
            BookingStatus::Completed => model.completed_at = Set(Some(now)),
            BookingStatus::Cancelled => {
                model.cancelled_at = Set(Some(now));
                model.cancellation_reason = Set(cancellation_reason);
            }
            BookingStatus::Pending => {}
        }
        if let Some(name) = clean_optional(request.technician_name) {
            model.technician_name = Set(Some(name));
        }
        if let Some(phone) = request.technician_phone {
            model.technician_phone = Set(Some(normalize_phone(&phone)?));
        }
        if let Some(notes) = clean_optional(request.notes) {
            model.notes = Set(Some(notes));
        }
        model.updated_at = Set(now);

        let updated = model.update(&*self.db_pool).await?;
        info!(booking_id = %booking_id, from = %old_status, to = %next, "Booking status updated");
        self.event_sender
            .send_or_log(Event::BookingStatusChanged {
                booking_id,
                old_status,
                new_status: next,
            })
            .await;

        Ok(updated)
    }

    #[instrument(skip(self, request))]
    pub async fn assign_technician(
        &self,
        booking_id: Uuid,
        request: AssignTechnicianRequest,
    ) -> Result<BookingModel, ServiceError> {
        request.validate()?;
        let existing = self.get_booking(booking_id).await?;
        if existing.status.is_terminal() {
            return Err(ServiceError::InvalidOperation(format!(
                "Booking {} is {}",
                existing.booking_number, existing.status
            )));
        }

        let mut model: BookingActiveModel = existing.into();
        model.technician_name = Set(Some(request.technician_name.trim().to_string()));
        model.technician_phone = Set(Some(normalize_phone(&request.technician_phone)?));
        model.updated_at = Set(Utc::now());
        let updated = model.update(&*self.db_pool).await?;

        info!(booking_id = %booking_id, "Technician assigned");
        Ok(updated)
    }

    pub async fn cancel_booking(
        &self,
        booking_id: Uuid,
        request: CancelBookingRequest,
    ) -> Result<BookingModel, ServiceError> {
        request.validate()?;
        self.update_status(
            booking_id,
            UpdateBookingStatusRequest {
                status: BookingStatus::Cancelled,
                technician_name: None,
                technician_phone: None,
                notes: None,
                cancellation_reason: Some(request.reason),
            },
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CreateBookingRequest {
        CreateBookingRequest {
            customer_name: "Meera Iyer".into(),
            customer_phone: "+91 98450 12345".into(),
            customer_email: Some("meera@example.com".into()),
            address: "4th Cross, Indiranagar".into(),
            pincode: "560038".into(),
            service_type: ServiceType::Installation,
            product_id: None,
            order_id: None,
            preferred_date: Utc::now().date_naive(),
            time_slot: TimeSlot::Morning,
            issue_description: None,
        }
    }

    #[test]
    fn valid_request_passes_validation() {
        assert!(request().validate().is_ok());
    }

    #[test]
    fn bad_contact_details_are_rejected() {
        let mut req = request();
        req.customer_phone = "12345".into();
        req.customer_email = Some("meera-at-example".into());
        req.pincode = "56003".into();
        let errors = req.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("customer_phone"));
        assert!(fields.contains_key("customer_email"));
        assert!(fields.contains_key("pincode"));
    }
}

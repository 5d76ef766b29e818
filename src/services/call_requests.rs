use crate::{
    db::DbPool,
    entities::{
        call_request::{
            self, ActiveModel as CallRequestActiveModel, CallPriority, CallSource, CallStatus,
            Entity as CallRequestEntity, Model as CallRequestModel,
        },
        product::Entity as ProductEntity,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{clean_optional, normalize_phone, validate_phone_field, PageLimits},
    PaginatedResponse,
};
use chrono::{Duration, Utc};
use metrics::counter;
use once_cell::sync::Lazy;
use regex::Regex;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, Condition, EntityTrait, Order, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

const HIGH_PRIORITY_KEYWORDS: &[&str] = &[
    "urgent",
    "emergency",
    "asap",
    "immediately",
    "leak",
    "leaking",
    "not working",
    "stopped working",
    "broken",
    "no water",
    "bad taste",
    "smell",
    "complaint",
    "burning",
    "shock",
];

const MEDIUM_PRIORITY_KEYWORDS: &[&str] = &[
    "install",
    "installation",
    "service",
    "repair",
    "filter",
    "maintenance",
    "amc",
    "buy",
    "purchase",
    "quote",
    "price",
    "demo",
    "warranty",
];

/// Case-insensitive whole-word alternation; spaces inside a phrase match any run of whitespace
fn keyword_pattern(keywords: &[&str]) -> Regex {
    let alternation = keywords
        .iter()
        .map(|k| {
            k.split_whitespace()
                .map(regex::escape)
                .collect::<Vec<_>>()
                .join(r"\s+")
        })
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?i)\b(?:{})\b", alternation)).expect("keyword pattern is valid")
}

static HIGH_PRIORITY_RE: Lazy<Regex> = Lazy::new(|| keyword_pattern(HIGH_PRIORITY_KEYWORDS));
static MEDIUM_PRIORITY_RE: Lazy<Regex> = Lazy::new(|| keyword_pattern(MEDIUM_PRIORITY_KEYWORDS));

/// Priority from the request text. The most urgent matching tier wins.
pub fn classify_priority(reason: &str, message: Option<&str>) -> CallPriority {
    let text = match message {
        Some(message) => format!("{} {}", reason, message),
        None => reason.to_string(),
    };

    if HIGH_PRIORITY_RE.is_match(&text) {
        CallPriority::High
    } else if MEDIUM_PRIORITY_RE.is_match(&text) {
        CallPriority::Medium
    } else {
        CallPriority::Low
    }
}

fn default_source() -> CallSource {
    CallSource::Website
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateCallRequest {
    #[validate(length(min = 2, max = 100, message = "Name must be between 2 and 100 characters"))]
    pub name: String,
    #[validate(custom = "validate_phone_field")]
    pub phone: String,
    #[validate(length(min = 2, max = 200, message = "Tell us what the call is about"))]
    pub reason: String,
    #[validate(length(max = 2000))]
    pub message: Option<String>,
    /// Free text such as "after 6 pm"
    #[validate(length(max = 100))]
    pub preferred_time: Option<String>,
    #[serde(default = "default_source")]
    pub source: CallSource,
    pub product_id: Option<Uuid>,
}

/// Result of submitting a call request. `duplicate` means an open request
/// from the same number already existed and was returned instead.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CallRequestOutcome {
    #[serde(flatten)]
    pub request: CallRequestModel,
    pub duplicate: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateCallStatusRequest {
    pub status: CallStatus,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateCallPriorityRequest {
    pub priority: CallPriority,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct CallRequestListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub status: Option<CallStatus>,
    pub priority: Option<CallPriority>,
    /// Name or phone fragment
    pub search: Option<String>,
}

/// Customer call-back queue
#[derive(Clone)]
pub struct CallRequestService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    dedup_window: Duration,
    page_limits: PageLimits,
}

impl CallRequestService {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        dedup_window: Duration,
        page_limits: PageLimits,
    ) -> Self {
        Self {
            db_pool,
            event_sender,
            dedup_window,
            page_limits,
        }
    }

    /// Records a call-back request, or returns the caller's open request
    /// when one was made within the dedup window.
    #[instrument(skip(self, request), fields(source = %request.source))]
    pub async fn create_call_request(
        &self,
        request: CreateCallRequest,
    ) -> Result<CallRequestOutcome, ServiceError> {
        request.validate()?;
        let db = &*self.db_pool;
        let phone = normalize_phone(&request.phone)?;
        let message = clean_optional(request.message);
        let priority = classify_priority(&request.reason, message.as_deref());
        let now = Utc::now();

        if let Some(product_id) = request.product_id {
            if ProductEntity::find_by_id(product_id).one(db).await?.is_none() {
                return Err(ServiceError::NotFound(format!("Product {} not found", product_id)));
            }
        }

        let recent = CallRequestEntity::find()
            .filter(call_request::Column::Phone.eq(phone.as_str()))
            .filter(call_request::Column::Status.is_in([CallStatus::Pending, CallStatus::Contacted]))
            .filter(call_request::Column::CreatedAt.gte(now - self.dedup_window))
            .order_by_desc(call_request::Column::CreatedAt)
            .one(db)
            .await?;

        if let Some(existing) = recent {
            counter!("aquacare_call_requests.duplicates", 1);
            info!(call_request_id = %existing.id, "Duplicate call request within window");

            if priority.rank() > existing.priority.rank() {
                debug!(from = %existing.priority, to = %priority, "Upgrading priority");
                let mut model: CallRequestActiveModel = existing.into();
                model.priority = Set(priority);
                model.updated_at = Set(now);
                let upgraded = model.update(db).await?;
                return Ok(CallRequestOutcome {
                    request: upgraded,
                    duplicate: true,
                });
            }
            return Ok(CallRequestOutcome {
                request: existing,
                duplicate: true,
            });
        }

        let created = CallRequestActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(request.name.trim().to_string()),
            phone: Set(phone),
            reason: Set(request.reason.trim().to_string()),
            message: Set(message),
            preferred_time: Set(clean_optional(request.preferred_time)),
            source: Set(request.source),
            product_id: Set(request.product_id),
            priority: Set(priority),
            status: Set(CallStatus::Pending),
            notes: Set(None),
            contacted_at: Set(None),
            resolved_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await?;

        counter!("aquacare_call_requests.created", 1, "priority" => priority.to_string());
        info!(call_request_id = %created.id, priority = %priority, "Call request created");
        self.event_sender
            .send_or_log(Event::CallRequestCreated(created.id))
            .await;

        Ok(CallRequestOutcome {
            request: created,
            duplicate: false,
        })
    }

    #[instrument(skip(self))]
    pub async fn get_call_request(&self, id: Uuid) -> Result<CallRequestModel, ServiceError> {
        CallRequestEntity::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Call request {} not found", id)))
    }

    /// Most urgent first, then longest waiting
    #[instrument(skip(self, query))]
    pub async fn list_call_requests(
        &self,
        query: CallRequestListQuery,
    ) -> Result<PaginatedResponse<CallRequestModel>, ServiceError> {
        let (page, limit) = self.page_limits.resolve(query.page, query.limit);
        let mut select = CallRequestEntity::find();

        if let Some(status) = query.status {
            select = select.filter(call_request::Column::Status.eq(status));
        }
        if let Some(priority) = query.priority {
            select = select.filter(call_request::Column::Priority.eq(priority));
        }
        if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            select = select.filter(
                Condition::any()
                    .add(call_request::Column::Name.contains(search))
                    .add(call_request::Column::Phone.contains(search)),
            );
        }

        let paginator = select
            .order_by(
                Expr::cust("CASE priority WHEN 'high' THEN 0 WHEN 'medium' THEN 1 ELSE 2 END"),
                Order::Asc,
            )
            .order_by_asc(call_request::Column::CreatedAt)
            .order_by_asc(call_request::Column::Id)
            .paginate(&*self.db_pool, limit);
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page - 1).await?;
        Ok(PaginatedResponse::new(items, total, page, limit))
    }

    #[instrument(skip(self, request), fields(status = %request.status))]
    pub async fn update_status(
        &self,
        id: Uuid,
        request: UpdateCallStatusRequest,
    ) -> Result<CallRequestModel, ServiceError> {
        request.validate()?;
        let existing = self.get_call_request(id).await?;
        let next = request.status;

        if existing.status == next {
            return Err(ServiceError::InvalidStatus(format!(
                "Call request is already {}",
                next
            )));
        }
        if !existing.status.can_transition_to(next) {
            return Err(ServiceError::InvalidStatus(format!(
                "Call request cannot move from {} to {}",
                existing.status, next
            )));
        }

        let now = Utc::now();
        let old_status = existing.status;
        let contacted_at = existing.contacted_at;
        let mut model: CallRequestActiveModel = existing.into();
        model.status = Set(next);
        match next {
            CallStatus::Contacted => model.contacted_at = Set(Some(now)),
            CallStatus::Resolved => {
                model.resolved_at = Set(Some(now));
                if contacted_at.is_none() {
                    model.contacted_at = Set(Some(now));
                }
            }
            _ => {}
        }
        if let Some(notes) = clean_optional(request.notes) {
            model.notes = Set(Some(notes));
        }
        model.updated_at = Set(now);

        let updated = model.update(&*self.db_pool).await?;
        info!(call_request_id = %id, from = %old_status, to = %next, "Call request status updated");
        Ok(updated)
    }

    #[instrument(skip(self, request), fields(priority = %request.priority))]
    pub async fn update_priority(
        &self,
        id: Uuid,
        request: UpdateCallPriorityRequest,
    ) -> Result<CallRequestModel, ServiceError> {
        let existing = self.get_call_request(id).await?;
        if !existing.status.is_open() {
            return Err(ServiceError::InvalidOperation(format!(
                "Call request is {}",
                existing.status
            )));
        }

        let mut model: CallRequestActiveModel = existing.into();
        model.priority = Set(request.priority);
        model.updated_at = Set(Utc::now());
        Ok(model.update(&*self.db_pool).await?)
    }

    #[instrument(skip(self))]
    pub async fn delete_call_request(&self, id: Uuid) -> Result<(), ServiceError> {
        let result = CallRequestEntity::delete_by_id(id)
            .exec(&*self.db_pool)
            .await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!("Call request {} not found", id)));
        }
        info!(call_request_id = %id, "Call request deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Water purifier is leaking", None, CallPriority::High)]
    #[case("General", Some("The RO has STOPPED   WORKING since morning"), CallPriority::High)]
    #[case("Need installation", None, CallPriority::Medium)]
    #[case("AMC renewal", Some("what is the price?"), CallPriority::Medium)]
    #[case("Urgent: filter change", None, CallPriority::High)]
    #[case("Just a question", Some("call me later"), CallPriority::Low)]
    fn priority_from_keywords(
        #[case] reason: &str,
        #[case] message: Option<&str>,
        #[case] expected: CallPriority,
    ) {
        assert_eq!(classify_priority(reason, message), expected);
    }

    #[rstest]
    #[case("Installed last year, any offers")]
    #[case("Serviceable area?")]
    #[case("smelly answer")]
    #[case("bleak outlook")]
    fn keywords_match_whole_words_only(#[case] reason: &str) {
        assert_eq!(classify_priority(reason, None), CallPriority::Low);
    }
}

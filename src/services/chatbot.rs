//! Rule-based assistant for the storefront chat widget.
//!
//! Messages are normalized and scored against per-intent keyword lists. The
//! reply is canned text, filled in from the catalog, the order book or the
//! call-back queue where the intent needs live data.

use crate::{
    db::DbPool,
    entities::{
        call_request::CallSource,
        chat_message::{self, ActiveModel as ChatMessageActiveModel, ChatRole, Entity as ChatMessageEntity, Model as ChatMessageModel},
        order::{self, Entity as OrderEntity},
        product::{self, Entity as ProductEntity},
    },
    errors::ServiceError,
    services::call_requests::{CallRequestService, CreateCallRequest},
};
use chrono::Utc;
use metrics::counter;
use once_cell::sync::Lazy;
use regex::Regex;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use strum::Display;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

static ORDER_NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bORD-\d{8}-[A-Z0-9]{6}\b").expect("valid regex"));

/// Ten digits starting 6-9, optionally after +91, with single spaces or
/// dashes allowed between digits
static MOBILE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:^|[^0-9])(?:\+?91[\s-]?)?([6-9](?:[\s-]?[0-9]){9})(?:[^0-9]|$)")
        .expect("valid regex")
});

const CALLBACK_PROMPT: &str =
    "Sure! Please share your 10 digit mobile number and our team will call you back.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, ToSchema)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Intent {
    Greeting,
    OrderStatus,
    Callback,
    Pricing,
    Products,
    Installation,
    Repair,
    Maintenance,
    WaterQuality,
    Warranty,
    Contact,
    Thanks,
    Goodbye,
    Fallback,
}

/// Keyword lists in priority order; a tie goes to the earlier intent
const INTENT_KEYWORDS: &[(Intent, &[&str])] = &[
    (
        Intent::Greeting,
        &["hi", "hello", "hey", "namaste", "good morning", "good afternoon", "good evening"],
    ),
    (
        Intent::OrderStatus,
        &["order", "track", "tracking", "status", "delivery", "shipped", "where is my", "awb"],
    ),
    (
        Intent::Callback,
        &["call", "callback", "call back", "call me", "phone", "ring me", "contact me"],
    ),
    (
        Intent::Pricing,
        &["price", "prices", "cost", "how much", "rate", "offer", "discount", "budget", "cheap"],
    ),
    (
        Intent::Products,
        &["product", "products", "purifier", "purifiers", "ro", "uv", "uf", "model", "models", "catalog"],
    ),
    (
        Intent::Installation,
        &["install", "installation", "setup", "set up", "fitting", "mount"],
    ),
    (
        Intent::Repair,
        &["repair", "broken", "not working", "leak", "leaking", "problem", "issue", "fault", "noise"],
    ),
    (
        Intent::Maintenance,
        &["maintenance", "service", "servicing", "filter", "cartridge", "amc", "cleaning", "membrane"],
    ),
    (
        Intent::WaterQuality,
        &["tds", "water quality", "hard water", "taste", "smell", "salty", "ph", "borewell"],
    ),
    (
        Intent::Warranty,
        &["warranty", "guarantee", "replacement", "claim"],
    ),
    (
        Intent::Contact,
        &["contact", "address", "email", "store", "location", "timings", "hours", "visit"],
    ),
    (
        Intent::Thanks,
        &["thanks", "thank you", "thx", "helpful"],
    ),
    (
        Intent::Goodbye,
        &["bye", "goodbye", "see you"],
    ),
];

/// Lowercases, replaces punctuation with spaces and collapses whitespace
pub fn normalize_message(message: &str) -> String {
    message
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Detected intent with the number of matching keywords
pub fn detect_intent(message: &str) -> (Intent, usize) {
    if ORDER_NUMBER_RE.is_match(message) {
        return (Intent::OrderStatus, 1);
    }

    let padded = format!(" {} ", normalize_message(message));
    let mut best = (Intent::Fallback, 0);
    for (intent, keywords) in INTENT_KEYWORDS {
        let score = keywords
            .iter()
            .filter(|k| padded.contains(&format!(" {} ", k)))
            .count();
        if score > best.1 {
            best = (*intent, score);
        }
    }
    best
}

pub fn extract_order_number(message: &str) -> Option<String> {
    ORDER_NUMBER_RE
        .find(message)
        .map(|m| m.as_str().to_uppercase())
}

/// First ten digit Indian mobile number in the text, separators removed
pub fn extract_mobile(message: &str) -> Option<String> {
    MOBILE_RE
        .captures(message)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().chars().filter(char::is_ascii_digit).collect())
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct ChatRequest {
    #[validate(length(min = 1, max = 1000, message = "Message must be between 1 and 1000 characters"))]
    pub message: String,
    /// Continue an existing conversation; a new session starts when absent
    #[validate(length(min = 1, max = 64))]
    pub session_id: Option<String>,
    /// Visitor name used for call-back requests
    #[validate(length(min = 2, max = 100))]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChatReply {
    pub session_id: String,
    pub intent: Intent,
    pub reply: String,
    /// Quick-reply chips shown under the answer
    pub suggestions: Vec<String>,
    /// Set when the message created (or matched) a call-back request
    pub call_request_id: Option<Uuid>,
}

struct Answer {
    reply: String,
    suggestions: Vec<&'static str>,
    call_request_id: Option<Uuid>,
}

impl Answer {
    fn text(reply: impl Into<String>, suggestions: &[&'static str]) -> Self {
        Self {
            reply: reply.into(),
            suggestions: suggestions.to_vec(),
            call_request_id: None,
        }
    }
}

#[derive(Clone)]
pub struct ChatbotService {
    db_pool: Arc<DbPool>,
    call_requests: Arc<CallRequestService>,
    currency_symbol: &'static str,
}

impl ChatbotService {
    pub fn new(db_pool: Arc<DbPool>, call_requests: Arc<CallRequestService>) -> Self {
        Self {
            db_pool,
            call_requests,
            currency_symbol: "₹",
        }
    }

    #[instrument(skip(self, request))]
    pub async fn respond(&self, request: ChatRequest) -> Result<ChatReply, ServiceError> {
        request.validate()?;
        let message = request.message.trim().to_string();
        let session_id = request
            .session_id
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| format!("chat-{}", Uuid::new_v4().simple()));

        let (mut intent, score) = detect_intent(&message);
        // A bare number answering the call-back prompt completes the request
        if intent != Intent::Callback
            && extract_mobile(&message).is_some()
            && (intent == Intent::Fallback || self.awaiting_mobile(&session_id).await?)
        {
            intent = Intent::Callback;
        }
        counter!("aquacare_chat.messages", 1, "intent" => intent.to_string());
        info!(session_id = %session_id, intent = %intent, score, "Chat message classified");

        self.record(&session_id, ChatRole::User, &message, Some(intent))
            .await?;

        let answer = match intent {
            Intent::OrderStatus => self.order_status(&message).await?,
            Intent::Pricing => self.pricing().await?,
            Intent::Callback => self.callback(&message, request.name.as_deref()).await?,
            other => canned_answer(other),
        };

        self.record(&session_id, ChatRole::Bot, &answer.reply, Some(intent))
            .await?;

        Ok(ChatReply {
            session_id,
            intent,
            reply: answer.reply,
            suggestions: answer.suggestions.into_iter().map(String::from).collect(),
            call_request_id: answer.call_request_id,
        })
    }

    /// Messages of one conversation in the order they were exchanged
    #[instrument(skip(self))]
    pub async fn session_history(
        &self,
        session_id: &str,
    ) -> Result<Vec<ChatMessageModel>, ServiceError> {
        let messages = ChatMessageEntity::find()
            .filter(chat_message::Column::SessionId.eq(session_id))
            .order_by_asc(chat_message::Column::CreatedAt)
            .order_by_desc(chat_message::Column::Role)
            .all(&*self.db_pool)
            .await?;
        if messages.is_empty() {
            return Err(ServiceError::NotFound(format!(
                "Chat session {} not found",
                session_id
            )));
        }
        Ok(messages)
    }

    /// Whether the last bot reply in the session asked for a mobile number
    async fn awaiting_mobile(&self, session_id: &str) -> Result<bool, ServiceError> {
        let last_reply = ChatMessageEntity::find()
            .filter(chat_message::Column::SessionId.eq(session_id))
            .filter(chat_message::Column::Role.eq(ChatRole::Bot))
            .order_by_desc(chat_message::Column::CreatedAt)
            .one(&*self.db_pool)
            .await?;
        Ok(last_reply.is_some_and(|m| m.content == CALLBACK_PROMPT))
    }

    async fn record(
        &self,
        session_id: &str,
        role: ChatRole,
        content: &str,
        intent: Option<Intent>,
    ) -> Result<(), ServiceError> {
        ChatMessageActiveModel {
            id: Set(Uuid::new_v4()),
            session_id: Set(session_id.to_string()),
            role: Set(role),
            content: Set(content.to_string()),
            intent: Set(intent.map(|i| i.to_string())),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.db_pool)
        .await?;
        Ok(())
    }

    async fn order_status(&self, message: &str) -> Result<Answer, ServiceError> {
        let Some(order_number) = extract_order_number(message) else {
            return Ok(Answer::text(
                "Please share your order number (it looks like ORD-20260318-AB12CD) and I'll check its status.",
                &["Talk to an agent", "Request a call back"],
            ));
        };

        let order = OrderEntity::find()
            .filter(order::Column::OrderNumber.eq(order_number.as_str()))
            .one(&*self.db_pool)
            .await?;

        let answer = match order {
            None => Answer::text(
                format!(
                    "I couldn't find order {}. Please check the number or request a call back.",
                    order_number
                ),
                &["Request a call back"],
            ),
            Some(order) => {
                let mut reply = format!(
                    "Order {} is currently {}.",
                    order.order_number,
                    order.status.to_string().replace('_', " ")
                );
                if let Some(tracking) = &order.tracking_number {
                    reply.push_str(&format!(
                        " It is with {} under tracking number {}.",
                        order.courier_name.as_deref().unwrap_or("our courier partner"),
                        tracking
                    ));
                }
                Answer::text(reply, &["Book installation", "Talk to an agent"])
            }
        };
        Ok(answer)
    }

    async fn pricing(&self) -> Result<Answer, ServiceError> {
        let products = ProductEntity::find()
            .filter(product::Column::IsActive.eq(true))
            .order_by_asc(product::Column::Price)
            .limit(3)
            .all(&*self.db_pool)
            .await?;

        if products.is_empty() {
            return Ok(Answer::text(
                "Our price list is being updated. Leave your number and we'll call you with current offers.",
                &["Request a call back"],
            ));
        }

        let lines: Vec<String> = products
            .iter()
            .map(|p| format!("{} at {}{}", p.name, self.currency_symbol, p.price.round_dp(2)))
            .collect();
        Ok(Answer::text(
            format!(
                "Our purifiers start at {}{}. Popular picks: {}. Free installation with every purifier.",
                self.currency_symbol,
                products[0].price.round_dp(2),
                lines.join("; ")
            ),
            &["Show all products", "Request a call back"],
        ))
    }

    async fn callback(&self, message: &str, name: Option<&str>) -> Result<Answer, ServiceError> {
        let Some(phone) = extract_mobile(message) else {
            return Ok(Answer::text(CALLBACK_PROMPT, &[]));
        };

        let outcome = self
            .call_requests
            .create_call_request(CreateCallRequest {
                name: name
                    .map(str::trim)
                    .filter(|n| n.len() >= 2)
                    .unwrap_or("Chat visitor")
                    .to_string(),
                phone,
                reason: "Call back requested from chat".to_string(),
                message: Some(message.chars().take(2000).collect()),
                preferred_time: None,
                source: CallSource::Chatbot,
                product_id: None,
            })
            .await;

        match outcome {
            Ok(outcome) => {
                let reply = if outcome.duplicate {
                    "We already have your call-back request and our team will reach you shortly."
                } else {
                    "Thanks! Our team will call you back shortly."
                };
                Ok(Answer {
                    reply: reply.to_string(),
                    suggestions: vec!["Browse purifiers"],
                    call_request_id: Some(outcome.request.id),
                })
            }
            Err(ServiceError::ValidationError(e)) => {
                warn!(error = %e, "Chat call-back rejected");
                Ok(Answer::text(
                    "That number doesn't look right. Please share a valid 10 digit mobile number.",
                    &[],
                ))
            }
            Err(e) => Err(e),
        }
    }
}

fn canned_answer(intent: Intent) -> Answer {
    match intent {
        Intent::Greeting => Answer::text(
            "Hello! Welcome to AquaCare. I can help with purifiers, prices, orders and service visits.",
            &["Show purifiers", "Track my order", "Book a service"],
        ),
        Intent::Products => Answer::text(
            "We offer RO, UV and RO+UV+UF purifiers for every water source. Tell me your water source or TDS and I'll suggest a model.",
            &["Check prices", "What is TDS?"],
        ),
        Intent::Installation => Answer::text(
            "Installation is free with every purifier and usually happens within 48 hours of delivery. You can book a slot from the Service page.",
            &["Book installation", "Request a call back"],
        ),
        Intent::Repair => Answer::text(
            "Sorry about the trouble! Book a repair visit and a technician will reach you, or share your number for an urgent call back.",
            &["Book a repair", "Request a call back"],
        ),
        Intent::Maintenance => Answer::text(
            "We recommend a service every 3 months and filter replacement every 6 to 12 months. Annual maintenance plans (AMC) are available.",
            &["Book maintenance", "Ask about AMC"],
        ),
        Intent::WaterQuality => Answer::text(
            "TDS above 500 ppm needs an RO purifier; below 200 ppm UV/UF is usually enough. Our technician can test your water for free.",
            &["Book a water test", "Show purifiers"],
        ),
        Intent::Warranty => Answer::text(
            "All purifiers carry a 1 year comprehensive warranty. Keep your order number handy when raising a claim.",
            &["Book a repair", "Talk to an agent"],
        ),
        Intent::Contact => Answer::text(
            "You can reach us at support@aquacare.in or request a call back here. Support hours are 9 am to 8 pm, all days.",
            &["Request a call back"],
        ),
        Intent::Thanks => Answer::text(
            "You're welcome! Anything else I can help with?",
            &["Show purifiers", "Track my order"],
        ),
        Intent::Goodbye => Answer::text("Goodbye! Stay hydrated.", &[]),
        _ => Answer::text(
            "I'm not sure I understood. I can help with products, prices, orders, installation and repairs, or arrange a call back.",
            &["Show purifiers", "Track my order", "Request a call back"],
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case("Hello there!", Intent::Greeting)]
    #[case("where is my order?", Intent::OrderStatus)]
    #[case("status of ord-20260318-ab12cd", Intent::OrderStatus)]
    #[case("please call me back", Intent::Callback)]
    #[case("how much does it cost", Intent::Pricing)]
    #[case("my purifier is leaking and not working", Intent::Repair)]
    #[case("need filter cartridge replacement service", Intent::Maintenance)]
    #[case("our borewell water has high TDS", Intent::WaterQuality)]
    #[case("thank you", Intent::Thanks)]
    #[case("asdfgh", Intent::Fallback)]
    fn intents(#[case] message: &str, #[case] expected: Intent) {
        assert_eq!(detect_intent(message).0, expected);
    }

    #[test]
    fn ties_go_to_earlier_intent() {
        // one greeting keyword, one products keyword
        assert_eq!(detect_intent("hi purifier").0, Intent::Greeting);
    }

    #[test]
    fn keywords_do_not_match_inside_words() {
        assert_eq!(normalize_message("  RO-UV,  Purifier!! "), "ro uv purifier");
        assert_eq!(detect_intent("this").0, Intent::Fallback);
    }

    #[rstest]
    #[case("call me on 98765 43210", Some("9876543210"))]
    #[case("my number is +91-9876543210 thanks", Some("9876543210"))]
    #[case("call 12345", None)]
    #[case("ref 598765432100", None)]
    #[case("919876543210", Some("9876543210"))]
    #[case("call me at 9876543210 2 pm", Some("9876543210"))]
    #[case("call me back 9876543210 - 6pm", Some("9876543210"))]
    #[case("call me 2 9876543210", Some("9876543210"))]
    #[case("98765-43210", Some("9876543210"))]
    #[case("98765432101", None)]
    fn mobile_numbers(#[case] message: &str, #[case] expected: Option<&str>) {
        assert_eq!(extract_mobile(message).as_deref(), expected);
    }

    #[test]
    fn order_number_is_uppercased() {
        assert_eq!(
            extract_order_number("track ord-20260318-ab12cd please").as_deref(),
            Some("ORD-20260318-AB12CD")
        );
    }

    proptest! {
        #[test]
        fn detection_never_panics(message in "\\PC{0,200}") {
            let (intent, score) = detect_intent(&message);
            prop_assert!(intent != Intent::Fallback || score == 0);
        }
    }
}

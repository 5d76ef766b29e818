pub mod call_request;
pub mod chat_message;
pub mod notification;
pub mod order;
pub mod order_item;
pub mod product;
pub mod service_booking;
pub mod shipment;

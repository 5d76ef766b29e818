//! Plain-text email bodies for customers and the seller.

use crate::entities::{
    call_request::Model as CallRequestModel,
    order::{Model as OrderModel, OrderStatus},
    order_item::Model as OrderItemModel,
    service_booking::{BookingStatus, Model as BookingModel},
    shipment::Model as ShipmentModel,
};

use super::mailer::EmailMessage;

const SIGNATURE: &str = "\n\nTeam AquaCare\nPure water, every day.";

fn money(currency: &str, amount: rust_decimal::Decimal) -> String {
    format!("{} {}", currency, amount.round_dp(2))
}

fn item_lines(order: &OrderModel, items: &[OrderItemModel]) -> String {
    items
        .iter()
        .map(|i| {
            format!(
                "  - {} x {} ({})",
                i.quantity,
                i.product_name,
                money(&order.currency, i.line_total)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn shipping_address(order: &OrderModel) -> String {
    let mut lines = vec![order.address_line1.clone()];
    if let Some(line2) = &order.address_line2 {
        lines.push(line2.clone());
    }
    lines.push(format!("{}, {} - {}", order.city, order.state, order.pincode));
    lines.join("\n  ")
}

pub fn order_confirmation(order: &OrderModel, items: &[OrderItemModel]) -> EmailMessage {
    EmailMessage {
        to: order.customer_email.clone(),
        subject: format!("Order {} received", order.order_number),
        body: format!(
            "Hi {},\n\nThank you for your order! We have received order {}.\n\nItems:\n{}\n\nSubtotal: {}\nShipping: {}\nTotal: {} ({})\n\nShipping to:\n  {}\n\nWe'll email you again once it ships.{}",
            order.customer_name,
            order.order_number,
            item_lines(order, items),
            money(&order.currency, order.subtotal),
            money(&order.currency, order.shipping_fee),
            money(&order.currency, order.total),
            order.payment_method.to_string().to_uppercase(),
            shipping_address(order),
            SIGNATURE
        ),
    }
}

pub fn new_order_alert(admin: &str, order: &OrderModel, items: &[OrderItemModel]) -> EmailMessage {
    EmailMessage {
        to: admin.to_string(),
        subject: format!(
            "New order {} - {}",
            order.order_number,
            money(&order.currency, order.total)
        ),
        body: format!(
            "New {} order from {} ({}, {}).\n\n{}\n\nDeliver to:\n  {}",
            order.payment_method.to_string().to_uppercase(),
            order.customer_name,
            order.customer_phone,
            order.customer_email,
            item_lines(order, items),
            shipping_address(order)
        ),
    }
}

/// Customer notice for a status change; statuses without news return `None`
pub fn order_status_update(order: &OrderModel) -> Option<EmailMessage> {
    let detail = match order.status {
        OrderStatus::Confirmed => "has been confirmed and is being prepared.".to_string(),
        OrderStatus::Shipped => match &order.tracking_number {
            Some(tracking) => format!(
                "has shipped with {}. Tracking number: {}.",
                order.courier_name.as_deref().unwrap_or("our courier partner"),
                tracking
            ),
            None => "has shipped.".to_string(),
        },
        OrderStatus::Delivered => {
            "has been delivered. Our technician will contact you to schedule the free installation."
                .to_string()
        }
        OrderStatus::Cancelled => format!(
            "has been cancelled{}.",
            order
                .cancellation_reason
                .as_deref()
                .map(|r| format!(" ({})", r))
                .unwrap_or_default()
        ),
        OrderStatus::Pending | OrderStatus::Processing => return None,
    };

    Some(EmailMessage {
        to: order.customer_email.clone(),
        subject: format!("Order {} update", order.order_number),
        body: format!(
            "Hi {},\n\nYour order {} {}{}",
            order.customer_name, order.order_number, detail, SIGNATURE
        ),
    })
}

pub fn shipment_dispatched(order: &OrderModel, shipment: &ShipmentModel) -> EmailMessage {
    let tracking = match (&shipment.awb_code, &shipment.courier_name) {
        (Some(awb), Some(courier)) => format!("Courier: {}\nTracking number (AWB): {}", courier, awb),
        (Some(awb), None) => format!("Tracking number (AWB): {}", awb),
        _ => "Tracking details will follow as soon as the courier assigns them.".to_string(),
    };

    EmailMessage {
        to: order.customer_email.clone(),
        subject: format!("Order {} is on its way", order.order_number),
        body: format!(
            "Hi {},\n\nYour order {} has been handed to our courier partner.\n\n{}{}",
            order.customer_name, order.order_number, tracking, SIGNATURE
        ),
    }
}

pub fn booking_received(booking: &BookingModel, to: &str) -> EmailMessage {
    EmailMessage {
        to: to.to_string(),
        subject: format!("Service booking {} received", booking.booking_number),
        body: format!(
            "Hi {},\n\nWe have received your {} request for {} ({} slot). Booking reference: {}.\n\nWe'll confirm the visit and share technician details shortly.{}",
            booking.customer_name,
            booking.service_type.label(),
            booking.preferred_date.format("%d %b %Y"),
            booking.time_slot,
            booking.booking_number,
            SIGNATURE
        ),
    }
}

pub fn booking_status_update(booking: &BookingModel, to: &str) -> EmailMessage {
    let detail = match booking.status {
        BookingStatus::Confirmed => {
            let technician = match (&booking.technician_name, &booking.technician_phone) {
                (Some(name), Some(phone)) => format!(" Technician: {} ({}).", name, phone),
                (Some(name), None) => format!(" Technician: {}.", name),
                _ => String::new(),
            };
            format!(
                "is confirmed for {} ({} slot).{}",
                booking.preferred_date.format("%d %b %Y"),
                booking.time_slot,
                technician
            )
        }
        BookingStatus::InProgress => "is in progress.".to_string(),
        BookingStatus::Completed => {
            "is complete. Thank you for choosing AquaCare!".to_string()
        }
        BookingStatus::Cancelled => format!(
            "has been cancelled{}.",
            booking
                .cancellation_reason
                .as_deref()
                .map(|r| format!(" ({})", r))
                .unwrap_or_default()
        ),
        BookingStatus::Pending => "is pending.".to_string(),
    };

    EmailMessage {
        to: to.to_string(),
        subject: format!("Service booking {} update", booking.booking_number),
        body: format!(
            "Hi {},\n\nYour {} booking {} {}{}",
            booking.customer_name,
            booking.service_type.label().to_lowercase(),
            booking.booking_number,
            detail,
            SIGNATURE
        ),
    }
}

pub fn new_booking_alert(admin: &str, booking: &BookingModel) -> EmailMessage {
    EmailMessage {
        to: admin.to_string(),
        subject: format!(
            "New {} booking {}",
            booking.service_type.label().to_lowercase(),
            booking.booking_number
        ),
        body: format!(
            "{} ({}) booked {} on {} ({} slot).\nAddress: {} - {}\nIssue: {}",
            booking.customer_name,
            booking.customer_phone,
            booking.service_type.label().to_lowercase(),
            booking.preferred_date.format("%d %b %Y"),
            booking.time_slot,
            booking.address,
            booking.pincode,
            booking.issue_description.as_deref().unwrap_or("-")
        ),
    }
}

pub fn urgent_call_alert(admin: &str, request: &CallRequestModel) -> EmailMessage {
    EmailMessage {
        to: admin.to_string(),
        subject: format!("URGENT call back: {} ({})", request.name, request.phone),
        body: format!(
            "{} asked for a call back.\nPhone: {}\nReason: {}\nMessage: {}\nPreferred time: {}\nSource: {}",
            request.name,
            request.phone,
            request.reason,
            request.message.as_deref().unwrap_or("-"),
            request.preferred_time.as_deref().unwrap_or("any"),
            request.source
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::order::{PaymentMethod, PaymentStatus};
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn order(status: OrderStatus) -> OrderModel {
        let now = Utc::now();
        OrderModel {
            id: Uuid::new_v4(),
            order_number: "ORD-20260318-AB12CD".into(),
            customer_name: "Asha".into(),
            customer_email: "asha@example.com".into(),
            customer_phone: "9876543210".into(),
            address_line1: "12 MG Road".into(),
            address_line2: Some("Near metro".into()),
            city: "Bengaluru".into(),
            state: "Karnataka".into(),
            pincode: "560001".into(),
            status,
            payment_method: PaymentMethod::Cod,
            payment_status: PaymentStatus::Pending,
            subtotal: dec!(12999),
            shipping_fee: dec!(0),
            total: dec!(12999),
            currency: "INR".into(),
            notes: None,
            tracking_number: Some("AWB123".into()),
            courier_name: Some("Delhivery".into()),
            cancellation_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn confirmation_lists_items_and_total() {
        let o = order(OrderStatus::Pending);
        let items = vec![OrderItemModel {
            id: Uuid::new_v4(),
            order_id: o.id,
            product_id: Uuid::new_v4(),
            product_name: "AquaPure RO 8L".into(),
            sku: "RO-8L".into(),
            unit_price: dec!(12999),
            quantity: 1,
            line_total: dec!(12999),
        }];
        let email = order_confirmation(&o, &items);
        assert_eq!(email.to, "asha@example.com");
        assert!(email.body.contains("1 x AquaPure RO 8L"));
        assert!(email.body.contains("Total: INR 12999"));
        assert!(email.body.contains("Near metro"));
    }

    #[test]
    fn shipped_update_mentions_tracking() {
        let email = order_status_update(&order(OrderStatus::Shipped)).unwrap();
        assert!(email.body.contains("AWB123"));
        assert!(email.body.contains("Delhivery"));
    }

    #[test]
    fn processing_sends_no_email() {
        assert!(order_status_update(&order(OrderStatus::Processing)).is_none());
    }
}

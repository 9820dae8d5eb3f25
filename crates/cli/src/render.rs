//! Terminal rendering of stores, entities and UI events.

use bubblemart_core::{
    FieldErrors, LogCredential, Order, Payment, Product, User, format_payment_method, format_whole,
};
use bubblemart_storefront::store::{CartItem, Collection, LinePhase};
use bubblemart_storefront::{ToastLevel, UiEvent};
use tokio::sync::broadcast;

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Print every event published since the last call. Returns whether an
/// error toast was among them.
#[allow(clippy::print_stdout)]
pub fn drain_events(events: &mut broadcast::Receiver<UiEvent>) -> bool {
    let mut error_shown = false;
    loop {
        match events.try_recv() {
            Ok(UiEvent::Toast { level, message }) => {
                error_shown |= level == ToastLevel::Error;
                let tag = match level {
                    ToastLevel::Success => "ok",
                    ToastLevel::Info => "info",
                    ToastLevel::Warning => "warn",
                    ToastLevel::Error => "error",
                };
                println!("[{tag}] {message}");
            }
            Ok(UiEvent::Navigate(route)) => println!("-> {route}"),
            Ok(UiEvent::Redirect(url)) => println!("Continue in your browser: {url}"),
            Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Dropped UI events");
            }
            Err(_) => break,
        }
    }
    error_shown
}

#[allow(clippy::print_stdout)]
pub fn message(text: &str) {
    println!("{text}");
}

#[allow(clippy::print_stderr)]
pub fn failure(text: &str) {
    eprintln!("error: {text}");
}

#[allow(clippy::print_stderr)]
pub fn field_errors(errors: &FieldErrors) {
    for (field, messages) in errors.iter() {
        for message in messages {
            eprintln!("  {field}: {message}");
        }
    }
}

#[allow(clippy::print_stdout)]
pub fn products(products: &[Product]) {
    if products.is_empty() {
        println!("No products found");
        return;
    }
    for p in products {
        println!(
            "{:<26} {:<5} {:>12}  {:>4} left  {}",
            p.id,
            p.kind,
            p.amount.display(),
            p.quantity,
            p.name
        );
    }
}

#[allow(clippy::print_stdout)]
pub fn product(p: &Product) {
    println!("{} ({})", p.name, p.kind);
    println!("  id:       {}", p.id);
    println!("  price:    {}", p.amount.display());
    println!("  in stock: {}", p.quantity);
    if p.total_sales > 0 {
        println!("  sold:     {}", p.total_sales);
    }
    if !p.description.is_empty() {
        println!("  {}", p.description);
    }
}

#[allow(clippy::print_stdout)]
pub fn cart(cart: &Collection<CartItem>) {
    if let Some(error) = &cart.error {
        println!("Could not load cart: {error}");
        return;
    }
    if cart.is_empty() {
        println!("Your cart is empty");
        return;
    }
    for item in cart.iter() {
        let state = match item.phase {
            LinePhase::Idle => "",
            LinePhase::Syncing => " (updating)",
            LinePhase::Deleting => " (removing)",
        };
        println!(
            "{:<26} {:>3} x {:<30} {:>12}{state}",
            item.line.id,
            item.display_quantity(),
            item.line.product_details.name,
            item.line.product_details.amount.display(),
        );
    }
    println!("Total: {}", cart.formatted_total());
    if cart.needs_address() {
        println!("Delivery details are required at checkout");
    }
}

#[allow(clippy::print_stdout)]
pub fn orders(orders: &[Order]) {
    if orders.is_empty() {
        println!("No orders yet");
        return;
    }
    for order in orders {
        let action = match order.payment_action() {
            bubblemart_core::PaymentAction::ViewReceipt => "view receipt",
            bubblemart_core::PaymentAction::CompletePayment => "complete payment",
            bubblemart_core::PaymentAction::PayNow => "pay now",
        };
        println!(
            "{:<26} {:<9?} {:>3} item(s)  {:>12}  [{action}]",
            order.id,
            order.status,
            order.cart_items.len(),
            order_total(order),
        );
    }
}

#[allow(clippy::print_stdout)]
pub fn order(order: &Order) {
    println!("Order {}", order.id);
    println!("  status:  {:?}", order.status);
    if let Some(created) = order.created_at {
        println!("  placed:  {}", created.format(DATE_FORMAT));
    }
    for line in &order.cart_items {
        println!(
            "  {:>3} x {:<30} {:>12}",
            line.quantity,
            line.product_details.name,
            line.product_details.amount.display()
        );
    }
    println!("  total:   {}", order_total(order));
    if let Some(contact) = &order.contact_information {
        println!(
            "  deliver to {} at {} ({})",
            contact.receiver_name, contact.receiver_address, contact.receiver_phone_number
        );
    }
    if order.is_refunded() {
        println!("  refunded");
    }
}

#[allow(clippy::print_stdout)]
pub fn receipt(order: &Order) {
    if !order.is_paid() {
        println!("Payment for order {} has not been confirmed yet", order.id);
        return;
    }
    println!("Payment received for order {}", order.id);
    if let Some(paid) = order.paid_at {
        println!("  paid:      {}", paid.format(DATE_FORMAT));
    }
    println!(
        "  method:    {}",
        format_payment_method(order.payment_method.as_deref())
    );
    if let Some(reference) = &order.payment_reference {
        println!("  reference: {reference}");
    }
    println!("  amount:    {}", order_total(order));
}

#[allow(clippy::print_stdout)]
pub fn users(users: &[User]) {
    for user in users {
        println!(
            "{:<26} {:<30} {:<20} orders: {}/{}",
            user.id, user.email, user.name, user.total_completed_orders, user.total_orders
        );
    }
}

#[allow(clippy::print_stdout)]
pub fn user(user: &User) {
    println!("{} <{}>", user.name, user.email);
    println!("  id:    {}", user.id);
    println!("  role:  {:?}", user.role);
    println!("  carts: {}", user.total_carts);
    println!(
        "  orders: {} ({} completed)",
        user.total_orders, user.total_completed_orders
    );
}

#[allow(clippy::print_stdout)]
pub fn payments(payments: &[Payment]) {
    for payment in payments {
        let paid = payment
            .paid_at
            .map_or_else(|| "unpaid".to_string(), |at| at.format(DATE_FORMAT).to_string());
        println!(
            "{:<26} {:<16} {:<16} {}",
            payment.id,
            payment.reference.as_deref().unwrap_or("-"),
            format_payment_method(payment.payment_method.as_deref()),
            paid
        );
    }
}

#[allow(clippy::print_stdout)]
pub fn logs(logs: &[LogCredential]) {
    if logs.is_empty() {
        println!("No logs");
        return;
    }
    for log in logs {
        let sold = if log.assigned_to.is_some() { "sold" } else { "" };
        println!("{:<26} {:<30} {:<20} {sold}", log.id, log.email, log.password);
    }
}

fn order_total(order: &Order) -> String {
    let symbol = order
        .cart_items
        .first()
        .map_or("₦", |line| line.product_details.amount.currency.symbol.as_str());
    format_whole(symbol, order.total_whole())
}

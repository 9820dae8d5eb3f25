//! Checkout, orders and payment commands.

use bubblemart_core::{ContactInfo, OrderId};
use bubblemart_storefront::ClientState;
use bubblemart_storefront::services::{OrderService, PaymentService, ReceiptCopy};

use crate::error::CliError;
use crate::render;

/// Check out the whole cart.
pub async fn checkout(state: &ClientState, contact: Option<ContactInfo>) -> Result<(), CliError> {
    state.session().require(Some("/cart"))?;
    state.cart().fetch().await?;
    let cart = state.cart_store().snapshot();
    render::cart(&cart);
    if cart.is_empty() {
        return Ok(());
    }

    let checkout = state.checkout();
    match checkout.run(contact).await {
        Ok(session) => {
            tracing::info!(reference = %session.reference, "Payment session ready");
            Ok(())
        }
        Err(e) => {
            let snapshot = checkout.snapshot();
            if let Some(order_id) = &snapshot.order_id {
                render::message(&format!(
                    "Order {order_id} was created; run `bubblemart pay {order_id}` to retry payment"
                ));
            }
            match snapshot.banner {
                Some(banner) => Err(CliError::reported(e, banner)),
                None => Err(e.into()),
            }
        }
    }
}

pub async fn list(state: &ClientState, admin: bool) -> Result<(), CliError> {
    state.session().require(Some("/orders"))?;
    let orders = state.orders();
    orders.list(admin).await?;
    while orders.load_next_page(admin).await? {}

    let store = if admin {
        state.admin_order_store()
    } else {
        state.order_store()
    };
    render::orders(&store.items().unwrap_or_default());
    Ok(())
}

pub async fn show(state: &ClientState, id: &str) -> Result<(), CliError> {
    state.session().require(None)?;
    let order = state
        .orders()
        .get(&OrderId::new(id))
        .await
        .map_err(|e| {
            let message = OrderService::detail_error_message(&e);
            CliError::reported(e, message)
        })?;
    render::order(&order);
    Ok(())
}

/// The order card's payment button: receipt, resume, or a new session.
pub async fn pay(state: &ClientState, id: &str) -> Result<(), CliError> {
    state.session().require(Some("/orders"))?;
    let order = state.orders().get(&OrderId::new(id)).await?;
    if order.is_paid() {
        render::receipt(&order);
        return Ok(());
    }
    state.checkout().resume_payment(&order).await?;
    Ok(())
}

/// Check the payment result of an order, as on return from the provider.
pub async fn verify(state: &ClientState, id: &str, reference: Option<&str>) -> Result<(), CliError> {
    state.session().require(None)?;
    render::message(ReceiptCopy::for_reference(reference).loading_text());
    let order = state
        .payments()
        .verify(&OrderId::new(id))
        .await
        .map_err(|e| {
            let message = PaymentService::verify_error_message(&e);
            CliError::reported(e, message)
        })?;
    render::receipt(&order);
    Ok(())
}

/// Credentials bought by the signed-in user.
pub async fn purchased_logs(state: &ClientState, page: u32) -> Result<(), CliError> {
    state.session().require(None)?;
    state.logs().list_purchased(page).await?;
    render::logs(&state.purchased_log_store().items().unwrap_or_default());
    Ok(())
}

//! Cart commands.

use bubblemart_core::{CartLineId, ProductId};
use bubblemart_storefront::ClientState;

use crate::error::CliError;
use crate::render;

pub async fn show(state: &ClientState) -> Result<(), CliError> {
    state.session().require(Some("/cart"))?;
    // A failed fetch is recorded on the store and rendered from there.
    let _ = state.cart().fetch().await;
    render::cart(&state.cart_store().snapshot());
    Ok(())
}

pub async fn add(state: &ClientState, product_id: &str, quantity: u32) -> Result<(), CliError> {
    let product_id = ProductId::new(product_id);
    // Knowing the product lets the stock check run before the request.
    if state.session().is_authenticated() && state.catalog().find(&product_id).is_none() {
        let _ = state.products().get(&product_id, false).await;
    }
    let item = state.cart().add(&product_id, quantity).await?;
    tracing::debug!(line_id = %item.line.id, "Cart line added");
    render::cart(&state.cart_store().snapshot());
    Ok(())
}

/// Set a line's quantity and wait for the debounced update to land.
pub async fn set(state: &ClientState, line_id: &str, quantity: u32) -> Result<(), CliError> {
    state.session().require(Some("/cart"))?;
    let cart = state.cart();
    cart.fetch().await?;
    cart.update_quantity(&CartLineId::new(line_id), quantity)?;
    cart.settle().await;
    render::cart(&state.cart_store().snapshot());
    Ok(())
}

pub async fn remove(state: &ClientState, line_id: &str) -> Result<(), CliError> {
    state.session().require(Some("/cart"))?;
    let cart = state.cart();
    cart.fetch().await?;
    let line_id = CartLineId::new(line_id);
    if state.cart_store().get(&line_id).is_none() {
        return Err(CliError::InvalidArgument(format!(
            "no cart line with id {line_id}"
        )));
    }
    cart.remove_line(&line_id).await?;
    render::cart(&state.cart_store().snapshot());
    Ok(())
}

pub async fn clear(state: &ClientState) -> Result<(), CliError> {
    state.session().require(Some("/cart"))?;
    state.cart().clear().await?;
    render::message("Cart emptied");
    Ok(())
}

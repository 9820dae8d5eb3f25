//! Browsing the catalog.

use bubblemart_core::{ProductId, ProductKind};
use bubblemart_storefront::ClientState;
use bubblemart_storefront::services::ProductService;

use crate::error::CliError;
use crate::render;

/// List products of one kind, optionally following every page.
pub async fn list(state: &ClientState, kind: ProductKind, all_pages: bool) -> Result<(), CliError> {
    let products = state.products();
    let store = state.catalog().for_kind(kind);
    if let Err(e) = products.list(kind).await {
        // The store keeps the message a products page would show.
        return Err(match store.snapshot().error {
            Some(message) => CliError::reported(e, message),
            None => e.into(),
        });
    }
    if all_pages {
        while products.load_next_page(kind).await? {}
    }

    render::products(&store.items().unwrap_or_default());
    Ok(())
}

/// Show one product.
pub async fn show(state: &ClientState, id: &str, admin: bool) -> Result<(), CliError> {
    let product = state
        .products()
        .get(&ProductId::new(id), admin)
        .await
        .map_err(|e| {
            let message = ProductService::detail_error_message(&e);
            CliError::reported(e, message)
        })?;
    render::product(&product);
    Ok(())
}

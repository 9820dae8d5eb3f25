//! Back-office commands: customers, payments, products and their logs.
//!
//! Every command here needs a signed-in admin.

use std::path::Path;

use bubblemart_core::{LogId, LogInput, NewProduct, ProductId, ProductKind, ProductUpdate, UserId};
use bubblemart_storefront::ClientState;
use bubblemart_storefront::services::UserService;
use rust_decimal::Decimal;

use crate::error::CliError;
use crate::render;

fn require_admin(state: &ClientState) -> Result<(), CliError> {
    state.session().require(None)?;
    if state.session_state().borrow().is_admin() {
        Ok(())
    } else {
        Err(CliError::NotAdmin)
    }
}

pub async fn users(state: &ClientState) -> Result<(), CliError> {
    require_admin(state)?;
    let users = state.users();
    users.list().await?;
    while users.load_next_page().await? {}
    render::users(&state.user_store().items().unwrap_or_default());
    Ok(())
}

pub async fn user(state: &ClientState, id: &str) -> Result<(), CliError> {
    require_admin(state)?;
    let user = state
        .users()
        .get(&UserId::new(id))
        .await
        .map_err(|e| {
            let message = UserService::detail_error_message(&e);
            CliError::reported(e, message)
        })?;
    render::user(&user);
    Ok(())
}

pub async fn payments(state: &ClientState) -> Result<(), CliError> {
    require_admin(state)?;
    let payments = state.payments();
    payments.list().await?;
    while payments.load_next_page().await? {}
    render::payments(&state.payment_store().items().unwrap_or_default());
    Ok(())
}

/// Input for a new product.
#[derive(Debug, Clone)]
pub struct ProductInput {
    pub name: String,
    pub kind: ProductKind,
    pub quantity: u32,
    pub amount: Decimal,
    pub image: String,
    pub description: String,
    /// `email:password` pairs for a log product.
    pub logs: Vec<String>,
}

pub async fn create_product(state: &ClientState, input: ProductInput) -> Result<(), CliError> {
    require_admin(state)?;
    let logs = match input.kind {
        ProductKind::Log => Some(parse_logs(&input.logs)?),
        ProductKind::Gift => None,
    };
    let quantity = match &logs {
        Some(logs) => u32::try_from(logs.len()).unwrap_or(u32::MAX),
        None => input.quantity,
    };
    let product = state
        .products()
        .create(NewProduct {
            name: input.name,
            kind: input.kind,
            quantity,
            amount: input.amount,
            image: input.image,
            description: input.description,
            logs,
        })
        .await?;
    render::product(&product);
    Ok(())
}

pub async fn update_product(
    state: &ClientState,
    id: &str,
    update: ProductUpdate,
    logs: &[String],
) -> Result<(), CliError> {
    require_admin(state)?;
    let update = if logs.is_empty() {
        update
    } else {
        update.with_logs(parse_logs(logs)?)
    };
    let product = state.products().update(&ProductId::new(id), update).await?;
    render::product(&product);
    Ok(())
}

pub async fn delete_product(state: &ClientState, id: &str) -> Result<(), CliError> {
    require_admin(state)?;
    state.products().delete(&ProductId::new(id)).await?;
    Ok(())
}

pub async fn product_logs(state: &ClientState, product_id: &str, page: u32) -> Result<(), CliError> {
    require_admin(state)?;
    state
        .logs()
        .list_for_product(&ProductId::new(product_id), page)
        .await?;
    let snapshot = state.product_log_store().snapshot();
    render::logs(&snapshot.items.clone().unwrap_or_default());
    if let Some(next) = snapshot.next_page() {
        render::message(&format!("More on page {next}"));
    }
    Ok(())
}

pub async fn update_log(
    state: &ClientState,
    id: &str,
    email: &str,
    password: &str,
) -> Result<(), CliError> {
    require_admin(state)?;
    state
        .logs()
        .update(&LogId::new(id), email, password)
        .await?;
    Ok(())
}

pub async fn delete_log(state: &ClientState, id: &str) -> Result<(), CliError> {
    require_admin(state)?;
    state.logs().delete(&LogId::new(id)).await?;
    Ok(())
}

/// Upload a product image from disk and print its link.
pub async fn upload(state: &ClientState, path: &Path) -> Result<(), CliError> {
    require_admin(state)?;
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| CliError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
    let file_name = path
        .file_name()
        .map_or_else(|| "image".to_string(), |n| n.to_string_lossy().into_owned());

    let image = state
        .uploads()
        .upload_image(&file_name, mime_for(path), bytes)
        .await?;
    render::message(&image.link);
    Ok(())
}

pub async fn delete_upload(state: &ClientState, path: &str) -> Result<(), CliError> {
    require_admin(state)?;
    state.uploads().delete_image(path).await?;
    render::message("Image deleted");
    Ok(())
}

/// Parse `email:password` pairs. The password may itself contain colons.
fn parse_logs(raw: &[String]) -> Result<Vec<LogInput>, CliError> {
    raw.iter()
        .map(|pair| {
            pair.split_once(':')
                .map(|(email, password)| LogInput {
                    email: email.trim().to_string(),
                    password: password.to_string(),
                })
                .ok_or_else(|| {
                    CliError::InvalidArgument(format!("expected email:password, got {pair}"))
                })
        })
        .collect()
}

fn mime_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase());
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

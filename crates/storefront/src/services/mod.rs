//! Commerce services.
//!
//! Each service composes the API client with its store(s) into the named
//! operations the view calls.
//!
//! # Services
//!
//! - `auth` - Login and registration
//! - `cart` - Cart lines, debounced quantity updates
//! - `products` - Catalog lists, product detail, admin CRUD
//! - `orders` - Own and admin order lists, order detail
//! - `payments` - Payment initiation, verification, admin payment list
//! - `users` - Current user, admin user list and detail
//! - `logs` - Credentials behind log products
//! - `uploads` - Product image upload and removal
//!
//! Failure policy shared by all of them: a 401 tears the session down, a
//! cancelled request is dropped silently, list fetches record their error on
//! the store, mutations toast theirs.

mod auth;
mod cart;
mod logs;
mod orders;
mod payments;
mod products;
mod uploads;
mod users;

pub use auth::{AuthService, Registration};
pub use cart::CartService;
pub use logs::LogService;
pub use orders::OrderService;
pub use payments::{PaymentService, ReceiptCopy};
pub use products::ProductService;
pub use uploads::UploadService;
pub use users::UserService;

use serde::de::DeserializeOwned;

use crate::api::Page;
use crate::error::{CommerceError, Result};
use crate::state::ClientState;
use crate::store::{Entity, EntityStore};

/// Fetch the first page of a list into `store`, replacing what it held.
async fn fetch_list<T>(
    state: &ClientState,
    store: &EntityStore<T>,
    path: &str,
    fallback: &str,
) -> Result<()>
where
    T: Entity + DeserializeOwned,
{
    store.set_error(None);
    match state.api().get::<Vec<T>>(path).await {
        Ok(envelope) => {
            let page = Page::from(envelope);
            store.set_page(page.items, page.pagination);
            Ok(())
        }
        Err(e) => Err(fetch_failed(state, store, e.into(), fallback)),
    }
}

/// Fetch the page after the last one loaded and merge it into `store`.
///
/// Returns `false` without a request when there is no further page or one is
/// already loading.
async fn fetch_next<T>(
    state: &ClientState,
    store: &EntityStore<T>,
    path_for: impl FnOnce(u32) -> String,
    fallback: &str,
) -> Result<bool>
where
    T: Entity + DeserializeOwned,
{
    let snapshot = store.snapshot();
    let Some(page) = snapshot.next_page() else {
        return Ok(false);
    };
    if snapshot.loading_next {
        return Ok(false);
    }

    store.begin_fetch_next();
    match state.api().get::<Vec<T>>(&path_for(page)).await {
        Ok(envelope) => {
            let page = Page::from(envelope);
            store.merge_page(page.items, page.pagination);
            Ok(true)
        }
        Err(e) => Err(fetch_failed(state, store, e.into(), fallback)),
    }
}

/// Record a failed list fetch on its store.
fn fetch_failed<T: Entity>(
    state: &ClientState,
    store: &EntityStore<T>,
    err: CommerceError,
    fallback: &str,
) -> CommerceError {
    let err = state.intercept(err);
    if err.is_silent() || err.is_unauthorized() {
        // Cancelled or torn down: the store is already in its reset state.
        store.set_error(None);
    } else {
        store.set_error(Some(err.user_message(fallback)));
    }
    err
}

/// Report a failed mutation to the user.
fn mutation_failed(state: &ClientState, err: CommerceError, fallback: &str) -> CommerceError {
    let err = state.intercept(err);
    if !err.is_silent() && !err.is_unauthorized() {
        state.events().error(err.user_message(fallback));
    }
    err
}

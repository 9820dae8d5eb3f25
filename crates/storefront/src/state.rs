//! Client state shared by every service.

use std::sync::Arc;
use std::time::Duration;

use bubblemart_core::{CartLineId, LogCredential, Order, OrderId, Payment, Product, ProductId, User};
use moka::future::Cache;
use tokio::sync::watch;

use crate::api::ApiClient;
use crate::checkout::Checkout;
use crate::config::ClientConfig;
use crate::debounce::Debouncer;
use crate::error::{CommerceError, Result};
use crate::events::EventBus;
use crate::services::{
    AuthService, CartService, LogService, OrderService, PaymentService, ProductService,
    UploadService, UserService,
};
use crate::session::{FileTokenStore, LogoutReason, Session, SessionState, TokenStore};
use crate::store::{CartItem, Catalog, EntityStore};

/// Client state shared across all services.
///
/// Cheaply cloneable via `Arc`; clones see the same stores, token and caches.
#[derive(Clone)]
pub struct ClientState {
    inner: Arc<ClientStateInner>,
}

pub(crate) struct Stores {
    pub cart: EntityStore<CartItem>,
    pub catalog: Catalog,
    pub orders: EntityStore<Order>,
    pub admin_orders: EntityStore<Order>,
    pub users: EntityStore<User>,
    pub payments: EntityStore<Payment>,
    pub product_logs: EntityStore<LogCredential>,
    pub purchased_logs: EntityStore<LogCredential>,
}

struct ClientStateInner {
    config: ClientConfig,
    api: ApiClient,
    events: EventBus,
    token_store: Arc<dyn TokenStore>,
    stores: Stores,
    session: watch::Sender<SessionState>,
    quantity_updates: Debouncer<CartLineId, u32>,
    product_cache: Cache<ProductId, Product>,
    paid_orders: Cache<OrderId, Order>,
}

impl ClientState {
    /// Create client state persisting the token through `token_store`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: ClientConfig, token_store: Arc<dyn TokenStore>) -> Result<Self> {
        let api = ApiClient::new(&config)?;

        let product_cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        // Paid is final; kept for the whole session.
        let paid_orders = Cache::builder().max_capacity(1000).build();

        let quantity_updates = Debouncer::new(config.quantity_debounce);
        let (session, _rx) = watch::channel(SessionState::default());

        Ok(Self {
            inner: Arc::new(ClientStateInner {
                config,
                api,
                events: EventBus::new(),
                token_store,
                stores: Stores {
                    cart: EntityStore::new(),
                    catalog: Catalog::new(),
                    orders: EntityStore::new(),
                    admin_orders: EntityStore::new(),
                    users: EntityStore::new(),
                    payments: EntityStore::new(),
                    product_logs: EntityStore::new(),
                    purchased_logs: EntityStore::new(),
                },
                session,
                quantity_updates,
                product_cache,
                paid_orders,
            }),
        })
    }

    /// Create client state persisting the token to `config.token_path()`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(config: ClientConfig) -> Result<Self> {
        let token_store = Arc::new(FileTokenStore::new(config.token_path()));
        Self::new(config, token_store)
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    #[must_use]
    pub fn events(&self) -> &EventBus {
        &self.inner.events
    }

    #[must_use]
    pub fn token_store(&self) -> &dyn TokenStore {
        self.inner.token_store.as_ref()
    }

    // =========================================================================
    // Stores
    // =========================================================================

    #[must_use]
    pub fn cart_store(&self) -> &EntityStore<CartItem> {
        &self.inner.stores.cart
    }

    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.inner.stores.catalog
    }

    /// The signed-in user's orders.
    #[must_use]
    pub fn order_store(&self) -> &EntityStore<Order> {
        &self.inner.stores.orders
    }

    /// Every customer's orders, for admins.
    #[must_use]
    pub fn admin_order_store(&self) -> &EntityStore<Order> {
        &self.inner.stores.admin_orders
    }

    #[must_use]
    pub fn user_store(&self) -> &EntityStore<User> {
        &self.inner.stores.users
    }

    #[must_use]
    pub fn payment_store(&self) -> &EntityStore<Payment> {
        &self.inner.stores.payments
    }

    /// Credentials behind the log product currently being managed.
    #[must_use]
    pub fn product_log_store(&self) -> &EntityStore<LogCredential> {
        &self.inner.stores.product_logs
    }

    /// Credentials the signed-in user has bought.
    #[must_use]
    pub fn purchased_log_store(&self) -> &EntityStore<LogCredential> {
        &self.inner.stores.purchased_logs
    }

    /// Session snapshots: current user, token presence, last error.
    #[must_use]
    pub fn session_state(&self) -> watch::Receiver<SessionState> {
        self.inner.session.subscribe()
    }

    pub(crate) fn session_tx(&self) -> &watch::Sender<SessionState> {
        &self.inner.session
    }

    pub(crate) fn quantity_updates(&self) -> &Debouncer<CartLineId, u32> {
        &self.inner.quantity_updates
    }

    pub(crate) fn product_cache(&self) -> &Cache<ProductId, Product> {
        &self.inner.product_cache
    }

    pub(crate) fn paid_orders(&self) -> &Cache<OrderId, Order> {
        &self.inner.paid_orders
    }

    /// Reset every store to its not-yet-fetched state and drop cached entities.
    pub(crate) fn clear_stores(&self) {
        let stores = &self.inner.stores;
        stores.cart.clear();
        stores.catalog.clear();
        stores.orders.clear();
        stores.admin_orders.clear();
        stores.users.clear();
        stores.payments.clear();
        stores.product_logs.clear();
        stores.purchased_logs.clear();
        self.inner.product_cache.invalidate_all();
        self.inner.paid_orders.invalidate_all();
    }

    /// Pass an error through, tearing the session down first if the server
    /// rejected the token.
    ///
    /// Only the first rejection of a token ends the session; later ones find
    /// the token already gone and pass through quietly.
    pub(crate) fn intercept(&self, err: CommerceError) -> CommerceError {
        if err.is_unauthorized() && self.api().take_auth_token().is_some() {
            self.session().logout(LogoutReason::Expired);
        }
        err
    }

    // =========================================================================
    // Services
    // =========================================================================

    #[must_use]
    pub fn session(&self) -> Session {
        Session::new(self.clone())
    }

    #[must_use]
    pub fn auth(&self) -> AuthService {
        AuthService::new(self.clone())
    }

    #[must_use]
    pub fn cart(&self) -> CartService {
        CartService::new(self.clone())
    }

    #[must_use]
    pub fn products(&self) -> ProductService {
        ProductService::new(self.clone())
    }

    #[must_use]
    pub fn orders(&self) -> OrderService {
        OrderService::new(self.clone())
    }

    #[must_use]
    pub fn payments(&self) -> PaymentService {
        PaymentService::new(self.clone())
    }

    #[must_use]
    pub fn users(&self) -> UserService {
        UserService::new(self.clone())
    }

    #[must_use]
    pub fn logs(&self) -> LogService {
        LogService::new(self.clone())
    }

    #[must_use]
    pub fn uploads(&self) -> UploadService {
        UploadService::new(self.clone())
    }

    #[must_use]
    pub fn checkout(&self) -> Checkout {
        Checkout::new(self.clone())
    }
}

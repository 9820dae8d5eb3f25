//! Domain types for Bubblemart.
//!
//! Wire shapes of the REST API plus the few pure checks the client runs on
//! them before anything reaches the network.

pub mod cart;
pub mod contact;
pub mod email;
pub mod field_errors;
pub mod id;
pub mod money;
pub mod order;
pub mod pagination;
pub mod product;
pub mod status;
pub mod user;

pub use cart::{CartLine, CartLineInput};
pub use contact::ContactInfo;
pub use email::{Email, EmailError};
pub use field_errors::FieldErrors;
pub use id::*;
pub use money::{Currency, FormattedAmount, Money, format_whole};
pub use order::{
    CreateOrderRequest, InitiatePaymentRequest, Order, Payment, PaymentAction, PaymentSession,
    format_payment_method,
};
pub use pagination::{PageLink, Pagination};
pub use product::{LogCredential, LogInput, NewProduct, Product, ProductRef, ProductUpdate};
pub use status::*;
pub use user::User;

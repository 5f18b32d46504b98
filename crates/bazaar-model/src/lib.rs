// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]
//! Marketplace domain model.
//!
//! Status enums carry their own transition tables; every other crate asks the
//! model whether a move is legal instead of re-deriving the rules.
//!
//! ```compile_fail
//! use bazaar_model::OrderStatus;
//!
//! fn exhaustive_match(s: OrderStatus) -> &'static str {
//!     match s {
//!         OrderStatus::Pending => "p",
//!         OrderStatus::Delivered => "d",
//!     }
//! }
//! ```

mod account;
mod catalog;
mod ids;
mod money;
mod order;
mod seller;
mod validation;

pub use account::{
    Address, AddressInput, CartItem, Notification, NotificationKind, ProfileChanges, Role,
    UserProfile, MAX_CART_QUANTITY,
};
pub use bazaar_core::UserId;
pub use catalog::{
    parse_slug, Category, NewCategory, Product, ProductDraft, ProductPatch, ProductSort,
    ProductStatus, PRODUCT_NAME_MAX_LEN, SLUG_MAX_LEN,
};
pub use ids::{AddressId, CategoryId, NotificationId, OrderId, OrderItemId, ProductId, SellerId};
pub use money::{CommissionRate, Money, BPS_SCALE};
pub use order::{
    FulfillmentStatus, LineItemRequest, Order, OrderItem, OrderStatus, PaymentMethod,
    ShippingTarget, INLINE_ADDRESS_MAX_LEN,
};
pub use seller::{Seller, SellerApplication, SellerStatus};
pub use validation::ValidationError;

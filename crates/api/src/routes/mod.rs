//! Route handlers and the static dispatch table.
//!
//! Every route resolves to a [`HandlerId`]; [`invoke`] maps identities to
//! typed handler functions at compile time. There is no string-based or
//! reflective dispatch anywhere in the pipeline.

pub mod orders;
pub mod products;
pub mod reports;
pub mod users;

use serde_json::Value;

use crate::dispatch::{Failure, HandlerCx};

/// Identity of a registered handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerId {
    SessionShow,
    SessionDestroy,
    Login,
    Logout,
    UserCreate,
    UserShow,
    UserUpdate,
    UserDelete,
    UserSendMail,
    ProductList,
    ProductShow,
    ProductCategories,
    ProductsByCategory,
    ProductUpdate,
    ProductDelete,
    OrderList,
    OrderShow,
    OrderStatuses,
    OrdersByStatus,
    Report,
}

/// What a successful handler hands back to the dispatcher for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub data: Value,
    pub message: String,
}

impl Reply {
    pub fn data(data: Value) -> Self {
        Self {
            data,
            message: String::new(),
        }
    }

    pub fn with_message(data: Value, message: impl Into<String>) -> Self {
        Self {
            data,
            message: message.into(),
        }
    }
}

/// Statically typed dispatch from route identity to handler.
pub async fn invoke(id: HandlerId, cx: &mut HandlerCx<'_>) -> Result<Reply, Failure> {
    match id {
        HandlerId::SessionShow => users::session_show(cx).await,
        HandlerId::SessionDestroy => users::session_destroy(cx).await,
        HandlerId::Login => users::login(cx).await,
        HandlerId::Logout => users::logout(cx).await,
        HandlerId::UserCreate => users::create(cx).await,
        HandlerId::UserShow => users::show(cx).await,
        HandlerId::UserUpdate => users::update(cx).await,
        HandlerId::UserDelete => users::delete(cx).await,
        HandlerId::UserSendMail => users::send_mail(cx).await,
        HandlerId::ProductList => products::list(cx).await,
        HandlerId::ProductShow => products::show(cx).await,
        HandlerId::ProductCategories => products::categories(cx).await,
        HandlerId::ProductsByCategory => products::by_category(cx).await,
        HandlerId::ProductUpdate => products::update(cx).await,
        HandlerId::ProductDelete => products::delete(cx).await,
        HandlerId::OrderList => orders::list(cx).await,
        HandlerId::OrderShow => orders::show(cx).await,
        HandlerId::OrderStatuses => orders::statuses(cx).await,
        HandlerId::OrdersByStatus => orders::by_status(cx).await,
        HandlerId::Report => reports::show(cx).await,
    }
}

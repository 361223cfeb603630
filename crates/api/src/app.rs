//! Application wiring: the route table and the axum host.
//!
//! All route resolution happens in our own [`Router`]; the axum app is a
//! single fallback handler that forwards every request to the
//! [`Dispatcher`].

use std::sync::Arc;

use axum::extract::{Extension, Request};
use axum::response::Response;
use tower::ServiceBuilder;

use crate::dispatch::{Dispatcher, Services};
use crate::router::{Access, Router};
use crate::routes::HandlerId;

/// Register every route. Registration order is match priority, so literal
/// routes precede the parameterized siblings they overlap with.
pub fn build_routes(base_path: &str) -> Router {
    let mut router = Router::new();
    let p = |path: &str| format!("{base_path}{path}");

    // Session routes
    router.get(&p("/auth/session"), HandlerId::SessionShow, Access::Authenticated);
    router.delete(&p("/auth/session"), HandlerId::SessionDestroy, Access::Public);

    // Auth routes
    router.post(&p("/auth/login"), HandlerId::Login, Access::Public);
    router.post(&p("/auth/logout"), HandlerId::Logout, Access::Public);

    // User routes
    router.post(&p("/user"), HandlerId::UserCreate, Access::Public);
    router.post(&p("/user/sendMail"), HandlerId::UserSendMail, Access::Public);
    router.get(&p("/user/:userId"), HandlerId::UserShow, Access::Authenticated);
    router.put(&p("/user/:userId"), HandlerId::UserUpdate, Access::Authenticated);
    router.delete(&p("/user/:userId"), HandlerId::UserDelete, Access::Authenticated);

    // Product routes
    router.get(&p("/products/categories"), HandlerId::ProductCategories, Access::Public);
    router.get(&p("/products/category/:name"), HandlerId::ProductsByCategory, Access::Public);
    router.get(&p("/products"), HandlerId::ProductList, Access::Public);
    router.get(&p("/products/:id"), HandlerId::ProductShow, Access::Public);
    router.put(&p("/products/:id"), HandlerId::ProductUpdate, Access::Authenticated);
    router.delete(&p("/products/:id"), HandlerId::ProductDelete, Access::Authenticated);

    // Order routes
    router.get(&p("/orders/statuses"), HandlerId::OrderStatuses, Access::Public);
    router.get(&p("/orders/status/:name"), HandlerId::OrdersByStatus, Access::Public);
    router.get(&p("/orders"), HandlerId::OrderList, Access::Authenticated);
    router.get(&p("/orders/:id"), HandlerId::OrderShow, Access::Authenticated);

    // Report routes
    router.get(&p("/report/:reportId"), HandlerId::Report, Access::Authenticated);

    router
}

/// Build the axum application around the dispatcher.
pub fn build_app(services: Arc<Services>) -> axum::Router {
    let router = build_routes(&services.config.base_path);
    let dispatcher = Arc::new(Dispatcher::new(router, services));

    axum::Router::new()
        .fallback(entry)
        .layer(ServiceBuilder::new().layer(Extension(dispatcher)))
}

async fn entry(Extension(dispatcher): Extension<Arc<Dispatcher>>, request: Request) -> Response {
    dispatcher.dispatch(request).await
}

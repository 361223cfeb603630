//! Resource models: thin parameterized-query glue over the [`Database`]
//! collaborator.
//!
//! [`Database`]: storefront_infra::Database

pub mod orders;
pub mod products;
pub mod reports;
pub mod users;

pub use orders::OrderModel;
pub use products::ProductModel;
pub use reports::ReportModel;
pub use users::UserModel;

pub mod auth;
pub mod compactor;
pub mod http;
pub mod limits;
pub mod mailer;
pub mod model;
pub mod observability;
pub mod store;
pub mod wal;

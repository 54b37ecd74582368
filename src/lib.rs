// Library entrypoint for the binary and integration tests.
mod api;
mod core;
mod services;

pub use api::build_router;
pub use api::errors::error_response;
pub use self::core::{config, i18n, shutdown, state};
pub use services::susar;

//! HTTP handlers.

mod files;
mod proxy;
mod screen;
mod status;

pub use files::staged_file_handler;
pub use proxy::proxy_handler;
pub use screen::screen_handler;
pub use status::status_handler;

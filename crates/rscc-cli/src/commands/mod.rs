//! CLI command implementations

mod config;
mod key;
mod session;
mod supporters;

pub use config::{config_init, config_path, config_show};
pub use key::{key_format, key_validate};
pub use session::{call_command, join_command, listen_command, request_command, CallTarget};
pub use supporters::{supporters_add, supporters_list, supporters_remove};

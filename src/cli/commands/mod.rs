mod check;
mod delete;
mod fetch;
mod init;
mod store;
mod sweep;

pub use check::{cmd_check, cmd_selftest};
pub use delete::cmd_delete;
pub use fetch::{cmd_fetch, cmd_get};
pub use init::cmd_init;
pub use store::cmd_store;
pub use sweep::cmd_sweep;

mod cache;
pub use cache::cache;

mod env;
pub use env::env;

mod exec;
pub use exec::{ExecArgs, descriptor_for, exec, run_entry};

mod update;
pub use update::{check_for_update, notify_update};

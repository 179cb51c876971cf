mod handlers;
mod state;

pub use handlers::{router, run_server, serve};

pub mod cookie;
pub mod session;

pub use session::*;

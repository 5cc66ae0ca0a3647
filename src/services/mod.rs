pub mod image_host;
pub mod lino;
pub mod metrics;
pub mod qr_code;

pub use image_host::*;
pub use lino::*;
pub use metrics::*;
pub use qr_code::*;

pub mod conv;
pub mod dense;
pub mod pool;

pub use conv::Conv2d;
pub use dense::Dense;
pub use pool::{max_pool2, max_pool2_all};

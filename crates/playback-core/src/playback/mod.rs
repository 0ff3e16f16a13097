mod traits;
pub use traits::*;

mod types;
pub use types::*;

mod prefetch;
pub use prefetch::*;

mod engine;
pub use engine::*;

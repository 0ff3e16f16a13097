mod cache;
pub use cache::*;

mod scorer;
pub use scorer::*;

mod traits;
pub use traits::*;

mod types;
pub use types::*;

mod track_resolver;
pub use track_resolver::*;

mod stream_resolver;
pub use stream_resolver::*;



#[cfg(test)]
mod track_resolver_tests;

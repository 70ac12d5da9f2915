mod cache;
mod mutator;
mod queue;
mod session;
mod signal;
mod store;
mod sync;

pub use cache::*;
pub use mutator::*;
pub use queue::RetryPolicy;
pub use session::*;
pub use signal::*;
pub use store::*;
pub use sync::*;

cfg_if::cfg_if! {
    if #[cfg(feature = "sqlite")] {
        mod sqlite;

        pub use sqlite::*;
    }
}

cfg_if::cfg_if! {
    if #[cfg(feature = "http")] {
        mod http;

        pub use http::*;
    }
}

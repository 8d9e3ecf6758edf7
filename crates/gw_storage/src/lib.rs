pub mod backends;

pub use backends::memory::MemoryStore;
pub use backends::sqlite::SqliteStore;

pub mod prelude {
    pub use super::backends::memory::MemoryStore;
    pub use super::backends::sqlite::SqliteStore;
    pub use gw_core::{ArticleStore, Result};
}

pub mod crawl;
pub mod decompress;
pub mod registry;

pub use crawl::{CrawlOptions, Crawler};
pub use decompress::decompress_if_needed;
pub use registry::{sync, PaperDeclaration, SyncOptions, SyncStats};

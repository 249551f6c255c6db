//! Persistence of workflow artifacts
//!
//! - [`language`] - language name ↔ code normalization
//! - [`repository`] - the narrow store interface the sink consumes
//! - [`handle`] - actor that owns the SQLite store
//! - [`sink`] - maps workflow results to one atomic artifact bundle
//! - [`archive`] - best-effort JSON artifacts on disk

pub mod archive;
pub mod handle;
pub mod language;
pub mod repository;
pub mod sink;

pub use archive::FileArchiver;
pub use handle::StoreHandle;
pub use language::LanguageMapper;
pub use repository::Repository;
pub use sink::PersistenceSink;

//! Core playtime session inference and collector configuration

mod config;
mod gate;
mod infer;
mod query;
mod store;
mod types;

pub use config::{
    AppConfig, ConfigError, ExportConfig, PlayerConfig, PollingConfig, ServerConfig,
    SourceConfig, SourceKind, StorageConfig, DEFAULT_CONFIG_TOML,
};
pub use gate::{fingerprint, ChangeGate, DEFAULT_TOLERANCE};
pub use infer::{infer_sessions, placeholder_name, sort_for_presentation};
pub use query::{
    infer_for_subjects, sessions_for_subject, BatchSessions, SubjectFailure, DEFAULT_QUERY_LIMIT,
};
pub use store::{OpenStore, SnapshotStore, StoreStats};
pub use types::{PlaytimeItem, Session, Snapshot, Subject};

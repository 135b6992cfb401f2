//! Purpose: Define the public Rust API boundary for fsgate.
//! Exports: Dispatcher, session monitor, registry resolver, gateway routes and file-service plumbing.
//! Role: Public, additive-only surface; internal helpers stay private to their modules.
//! Invariants: Every network call goes through `Dispatcher`.
//! Invariants: One `SessionMonitor` is shared by all dispatchers of an application session.

pub mod config;
pub mod dispatch;
pub mod files;
pub mod gateway;
pub mod registry;
pub mod session;
pub mod token;

pub use crate::core::error::{ApiResult, Error, ErrorKind};
pub use config::{ClientConfig, default_token_file};
pub use dispatch::{
    Body, CONTENT_TYPE, Dispatcher, JSON_CONTENT_TYPE, Method, MultipartForm, Outcome,
    PreparedRequest,
};
pub use files::{
    BooleanResponse, FileMeta, FileServiceClient, FileType, SaveFileResponse, TextFile,
};
pub use gateway::{host_route, ip_route};
pub use registry::{RegistryResolver, ServiceDescriptor, parse_registry};
pub use session::{
    Notifier, SessionMonitor, SessionState, StderrNotifier, ThreadTimer, Timer, TimerTask,
    TracingNotifier,
};
pub use token::{FileTokenStore, MemoryTokenStore, TokenStore};

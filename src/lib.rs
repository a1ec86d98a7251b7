// Library root
// -----------
// Async client for a headless CMS's content and admin APIs, plus the
// interactive menu used by the `cms-cli` binary.
//
// Module responsibilities:
// - `api`: the `CmsClient` and the request/response shapes it exchanges
//   with the CMS (entries, uploads, media folders, scheduling).
// - `config`: connection settings, usually read from `CMS_*` variables.
// - `error`: configuration errors raised before any request is sent, and
//   the error for typed calls the CMS rejected.
// - `scheduler`: the two supported scheduling plugins and their bodies.
// - `ui`: terminal flows that prompt for input and call `api`.
pub mod api;
pub mod config;
pub mod error;
pub mod scheduler;
pub mod ui;

pub use api::CmsClient;
pub use config::ClientConfig;
pub use error::{ConfigError, RemoteRequestError};
pub use scheduler::SchedulerPlugin;

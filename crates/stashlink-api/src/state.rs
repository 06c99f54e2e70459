use crate::auth::{SessionVerifier, TokenService};
use crate::services::{SweepService, UploadService};
use stashlink_core::Config;
use stashlink_storage::Storage;
use std::sync::Arc;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub storage: Arc<dyn Storage>,
    pub uploads: UploadService,
    pub sweeper: Arc<SweepService>,
    pub tokens: Arc<dyn TokenService>,
    pub sessions: Arc<dyn SessionVerifier>,
}

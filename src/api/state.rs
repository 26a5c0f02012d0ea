use std::sync::Arc;

use crate::service::DownloadService;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<DownloadService>,
}

impl AppState {
    pub fn new(service: DownloadService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}

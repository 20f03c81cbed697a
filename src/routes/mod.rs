// Route exports
pub mod dispatch;
pub mod pages;

use actix_web::web;
use std::sync::Arc;

use crate::config::Settings;
use crate::services::{UploadStore, Workers};
use pages::Pages;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub workers: Arc<Workers>,
    pub uploads: Arc<UploadStore>,
    pub pages: Arc<Pages>,
}

impl AppState {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            workers: Arc::new(Workers::from_settings(&settings.scripts)),
            uploads: Arc::new(UploadStore::from_settings(&settings.uploads)),
            pages: Arc::new(Pages::render(&settings.client)),
        }
    }
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/api").configure(dispatch::configure))
        .configure(pages::configure);
}

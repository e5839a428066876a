// src/api/state.rs
use crate::catalog::Catalog;
use crate::config::AppConfig;
use crate::errors::Result;
use crate::runs::RunSlot;
use reqwest::Client;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub client: Client,
    pub catalog: Arc<Catalog>,
    pub runs: Arc<RunSlot>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Result<Self> {
        let catalog = Catalog::load(config.kata.catalog_path.as_deref())?;
        Ok(Self {
            config: Arc::new(config),
            client: Client::new(),
            catalog: Arc::new(catalog),
            runs: Arc::new(RunSlot::new()),
        })
    }
}

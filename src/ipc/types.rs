use std::path::PathBuf;

use crate::config::Config;
use crate::desk::Desk;
use rusqlite::Connection;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct AppState {
    pub config: Config,
    pub workspace: Option<PathBuf>,
    pub db: Option<Connection>,
    pub desk: Desk,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let desk = Desk::new(config.desk);
        Self {
            config,
            workspace: None,
            db: None,
            desk,
        }
    }
}

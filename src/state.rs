use crate::debounce::Debouncer;
use crate::draft::DraftStore;
use crate::models::AppData;
use std::{path::PathBuf, sync::Arc};
use tokio::sync::Mutex;

#[derive(Clone)]
pub struct AppState {
    pub data_path: PathBuf,
    pub data: Arc<Mutex<AppData>>,
    pub draft: Arc<Mutex<DraftStore>>,
    pub debouncer: Arc<Debouncer>,
}

impl AppState {
    pub fn new(data_path: PathBuf, data: AppData, draft: DraftStore, debouncer: Debouncer) -> Self {
        Self {
            data_path,
            data: Arc::new(Mutex::new(data)),
            draft: Arc::new(Mutex::new(draft)),
            debouncer: Arc::new(debouncer),
        }
    }
}

use crate::service::EventService;
use crate::store::EventStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub service: EventService,
}

impl AppState {
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self {
            service: EventService::new(store),
        }
    }
}

use std::sync::Arc;

use chrono::{DateTime, FixedOffset};
use tokio::sync::Mutex;

use crate::clock::Clock;
use crate::error::ApiError;
use crate::models::Db;
use crate::store::Repository;

pub type SharedState = Arc<AppState>;

/// Shared by handlers and the ticker.
///
/// Every engine call returns new records, so concurrent actions could lose each
/// other's writes. All read-modify-write cycles go through [`AppState::update`],
/// which holds `writer` for the whole load/apply/save.
pub struct AppState {
    store: Arc<dyn Repository>,
    clock: Arc<dyn Clock>,
    writer: Mutex<()>,
}

impl AppState {
    pub fn new(store: Arc<dyn Repository>, clock: Arc<dyn Clock>) -> SharedState {
        Arc::new(Self {
            store,
            clock,
            writer: Mutex::new(()),
        })
    }

    pub fn now(&self) -> DateTime<FixedOffset> {
        self.clock.now()
    }

    pub fn read(&self) -> Result<Db, ApiError> {
        Ok(self.store.load()?)
    }

    // Apply `f` to the stored blob and write it back if it changed.
    pub async fn update<T>(
        &self,
        f: impl FnOnce(&mut Db, DateTime<FixedOffset>) -> Result<T, ApiError>,
    ) -> Result<T, ApiError> {
        let _guard = self.writer.lock().await;

        let before = self.store.load()?;
        let mut db = before.clone();
        let out = f(&mut db, self.clock.now())?;

        if db != before {
            self.store.save(&db)?;
        }
        Ok(out)
    }
}

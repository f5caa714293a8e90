use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::cache::{DASHBOARD_STATS_KEY, TtlCache};
use crate::config::AppConfig;
use crate::models::dashboard::DashboardResponse;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Arc<AppConfig>,
    pub stats_cache: Arc<TtlCache<DashboardResponse>>,
}

impl AppState {
    /// Drop the cached dashboard so the next read recomputes it.
    pub fn evict_stats(&self) {
        self.stats_cache.delete(DASHBOARD_STATS_KEY);
    }
}

//! Dashboard data: stats and signup chart fetched side by side.

use crate::client::UserApi;
use crate::error::ApiError;
use crate::types::{ChartPoint, UserStats};

pub const DEFAULT_CHART_DAYS: u32 = 7;

/// Each half succeeds or fails on its own.
#[derive(Debug)]
pub struct Dashboard {
    pub stats: Result<UserStats, ApiError>,
    pub chart: Result<Vec<ChartPoint>, ApiError>,
}

impl Dashboard {
    pub fn errors(&self) -> Vec<&ApiError> {
        self.stats
            .as_ref()
            .err()
            .into_iter()
            .chain(self.chart.as_ref().err())
            .collect()
    }
}

pub async fn load<A: UserApi + ?Sized>(api: &A, days: u32) -> Dashboard {
    let (stats, chart) = tokio::join!(api.stats(), api.chart(days));

    if let Err(e) = &stats {
        tracing::warn!(error = %e, "stats unavailable");
    }
    if let Err(e) = &chart {
        tracing::warn!(error = %e, days, "chart unavailable");
    }

    Dashboard { stats, chart }
}

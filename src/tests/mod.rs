mod scenarios;

use log::LevelFilter;
use std::{
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Once,
    },
};

use crate::prelude::{
    Epoch, ProductSource, Quantity, ReflectometryOpts, RefractometryOpts, StationConfig,
    TimeSeries,
};

static INIT: Once = Once::new();

pub fn init_logger() {
    INIT.call_once(|| {
        env_logger::builder()
            .is_test(true)
            .filter_level(LevelFilter::Debug)
            .init();
    });
}

/// Midnight of the nth day of January 2022
pub fn day(n: u8) -> Epoch {
    Epoch::from_gregorian_utc_at_midnight(2022, 1, n)
}

/// Daily series starting January 1st
pub fn daily_series(id: &str, quantity: Quantity, values: &[f64]) -> TimeSeries {
    let epochs = (1..=values.len() as u8).map(day).collect::<Vec<_>>();
    TimeSeries::from_values(id, quantity, &epochs, values).unwrap()
}

/// Station whose conditioning windows are one day wide,
/// so estimates can be verified exactly.
pub fn test_station(reflectometry: &str, refractometry: &str) -> StationConfig {
    let mut cfg = StationConfig::new(
        "nmlb",
        ReflectometryOpts::new(ProductSource::new(reflectometry)),
        RefractometryOpts::new(ProductSource::new(refractometry)).with_zero_point(0.010),
    )
    .with_antenna_height(2.0);

    cfg.accumulation.smoothing_window_days = 1.0;
    cfg.swe.smoothing_window_days = 1.0;
    cfg.swe.sigma_threshold = None;
    cfg.density = cfg
        .density
        .with_smoothing_window(1.0)
        .without_outlier_rejection();
    cfg
}

static TEMP_ID: AtomicUsize = AtomicUsize::new(0);

/// Temporary directory, removed on drop
pub struct TempDir {
    path: PathBuf,
}

impl TempDir {
    pub fn new(name: &str) -> Self {
        let path = std::env::temp_dir().join(format!(
            "gnss-smb-{}-{}-{}",
            name,
            std::process::id(),
            TEMP_ID.fetch_add(1, Ordering::Relaxed)
        ));
        std::fs::create_dir_all(&path).unwrap();
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes a file within this directory, returns its path
    pub fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.path.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    /// Path template within this directory
    pub fn template(&self, name: &str) -> String {
        self.path.join(name).to_string_lossy().to_string()
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.path);
    }
}

//! CSV files of a generated dataset.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use anyhow::{Context, Result};

use hospisim_core::export::{write_establishment, write_patients, write_rows};
use hospisim_core::{DailyRecord, ExportError, PatientRecord, ResourceRecord};
use hospisim_rollup::Rollup;

pub const ESTABLISHMENT: &str = "establishment.csv";
pub const ADMISSIONS: &str = "admissions.csv";
pub const RESOURCES: &str = "resources.csv";
pub const DAILY_STATS: &str = "daily_stats.csv";
pub const SERVICE_DAILY_STATS: &str = "service_daily_stats.csv";
pub const WEEKLY_STATS: &str = "weekly_stats.csv";
pub const MONTHLY_STATS: &str = "monthly_stats.csv";

#[cfg(test)]
pub const TABLES: [&str; 7] = [
    ESTABLISHMENT,
    ADMISSIONS,
    RESOURCES,
    DAILY_STATS,
    SERVICE_DAILY_STATS,
    WEEKLY_STATS,
    MONTHLY_STATS,
];

fn write_file<F>(dir: &Path, name: &str, write: F) -> Result<()>
where
    F: FnOnce(BufWriter<File>) -> Result<(), ExportError>,
{
    let path = dir.join(name);
    let file = File::create(&path).with_context(|| format!("creating {}", path.display()))?;
    write(BufWriter::new(file)).with_context(|| format!("writing {}", path.display()))?;
    tracing::debug!(path = %path.display(), "table written");
    Ok(())
}

fn ensure_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).with_context(|| format!("creating directory {}", dir.display()))
}

pub fn write_all(
    dir: &Path,
    days: &[DailyRecord],
    patients: &[PatientRecord],
    resources: &[ResourceRecord],
    rollup: &Rollup,
) -> Result<()> {
    ensure_dir(dir)?;
    write_file(dir, ESTABLISHMENT, |w| write_establishment(w, days))?;
    write_file(dir, ADMISSIONS, |w| write_patients(w, patients))?;
    write_file(dir, RESOURCES, |w| write_rows(w, resources))?;
    write_file(dir, DAILY_STATS, |w| write_rows(w, &rollup.daily))?;
    write_file(dir, SERVICE_DAILY_STATS, |w| {
        write_rows(w, &rollup.service_daily)
    })?;
    write_file(dir, WEEKLY_STATS, |w| write_rows(w, &rollup.weekly))?;
    write_file(dir, MONTHLY_STATS, |w| write_rows(w, &rollup.monthly))
}

pub fn write_resources(dir: &Path, resources: &[ResourceRecord]) -> Result<()> {
    ensure_dir(dir)?;
    write_file(dir, RESOURCES, |w| write_rows(w, resources))
}

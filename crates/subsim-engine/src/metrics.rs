use std::fs::File;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::kernel::LevelRecord;

/// Per-level row of the level table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LevelMetric {
    /// Level index.
    pub level: usize,
    /// Threshold of the level.
    pub threshold: f64,
    /// Population size.
    pub num_samples: usize,
    /// Samples inside the failure domain.
    pub num_failed: usize,
    /// Conditional level probability.
    pub level_pf: f64,
    /// COV of the level probability.
    pub level_cov: f64,
    /// Chain correlation factor.
    pub gamma: f64,
    /// Running failure probability.
    pub pf: f64,
    /// Mean chain acceptance, empty for level 0.
    pub acceptance_rate: Option<f64>,
    /// Scale parameter at the end of the level.
    pub lambda: Option<f64>,
    /// Whether the level was terminal.
    pub is_finished: bool,
}

impl From<&LevelRecord> for LevelMetric {
    fn from(record: &LevelRecord) -> Self {
        Self {
            level: record.index,
            threshold: record.threshold,
            num_samples: record.num_samples,
            num_failed: record.num_failed,
            level_pf: record.level_pf,
            level_cov: record.level_cov,
            gamma: record.gamma,
            pf: record.pf,
            acceptance_rate: record.acceptance_rate,
            lambda: record.lambda,
            is_finished: record.is_finished,
        }
    }
}

/// Collects level rows for CSV export.
#[derive(Debug, Default)]
pub struct MetricsRecorder {
    rows: Vec<LevelMetric>,
}

impl MetricsRecorder {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one completed level.
    pub fn push_level(&mut self, record: &LevelRecord) {
        self.rows.push(LevelMetric::from(record));
    }

    /// Writes the recorded levels to a CSV file.
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = File::create(path)?;
        writeln!(
            file,
            "level,threshold,num_samples,num_failed,level_pf,level_cov,gamma,pf,acceptance_rate,lambda,is_finished"
        )?;
        for row in &self.rows {
            writeln!(
                file,
                "{},{:.9},{},{},{:.9},{:.6},{:.6},{:e},{},{},{}",
                row.level,
                row.threshold,
                row.num_samples,
                row.num_failed,
                row.level_pf,
                row.level_cov,
                row.gamma,
                row.pf,
                optional(row.acceptance_rate),
                optional(row.lambda),
                row.is_finished
            )?;
        }
        Ok(())
    }
}

fn optional(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.6}")).unwrap_or_default()
}

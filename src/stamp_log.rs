//! Crater stamp trace log for tuning sessions.
//!
//! Writes one line per accepted stamp to a file chosen with
//! `init_stamp_log()`. The file is recreated on each init call and nothing is
//! written until then.

use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

lazy_static::lazy_static! {
    static ref STAMP_LOG: Mutex<Option<File>> = Mutex::new(None);
}

/// Append a line to the stamp log, if open
pub fn stamp_log(msg: &str) {
    if let Ok(mut guard) = STAMP_LOG.lock() {
        if let Some(ref mut file) = *guard {
            let _ = writeln!(file, "{}", msg);
            let _ = file.flush();
        }
    }
}

/// Open (or truncate) the stamp log at `path`
pub fn init_stamp_log(path: impl AsRef<Path>) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    writeln!(file, "=== PIXY CRATER STAMP LOG ===")?;
    writeln!(file, "Timestamp: {:?}", std::time::SystemTime::now())?;
    writeln!(file)?;
    if let Ok(mut guard) = STAMP_LOG.lock() {
        *guard = Some(file);
    }
    Ok(())
}

pub fn close_stamp_log() {
    if let Ok(mut guard) = STAMP_LOG.lock() {
        *guard = None;
    }
}

pub fn stamp_log_enabled() -> bool {
    STAMP_LOG.lock().map(|guard| guard.is_some()).unwrap_or(false)
}

/// How far one stamp lowered a block of heights
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepressionStats {
    pub lowered_cells: usize,
    pub max_drop: f32,
    pub mean_drop: f32,
    /// Cells that ended at the zero floor
    pub floored_cells: usize,
}

/// Compare a block before and after stamping
pub fn compute_depression_stats(before: &[f32], after: &[f32]) -> DepressionStats {
    let mut lowered_cells = 0;
    let mut floored_cells = 0;
    let mut max_drop = 0.0f32;
    let mut total_drop = 0.0f32;

    for (b, a) in before.iter().zip(after) {
        let drop = b - a;
        if drop > 0.0 {
            lowered_cells += 1;
            total_drop += drop;
            max_drop = max_drop.max(drop);
            if *a <= 0.0 {
                floored_cells += 1;
            }
        }
    }

    DepressionStats {
        lowered_cells,
        max_drop,
        mean_drop: if lowered_cells > 0 {
            total_drop / lowered_cells as f32
        } else {
            0.0
        },
        floored_cells,
    }
}

//! Conversion report and size formatting helpers.

use serde::{Deserialize, Serialize};

use super::SceneStats;

/// Result of a completed conversion, as presented in the results panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionReport {
    pub original_bytes: u64,
    pub final_bytes: u64,
    /// `round((1 - final/original) * 100)`; negative when the file grew
    pub reduction_percent: Option<i64>,
    pub original: SceneStats,
    pub result: SceneStats,
    /// Suggested download file name
    pub filename: String,
    pub mime_type: String,
}

impl ConversionReport {
    /// Badge text such as `-60%` (smaller) or `+25%` (larger).
    pub fn badge(&self) -> Option<String> {
        self.reduction_percent.map(|reduction| {
            let sign = if reduction >= 0 { '-' } else { '+' };
            format!("{sign}{}%", reduction.abs())
        })
    }
}

/// Size reduction in whole percent.
///
/// Rounds half up like the UI does, so `-0.5` becomes `0`. Returns `None`
/// when the original size is zero.
pub fn reduction_percent(original_bytes: u64, final_bytes: u64) -> Option<i64> {
    if original_bytes == 0 {
        return None;
    }
    let ratio = final_bytes as f64 / original_bytes as f64;
    Some(((1.0 - ratio) * 100.0 + 0.5).floor() as i64)
}

/// Human readable byte size: `0 B`, `512 B`, `1.5 KB`, `2 MB`.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut unit = 0;
    let mut value = bytes as f64;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let text = format!("{value:.2}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    format!("{text} {}", UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reduction_percent() {
        assert_eq!(reduction_percent(50_000, 20_000), Some(60));
        assert_eq!(reduction_percent(100, 125), Some(-25));
        assert_eq!(reduction_percent(1000, 1000), Some(0));
        assert_eq!(reduction_percent(0, 10), None);
    }

    #[test]
    fn test_reduction_rounds_half_up() {
        // 1 - 1005/1000 = -0.5% -> 0
        assert_eq!(reduction_percent(1000, 1005), Some(0));
        // 1 - 995/1000 = 0.5% -> 1
        assert_eq!(reduction_percent(1000, 995), Some(1));
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1024), "1 KB");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5 MB");
    }

    #[test]
    fn test_badge() {
        let mut report = ConversionReport {
            original_bytes: 50_000,
            final_bytes: 20_000,
            reduction_percent: reduction_percent(50_000, 20_000),
            original: SceneStats::from_vertex_count(300),
            result: SceneStats::from_vertex_count(300),
            filename: "model.glb".into(),
            mime_type: "model/gltf-binary".into(),
        };
        assert_eq!(report.badge().as_deref(), Some("-60%"));

        report.reduction_percent = Some(-25);
        assert_eq!(report.badge().as_deref(), Some("+25%"));
    }
}

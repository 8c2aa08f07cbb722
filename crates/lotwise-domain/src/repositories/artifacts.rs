use crate::services::audit::AuditEvent;
use crate::services::metrics::SummaryStatistics;
use crate::value_objects::bar_record::BarRecord;
use crate::value_objects::trade::Trade;
use std::path::Path;

pub trait ArtifactWriter {
    fn ensure_dir(&self, path: &Path) -> Result<(), String>;
    fn write_bars_csv(&self, path: &Path, records: &[BarRecord]) -> Result<(), String>;
    fn write_trades_csv(&self, path: &Path, trades: &[Trade]) -> Result<(), String>;
    fn write_summary_json(
        &self,
        path: &Path,
        summary: &SummaryStatistics,
        meta: Option<&serde_json::Value>,
        config_snapshot: Option<&serde_json::Value>,
    ) -> Result<(), String>;
    fn write_summary_html(
        &self,
        path: &Path,
        summary: &SummaryStatistics,
        meta: Option<&serde_json::Value>,
    ) -> Result<(), String>;
    fn write_audit_jsonl(&self, path: &Path, events: &[AuditEvent]) -> Result<(), String>;
    fn write_config_snapshot_toml(&self, path: &Path, contents: &str) -> Result<(), String>;
}

pub trait ArtifactReader {
    fn read_bars_csv(&self, path: &Path) -> Result<Vec<BarRecord>, String>;
    fn read_config_snapshot_toml(&self, path: &Path) -> Result<Option<String>, String>;
    fn read_text(&self, path: &Path) -> Result<String, String>;
    fn exists(&self, path: &Path) -> bool;
}

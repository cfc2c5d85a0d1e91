//! COUNTER reports service.
//!
//! Owns the output directory and the recording and aggregation services, and
//! saves compiled reports to disk. A manager that was not started, or whose
//! start-up failed, is not ready: its accessors return `None` or `false`.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::aggregator::RequestAggregator;
use crate::clock::SharedClock;
use crate::config::Settings;
use crate::error::CounterError;
use crate::recorder::RequestRecorder;
use crate::reports::{CounterReport, ReportFormat, ReportKind, ReportPeriod};
use crate::repository::{
    run_migrations, AggregateRepository, DbPool, RequestRepository, TitleRepository,
};

/// Services available once the manager is ready.
struct ReadyState {
    output_dir: PathBuf,
    recorder: RequestRecorder,
    aggregator: RequestAggregator,
    aggregates: AggregateRepository,
}

pub struct CounterReportsManager {
    settings: Settings,
    clock: SharedClock,
    state: Option<ReadyState>,
    writer_lock: Mutex<()>,
}

impl CounterReportsManager {
    /// Start the service. Disabled reporting yields a manager that is not ready.
    pub async fn start(
        settings: Settings,
        pool: DbPool,
        clock: SharedClock,
    ) -> Result<Self, CounterError> {
        let mut manager = Self {
            settings,
            clock,
            state: None,
            writer_lock: Mutex::new(()),
        };

        if !manager.settings.enabled {
            debug!("COUNTER reports are disabled");
            return Ok(manager);
        }

        for dir in [&manager.settings.report_dir, &manager.settings.output_dir] {
            fs::create_dir_all(dir).map_err(|e| {
                error!("Error creating the report directory '{}': {}", dir.display(), e);
                e
            })?;
        }

        run_migrations(pool.database_url())
            .await
            .map_err(|e| CounterError::Migration(e.to_string()))?;
        TitleRepository::new(pool.clone()).ensure_sinks().await?;

        manager.state = Some(ReadyState {
            output_dir: manager.settings.output_dir.clone(),
            recorder: RequestRecorder::new(
                RequestRepository::new(pool.clone()),
                manager.clock.clone(),
            ),
            aggregator: RequestAggregator::new(pool.clone()),
            aggregates: AggregateRepository::new(pool),
        });
        info!(
            "COUNTER reports ready, output in {}",
            manager.settings.output_dir.display()
        );
        Ok(manager)
    }

    pub fn is_ready(&self) -> bool {
        self.state.is_some()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn output_dir(&self) -> Option<&Path> {
        self.state.as_ref().map(|s| s.output_dir.as_path())
    }

    pub fn recorder(&self) -> Option<&RequestRecorder> {
        self.state.as_ref().map(|s| &s.recorder)
    }

    pub fn aggregator(&self) -> Option<&RequestAggregator> {
        self.state.as_ref().map(|s| &s.aggregator)
    }

    pub fn aggregates(&self) -> Option<&AggregateRepository> {
        self.state.as_ref().map(|s| &s.aggregates)
    }

    /// A new report for this manager's clock and header identity.
    ///
    /// `period` of `None` selects the default trailing period.
    pub fn report(&self, kind: ReportKind, period: Option<ReportPeriod>) -> CounterReport {
        let period = period.unwrap_or_else(|| ReportPeriod::trailing(self.clock.as_ref()));
        CounterReport::new(kind, period, self.clock.as_ref())
            .with_header(self.settings.report_header.clone())
    }

    /// Create a new file in the output directory.
    ///
    /// Returns `None` when not ready, when the file already exists, or when
    /// it cannot be created.
    pub async fn report_output_writer(&self, file_name: &str) -> Option<File> {
        let state = self.state.as_ref()?;
        match self.create_output_file(&state.output_dir, file_name).await {
            Ok(file) => file,
            Err(e) => {
                error!("Cannot create report file '{}': {}", file_name, e);
                None
            }
        }
    }

    /// `Ok(None)` on a name collision; any other failure is an error.
    async fn create_output_file(
        &self,
        output_dir: &Path,
        file_name: &str,
    ) -> std::io::Result<Option<File>> {
        let _guard = self.writer_lock.lock().await;

        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(output_dir.join(file_name))
        {
            Ok(file) => Ok(Some(file)),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                debug!("Collision with file '{}'", file_name);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Delete a file from the output directory. `false` when not ready or missing.
    pub fn delete_report_output_file(&self, file_name: &str) -> bool {
        let Some(state) = self.state.as_ref() else {
            return false;
        };
        fs::remove_file(state.output_dir.join(file_name)).is_ok()
    }

    /// Names of the files in the output directory, sorted.
    pub fn list_report_files(&self) -> Result<Vec<String>, CounterError> {
        let state = self.state.as_ref().ok_or(CounterError::NotReady)?;
        let mut names = Vec::new();
        for entry in fs::read_dir(&state.output_dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    pub async fn save_csv_report(&self, report: &mut CounterReport) -> Result<PathBuf, CounterError> {
        self.save_report(report, ReportFormat::Csv).await
    }

    pub async fn save_tsv_report(&self, report: &mut CounterReport) -> Result<PathBuf, CounterError> {
        self.save_report(report, ReportFormat::Tsv).await
    }

    /// Compile `report` if needed and write it to the output directory.
    ///
    /// An existing file with the same name is left alone and its path returned.
    pub async fn save_report(
        &self,
        report: &mut CounterReport,
        format: ReportFormat,
    ) -> Result<PathBuf, CounterError> {
        let state = self.state.as_ref().ok_or(CounterError::NotReady)?;
        let file_name = report.file_name(format);
        let path = state.output_dir.join(&file_name);

        let file = match self.create_output_file(&state.output_dir, &file_name).await {
            Ok(Some(file)) => file,
            Ok(None) => return Ok(path),
            Err(e) => {
                error!("Cannot create report file '{}': {}", path.display(), e);
                return Err(e.into());
            }
        };

        let result = write_report(file, report, format, &state.aggregates).await;
        if let Err(e) = result {
            error!(
                "Encountered unrecoverable error saving {} report file: {}",
                format.extension().to_uppercase(),
                e
            );
            if !self.delete_report_output_file(&file_name) {
                error!(
                    "Failed to delete invalid {} report file",
                    format.extension().to_uppercase()
                );
            }
            return Err(e);
        }

        info!("Saved {} to {}", report.kind(), path.display());
        Ok(path)
    }
}

async fn write_report(
    file: File,
    report: &mut CounterReport,
    format: ReportFormat,
    aggregates: &AggregateRepository,
) -> Result<(), CounterError> {
    if !report.is_compiled() {
        report.compile(aggregates).await?;
    }

    let mut writer = BufWriter::new(file);
    for line in report.text_lines(format)? {
        writeln!(writer, "{}", line)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{TimeZone, Utc};
    use tempfile::{tempdir, TempDir};

    use super::*;
    use crate::clock::FixedClock;
    use crate::reports::HEADER_LINE_COUNT;

    async fn manager(enabled: bool) -> (CounterReportsManager, TempDir) {
        let dir = tempdir().unwrap();
        let mut settings = Settings::with_data_dir(dir.path().to_path_buf());
        settings.enabled = enabled;
        let pool = DbPool::sqlite_from_path(&settings.database_path());
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2013, 1, 15, 12, 0, 0).unwrap());
        let manager = CounterReportsManager::start(settings, pool, Arc::new(clock))
            .await
            .unwrap();
        (manager, dir)
    }

    #[tokio::test]
    async fn test_disabled_manager_is_not_ready() {
        let (manager, _dir) = manager(false).await;
        assert!(!manager.is_ready());
        assert!(manager.output_dir().is_none());
        assert!(manager.recorder().is_none());
        assert!(manager.aggregator().is_none());
        assert!(manager.report_output_writer("x.csv").await.is_none());
        assert!(!manager.delete_report_output_file("x.csv"));
        assert!(matches!(
            manager.list_report_files(),
            Err(CounterError::NotReady)
        ));
    }

    #[tokio::test]
    async fn test_writer_collision_and_delete() {
        let (manager, _dir) = manager(true).await;
        assert!(manager.is_ready());
        assert!(manager.output_dir().unwrap().is_dir());

        assert!(manager.report_output_writer("a.csv").await.is_some());
        assert!(manager.report_output_writer("a.csv").await.is_none());
        assert_eq!(manager.list_report_files().unwrap(), vec!["a.csv"]);

        assert!(manager.delete_report_output_file("a.csv"));
        assert!(!manager.delete_report_output_file("a.csv"));
    }

    #[tokio::test]
    async fn test_save_empty_reports() {
        let (manager, _dir) = manager(true).await;

        let mut report = manager.report(ReportKind::BOOK_1, None);
        let csv = manager.save_csv_report(&mut report).await.unwrap();
        let tsv = manager.save_tsv_report(&mut report).await.unwrap();

        assert!(csv.ends_with("COUNTER_Book_1-2011_01-2012_12-2013-01-15.csv"));
        assert!(tsv.ends_with("COUNTER_Book_1-2011_01-2012_12-2013-01-15.txt"));

        let contents = fs::read_to_string(&csv).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), HEADER_LINE_COUNT + 1);
        assert!(lines[HEADER_LINE_COUNT].starts_with("\"Total for all books\",,,,,,,0,0"));

        let contents = fs::read_to_string(&tsv).unwrap();
        assert!(contents
            .lines()
            .nth(HEADER_LINE_COUNT)
            .unwrap()
            .starts_with("Total for all books\t\t\t\t\t\t\t0\t0"));
    }

    #[tokio::test]
    async fn test_save_keeps_existing_file() {
        let (manager, _dir) = manager(true).await;
        let mut report = manager.report(ReportKind::JOURNAL_1, None);
        let name = report.file_name(ReportFormat::Csv);
        fs::write(manager.output_dir().unwrap().join(&name), "kept").unwrap();

        let path = manager.save_csv_report(&mut report).await.unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), "kept");
    }

    #[tokio::test]
    async fn test_save_fails_when_output_dir_is_gone() {
        let (manager, _dir) = manager(true).await;
        fs::remove_dir_all(manager.output_dir().unwrap()).unwrap();

        let mut report = manager.report(ReportKind::BOOK_2, None);
        let err = manager.save_csv_report(&mut report).await.unwrap_err();
        assert!(matches!(err, CounterError::Io(_)));
        assert!(manager.report_output_writer("a.csv").await.is_none());
    }
}

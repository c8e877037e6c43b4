//! # db_rolling_backup
//!
//! Per-database logical backups of MySQL and PostgreSQL with a rolling
//! seven day history.
//!
//! ## Features
//!
//! - **Per-section isolation**: every configured database is validated, dumped and
//!   compressed on its own; one failure never stops the others
//! - **Rolling retention**: one slot per weekday, `<database>-<0..6>.sql.gz`,
//!   overwritten on the same weekday of the next week
//! - **Safe output**: dumps are created `0600`, compressed output gets the configured
//!   mode and owner/group
//! - **No password leaks**: the PostgreSQL password only reaches `pg_dump` through its
//!   own environment
//!
//! ## Quick Start
//!
//! ```no_run
//! use db_rolling_backup::backup::backup_config::{BackupConfig, RunDefaults};
//! use db_rolling_backup::backup::orchestrator::BackupRunner;
//!
//! let config = BackupConfig::from_path("backup.yml")?;
//! let runner = BackupRunner::builder()
//!     .run_defaults(RunDefaults::builder().output_dir("/backups").build())
//!     .build();
//! let report = runner.run(config);
//! assert!(report.is_success());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod backup;

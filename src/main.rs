use clap::Parser;
use db_rolling_backup::backup::backup_config::{BackupConfig, RunDefaults};
use db_rolling_backup::backup::dump::DumpTools;
use db_rolling_backup::backup::orchestrator::BackupRunner;
use db_rolling_backup::backup::result_error::result::Result;
use db_rolling_backup::backup::validate::{validate_dir_exist, validate_readable_file};
use itertools::Itertools;
use std::path::PathBuf;
use std::process::exit;
use tracing::{error, info};

/// Database weekly rolling backup. Supports MySQL and PostgreSQL.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file
    #[arg(short, long, value_name = "FILE", default_value = "backup.yml")]
    config: PathBuf,
    /// Output directory, used by sections without `outputdir`
    #[arg(short, long, value_name = "DIRECTORY", default_value = ".")]
    output: PathBuf,
    /// mysqldump executable
    #[arg(long, value_name = "PATH", default_value = "mysqldump")]
    mysqldump: PathBuf,
    /// pg_dump executable
    #[arg(long, value_name = "PATH", default_value = "pg_dump")]
    pg_dump: PathBuf,
}

fn load(args: &Args) -> Result<BackupConfig> {
    validate_readable_file(&args.config)?;
    validate_dir_exist(&args.output)?;
    BackupConfig::from_path(&args.config)
}

fn main() {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let config = match load(&args) {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            exit(1);
        }
    };

    let runner = BackupRunner::builder()
        .tools(
            DumpTools::builder()
                .mysqldump(args.mysqldump)
                .pg_dump(args.pg_dump)
                .build(),
        )
        .run_defaults(RunDefaults::builder().output_dir(args.output).build())
        .build();
    let report = runner.run(config);

    let failed = report.failed().count();
    info!(
        "Backed up {} of {} section(s)",
        report.outcomes().len() - failed,
        report.outcomes().len()
    );
    if failed > 0 {
        error!(
            "Failed section(s): {}",
            report.failed().map(|o| o.section().as_str()).join(", ")
        );
        exit(1);
    }
}

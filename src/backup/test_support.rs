//! Fixtures shared by the unit tests.

use crate::backup::backup_config::SectionConfig;
use crate::backup::target::BackupTarget;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

static SPAWN_LOCK: Mutex<()> = Mutex::new(());

/// Serializes tests that write and then execute fake dump tools, so no
/// concurrent fork can hold a write descriptor to a script being exec'd
/// (ETXTBSY).
pub fn spawn_lock() -> MutexGuard<'static, ()> {
    SPAWN_LOCK.lock().unwrap_or_else(|e| e.into_inner())
}

/// Writes an executable `/bin/sh` script standing in for a dump tool.
pub fn fake_tool(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

pub fn mysql_section(dir: &Path) -> SectionConfig {
    SectionConfig::builder()
        .db_type("mysql")
        .hostname("db.internal")
        .username("backup")
        .password("s3cr3t")
        .chmod("0600")
        .outputdir(dir)
        .build()
}

pub fn postgres_section(dir: &Path) -> SectionConfig {
    SectionConfig::builder()
        .db_type("pgsql")
        .hostname("pg.internal")
        .username("postgres")
        .password("s3cr3t")
        .chmod("0600")
        .outputdir(dir)
        .build()
}

pub fn mysql_target(name: &str, dir: &Path) -> BackupTarget {
    BackupTarget::from_section(name, mysql_section(dir)).unwrap()
}

pub fn postgres_target(name: &str, dir: &Path) -> BackupTarget {
    BackupTarget::from_section(name, postgres_section(dir)).unwrap()
}

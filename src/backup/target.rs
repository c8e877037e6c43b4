//! Validated per-database backup targets.
//!
//! A [`BackupTarget`] is only ever built through [`BackupTarget::from_section`],
//! which checks every option and resolves owner and group names before
//! anything touches the database or the output directory.

use crate::backup::backup_config::SectionConfig;
use crate::backup::compress::GzipConfig;
use crate::backup::redacted::RedactedString;
use crate::backup::result_error::error::{Error, IdentityKind};
use crate::backup::result_error::result::Result;
use crate::backup::result_error::WithMsg;
use crate::backup::validate::{
    lookup_group, lookup_user, parse_octal_mode, validate_section_name, validate_writable_dir,
};
use derive_more::Display;
use getset::{CopyGetters, Getters};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use validator::Validate;

/// Database engines a target can be dumped from.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash)]
pub enum DatabaseKind {
    #[display("mysql")]
    MySql,
    #[display("pgsql")]
    Postgres,
}

impl FromStr for DatabaseKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mysql" => Ok(DatabaseKind::MySql),
            "pgsql" | "postgres" | "postgresql" => Ok(DatabaseKind::Postgres),
            _ => Err(s.to_string()),
        }
    }
}

/// Owner and group to apply to the compressed dump.
///
/// `None` leaves that attribute as the filesystem created it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, CopyGetters)]
#[getset(get_copy = "pub")]
pub struct Ownership {
    uid: Option<u32>,
    gid: Option<u32>,
}

impl Ownership {
    pub fn new(uid: Option<u32>, gid: Option<u32>) -> Self {
        Self { uid, gid }
    }

    pub fn is_unchanged(&self) -> bool {
        self.uid.is_none() && self.gid.is_none()
    }
}

#[derive(Clone, Debug, Getters, CopyGetters)]
pub struct BackupTarget {
    /// Section name, which is also the database name passed to the dump tool
    #[getset(get = "pub")]
    database: String,
    #[getset(get_copy = "pub")]
    kind: DatabaseKind,
    #[getset(get = "pub")]
    hostname: String,
    #[getset(get = "pub")]
    username: String,
    #[getset(get = "pub")]
    password: RedactedString,
    #[getset(get_copy = "pub")]
    ownership: Ownership,
    /// Permission bits of the compressed dump
    #[getset(get_copy = "pub")]
    mode: u32,
    #[getset(get = "pub")]
    output_dir: PathBuf,
    #[getset(get_copy = "pub")]
    timeout: Option<Duration>,
    #[getset(get_copy = "pub")]
    compression: GzipConfig,
}

fn required<T>(section: &str, field: &str, value: Option<T>) -> Result<T> {
    value.ok_or_else(|| Error::config(section, field, "option is missing"))
}

impl BackupTarget {
    /// Validates one configuration section, defaults already merged in.
    pub fn from_section(name: &str, section: SectionConfig) -> Result<BackupTarget> {
        validate_section_name(name).map_err(|e| Error::config(name, "", e.to_string()))?;

        let db_type = required(name, "type", section.db_type)?;
        let hostname = required(name, "hostname", section.hostname)?;
        let username = required(name, "username", section.username)?;
        let password = required(name, "password", section.password)?;
        let output_dir = required(name, "outputdir", section.outputdir)?;
        let chmod = required(name, "chmod", section.chmod)?;

        let kind = db_type
            .parse::<DatabaseKind>()
            .map_err(|kind| Error::UnsupportedEngine {
                section: name.to_string(),
                kind,
            })?;

        let mode =
            parse_octal_mode(&chmod).map_err(|e| Error::config(name, "chmod", e.to_string()))?;

        let compression = GzipConfig::builder()
            .maybe_level(section.compression_level)
            .build();
        compression
            .validate()
            .map_err(|e| Error::config(name, "compression_level", e.to_string()))?;

        let uid = section
            .chown
            .map(|user| resolve(name, IdentityKind::User, user, |n| lookup_user(n)))
            .transpose()?;
        let gid = section
            .chgrp
            .map(|group| resolve(name, IdentityKind::Group, group, |n| lookup_group(n)))
            .transpose()?;

        if let Err(e) = validate_writable_dir(&output_dir) {
            tracing::debug!("Output directory check for section {:?} failed: {}", name, e);
            return Err(Error::Permission {
                section: name.to_string(),
                dir: output_dir,
            });
        }

        Ok(BackupTarget {
            database: name.to_string(),
            kind,
            hostname,
            username,
            password,
            ownership: Ownership::new(uid, gid),
            mode,
            output_dir,
            timeout: section.timeout,
            compression,
        })
    }
}

fn resolve<F>(section: &str, kind: IdentityKind, name: String, lookup: F) -> Result<u32>
where
    F: Fn(&str) -> nix::Result<Option<u32>>,
{
    match lookup(&name) {
        Ok(Some(id)) => Ok(id),
        Ok(None) => Err(Error::Identity {
            section: section.to_string(),
            kind,
            name,
        }),
        Err(e) => Err(Error::from(e).with_msg(format!(
            "{} {} lookup in section {:?} failed",
            kind, name, section
        ))),
    }
}

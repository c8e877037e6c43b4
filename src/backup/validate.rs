//! Validation functions for configuration values.
//!
//! Provides checks for file and directory paths, section names used as
//! file names, octal permission strings and OS user/group names.

use nix::unistd::{access, AccessFlags, Group, User};
use sanitize_filename::{is_sanitized, sanitize};
use validator::ValidationError;

use std::path::Path;

/// Highest value accepted for a `chmod` option (`0o7777`)
pub static MAX_MODE: u32 = 0o7777;

pub fn validate_section_name<S: AsRef<str>>(name: S) -> Result<(), ValidationError> {
    let name = name.as_ref();
    if name.is_empty() || !is_sanitized(name) {
        return Err(ValidationError::new("InvalidSectionName").with_message(
            format!(
                "section name is not usable as a file name, try sanitizing like {:?}",
                sanitize(name)
            )
            .into(),
        ));
    }

    // The name is passed to the dump tool as a positional argument
    if name.starts_with('-') {
        return Err(ValidationError::new("InvalidSectionName")
            .with_message("section name must not start with '-'".into()));
    }

    Ok(())
}

pub fn validate_dir_exist<P: AsRef<Path>>(dir: P) -> Result<(), ValidationError> {
    let dir = dir.as_ref();
    if dir.exists() {
        if !dir.is_dir() {
            return Err(ValidationError::new("InvalidDirectory")
                .with_message(format!("{:?} is not a directory", dir).into()));
        }
    } else {
        return Err(ValidationError::new("InvalidDirectory")
            .with_message(format!("Output directory {:?} not found", dir).into()));
    }

    Ok(())
}

pub fn validate_readable_file<P: AsRef<Path>>(file: P) -> Result<(), ValidationError> {
    let file = file.as_ref();
    if !file.is_file() {
        return Err(ValidationError::new("InvalidFile")
            .with_message(format!("Configuration file {:?} not found", file).into()));
    }
    if access(file, AccessFlags::R_OK).is_err() {
        return Err(ValidationError::new("InvalidFile")
            .with_message(format!("Configuration file {:?} is not readable", file).into()));
    }

    Ok(())
}

/// Checks the directory with the real uid/gid of this process, like `access(2)`.
pub fn validate_writable_dir<P: AsRef<Path>>(dir: P) -> Result<(), ValidationError> {
    let dir = dir.as_ref();
    validate_dir_exist(dir)?;
    access(dir, AccessFlags::W_OK | AccessFlags::X_OK).map_err(|e| {
        ValidationError::new("InvalidDirectory")
            .with_message(format!("cannot write to dir {:?}: {}", dir, e).into())
    })
}

/// Parses a `chmod` option such as `"0600"` or `"640"` as octal permission bits.
pub fn parse_octal_mode<S: AsRef<str>>(mode: S) -> Result<u32, ValidationError> {
    let mode = mode.as_ref().trim();
    let digits = mode.strip_prefix("0o").unwrap_or(mode);
    u32::from_str_radix(digits, 8)
        .ok()
        .filter(|bits| !digits.is_empty() && *bits <= MAX_MODE)
        .ok_or_else(|| {
            ValidationError::new("InvalidMode")
                .with_message(format!("{:?} is not an octal mode", mode).into())
        })
}

/// Looks up a user name in the host's user database. `Ok(None)` means no such user.
pub fn lookup_user<S: AsRef<str>>(name: S) -> nix::Result<Option<u32>> {
    User::from_name(name.as_ref()).map(|user| user.map(|u| u.uid.as_raw()))
}

/// Looks up a group name in the host's group database. `Ok(None)` means no such group.
pub fn lookup_group<S: AsRef<str>>(name: S) -> nix::Result<Option<u32>> {
    Group::from_name(name.as_ref()).map(|group| group.map(|g| g.gid.as_raw()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use nix::unistd::{getgid, getuid};
    use tempfile::tempdir;

    #[test]
    fn test_section_name() {
        assert!(validate_section_name("orders").is_ok());
        assert!(validate_section_name("billing_2024-eu").is_ok());
        assert!(validate_section_name("../etc").is_err());
        assert!(validate_section_name("a/b").is_err());
        assert!(validate_section_name("").is_err());
        assert!(validate_section_name("--all-databases").is_err());
        assert!(validate_section_name("-h").is_err());
    }

    #[test]
    fn test_dir_exist() {
        let dir = tempdir().unwrap();
        assert!(validate_dir_exist(dir.path()).is_ok());
        assert!(validate_dir_exist(dir.path().join("missing")).is_err());

        let file = dir.path().join("file");
        std::fs::write(&file, b"").unwrap();
        assert!(validate_dir_exist(&file).is_err());
    }

    #[test]
    fn test_readable_file() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("backup.yml");
        assert!(validate_readable_file(&file).is_err());
        std::fs::write(&file, b"{}").unwrap();
        assert!(validate_readable_file(&file).is_ok());
        assert!(validate_readable_file(dir.path()).is_err());
    }

    #[test]
    fn test_writable_dir() {
        let dir = tempdir().unwrap();
        assert!(validate_writable_dir(dir.path()).is_ok());
        assert!(validate_writable_dir(dir.path().join("missing")).is_err());
    }

    #[test]
    fn test_parse_octal_mode() {
        assert_eq!(parse_octal_mode("0600").unwrap(), 0o600);
        assert_eq!(parse_octal_mode("640").unwrap(), 0o640);
        assert_eq!(parse_octal_mode("0o755").unwrap(), 0o755);
        assert_eq!(parse_octal_mode(" 0644 ").unwrap(), 0o644);
        assert!(parse_octal_mode("0800").is_err());
        assert!(parse_octal_mode("rw-r--r--").is_err());
        assert!(parse_octal_mode("").is_err());
        assert!(parse_octal_mode("17777").is_err());
    }

    #[test]
    fn test_lookup_current_user_and_group() {
        let user = User::from_uid(getuid()).unwrap().unwrap();
        assert_eq!(lookup_user(&user.name).unwrap(), Some(getuid().as_raw()));

        if let Some(group) = Group::from_gid(getgid()).unwrap() {
            assert_eq!(lookup_group(&group.name).unwrap(), Some(getgid().as_raw()));
        }
    }

    #[test]
    fn test_lookup_unknown_user_and_group() {
        assert_eq!(lookup_user("nonexistent_user_for_db_backup").unwrap(), None);
        assert_eq!(lookup_group("nonexistent_group_for_db_backup").unwrap(), None);
    }
}

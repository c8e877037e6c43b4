//! Raw configuration file model.
//!
//! The configuration file is a YAML mapping from section name (the logical
//! database name) to that section's options. A section called `DEFAULT`
//! supplies fallback values for every other section. Sections are kept in
//! file order and each one is parsed on its own, so a malformed section only
//! rejects itself.

use crate::backup::redacted::RedactedString;
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use crate::backup::result_error::WithMsg;
use bon::Builder;
use getset::Getters;
use serde::Deserialize;
use serde_yml::{Mapping, Value};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name of the section holding file-wide defaults
pub static DEFAULT_SECTION: &str = "DEFAULT";
/// Mode applied to compressed dumps when no section sets `chmod`
pub static DEFAULT_CHMOD: &str = "0600";

/// Options of one configuration section, before validation.
///
/// Every field is optional here; required fields are enforced when the
/// section is turned into a [`BackupTarget`](crate::backup::target::BackupTarget)
/// so the error can name the missing option.
#[derive(Clone, Default, Deserialize, Debug, PartialEq, Eq, Builder)]
#[serde(deny_unknown_fields)]
pub struct SectionConfig {
    #[serde(default, rename = "type")]
    #[builder(into)]
    pub db_type: Option<String>,
    #[serde(default)]
    #[builder(into)]
    pub hostname: Option<String>,
    #[serde(default)]
    #[builder(into)]
    pub username: Option<String>,
    #[serde(default)]
    #[builder(into)]
    pub password: Option<RedactedString>,
    #[serde(default)]
    #[builder(into)]
    pub chown: Option<String>,
    #[serde(default)]
    #[builder(into)]
    pub chgrp: Option<String>,
    #[serde(default)]
    #[builder(into)]
    pub chmod: Option<String>,
    #[serde(default)]
    #[builder(into)]
    pub outputdir: Option<PathBuf>,
    #[serde(default, with = "humantime_serde")]
    pub timeout: Option<Duration>,
    #[serde(default)]
    pub compression_level: Option<u32>,
}

impl SectionConfig {
    /// Fills every option this section leaves unset from `defaults`.
    pub fn with_defaults(self, defaults: &SectionConfig) -> SectionConfig {
        SectionConfig {
            db_type: self.db_type.or_else(|| defaults.db_type.clone()),
            hostname: self.hostname.or_else(|| defaults.hostname.clone()),
            username: self.username.or_else(|| defaults.username.clone()),
            password: self.password.or_else(|| defaults.password.clone()),
            chown: self.chown.or_else(|| defaults.chown.clone()),
            chgrp: self.chgrp.or_else(|| defaults.chgrp.clone()),
            chmod: self.chmod.or_else(|| defaults.chmod.clone()),
            outputdir: self.outputdir.or_else(|| defaults.outputdir.clone()),
            timeout: self.timeout.or(defaults.timeout),
            compression_level: self.compression_level.or(defaults.compression_level),
        }
    }
}

/// Options that are passed on verbatim, so YAML must not reinterpret them.
/// Unquoted `0o640` would otherwise arrive as 416 and `1e3` as 1000.
static STRING_OPTIONS: [&str; 7] = [
    "type", "hostname", "username", "password", "chown", "chgrp", "chmod",
];

fn check_string_options(section: &str, mapping: &Mapping) -> Result<()> {
    for (key, value) in mapping {
        let Some(option) = key.as_str().filter(|k| STRING_OPTIONS.contains(k)) else {
            continue;
        };
        if matches!(value, Value::Number(_) | Value::Bool(_)) {
            return Err(Error::config(
                section,
                option,
                "unquoted numbers and booleans are not accepted, quote the value",
            ));
        }
    }
    Ok(())
}

/// Defaults supplied by the process rather than the configuration file.
#[derive(Clone, Debug, Builder, Getters)]
#[getset(get = "pub")]
pub struct RunDefaults {
    #[builder(into)]
    output_dir: PathBuf,
}

impl RunDefaults {
    fn as_section(&self) -> SectionConfig {
        SectionConfig::builder()
            .chmod(DEFAULT_CHMOD)
            .outputdir(self.output_dir.clone())
            .build()
    }
}

/// One section as read from the file, parsed independently of the others.
#[derive(Debug)]
pub struct RawSection {
    pub name: String,
    pub config: Result<SectionConfig>,
}

/// The whole configuration file.
#[derive(Debug, Default)]
pub struct BackupConfig {
    defaults: SectionConfig,
    sections: Vec<RawSection>,
}

impl BackupConfig {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<BackupConfig> {
        let path = path.as_ref();
        File::open(path)
            .map_err(Error::from)
            .and_then(Self::from_reader)
            .with_msg(format!("Parse YAML config failed: {:?}", path))
    }

    pub fn from_reader<R: Read>(mut reader: R) -> Result<BackupConfig> {
        let mut content = String::new();
        reader.read_to_string(&mut content)?;
        if content.trim().is_empty() {
            return Ok(BackupConfig::default());
        }

        let mapping = match serde_yml::from_str::<Value>(&content)? {
            Value::Null => return Ok(BackupConfig::default()),
            Value::Mapping(mapping) => mapping,
            _ => {
                return Err(Error::config(
                    "",
                    "",
                    "top level of the configuration must be a mapping of sections",
                ))
            }
        };

        let mut defaults = SectionConfig::default();
        let mut sections = Vec::with_capacity(mapping.len());
        for (key, value) in mapping {
            let name = match key.as_str() {
                Some(name) => name.to_string(),
                None => {
                    sections.push(RawSection {
                        name: format!("{:?}", key),
                        config: Err(Error::config(
                            format!("{:?}", key),
                            "",
                            "section name must be a string",
                        )),
                    });
                    continue;
                }
            };
            let config = parse_section(&name, value);
            if name == DEFAULT_SECTION {
                defaults = config?;
            } else {
                sections.push(RawSection { name, config });
            }
        }

        Ok(BackupConfig { defaults, sections })
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Yields every section with the `DEFAULT` section and then `run_defaults`
    /// filled in. Sections that failed to parse are yielded as errors.
    pub fn into_sections(
        self,
        run_defaults: &RunDefaults,
    ) -> impl Iterator<Item = (String, Result<SectionConfig>)> {
        let defaults = self.defaults.with_defaults(&run_defaults.as_section());
        self.sections.into_iter().map(move |raw| {
            let config = raw.config.map(|c| c.with_defaults(&defaults));
            (raw.name, config)
        })
    }
}

fn parse_section(name: &str, value: Value) -> Result<SectionConfig> {
    match value {
        Value::Null => Ok(SectionConfig::default()),
        Value::Mapping(mapping) => {
            check_string_options(name, &mapping)?;
            serde_yml::from_value::<SectionConfig>(Value::Mapping(mapping))
                .map_err(|e| Error::config(name, "", e.to_string()))
        }
        value => serde_yml::from_value::<SectionConfig>(value)
            .map_err(|e| Error::config(name, "", e.to_string())),
    }
}

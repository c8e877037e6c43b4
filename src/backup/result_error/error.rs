use crate::backup::result_error::WithMsg;
use derive_more::Display;
use itertools::Itertools;
use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;
use thiserror::Error;

/// Which kind of OS identity failed to resolve.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq)]
pub enum IdentityKind {
    #[display("User")]
    User,
    #[display("Group")]
    Group,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Nix(#[from] nix::errno::Errno),
    #[error(transparent)]
    ValidationErrors(#[from] validator::ValidationErrors),
    #[error(transparent)]
    ValidationError(#[from] validator::ValidationError),
    #[error(transparent)]
    SerdeYml(#[from] serde_yml::Error),
    #[error("Failed to parse config in section {section:?}, option {field:?}: {reason}")]
    Config {
        section: String,
        field: String,
        reason: String,
    },
    #[error("{kind} {name} in section {section:?} does not exist")]
    Identity {
        section: String,
        kind: IdentityKind,
        name: String,
    },
    #[error("Output directory {dir:?} in section {section:?} is not writeable")]
    Permission { section: String, dir: PathBuf },
    #[error("Unsupported database type {kind:?} in section {section:?}")]
    UnsupportedEngine { section: String, kind: String },
    #[error("Failed to backup database {section:?} ({status}):\n{}", indent::indent_all_with("  ", .stderr.trim()))]
    DumpFailure {
        section: String,
        status: ExitStatus,
        stderr: String,
    },
    #[error("Dump of database {section:?} did not finish within {timeout:?}")]
    DumpTimeout { section: String, timeout: Duration },
    #[error("Failed to compress dump {path:?} of database {section:?}: {source}")]
    CompressionFailure {
        section: String,
        path: PathBuf,
        #[source]
        source: Box<Error>,
    },
    #[error("{}:\n{}", msg, indent::indent_all_with("  ", error.to_string()))]
    WithMsg { msg: String, error: Box<Error> },
    #[error("{}", itertools::join(.0, "\n\n"))]
    LotsOfError(Vec<Error>),
}

impl<S: Into<String>> WithMsg<S> for Error {
    fn with_msg(self, msg: S) -> Self {
        Self::WithMsg {
            msg: msg.into(),
            error: Box::new(self),
        }
    }
}

impl Error {
    pub fn config<S: Into<String>, F: Into<String>, R: Into<String>>(
        section: S,
        field: F,
        reason: R,
    ) -> Self {
        Self::Config {
            section: section.into(),
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn into_iter(self) -> Box<dyn Iterator<Item = Error>> {
        match self {
            Error::LotsOfError(v) => Box::new(v.into_iter().flat_map(Error::into_iter)),
            e => Box::new(std::iter::once(e)),
        }
    }

    pub fn chain(self, other: Error) -> Error {
        Error::LotsOfError(self.into_iter().chain(other.into_iter()).collect_vec())
    }
}

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

pub trait FileExtProvider {
    fn file_ext(&self) -> Option<Arc<str>>;
}

/// Extension of the raw dump written by the dump tools.
#[derive(Clone, Copy, Debug, Default)]
pub struct SqlDump;

static SQL_FILE_EXT: OnceLock<Arc<str>> = OnceLock::new();

impl FileExtProvider for SqlDump {
    fn file_ext(&self) -> Option<Arc<str>> {
        Some(SQL_FILE_EXT.get_or_init(|| "sql".into()).clone())
    }
}

/// Appends the provider's extension to the whole file name, so
/// `orders-3.sql` becomes `orders-3.sql.gz` rather than `orders-3.gz`.
pub fn append_file_ext<E: FileExtProvider + ?Sized>(path: &Path, ext: &E) -> PathBuf {
    match ext.file_ext() {
        Some(ext) => {
            let mut name = OsString::from(path.as_os_str());
            name.push(".");
            name.push(ext.as_ref());
            PathBuf::from(name)
        }
        None => path.to_path_buf(),
    }
}

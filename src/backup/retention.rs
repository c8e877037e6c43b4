//! Rolling weekday retention.
//!
//! Every target keeps at most seven dumps on disk: one per day of the
//! week, numbered like `strftime("%w")` (Sunday = 0 .. Saturday = 6). A run
//! always writes into the slot of the current weekday, silently replacing
//! whatever that slot held from the previous week.

use crate::backup::file_ext::FileExtProvider;
use chrono::{DateTime, Datelike, TimeZone};
use derive_more::Display;
use std::path::{Path, PathBuf};

#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[display("{_0}")]
pub struct WeekdaySlot(u32);

impl WeekdaySlot {
    pub fn of<T: TimeZone>(dt: &DateTime<T>) -> Self {
        Self(dt.weekday().num_days_from_sunday())
    }

    /// `<database>-<slot>.<ext>`
    pub fn file_name<E: FileExtProvider + ?Sized>(&self, database: &str, ext: &E) -> String {
        match ext.file_ext() {
            Some(ext) => format!("{}-{}.{}", database, self, ext),
            None => format!("{}-{}", database, self),
        }
    }

    pub fn path_in<E: FileExtProvider + ?Sized>(
        &self,
        dir: &Path,
        database: &str,
        ext: &E,
    ) -> PathBuf {
        dir.join(self.file_name(database, ext))
    }
}

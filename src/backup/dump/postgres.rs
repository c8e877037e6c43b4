use crate::backup::dump::DumpCommandBuilder;
use crate::backup::target::BackupTarget;
use std::path::PathBuf;
use std::process::Command;

/// Environment variable `pg_dump` reads the password from
pub static PGPASSWORD: &str = "PGPASSWORD";

/// `pg_dump -h <host> -U <user> <database>`
///
/// The password only ever reaches the child through its own environment;
/// it is not in the argument list and this process's environment is left
/// untouched.
#[derive(Clone, Debug)]
pub struct PostgresDump {
    program: PathBuf,
}

impl PostgresDump {
    pub fn new<P: Into<PathBuf>>(program: P) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl DumpCommandBuilder for PostgresDump {
    fn build_dump_command(&self, target: &BackupTarget) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("-h")
            .arg(target.hostname())
            .arg("-U")
            .arg(target.username())
            .arg(target.database())
            .env(PGPASSWORD, target.password().secret());
        cmd
    }

    fn describe(&self, target: &BackupTarget) -> String {
        format!(
            "{} -h {} -U {} {}",
            self.program.display(),
            target.hostname(),
            target.username(),
            target.database()
        )
    }
}

use crate::backup::dump::DumpCommandBuilder;
use crate::backup::target::BackupTarget;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Command;

/// `mysqldump -h <host> -u <user> --password=<secret> <database>`
#[derive(Clone, Debug)]
pub struct MySqlDump {
    program: PathBuf,
}

impl MySqlDump {
    pub fn new<P: Into<PathBuf>>(program: P) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl DumpCommandBuilder for MySqlDump {
    fn build_dump_command(&self, target: &BackupTarget) -> Command {
        let mut password = OsString::from("--password=");
        password.push(target.password().secret());

        let mut cmd = Command::new(&self.program);
        cmd.arg("-h")
            .arg(target.hostname())
            .arg("-u")
            .arg(target.username())
            .arg(password)
            .arg(target.database());
        cmd
    }

    fn describe(&self, target: &BackupTarget) -> String {
        format!(
            "{} -h {} -u {} --password=*** {}",
            self.program.display(),
            target.hostname(),
            target.username(),
            target.database()
        )
    }
}

// dbops/src/utils/report.rs

/// Console reporter. Informational lines go to stdout and honor the silent
/// flag; warnings always reach stderr, tagged by the caller with the
/// offending instance/database.
#[derive(Debug, Clone, Copy)]
pub struct Reporter {
    silent: bool,
}

impl Reporter {
    pub fn new(silent: bool) -> Self {
        Reporter { silent }
    }

    pub fn info(&self, message: impl AsRef<str>) {
        if !self.silent {
            println!("{}", message.as_ref());
        }
    }

    pub fn warn(&self, message: impl AsRef<str>) {
        eprintln!("⚠️ {}", message.as_ref());
    }
}

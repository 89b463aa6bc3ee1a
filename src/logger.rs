//! A small five-level verbosity-gated console logger.
//!
//! The teacher never factors its colorized `println!` calls into a dedicated type,
//! but the spirit carries over directly: level-tagged, colored, terse. `success` has
//! no equivalent in `log`/`tracing`, so this stays a bespoke sink rather than a facade.

use colored::Colorize;

/// Verbosity level, controlled by the CLI's `-v {0..3}` flag.
///
/// 0 — warning/error/success only (default).
/// 1 — + info.
/// 2 — + debug.
/// 3 — reserved for future finer-grained tracing; currently behaves like 2.
#[derive(Clone, Copy)]
pub struct Logger {
    verbosity: u8,
}

impl Logger {
    pub fn new(verbosity: u8) -> Self {
        Self { verbosity }
    }

    pub fn debug(&self, msg: impl AsRef<str>) {
        if self.verbosity >= 2 {
            eprintln!("{} {}", "[debug]".dimmed(), msg.as_ref().dimmed());
        }
    }

    pub fn info(&self, msg: impl AsRef<str>) {
        if self.verbosity >= 1 {
            println!("{} {}", "[info]".blue().bold(), msg.as_ref());
        }
    }

    pub fn success(&self, msg: impl AsRef<str>) {
        println!("{} {}", "[+]".green().bold(), msg.as_ref().green());
    }

    pub fn warning(&self, msg: impl AsRef<str>) {
        eprintln!("{} {}", "[warn]".yellow().bold(), msg.as_ref().yellow());
    }

    pub fn error(&self, msg: impl AsRef<str>) {
        eprintln!("{} {}", "[error]".red().bold(), msg.as_ref().red());
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new(0)
    }
}

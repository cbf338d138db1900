//! Output sink for `log`: an external pager when attached to a terminal,
//! plain stdout otherwise.

use std::env;
use std::io::{self, IsTerminal, Stdout, Write};
use std::process::{Child, ChildStdin, Command, Stdio};

const FALLBACK_PAGER: &str = "less -FRX";

/// Pager preferences from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagerSettings {
    pub enabled: bool,
    /// Explicit command line; `None` falls back to the environment.
    pub command: Option<String>,
}

impl Default for PagerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            command: None,
        }
    }
}

/// Pick the pager command: configured value, then `LINEAGE_PAGER`, then
/// `PAGER`, then `less -FRX`. An empty value at any level disables paging.
fn pager_command(
    configured: Option<&str>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Option<String> {
    let chosen = configured
        .map(str::to_string)
        .or_else(|| lookup("LINEAGE_PAGER"))
        .or_else(|| lookup("PAGER"))
        .unwrap_or_else(|| FALLBACK_PAGER.to_string());
    let chosen = chosen.trim();
    (!chosen.is_empty()).then(|| chosen.to_string())
}

pub enum Pager {
    Stdout(Stdout),
    Process {
        child: Child,
        stdin: Option<ChildStdin>,
    },
}

impl Pager {
    /// Start the configured pager, or write straight to stdout when paging
    /// is disabled, stdout is not a terminal, or the pager fails to spawn.
    #[must_use]
    pub fn start(settings: &PagerSettings) -> Self {
        if !settings.enabled || !io::stdout().is_terminal() {
            return Self::stdout();
        }
        let Some(command) = pager_command(settings.command.as_deref(), |key| env::var(key).ok())
        else {
            return Self::stdout();
        };
        match Self::spawn(&command, Stdio::inherit()) {
            Ok(pager) => pager,
            Err(err) => {
                tracing::warn!(%command, error = %err, "Failed to start pager; using stdout");
                Self::stdout()
            }
        }
    }

    #[must_use]
    pub fn stdout() -> Self {
        Self::Stdout(io::stdout())
    }

    fn spawn(command: &str, stdout: Stdio) -> io::Result<Self> {
        let mut words = command.split_whitespace();
        let program = words
            .next()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "empty pager command"))?;
        let mut child = Command::new(program)
            .args(words)
            .stdin(Stdio::piped())
            .stdout(stdout)
            .spawn()?;
        let stdin = child.stdin.take();
        tracing::debug!(%command, pid = child.id(), "Started pager");
        Ok(Self::Process { child, stdin })
    }

    #[must_use]
    pub fn is_paging(&self) -> bool {
        matches!(self, Self::Process { .. })
    }
}

impl Write for Pager {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Stdout(out) => out.write(buf),
            Self::Process { stdin, .. } => match stdin {
                Some(pipe) => pipe.write(buf),
                None => Err(io::Error::from(io::ErrorKind::BrokenPipe)),
            },
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Stdout(out) => out.flush(),
            Self::Process { stdin, .. } => stdin.as_mut().map_or(Ok(()), |pipe| pipe.flush()),
        }
    }
}

impl Drop for Pager {
    fn drop(&mut self) {
        if let Self::Process { child, stdin } = self {
            // Closing stdin lets the pager see EOF; then wait for the user to quit it.
            drop(stdin.take());
            if let Err(err) = child.wait() {
                tracing::warn!(error = %err, "Failed to wait for pager");
            }
        }
    }
}

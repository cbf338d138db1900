//! Commands shared by the one-shot CLI and the interactive shell.

use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use regex::Regex;

use lineage_core::{
    CancellationSignal, CommitRenderer, LogError, LogPipeline, LogSummary, Pager, PagerSettings,
    log_dataset,
};
use lineage_store::{Database, ObjectSpec};
use lineage_types::{CommitMeta, DatasetName, FORMAT_VERSION, Hash, ValuePath};

use crate::args::{CommitArgs, LogArgs};
use crate::config::Settings;

/// What to render for one `log` command, before settings are applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogRequest {
    pub dataset: String,
    pub verbose: bool,
    /// Explicit graph choice; `None` follows the layout default.
    pub graph: Option<bool>,
    pub max_nodes: Option<i64>,
    pub path: Option<String>,
    pub max_lines: Option<usize>,
}

impl From<LogArgs> for LogRequest {
    fn from(args: LogArgs) -> Self {
        let graph = match (args.graph, args.no_graph) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        };
        Self {
            dataset: args.dataset,
            verbose: args.verbose && !args.oneline,
            graph,
            max_nodes: args.max_nodes,
            path: args.path,
            max_lines: args.max_lines,
        }
    }
}

/// Opens the owned sink that `log` and paged `show` write to.
type OutputOpener = Arc<dyn Fn(&PagerSettings) -> Box<dyn Write + Send> + Send + Sync>;

fn open_pager(settings: &PagerSettings) -> Box<dyn Write + Send> {
    let pager = Pager::start(settings);
    tracing::debug!(paging = pager.is_paging(), "Opened output");
    Box::new(pager)
}

pub struct Session {
    db: Database,
    settings: Settings,
    open_output: OutputOpener,
}

impl Session {
    pub fn open(settings: Settings) -> Result<Self> {
        let db = Database::open(&settings.db_path)
            .with_context(|| format!("failed to open database {}", settings.db_path.display()))?;
        tracing::info!(path = %settings.db_path.display(), "Opened database");
        Ok(Self::with_database(db, settings))
    }

    pub fn with_database(db: Database, settings: Settings) -> Self {
        Self {
            db,
            settings,
            open_output: Arc::new(open_pager),
        }
    }

    /// Pick up dataset heads moved by other processes.
    pub fn rebase(&mut self) -> Result<()> {
        self.db.rebase().context("failed to refresh database")
    }

    pub fn version(&self, out: &mut dyn Write) -> Result<()> {
        writeln!(out, "format version: {FORMAT_VERSION}")?;
        writeln!(out, "built from lineage {}", env!("CARGO_PKG_VERSION"))?;
        Ok(())
    }

    pub fn list_datasets(&self, pattern: Option<&str>, out: &mut dyn Write) -> Result<()> {
        let filter = match pattern {
            Some(raw) => Some(Regex::new(raw).map_err(|err| {
                tracing::debug!(error = %err, "Rejected dataset pattern");
                anyhow!("invalid dataset pattern {raw:?}")
            })?),
            None => None,
        };
        for (name, _) in self.db.datasets() {
            if filter.as_ref().is_none_or(|re| re.is_match(name.as_str())) {
                writeln!(out, "{name}")?;
            }
        }
        Ok(())
    }

    /// Print the value `spec` names, through the pager when paging is on.
    pub async fn show(&self, spec: &str, out: &mut dyn Write) -> Result<()> {
        let spec: ObjectSpec = spec.parse()?;
        let Some(value) = self.db.resolve(&spec)? else {
            writeln!(out, "<nil>")?;
            return Ok(());
        };
        let mut text = serde_json::to_vec_pretty(&value)?;
        text.push(b'\n');

        if !self.settings.pager.enabled {
            out.write_all(&text)?;
            return Ok(());
        }
        out.flush()?;

        // Starting the pager, writing to it and waiting for it to exit all block.
        let open = Arc::clone(&self.open_output);
        let settings = self.settings.pager.clone();
        let written = tokio::task::spawn_blocking(move || {
            let mut pager = open(&settings);
            pager.write_all(&text)?;
            pager.flush()
        })
        .await
        .context("pager task failed")?;

        match written {
            Err(err) if err.kind() != io::ErrorKind::BrokenPipe => Err(err.into()),
            _ => Ok(()),
        }
    }

    /// Run `log`. Ctrl-C stops the run the same way a failed write does.
    ///
    /// Output goes to the pager (or stdout); the caller flushes anything it
    /// wrote first. Returns `None` when the reader closed the output early
    /// (e.g. quit the pager), which is not an error.
    pub async fn log(&self, request: &LogRequest) -> Result<Option<LogSummary>> {
        let dataset = DatasetName::new(request.dataset.as_str())
            .with_context(|| format!("invalid dataset name {:?}", request.dataset))?;
        if self.db.head(&dataset).is_none() {
            return Err(LogError::NoHead(dataset).into());
        }

        let mut options = self.settings.render_options();
        if request.verbose {
            options = options.verbose();
        }
        if let Some(graph) = request.graph {
            options.show_ancestry_graph = graph;
        }
        if let Some(max) = request.max_nodes {
            options.max_nodes = Some(max);
        }
        if let Some(lines) = request.max_lines {
            options.max_value_lines = lines;
        }
        if let Some(path) = &request.path {
            options.target_path = path
                .parse::<ValuePath>()
                .with_context(|| format!("invalid path {path:?}"))?;
        }

        let cancel = CancellationSignal::new();
        let pipeline = LogPipeline::new(Arc::new(CommitRenderer::new()), self.settings.parallelism)
            .with_cancellation(cancel.clone());

        let sink = (self.open_output)(&self.settings.pager);
        let run = log_dataset(&self.db, &dataset, &pipeline, options, sink);
        tokio::pin!(run);

        let mut interrupt_armed = true;
        let result = loop {
            tokio::select! {
                result = &mut run => break result,
                signal = tokio::signal::ctrl_c(), if interrupt_armed => {
                    interrupt_armed = false;
                    if signal.is_ok() && cancel.raise() {
                        tracing::info!("Interrupted; stopping log");
                    }
                }
            }
        };

        match result {
            Ok(summary) => Ok(Some(summary)),
            Err(err) if err.is_broken_pipe() => {
                tracing::debug!("Output closed before log finished");
                Ok(None)
            }
            Err(err) => Err(err.into()),
        }
    }

    pub fn commit(&mut self, args: &CommitArgs) -> Result<Hash> {
        let dataset = DatasetName::new(args.dataset.as_str())
            .with_context(|| format!("invalid dataset name {:?}", args.dataset))?;
        let value: serde_json::Value =
            serde_json::from_str(&args.value).context("value is not valid JSON")?;
        let merges = args
            .merge
            .iter()
            .map(|raw| {
                raw.parse::<Hash>()
                    .with_context(|| format!("invalid commit hash {raw:?}"))
            })
            .collect::<Result<Vec<_>>>()?;

        let meta = CommitMeta {
            date: Some(chrono::Utc::now().timestamp()),
            message: args.message.clone(),
        };
        let hash = self.db.merge_commit(&dataset, value, meta, &merges)?;
        tracing::info!(%dataset, commit = %hash.short(), "Recorded commit");
        Ok(hash)
    }
}

/// In-memory stand-in for the pager, shared with the test that reads it.
#[cfg(test)]
#[derive(Clone, Default)]
pub(crate) struct CapturedOutput(Arc<std::sync::Mutex<Vec<u8>>>);

#[cfg(test)]
impl CapturedOutput {
    pub(crate) fn text(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

#[cfg(test)]
impl Write for CapturedOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
impl Session {
    /// Send pager-bound output to a buffer instead.
    pub(crate) fn capture_output(&mut self) -> CapturedOutput {
        let captured = CapturedOutput::default();
        let sink = captured.clone();
        self.open_output = Arc::new(move |_: &PagerSettings| -> Box<dyn Write + Send> {
            Box::new(sink.clone())
        });
        captured
    }
}

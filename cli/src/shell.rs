//! Interactive command loop.
//!
//! Reads one statement at a time, refreshes the database snapshot, and runs
//! the command. A failing command prints `error: ...` and the loop goes on;
//! only `exit`, `quit`, or end of input stop it.

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result, bail};

use crate::session::{LogRequest, Session};

pub const PROMPT: &str = "lineage> ";
pub const CONTINUATION_PROMPT: &str = "... ";

const HELP: &str = "\
Commands:
  ds [regex]                           list datasets
  show <dataset|#hash>[path]           print a value
  log <dataset> [v] [-n N] [--path P]  show history (v = verbose)
  version                              print version information
  help                                 show this text
  exit | quit                          leave the shell
";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Exit,
}

/// Read one statement. A statement continues onto further lines while it
/// contains an odd number of `"` characters. `None` at end of input.
pub fn read_statement<R, W>(input: &mut R, prompts: &mut W) -> io::Result<Option<String>>
where
    R: BufRead,
    W: Write + ?Sized,
{
    let mut statement = String::new();
    let mut quotes = 0usize;
    let mut prompt = PROMPT;

    loop {
        write!(prompts, "{prompt}")?;
        prompts.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        quotes += line.matches('"').count();
        statement.push_str(line.trim_end_matches(['\n', '\r']));
        statement.push('\n');

        if quotes % 2 == 0 {
            return Ok(Some(statement));
        }
        prompt = CONTINUATION_PROMPT;
    }
}

pub fn parse_args(statement: &str) -> Vec<&str> {
    statement.split_whitespace().collect()
}

fn parse_log_args(args: &[&str]) -> Result<LogRequest> {
    let (dataset, rest) = args
        .split_first()
        .context("usage: log <dataset> [v] [-n N] [--path P]")?;
    let mut request = LogRequest {
        dataset: (*dataset).to_string(),
        ..LogRequest::default()
    };

    let mut rest = rest.iter();
    while let Some(arg) = rest.next() {
        match *arg {
            "v" => request.verbose = true,
            "-n" => {
                let raw = rest.next().context("-n needs a number")?;
                let count = raw
                    .parse()
                    .with_context(|| format!("invalid count {raw:?}"))?;
                request.max_nodes = Some(count);
            }
            "--path" => {
                let raw = rest.next().context("--path needs a path")?;
                request.path = Some((*raw).to_string());
            }
            other => bail!("unexpected argument {other:?} to log"),
        }
    }
    Ok(request)
}

async fn execute<W>(session: &mut Session, statement: &str, out: &mut W) -> Result<Flow>
where
    W: Write,
{
    let args = parse_args(statement);
    let Some((command, rest)) = args.split_first() else {
        return Ok(Flow::Continue);
    };
    if matches!(*command, "exit" | "quit") {
        return Ok(Flow::Exit);
    }

    session.rebase()?;
    tracing::debug!(command, "Running shell command");

    match *command {
        "version" => session.version(out)?,
        "ds" => session.list_datasets(rest.first().copied(), out)?,
        "show" => {
            let spec = rest.first().context("usage: show <dataset|#hash>[path]")?;
            session.show(spec, out).await?;
        }
        "log" => {
            let request = parse_log_args(rest)?;
            out.flush()?;
            session.log(&request).await?;
        }
        "help" => out.write_all(HELP.as_bytes())?,
        other => writeln!(out, "Unrecognized command: {other}")?,
    }
    Ok(Flow::Continue)
}

/// Run the loop until `exit`, `quit`, or end of input.
pub async fn run<R, W>(session: &mut Session, mut input: R, out: &mut W) -> Result<()>
where
    R: BufRead,
    W: Write,
{
    tracing::info!("Shell started");
    loop {
        let Some(statement) = read_statement(&mut input, out)? else {
            writeln!(out)?;
            break;
        };
        match execute(session, &statement, out).await {
            Ok(Flow::Continue) => {}
            Ok(Flow::Exit) => break,
            Err(err) => {
                tracing::debug!(error = %format!("{err:#}"), "Shell command failed");
                writeln!(out, "error: {err:#}")?;
            }
        }
        out.flush()?;
    }
    tracing::info!("Shell exited");
    Ok(())
}

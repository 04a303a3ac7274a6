use std::io::{stdout, Write};
use std::path::Path;

use anyhow::{Context, Result};
use astropix::{decode, DecodeOpts, Summary};
use serde::Serialize;
use tracing::error;

#[derive(Debug, Clone)]
pub enum Format {
    Json,
    Text,
}

impl clap::ValueEnum for Format {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::Json, Self::Text]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        match self {
            Self::Json => Some(clap::builder::PossibleValue::new("json")),
            Self::Text => Some(clap::builder::PossibleValue::new("text")),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct Info {
    filename: String,
    data_bytes: usize,
    sampleclock_period_ns: u32,
    summary: Summary,
}

fn summarize(fpath: &Path, stream: &[u8], opts: &DecodeOpts) -> Result<Info> {
    let decoded = decode(stream, opts).context("decoding stream")?;

    Ok(Info {
        filename: fpath.to_string_lossy().to_string(),
        data_bytes: opts.data_bytes,
        sampleclock_period_ns: opts.sampleclock_period_ns,
        summary: decoded.summary,
    })
}

fn render_text<W: Write>(mut out: W, info: &Info) -> Result<()> {
    let s = &info.summary;
    writeln!(out, "{}", info.filename)?;
    writeln!(
        out,
        "  data_bytes={} sampleclock_period_ns={}",
        info.data_bytes, info.sampleclock_period_ns
    )?;
    writeln!(out, "  lines:         {}", s.lines)?;
    writeln!(out, "  candidates:    {}", s.candidates)?;
    writeln!(out, "  heartbeats:    {}", s.heartbeats)?;
    writeln!(out, "  truncated:     {}", s.truncated)?;
    writeln!(out, "  decode errors: {}", s.decode_errors)?;
    writeln!(
        out,
        "  hits:          {} (col={} row={})",
        s.hits, s.col_hits, s.row_hits
    )?;
    Ok(())
}

fn render<W: Write>(mut out: W, info: &Info, format: &Format) -> Result<()> {
    match format {
        Format::Json => {
            serde_json::to_writer_pretty(&mut out, info).context("serializing to json")?;
            writeln!(out)?;
        }
        Format::Text => render_text(out, info)?,
    }
    Ok(())
}

/// Print decode statistics for `input`.
///
/// An input that cannot be opened is reported and is not an error.
pub fn info(input: &Path, opts: &DecodeOpts, format: &Format) -> Result<()> {
    let stream = match std::fs::read(input) {
        Ok(stream) => stream,
        Err(err) => {
            error!("cannot open the file {input:?}: {err}; stop");
            return Ok(());
        }
    };
    let info = summarize(input, &stream, opts)?;
    render(stdout(), &info, format)
}

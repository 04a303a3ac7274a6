use std::fs::File;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{debug, span, trace, Level};
use typed_builder::TypedBuilder;

use crate::hit::{HitRecord, RecordDecoder};
use crate::scanner::{HeartbeatFilter, RecordScanner, HEARTBEAT, MARKER};
use crate::tokenizer::{tokenize, Framing, Line};
use crate::writer::RecordWriter;
use crate::{Error, Result};

/// Options controlling how a readout stream is decoded.
///
/// # Example
/// ```
/// use astropix::DecodeOpts;
///
/// let opts = DecodeOpts::builder()
///     .sampleclock_period_ns(10)
///     .num_threads(4)
///     .build();
/// assert_eq!(opts.data_bytes, 5);
/// ```
#[derive(Debug, Clone, TypedBuilder)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DecodeOpts {
    /// Size of a hit record in bytes, including the 1 byte marker.
    #[builder(default = 5)]
    pub data_bytes: usize,
    /// Sample clock period used to convert ToT counts to time.
    #[builder(default = 5)]
    pub sampleclock_period_ns: u32,
    /// Hex marker preceding each record.
    #[builder(default = MARKER.to_string(), setter(into))]
    pub marker: String,
    /// Heartbeat token; records containing repeated runs of it are dropped.
    #[builder(default = HEARTBEAT.to_string(), setter(into))]
    pub heartbeat: String,
    #[builder(default)]
    pub framing: Framing,
    /// Number of threads used to decode lines. `None` decodes on the calling thread.
    #[builder(default, setter(strip_option))]
    pub num_threads: Option<usize>,
}

impl Default for DecodeOpts {
    fn default() -> Self {
        DecodeOpts::builder().build()
    }
}

impl DecodeOpts {
    /// Number of hex characters following the marker in each record.
    #[must_use]
    pub fn data_length(&self) -> usize {
        self.data_bytes.saturating_sub(1).saturating_mul(2)
    }

    /// Check these options describe a decodable stream.
    ///
    /// # Errors
    /// [Error::Config] describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        if !(HitRecord::LEN..=RecordDecoder::MAX_DATA_BYTES).contains(&self.data_bytes) {
            return Err(Error::Config(format!(
                "data_bytes must be between {} and {}, got {}",
                HitRecord::LEN,
                RecordDecoder::MAX_DATA_BYTES,
                self.data_bytes
            )));
        }
        if self.marker.len() != 2 {
            return Err(Error::Config(format!(
                "marker must be 2 hex characters, got {:?}",
                self.marker
            )));
        }
        if self.heartbeat.is_empty() {
            return Err(Error::Config("heartbeat token must not be empty".into()));
        }
        if self.framing.filler == self.framing.delimiter {
            return Err(Error::Config(
                "filler and delimiter must be different characters".into(),
            ));
        }
        if self.num_threads == Some(0) {
            return Err(Error::Config("num_threads must be greater than 0".into()));
        }
        Ok(())
    }
}

/// Counters collected while decoding.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Summary {
    /// Readout lines found in the stream.
    pub lines: usize,
    /// Complete records found by the scanner.
    pub candidates: usize,
    /// Lines whose scan ended on a truncated record.
    pub truncated: usize,
    pub heartbeats: usize,
    /// Records skipped because their hex could not be decoded.
    pub decode_errors: usize,
    pub hits: usize,
    pub col_hits: usize,
    pub row_hits: usize,
}

impl Summary {
    pub fn add_hit(&mut self, hit: &HitRecord) {
        self.hits += 1;
        if hit.is_col {
            self.col_hits += 1;
        } else {
            self.row_hits += 1;
        }
    }

    pub fn merge(&mut self, other: &Summary) {
        self.lines += other.lines;
        self.candidates += other.candidates;
        self.truncated += other.truncated;
        self.heartbeats += other.heartbeats;
        self.decode_errors += other.decode_errors;
        self.hits += other.hits;
        self.col_hits += other.col_hits;
        self.row_hits += other.row_hits;
    }
}

/// All hits decoded from a stream, in the order they were found.
#[derive(Debug, Default, Clone)]
pub struct Decoded {
    pub hits: Vec<HitRecord>,
    pub summary: Summary,
}

struct Pipeline<'a> {
    decoder: RecordDecoder,
    heartbeat: HeartbeatFilter,
    marker: &'a [u8],
    data_length: usize,
}

impl Pipeline<'_> {
    fn decode_line(&self, line: &Line, readout: usize) -> Decoded {
        let mut decoded = Decoded {
            hits: Vec::new(),
            summary: Summary {
                lines: 1,
                ..Summary::default()
            },
        };

        let mut scanner = RecordScanner::new(line.as_bytes(), self.marker, self.data_length);
        for candidate in scanner.by_ref() {
            decoded.summary.candidates += 1;
            if self.heartbeat.is_heartbeat(candidate.text) {
                trace!(line = line.index, offset = candidate.offset, "heartbeat");
                decoded.summary.heartbeats += 1;
                continue;
            }
            match self.decoder.decode(candidate.text, line.index, readout) {
                Ok(hit) => {
                    decoded.summary.add_hit(&hit);
                    decoded.hits.push(hit);
                }
                Err(err) => {
                    debug!(
                        line = line.index,
                        offset = candidate.offset,
                        "skipping record: {err}"
                    );
                    decoded.summary.decode_errors += 1;
                }
            }
        }
        if scanner.truncated() {
            decoded.summary.truncated += 1;
        }

        decoded
    }
}

/// Decode all hits in `stream`.
///
/// Lines are processed in stream order and each line bumps the readout counter once,
/// whether or not it contains any hits. Records that fail to decode are logged and
/// skipped.
///
/// When `opts.num_threads` is set, lines are decoded on a thread pool of that size;
/// the result is the same as decoding sequentially.
///
/// # Errors
/// [Error::Config] if `opts` is not valid or the thread pool cannot be created.
pub fn decode(stream: &[u8], opts: &DecodeOpts) -> Result<Decoded> {
    opts.validate()?;
    let pipeline = Pipeline {
        decoder: RecordDecoder::new(opts.data_bytes, opts.sampleclock_period_ns)?,
        heartbeat: HeartbeatFilter::new(&opts.heartbeat),
        marker: opts.marker.as_bytes(),
        data_length: opts.data_length(),
    };

    let span = span!(Level::DEBUG, "decode", len = stream.len());
    let _guard = span.enter();

    let lines = tokenize(stream, opts.framing);
    debug!("found {} lines", lines.len());

    // Readout counter is the position of the line in the stream
    let per_line: Vec<Decoded> = match opts.num_threads {
        None => lines
            .iter()
            .enumerate()
            .map(|(readout, line)| pipeline.decode_line(line, readout))
            .collect(),
        Some(num) => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(num)
                .build()
                .map_err(|err| Error::Config(format!("failed to construct threadpool: {err}")))?;
            // collect on an indexed iterator keeps line order
            pool.install(|| {
                lines
                    .par_iter()
                    .enumerate()
                    .map(|(readout, line)| pipeline.decode_line(line, readout))
                    .collect()
            })
        }
    };

    let mut decoded = Decoded::default();
    for line in per_line {
        decoded.summary.merge(&line.summary);
        decoded.hits.extend(line.hits);
    }
    debug!(summary = ?decoded.summary, "decode complete");

    Ok(decoded)
}

/// Result of decoding a file.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Report {
    pub output: PathBuf,
    pub summary: Summary,
}

/// The default output path for `input`, i.e., `input` with its extension replaced
/// by `txt`.
#[must_use]
pub fn output_path(input: &Path) -> PathBuf {
    input.with_extension("txt")
}

// Paths name the same file if they are equal or, when both exist, resolve to the
// same canonical path.
fn same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (std::fs::canonicalize(a), std::fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Decode the stream in `input` and write one row per hit to `output`.
///
/// The input is read in full before anything else happens, so if it cannot be read
/// no output file is created.
///
/// # Errors
/// [Error::Open] if `input` cannot be read, [Error::OutputCollision] if `output` is
/// the same file as `input`, [Error::Config] for invalid `opts`, or [Error::Io] writing `output`.
pub fn decode_file(input: &Path, output: &Path, opts: &DecodeOpts) -> Result<Report> {
    if same_file(input, output) {
        return Err(Error::OutputCollision(output.to_path_buf()));
    }
    let stream = std::fs::read(input).map_err(|source| Error::Open {
        path: input.to_path_buf(),
        source,
    })?;
    debug!("read {} bytes from {input:?}", stream.len());

    let decoded = decode(&stream, opts)?;

    let mut writer = RecordWriter::new(File::create(output)?);
    writer.write_all(&decoded.hits)?;
    let rows = writer.finish()?;
    debug!("wrote {rows} rows to {output:?}");

    Ok(Report {
        output: output.to_path_buf(),
        summary: decoded.summary,
    })
}

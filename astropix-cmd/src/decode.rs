use std::path::Path;

use anyhow::{Context, Result};
use astropix::{decode_file, output_path, DecodeOpts, Error};
use tracing::{error, info};

/// Decode `input` to the default output path.
///
/// An input that cannot be opened is reported and is not an error; nothing is written.
pub fn decode(input: &Path, opts: &DecodeOpts) -> Result<()> {
    let output = output_path(input);
    info!("decoding {input:?} to {output:?}");

    let report = match decode_file(input, &output, opts) {
        Ok(report) => report,
        Err(Error::Open { path, source }) => {
            error!("cannot open the file {path:?}: {source}; stop");
            return Ok(());
        }
        Err(err) => return Err(err).with_context(|| format!("failed to decode {input:?}")),
    };

    let summary = &report.summary;
    if summary.decode_errors > 0 {
        info!("skipped {} records with invalid hex", summary.decode_errors);
    }
    info!(
        lines = summary.lines,
        heartbeats = summary.heartbeats,
        "wrote {} hits to {:?}",
        summary.hits,
        report.output
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_input_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("missing.dat");

        decode(&input, &DecodeOpts::default()).expect("missing input should not fail");

        assert!(!output_path(&input).exists());
    }

    #[test]
    fn decode_writes_txt_next_to_input() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("run.dat");
        std::fs::write(&input, b"ffff'20bcbcbcbc20a1b2c3d4''").unwrap();

        decode(&input, &DecodeOpts::default()).unwrap();

        let text = std::fs::read_to_string(dir.path().join("run.txt")).unwrap();
        assert_eq!(text, "0 0 0 4  5 1  77  3  43  811  4.0550\n");
    }

    #[test]
    fn invalid_options_fail() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("run.dat");
        std::fs::write(&input, b"'20a1b2c3d4'").unwrap();

        let opts = DecodeOpts::builder().data_bytes(3).build();
        assert!(decode(&input, &opts).is_err());
    }
}

use std::fmt::Display;
use std::io::BufRead;
use std::str::FromStr;

use crate::bits::reverse_all;
use crate::{Error, Result};

/// A single decoded pixel hit.
///
/// The text form (see the [Display] impl) is one row of the decoded output file:
/// ```text
/// line readout id payload location is_col timestamp tot_msb tot_lsb tot_total tot_us
/// ```
/// with `tot_us` printed with 4 decimal places. Rows can be parsed back with
/// [FromStr], separated by commas or whitespace.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HitRecord {
    /// Index of the readout line this hit was found in.
    pub line_index: usize,
    /// Readout counter value of the line; advances once per line, not per hit.
    pub readout_index: usize,
    /// Chip id, 5 bits.
    pub id: u8,
    /// 3 bits.
    pub payload: u8,
    /// Pixel coordinate along the axis given by `is_col`, 6 bits.
    pub location: u8,
    pub is_col: bool,
    pub timestamp: u8,
    /// Upper 4 bits of the time over threshold counter.
    pub tot_msb: u8,
    pub tot_lsb: u8,
    /// Full 12-bit time over threshold count.
    pub tot_total: u16,
    /// Time over threshold in microseconds.
    pub tot_us: f64,
}

impl HitRecord {
    /// Minimum number of record bytes, including the marker byte.
    pub const LEN: usize = 5;

    /// Construct from bit-reversed record bytes, or `None` if there are not enough bytes.
    /// Bytes past [HitRecord::LEN] are ignored.
    #[must_use]
    pub fn decode(
        dat: &[u8],
        line_index: usize,
        readout_index: usize,
        sampleclock_period_ns: u32,
    ) -> Option<Self> {
        let head: &[u8; Self::LEN] = dat.get(..Self::LEN)?.try_into().ok()?;
        Some(Self::from_bytes(
            head,
            line_index,
            readout_index,
            sampleclock_period_ns,
        ))
    }

    fn from_bytes(
        dat: &[u8; Self::LEN],
        line_index: usize,
        readout_index: usize,
        sampleclock_period_ns: u32,
    ) -> Self {
        let tot_msb = dat[3] & 0x0f;
        let tot_lsb = dat[4];
        let tot_total = (u16::from(tot_msb) << 8) | u16::from(tot_lsb);
        HitRecord {
            line_index,
            readout_index,
            id: (dat[0] >> 3) & 0x1f,
            payload: dat[0] & 0x07,
            location: dat[1] & 0x3f,
            is_col: (dat[1] >> 7) & 0x1 == 1,
            timestamp: dat[2],
            tot_msb,
            tot_lsb,
            tot_total,
            tot_us: f64::from(tot_total) * f64::from(sampleclock_period_ns) * 0.001,
        }
    }
}

impl Display for HitRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} {} {} {:2} {} {:3} {:2} {:3} {:4} {:7.4}",
            self.line_index,
            self.readout_index,
            self.id,
            self.payload,
            self.location,
            u8::from(self.is_col),
            self.timestamp,
            self.tot_msb,
            self.tot_lsb,
            self.tot_total,
            self.tot_us,
        )
    }
}

fn field<T: FromStr>(name: &str, s: &str) -> Result<T> {
    s.parse::<T>()
        .map_err(|_| Error::InvalidRow(format!("bad {name} value {s:?}")))
}

impl FromStr for HitRecord {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|p| !p.is_empty())
            .collect();
        if parts.len() != 11 {
            return Err(Error::InvalidRow(format!(
                "expected 11 fields, got {}",
                parts.len()
            )));
        }

        let is_col = match parts[5] {
            "0" => false,
            "1" => true,
            other => return Err(Error::InvalidRow(format!("bad is_col value {other:?}"))),
        };
        Ok(HitRecord {
            line_index: field("line_index", parts[0])?,
            readout_index: field("readout_index", parts[1])?,
            id: field("id", parts[2])?,
            payload: field("payload", parts[3])?,
            location: field("location", parts[4])?,
            is_col,
            timestamp: field("timestamp", parts[6])?,
            tot_msb: field("tot_msb", parts[7])?,
            tot_lsb: field("tot_lsb", parts[8])?,
            tot_total: field("tot_total", parts[9])?,
            tot_us: field("tot_us", parts[10])?,
        })
    }
}

/// Read decoded rows back from `reader`, skipping blank lines.
pub fn read_rows<R: BufRead>(reader: R) -> impl Iterator<Item = Result<HitRecord>> {
    reader.lines().filter_map(|line| match line {
        Ok(line) if line.trim().is_empty() => None,
        Ok(line) => Some(line.parse::<HitRecord>()),
        Err(err) => Some(Err(Error::Io(err))),
    })
}

/// Decodes the hex text of a hit record into a [HitRecord].
#[derive(Debug, Clone, Copy)]
pub struct RecordDecoder {
    data_bytes: usize,
    sampleclock_period_ns: u32,
}

impl RecordDecoder {
    /// Largest supported record size in bytes.
    pub const MAX_DATA_BYTES: usize = 64;

    /// Creates a new ``RecordDecoder``.
    ///
    /// `data_bytes` is the size of a record in bytes, including the 1 byte marker.
    ///
    /// # Errors
    /// [Error::Config] if `data_bytes` is not in `HitRecord::LEN..=MAX_DATA_BYTES`.
    pub fn new(data_bytes: usize, sampleclock_period_ns: u32) -> Result<Self> {
        if !(HitRecord::LEN..=Self::MAX_DATA_BYTES).contains(&data_bytes) {
            return Err(Error::Config(format!(
                "data_bytes must be between {} and {}, got {data_bytes}",
                HitRecord::LEN,
                Self::MAX_DATA_BYTES
            )));
        }
        Ok(RecordDecoder {
            data_bytes,
            sampleclock_period_ns,
        })
    }

    /// Decode record `text`, which must be exactly 2 hex characters per record byte.
    ///
    /// # Errors
    /// [Error::InvalidHex] if `text` is not valid hex of the expected length.
    pub fn decode(
        &self,
        text: &[u8],
        line_index: usize,
        readout_index: usize,
    ) -> Result<HitRecord> {
        let mut buf = vec![0u8; self.data_bytes];
        hex::decode_to_slice(text, &mut buf).map_err(|source| Error::InvalidHex {
            text: String::from_utf8_lossy(text).into_owned(),
            source,
        })?;
        // Only the leading bytes carry hit fields
        let mut head = [0u8; HitRecord::LEN];
        head.copy_from_slice(&buf[..HitRecord::LEN]);
        // LSB-first on the wire
        reverse_all(&mut head);

        Ok(HitRecord::from_bytes(
            &head,
            line_index,
            readout_index,
            self.sampleclock_period_ns,
        ))
    }
}

use std::io::{BufWriter, Write};

use crate::hit::HitRecord;
use crate::Result;

/// Writes [HitRecord]s as text rows, one per line, in the order given.
///
/// # Example
/// ```
/// use astropix::{writer::RecordWriter, HitRecord};
///
/// let hit = HitRecord::decode(&[0x04, 0x85, 0x4d, 0xc3, 0x2b], 0, 0, 5).unwrap();
/// let mut buf = Vec::new();
/// let mut writer = RecordWriter::new(&mut buf);
/// writer.write(&hit).unwrap();
/// assert_eq!(writer.finish().unwrap(), 1);
/// assert_eq!(String::from_utf8(buf).unwrap(), "0 0 0 4  5 1  77  3  43  811  4.0550\n");
/// ```
pub struct RecordWriter<W: Write> {
    writer: BufWriter<W>,
    count: usize,
}

impl<W: Write> RecordWriter<W> {
    pub fn new(writer: W) -> Self {
        RecordWriter {
            writer: BufWriter::new(writer),
            count: 0,
        }
    }

    /// Write a single row for `hit`.
    ///
    /// # Errors
    /// On IO errors writing the row.
    pub fn write(&mut self, hit: &HitRecord) -> Result<()> {
        writeln!(self.writer, "{hit}")?;
        self.count += 1;
        Ok(())
    }

    /// Write a row for each hit in `hits`.
    ///
    /// # Errors
    /// On the first IO error; rows before it have been written.
    pub fn write_all<'a, I>(&mut self, hits: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a HitRecord>,
    {
        for hit in hits {
            self.write(hit)?;
        }
        Ok(())
    }

    /// Number of rows written so far.
    #[must_use]
    pub fn count(&self) -> usize {
        self.count
    }

    /// Flush buffered rows and return the number of rows written.
    ///
    /// # Errors
    /// If the flush fails.
    pub fn finish(mut self) -> Result<usize> {
        self.writer.flush()?;
        Ok(self.count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hit::read_rows;

    fn hits() -> Vec<HitRecord> {
        vec![
            HitRecord::decode(&[0x04, 0x85, 0x4d, 0xc3, 0x2b], 0, 0, 5).unwrap(),
            HitRecord::decode(&[0x04, 0x23, 0x31, 0x02, 0x04], 0, 0, 5).unwrap(),
            HitRecord::decode(&[0xff, 0xbf, 0xff, 0x0f, 0xff], 7, 7, 5).unwrap(),
        ]
    }

    #[test]
    fn rows_in_order() {
        let mut buf = Vec::new();
        let mut writer = RecordWriter::new(&mut buf);
        writer.write_all(&hits()).unwrap();
        assert_eq!(writer.count(), 3);
        assert_eq!(writer.finish().unwrap(), 3);

        let text = String::from_utf8(buf).unwrap();
        let rows: Vec<&str> = text.lines().collect();
        assert_eq!(
            rows,
            vec![
                "0 0 0 4  5 1  77  3  43  811  4.0550",
                "0 0 0 4 35 0  49  2   4  516  2.5800",
                "7 7 31 7 63 1 255 15 255 4095 20.4750",
            ]
        );
        assert!(text.ends_with('\n'));
    }

    #[test]
    fn rows_parse_back() {
        let mut buf = Vec::new();
        let mut writer = RecordWriter::new(&mut buf);
        writer.write_all(&hits()).unwrap();
        writer.finish().unwrap();

        let parsed: Vec<HitRecord> = read_rows(&buf[..]).map(Result::unwrap).collect();
        assert_eq!(parsed.len(), 3);
        for (got, expected) in parsed.iter().zip(hits()) {
            assert_eq!(got.location, expected.location);
            assert_eq!(got.tot_total, expected.tot_total);
            assert!((got.tot_us - expected.tot_us).abs() < 1e-4);
        }
    }

    #[test]
    fn nothing_written() {
        let mut buf = Vec::new();
        let writer = RecordWriter::new(&mut buf);
        assert_eq!(writer.finish().unwrap(), 0);
        assert!(buf.is_empty());
    }
}

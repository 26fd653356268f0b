//! 📄 The Record Parser: bytes in, [`RawRow`]s out, one at a time.
//!
//! Wraps a `csv_async` reader over any tokio `AsyncRead`. The sequence is lazy,
//! finite and forward-only. Once the stream is done (cleanly or not) the parser
//! stays done; there is no rewind button. 🦆
//!
//! The reader runs in flexible mode: a row with the wrong number of
//! fields is a *validation* problem for the workers, not a stream problem.
//! Stream problems come back as [`ParseError`] and end the run: undecodable
//! bytes, I/O failures, and a quoted field that is still open when the input
//! runs out (see [`QuoteGuard`](quote_guard::QuoteGuard)).

use csv_async::{AsyncReader, AsyncReaderBuilder, StringRecord};
use thiserror::Error;
use tokio::io::AsyncRead;
use tracing::trace;

use crate::common::RawRow;

mod quote_guard;
pub use quote_guard::UnterminatedQuote;
use quote_guard::QuoteGuard;

/// 💀 The input could not be read past `row`. Fatal for the run.
#[derive(Debug, Error)]
#[error("could not read row {row} of the input: {source}")]
pub struct ParseError {
    /// 🔢 1-based data row the parser was trying to produce when things went sideways
    pub row: u64,
    #[source]
    pub source: csv_async::Error,
}

impl ParseError {
    /// 🔒 The open quote behind this failure, if that is what it was.
    pub fn unterminated_quote(&self) -> Option<UnterminatedQuote> {
        match self.source.kind() {
            csv_async::ErrorKind::Io(err) => err
                .get_ref()
                .and_then(|inner| inner.downcast_ref::<UnterminatedQuote>())
                .copied(),
            _ => None,
        }
    }
}

/// 🚰 A forward-only cursor over the rows of a delimited text stream.
pub struct RecordParser<R> {
    reader: AsyncReader<QuoteGuard<R>>,
    record: StringRecord,
    rows_read: u64,
    exhausted: bool,
}

impl<R> std::fmt::Debug for RecordParser<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordParser")
            .field("rows_read", &self.rows_read)
            .field("exhausted", &self.exhausted)
            .finish()
    }
}

impl<R> RecordParser<R>
where
    R: AsyncRead + Unpin + Send,
{
    /// 🏗️ Build a parser over `reader`. When `has_headers` is set the first
    /// line is swallowed exactly once and never shows up as a row.
    pub fn new(reader: R, has_headers: bool) -> Self {
        let reader = AsyncReaderBuilder::new()
            .has_headers(has_headers)
            .flexible(true)
            // 📦 1 MiB buffer, fewer syscalls, less allocator churn
            .buffer_capacity(1 << 20)
            .create_reader(QuoteGuard::new(reader));

        Self {
            reader,
            record: StringRecord::new(),
            rows_read: 0,
            exhausted: false,
        }
    }

    /// 📄 Produce the next row, `Ok(None)` at end of stream.
    ///
    /// After the first `Ok(None)` or `Err(..)` every later call returns
    /// `Ok(None)`. The stream was consumed; it is not coming back.
    pub async fn next_row(&mut self) -> Result<Option<RawRow>, ParseError> {
        if self.exhausted {
            return Ok(None);
        }

        let row_number = self.rows_read + 1;
        match self.reader.read_record(&mut self.record).await {
            Ok(true) => {
                self.rows_read = row_number;
                let fields = self.record.iter().map(str::to_owned).collect();
                Ok(Some(RawRow::new(row_number, fields)))
            }
            Ok(false) => {
                trace!(rows = self.rows_read, "🏁 parser reached end of stream");
                self.exhausted = true;
                Ok(None)
            }
            Err(source) => {
                self.exhausted = true;
                Err(ParseError {
                    row: row_number,
                    source,
                })
            }
        }
    }

    /// 🔢 Data rows produced so far.
    pub fn rows_read(&self) -> u64 {
        self.rows_read
    }

    /// 📏 Bytes consumed from the underlying stream so far. Feeds the progress bar.
    pub fn byte_position(&self) -> u64 {
        self.reader.position().byte()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn collect_rows(input: &'static [u8], has_headers: bool) -> Vec<RawRow> {
        let mut parser = RecordParser::new(input, has_headers);
        let mut rows = Vec::new();
        while let Some(row) = parser.next_row().await.expect("💀 test input should parse") {
            rows.push(row);
        }
        rows
    }

    #[tokio::test]
    async fn the_one_where_the_header_is_skipped_exactly_once() {
        let rows = collect_rows(b"id,name\n1,alpha\n2,beta\n", true).await;

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], RawRow::new(1, vec!["1".into(), "alpha".into()]));
        assert_eq!(rows[1].row_number, 2);
        assert_eq!(rows[1].fields, vec!["2", "beta"]);
    }

    #[tokio::test]
    async fn the_one_where_there_is_no_header_and_nobody_minds() {
        let rows = collect_rows(b"1,alpha\n2,beta\n", false).await;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].fields[1], "alpha");
    }

    #[tokio::test]
    async fn the_one_where_quoted_commas_stay_inside_their_field() {
        let rows = collect_rows(b"h1,h2,h3\n\"Galaxy, Tab\",\"say \"\"hi\"\"\",3\n", true).await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].fields, vec!["Galaxy, Tab", "say \"hi\"", "3"]);
    }

    #[tokio::test]
    async fn the_one_where_ragged_rows_are_not_the_parsers_problem() {
        // 🧪 flexible mode: a short row is still a row, the validator gets to judge it
        let rows = collect_rows(b"a,b,c\n1,2,3\n1,2\n1,2,3,4\n", true).await;
        let counts: Vec<usize> = rows.iter().map(RawRow::field_count).collect();
        assert_eq!(counts, vec![3, 2, 4]);
    }

    #[tokio::test]
    async fn the_one_where_empty_and_header_only_inputs_produce_nothing() {
        assert!(collect_rows(b"", true).await.is_empty());
        assert!(collect_rows(b"id,name,price\n", true).await.is_empty());
    }

    #[tokio::test]
    async fn the_one_where_garbage_bytes_end_the_stream() {
        let input: &'static [u8] = b"id,name\n1,ok\n2,\xff\xfe\n3,never\n";
        let mut parser = RecordParser::new(input, true);

        let first = parser.next_row().await.expect("first row is fine");
        assert!(first.is_some());

        let err = parser
            .next_row()
            .await
            .expect_err("💀 invalid UTF-8 should be a stream error");
        assert_eq!(err.row, 2);
        assert!(err.unterminated_quote().is_none());

        // 🔒 not restartable: after a failure the parser stays quiet
        assert!(parser.next_row().await.expect("fused").is_none());
        assert_eq!(parser.rows_read(), 1);
    }

    #[tokio::test]
    async fn the_one_where_the_byte_position_moves_forward() {
        let input: &'static [u8] = b"h\nabc\ndef\n";
        let mut parser = RecordParser::new(input, true);
        let before = parser.byte_position();
        parser.next_row().await.expect("row").expect("some row");
        assert!(parser.byte_position() > before);
    }

    #[tokio::test]
    async fn the_one_where_an_open_quote_mid_file_is_fatal_not_swallowed() {
        let input: &'static [u8] = b"id,name,price\n1,alpha,10\n2,\"beta,20\n3,gamma,30\n4,delta,40\n";
        let mut parser = RecordParser::new(input, true);

        let first = parser.next_row().await.expect("row 1 is fine").expect("some row");
        assert_eq!(first.fields, vec!["1", "alpha", "10"]);

        let err = parser
            .next_row()
            .await
            .expect_err("💀 rows 3 and 4 must not vanish into row 2");
        assert_eq!(err.row, 2);
        let open = err.unterminated_quote().expect("reported as an open quote");
        assert_eq!(open.line, 3);
        assert!(err.to_string().contains("never closed"), "{err}");
        assert!(parser.next_row().await.expect("fused").is_none());
    }

    #[tokio::test]
    async fn the_one_where_an_open_quote_on_the_last_price_is_fatal() {
        let input: &'static [u8] = b"id,name,price\n1,alpha,10\n2,beta,\"500";
        let mut parser = RecordParser::new(input, true);

        parser.next_row().await.expect("row 1 is fine").expect("some row");
        let err = parser.next_row().await.expect_err("💀 \"500 is not a price");
        assert_eq!(err.row, 2);
        assert!(err.unterminated_quote().is_some());
    }

    #[tokio::test]
    async fn the_one_where_quoted_newlines_are_still_welcome() {
        let rows = collect_rows(b"h1,h2\n\"two\nlines\",x\n", true).await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].fields, vec!["two\nlines", "x"]);
    }
}

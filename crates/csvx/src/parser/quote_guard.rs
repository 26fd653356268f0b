//! 🔒 QuoteGuard: an `AsyncRead` pass-through that watches the quoting.
//!
//! csv-async treats an opening quote that never closes as "the rest of the
//! file is one field" and reports nothing. This adapter follows the same
//! quoting rules over the raw bytes as they stream past. If the input ends
//! while a quoted field is still open, the final read fails with
//! [`UnterminatedQuote`] instead of a clean EOF, and the csv reader hands
//! that up as an I/O error on the row that opened the quote.
//!
//! Rules tracked, matching the reader's defaults:
//! - a `"` opens a quoted field only as the first byte of a field
//! - inside a quoted field `""` is a literal quote, a lone `"` closes it
//! - `,` ends a field, `\r` and `\n` end a record (outside quotes)

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use thiserror::Error;
use tokio::io::{AsyncRead, ReadBuf};

/// 💀 A quoted field was opened and the input ran out before it was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("quoted field opened on line {line} (byte {byte}) is never closed")]
pub struct UnterminatedQuote {
    /// 📍 1-based line of the input, header included
    pub line: u64,
    /// 📏 0-based byte offset of the opening quote
    pub byte: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexState {
    FieldStart,
    Unquoted,
    Quoted,
    QuoteInQuoted,
}

#[derive(Debug)]
pub(crate) struct QuoteGuard<R> {
    inner: R,
    state: LexState,
    bytes_seen: u64,
    line: u64,
    open_quote: Option<UnterminatedQuote>,
}

impl<R> QuoteGuard<R> {
    pub(crate) fn new(inner: R) -> Self {
        Self {
            inner,
            state: LexState::FieldStart,
            bytes_seen: 0,
            line: 1,
            open_quote: None,
        }
    }

    fn feed(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.state = match (self.state, b) {
                (LexState::FieldStart, b'"') => {
                    self.open_quote = Some(UnterminatedQuote {
                        line: self.line,
                        byte: self.bytes_seen,
                    });
                    LexState::Quoted
                }
                (LexState::Quoted, b'"') => LexState::QuoteInQuoted,
                (LexState::Quoted, _) => LexState::Quoted,
                // 🔁 `""` inside quotes is an escaped quote, still inside
                (LexState::QuoteInQuoted, b'"') => LexState::Quoted,
                (
                    LexState::FieldStart | LexState::Unquoted | LexState::QuoteInQuoted,
                    b',' | b'\r' | b'\n',
                ) => LexState::FieldStart,
                (_, _) => LexState::Unquoted,
            };
            if self.state != LexState::Quoted && self.state != LexState::QuoteInQuoted {
                self.open_quote = None;
            }
            if b == b'\n' {
                self.line += 1;
            }
            self.bytes_seen += 1;
        }
    }

    /// 🔍 The quote still open right now, if any.
    fn still_open(&self) -> Option<UnterminatedQuote> {
        match self.state {
            LexState::Quoted => self.open_quote,
            _ => None,
        }
    }
}

impl<R> AsyncRead for QuoteGuard<R>
where
    R: AsyncRead + Unpin,
{
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = &mut *self;
        let asked = buf.remaining() > 0;
        let before = buf.filled().len();
        ready!(Pin::new(&mut this.inner).poll_read(cx, buf))?;

        let fresh = &buf.filled()[before..];
        if fresh.is_empty() && asked {
            // 🏁 end of input: only a clean EOF if every quote got closed
            if let Some(open) = this.still_open() {
                return Poll::Ready(Err(io::Error::new(io::ErrorKind::InvalidData, open)));
            }
        }
        this.feed(fresh);
        Poll::Ready(Ok(()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    async fn drain(input: &'static [u8]) -> io::Result<Vec<u8>> {
        let mut guard = QuoteGuard::new(input);
        let mut out = Vec::new();
        guard.read_to_end(&mut out).await?;
        Ok(out)
    }

    fn open_quote_of(err: io::Error) -> UnterminatedQuote {
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        *err.get_ref()
            .and_then(|inner| inner.downcast_ref::<UnterminatedQuote>())
            .expect("💀 the io error should carry the open quote")
    }

    #[tokio::test]
    async fn the_one_where_balanced_quotes_pass_straight_through() {
        let input: &'static [u8] = b"a,\"b, c\",\"say \"\"hi\"\"\"\n\"multi\nline\",x\n";
        assert_eq!(drain(input).await.expect("well formed"), input);
    }

    #[tokio::test]
    async fn the_one_where_a_quote_mid_field_is_just_a_character() {
        // 🧪 only a quote at the start of a field opens quoting
        let input: &'static [u8] = b"5\" screen,ok\n";
        assert_eq!(drain(input).await.expect("literal quote"), input);
    }

    #[tokio::test]
    async fn the_one_where_a_quote_left_open_swallows_the_rest_and_gets_caught() {
        let err = drain(b"h1,h2\n1,ok\n2,\"oops\n3,fine\n4,fine\n")
            .await
            .expect_err("open quote at EOF");
        assert_eq!(open_quote_of(err), UnterminatedQuote { line: 3, byte: 13 });
    }

    #[tokio::test]
    async fn the_one_where_the_last_field_never_closes() {
        let err = drain(b"h\n\"500").await.expect_err("open quote at EOF");
        assert_eq!(open_quote_of(err).line, 2);
    }

    #[tokio::test]
    async fn the_one_where_a_closing_quote_right_before_eof_is_fine() {
        drain(b"h\n\"500\"").await.expect("closed just in time");
    }
}

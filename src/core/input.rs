/*!
 * Input source: CIDs from arguments or line-delimited stdin.
 *
 * The choice is made once at startup. Arguments win; stdin is only opened
 * when no arguments were given. Lines are pulled from the reader on demand,
 * so nothing written before the pipeline starts polling is lost and nothing
 * is buffered beyond the reader's own buffer.
 *
 * Line bytes are decoded lossily: a line that is not UTF-8 still comes
 * through (with replacement characters) and fails later as a parse error.
 * Only a read error ends the stream.
 */

use futures::stream::{self, BoxStream, StreamExt};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Stdin};
use tracing::{debug, warn};

/// Where identifiers come from
#[derive(Debug)]
pub enum InputSource<R> {
    /// Explicit identifiers from the command line
    Args(Vec<String>),

    /// Newline-delimited identifiers from a reader
    Lines(R),
}

impl InputSource<BufReader<Stdin>> {
    /// Args if any were given, otherwise stdin
    pub fn from_args_or_stdin(args: Vec<String>) -> Self {
        Self::select(args, || BufReader::new(tokio::io::stdin()))
    }
}

impl<R> InputSource<R>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    /// Args if any were given, otherwise the reader built by `open`.
    ///
    /// `open` is not called when args are present.
    pub fn select(args: Vec<String>, open: impl FnOnce() -> R) -> Self {
        if args.is_empty() {
            debug!("no identifiers on the command line, reading stdin");
            InputSource::Lines(open())
        } else {
            InputSource::Args(args)
        }
    }

    /// Lazy stream of raw identifier strings, in arrival order
    pub fn into_stream(self) -> BoxStream<'static, String> {
        match self {
            InputSource::Args(args) => stream::iter(args).boxed(),
            InputSource::Lines(reader) => {
                stream::unfold(reader.split(b'\n'), |mut segments| async move {
                    match segments.next_segment().await {
                        Ok(Some(mut bytes)) => {
                            if bytes.last() == Some(&b'\r') {
                                bytes.pop();
                            }
                            Some((String::from_utf8_lossy(&bytes).into_owned(), segments))
                        }
                        Ok(None) => None,
                        Err(e) => {
                            warn!(error = %e, "stopped reading input");
                            None
                        }
                    }
                })
                .boxed()
            }
        }
    }
}

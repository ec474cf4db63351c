use tokio::io::{AsyncRead, AsyncReadExt};

use crate::engine::{ResumableDecompressor, Status};
use crate::error::CodecError;

/// Default size of each read from the underlying reader.
pub const DEFAULT_READ_SIZE: usize = 4096;

/// Default size of each decoded chunk handed to the caller.
pub const DEFAULT_CHUNK_SIZE: usize = 2048;

/// Async adapter that pulls a compressed stream from an [`AsyncRead`] and
/// yields decoded chunks through a [`ResumableDecompressor`].
///
/// At most one read buffer and one output chunk are held in memory, so
/// the stream can be far larger than either.
///
/// ```rust,no_run
/// use bop_codec::StreamingDecompressor;
///
/// async fn inflate(reader: impl tokio::io::AsyncRead + Unpin) -> Result<usize, bop_codec::CodecError> {
///   let mut stream = StreamingDecompressor::new(reader);
///   let mut total = 0;
///   while let Some(chunk) = stream.next().await {
///     total += chunk?.len();
///   }
///   Ok(total)
/// }
/// ```
pub struct StreamingDecompressor<R> {
  reader: R,
  engine: ResumableDecompressor,
  state: StreamState,
  /// Bytes read but not yet consumed by the engine.
  pending: Vec<u8>,
  read_buf: Vec<u8>,
  chunk_size: usize,
  eof: bool,
}

/// ```text
///   Running → Finished
///      └────→ Failed
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum StreamState {
  Running,
  Finished,
  Failed,
}

impl<R: AsyncRead + Unpin> StreamingDecompressor<R> {
  #[must_use]
  pub fn new(reader: R) -> Self {
    Self::with_sizes(reader, DEFAULT_READ_SIZE, DEFAULT_CHUNK_SIZE)
  }

  /// Use custom read and output chunk sizes. Zero sizes are raised to one.
  #[must_use]
  pub fn with_sizes(reader: R, read_size: usize, chunk_size: usize) -> Self {
    Self {
      reader,
      engine: ResumableDecompressor::new(),
      state: StreamState::Running,
      pending: Vec::new(),
      read_buf: vec![0; read_size.max(1)],
      chunk_size: chunk_size.max(1),
      eof: false,
    }
  }

  /// The engine, for coverage info once the stream has finished.
  pub fn engine(&self) -> &ResumableDecompressor {
    &self.engine
  }

  /// Next decoded chunk, `None` once the stream is finished or failed.
  ///
  /// Bytes after the end of the compressed stream are left unread.
  pub async fn next(&mut self) -> Option<Result<Vec<u8>, CodecError>> {
    if self.state != StreamState::Running {
      return None;
    }
    match self.next_chunk().await {
      Ok(chunk) => Some(Ok(chunk)),
      Err(e) => {
        self.state = StreamState::Failed;
        Some(Err(e))
      }
    }
  }

  /// Drain the stream into one buffer.
  ///
  /// # Errors
  ///
  /// Returns the first error from the reader or the engine.
  pub async fn read_to_end(mut self) -> Result<Vec<u8>, CodecError> {
    let mut out = Vec::new();
    while let Some(chunk) = self.next().await {
      out.extend_from_slice(&chunk?);
    }
    Ok(out)
  }

  async fn fill(&mut self) -> Result<(), CodecError> {
    let n = self.reader.read(&mut self.read_buf).await?;
    if n == 0 {
      self.eof = true;
    } else {
      self.pending.extend_from_slice(&self.read_buf[..n]);
    }
    Ok(())
  }

  async fn next_chunk(&mut self) -> Result<Vec<u8>, CodecError> {
    let mut chunk = vec![0u8; self.chunk_size];
    loop {
      if self.pending.is_empty() && !self.eof {
        self.fill().await?;
      }
      let progress = self.engine.process(&self.pending, &mut chunk)?;
      self.pending.drain(..progress.consumed);
      match progress.status {
        Status::Done => {
          self.state = StreamState::Finished;
          chunk.truncate(progress.written);
          return Ok(chunk);
        }
        Status::Good => {
          chunk.truncate(progress.written);
          return Ok(chunk);
        }
        Status::NeedInput => {
          if progress.written > 0 {
            chunk.truncate(progress.written);
            return Ok(chunk);
          }
          if self.eof {
            return Err(CodecError::UnexpectedEndOfStream);
          }
        }
      }
    }
  }
}

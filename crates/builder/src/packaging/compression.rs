//! Gzip compression for apk sections
//!
//! Control and signature sections are tiny and go through a plain
//! [`GzBuilder`]. The data section can be large and is compressed by
//! [`ParallelGzEncoder`], which deflates fixed-size blocks on a private
//! rayon pool and stitches them into a single gzip member.

use apkforge_config::GzipConcurrency;
use apkforge_errors::{BuildError, Error};
use flate2::{Compress, Compression, Crc, FlushCompress, GzBuilder, Status};
use rayon::prelude::*;
use std::io::{self, Write};

/// Gzip header: magic, deflate, no flags, mtime 0, no extra flags, unknown OS
const GZIP_HEADER: [u8; 10] = [0x1f, 0x8b, 0x08, 0x00, 0, 0, 0, 0, 0x00, 0xff];

/// Gzip a small in-memory buffer with a reproducible header
///
/// # Errors
///
/// Returns an error if compression fails.
pub fn gzip_bytes(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut encoder = GzBuilder::new()
        .mtime(0)
        .operating_system(0xff)
        .write(Vec::with_capacity(data.len() / 2 + 64), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

/// Block-parallel gzip writer
///
/// Input is cut into blocks of exactly `block_size` bytes. Every block is
/// raw-deflated by a fresh compressor; all but the last end with a sync
/// flush so the pieces concatenate into one valid deflate stream. Block
/// boundaries depend only on the input, so the output is the same for any
/// thread count.
///
/// The last full block is always held back until [`finish`](Self::finish)
/// because only then is it known whether it ends the stream.
pub struct ParallelGzEncoder<W: Write> {
    inner: W,
    pool: rayon::ThreadPool,
    level: Compression,
    threads: usize,
    block_size: usize,
    pending: Vec<Vec<u8>>,
    current: Vec<u8>,
    crc: Crc,
    header_written: bool,
}

impl<W: Write> ParallelGzEncoder<W> {
    /// Create an encoder writing to `inner`
    ///
    /// # Errors
    ///
    /// Returns `BuildError::Compression` if the worker pool cannot be started.
    pub fn new(inner: W, concurrency: GzipConcurrency) -> Result<Self, Error> {
        Self::with_level(inner, concurrency, Compression::default())
    }

    /// Create an encoder with an explicit compression level
    ///
    /// # Errors
    ///
    /// Returns `BuildError::Compression` if the worker pool cannot be started.
    pub fn with_level(
        inner: W,
        concurrency: GzipConcurrency,
        level: Compression,
    ) -> Result<Self, Error> {
        let threads = concurrency.threads.max(1);
        let block_size = concurrency.block_size.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("apk-gzip-{i}"))
            .build()
            .map_err(|e| BuildError::Compression {
                message: format!("unable to start compressor pool: {e}"),
            })?;

        Ok(Self {
            inner,
            pool,
            level,
            threads,
            block_size,
            pending: Vec::with_capacity(threads + 1),
            current: Vec::with_capacity(block_size),
            crc: Crc::new(),
            header_written: false,
        })
    }

    fn write_header(&mut self) -> io::Result<()> {
        if !self.header_written {
            self.inner.write_all(&GZIP_HEADER)?;
            self.header_written = true;
        }
        Ok(())
    }

    /// Compress every pending block except the last one
    fn drain_pending(&mut self) -> io::Result<()> {
        let keep = self.pending.split_off(self.pending.len() - 1);
        let blocks = std::mem::replace(&mut self.pending, keep);
        let level = self.level;

        let compressed = self.pool.install(|| {
            blocks
                .par_iter()
                .map(|block| deflate_block(block, level, false))
                .collect::<io::Result<Vec<_>>>()
        })?;

        self.write_header()?;
        for chunk in compressed {
            self.inner.write_all(&chunk)?;
        }
        Ok(())
    }

    /// Flush every remaining block, write the trailer and return the writer
    ///
    /// # Errors
    ///
    /// Returns an error if compression or writing fails.
    pub fn finish(mut self) -> io::Result<W> {
        let mut blocks = std::mem::take(&mut self.pending);
        if !self.current.is_empty() || blocks.is_empty() {
            blocks.push(std::mem::take(&mut self.current));
        }

        let last = blocks.len() - 1;
        let level = self.level;
        let compressed = self.pool.install(|| {
            blocks
                .par_iter()
                .enumerate()
                .map(|(i, block)| deflate_block(block, level, i == last))
                .collect::<io::Result<Vec<_>>>()
        })?;

        self.write_header()?;
        for chunk in compressed {
            self.inner.write_all(&chunk)?;
        }
        self.inner.write_all(&self.crc.sum().to_le_bytes())?;
        self.inner.write_all(&self.crc.amount().to_le_bytes())?;
        self.inner.flush()?;
        Ok(self.inner)
    }
}

impl<W: Write> Write for ParallelGzEncoder<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.crc.update(buf);

        let mut rest = buf;
        while !rest.is_empty() {
            let room = self.block_size - self.current.len();
            let take = room.min(rest.len());
            self.current.extend_from_slice(&rest[..take]);
            rest = &rest[take..];

            if self.current.len() == self.block_size {
                let full = std::mem::replace(&mut self.current, Vec::with_capacity(self.block_size));
                self.pending.push(full);
                if self.pending.len() > self.threads {
                    self.drain_pending()?;
                }
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Raw-deflate one block with a fresh compressor
fn deflate_block(data: &[u8], level: Compression, last: bool) -> io::Result<Vec<u8>> {
    let mut compress = Compress::new(level, false);
    let flush = if last {
        FlushCompress::Finish
    } else {
        FlushCompress::Sync
    };
    let mut out = Vec::with_capacity(data.len() / 2 + 1024);

    loop {
        let consumed = usize::try_from(compress.total_in()).map_err(io::Error::other)?;
        let status = compress
            .compress_vec(&data[consumed..], &mut out, flush)
            .map_err(io::Error::other)?;

        let all_in = usize::try_from(compress.total_in()).map_err(io::Error::other)? == data.len();
        let done = match status {
            Status::StreamEnd => true,
            Status::Ok | Status::BufError => !last && all_in && out.len() < out.capacity(),
        };
        if done {
            return Ok(out);
        }
        out.reserve(out.capacity().max(4096));
    }
}

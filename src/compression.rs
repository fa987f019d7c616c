//! Zlib stream codec for on-disk object bytes.
//!
//! Both directions work in fixed-size chunks and keep all encoder/decoder
//! state local to the call, so concurrent callers never share buffers.

use std::io::Write;

use flate2::{write::ZlibEncoder, Compression, Decompress, FlushDecompress, Status};
use tracing::trace;

use crate::error::{Error, Result};

pub const CHUNK_SIZE: usize = 1024;

pub fn compress(payload: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());

    for chunk in payload.chunks(CHUNK_SIZE) {
        encoder
            .write_all(chunk)
            .map_err(|e| Error::Codec(format!("deflate failed: {e}")))?;
    }

    let compressed = encoder
        .finish()
        .map_err(|e| Error::Codec(format!("deflate failed to finish: {e}")))?;

    trace!(
        input = payload.len(),
        output = compressed.len(),
        "compressed payload"
    );
    Ok(compressed)
}

pub fn decompress(compressed: &[u8]) -> Result<Vec<u8>> {
    let mut inflater = Decompress::new(true);
    let mut payload = Vec::new();
    let mut buf = [0u8; CHUNK_SIZE];

    loop {
        let consumed = inflater.total_in() as usize;
        let produced_before = inflater.total_out();

        let status = inflater
            .decompress(&compressed[consumed..], &mut buf, FlushDecompress::None)
            .map_err(|e| Error::Codec(format!("corrupt deflate stream: {e}")))?;

        let produced = (inflater.total_out() - produced_before) as usize;
        payload.extend_from_slice(&buf[..produced]);

        match status {
            Status::StreamEnd => break,
            Status::Ok | Status::BufError => {
                if produced == 0 && inflater.total_in() as usize == consumed {
                    return Err(Error::Codec(format!(
                        "deflate stream ended prematurely after {} of {} bytes",
                        consumed,
                        compressed.len()
                    )));
                }
            }
        }
    }

    trace!(
        input = compressed.len(),
        output = payload.len(),
        "decompressed payload"
    );
    Ok(payload)
}

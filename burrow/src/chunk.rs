//! Chunked, acknowledged delivery of oversized payloads.
//!
//! The channel moves at most a label's worth of data per query, so one
//! logical send becomes a train of per-chunk queries. Each chunk must come
//! back `ACK`ed before the next leaves; anything else aborts the train.

use std::time::Duration;

use tracing::{debug, warn};

use crate::{
    encoding,
    transport::{LookupClient, ACK},
    BurrowError, Result,
};

/// Pause between consecutive chunk queries.
pub const CHUNK_DELAY: Duration = Duration::from_millis(500);

pub struct ChunkSender<'a> {
    client: &'a LookupClient,
    chunk_size: usize,
}

impl<'a> ChunkSender<'a> {
    /// `chunk_size` is raw bytes per chunk, before text encoding.
    pub fn new(client: &'a LookupClient, chunk_size: usize) -> Self {
        ChunkSender {
            client,
            chunk_size: chunk_size.max(1),
        }
    }

    /// Delivers `payload`, one encoded chunk per query.
    ///
    /// `name_for` maps a chunk index and its encoded form to the query name
    /// carrying it. Returns only once every chunk in order was acknowledged;
    /// a missing or non-`ACK` answer aborts the whole send, with no resend
    /// from offset.
    pub async fn send<F>(&self, payload: &[u8], mut name_for: F) -> Result<()>
    where
        F: FnMut(usize, &str) -> String,
    {
        let total = payload.len().div_ceil(self.chunk_size);
        debug!(total, len = payload.len(), "sending chunked payload");

        for (index, raw) in payload.chunks(self.chunk_size).enumerate() {
            let encoded = encoding::encode(raw);
            let name = name_for(index, &encoded);
            debug!(index, total, %name, "sending chunk");

            match self.client.lookup(&name).await {
                Ok(answer) if answer == ACK => {}
                Ok(answer) => {
                    warn!(index, %answer, "chunk rejected");
                    return Err(BurrowError::ChunkNotAcknowledged { index });
                }
                Err(_) => {
                    warn!(index, "chunk went unanswered");
                    return Err(BurrowError::ChunkNotAcknowledged { index });
                }
            }

            if index + 1 < total {
                tokio::time::sleep(CHUNK_DELAY).await;
            }
        }

        Ok(())
    }
}

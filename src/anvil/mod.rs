use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use flume::{Receiver, RecvTimeoutError, Sender};
use valence_nbt::Compound;

pub use error::ParseChunkError;
pub use packed::{PackedArray, PackingMode};
pub use palette::{BlockState, Paletted};
pub use parsing::{decode_chunk, section_slot, Chunk, ChunkDecoder, ColumnBiomes, Schema};
pub use section::{decode_section, DecodeContext, Section};

use crate::config::{BatchConfig, DecodeConfig};
use crate::legacy::LegacyTables;

mod error;
pub mod packed;
pub mod palette;
mod parsing;
pub mod section;

/// Chunk coordinates, in chunks rather than blocks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChunkPos {
    pub x: i32,
    pub z: i32,
}

impl ChunkPos {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }
}

impl fmt::Display for ChunkPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}

type WorkerResult = Result<Chunk, ParseChunkError>;

type DecodeFn = fn(&ChunkDecoder<'_>, &Compound) -> WorkerResult;

struct Job {
    id: usize,
    root: Compound,
}

enum Response {
    Started(usize, Instant),
    Decoded(usize, WorkerResult),
}

struct DecodeWorkerState {
    tables: Arc<LegacyTables>,
    config: DecodeConfig,
    decode: DecodeFn,
    /// Sender of finished chunks.
    sender: Sender<Response>,
    /// Receiver of pending chunks.
    receiver: Receiver<Job>,
}

/// Decodes many chunks on a pool of worker threads.
///
/// One failing chunk never affects the others: every input gets its own
/// result, in input order.
#[derive(Debug, Clone)]
pub struct BatchDecoder {
    tables: Arc<LegacyTables>,
    config: BatchConfig,
}

impl BatchDecoder {
    pub fn new(tables: Arc<LegacyTables>, config: BatchConfig) -> Self {
        Self { tables, config }
    }

    /// A batch decoder sharing the process-wide vanilla id tables.
    pub fn vanilla(config: BatchConfig) -> Self {
        Self::new(LegacyTables::shared_vanilla(), config)
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    pub fn decode_all<I>(&self, chunks: I) -> Vec<(ChunkPos, WorkerResult)>
    where
        I: IntoIterator<Item = (ChunkPos, Compound)>,
    {
        self.run(chunks, |decoder, root| decoder.decode(root))
    }

    fn run<I>(&self, chunks: I, decode: DecodeFn) -> Vec<(ChunkPos, WorkerResult)>
    where
        I: IntoIterator<Item = (ChunkPos, Compound)>,
    {
        let (job_sender, job_receiver) = flume::unbounded();
        let (done_sender, done_receiver) = flume::unbounded();

        let mut positions = Vec::new();
        for (id, (pos, root)) in chunks.into_iter().enumerate() {
            positions.push(pos);
            let _ = job_sender.send(Job { id, root });
        }
        // Workers stop once the queue is drained and this sender is gone.
        drop(job_sender);

        let total = positions.len();
        if total == 0 {
            return Vec::new();
        }

        let workers = self.config.workers.get().min(total);
        for n in 0..workers {
            let state = DecodeWorkerState {
                tables: self.tables.clone(),
                config: self.config.decode.clone(),
                decode,
                sender: done_sender.clone(),
                receiver: job_receiver.clone(),
            };
            let spawned = thread::Builder::new()
                .name(format!("chunk-decoder-{n}"))
                .spawn(move || decode_worker(state));
            if let Err(err) = spawned {
                tracing::warn!(%err, "Failed to spawn chunk decoder thread");
            }
        }
        drop(done_sender);
        drop(job_receiver);

        let mut results: Vec<Option<WorkerResult>> = (0..total).map(|_| None).collect();
        let mut started: HashMap<usize, Instant> = HashMap::new();
        let mut remaining = total;

        while remaining > 0 {
            let next_deadline = self
                .config
                .chunk_timeout
                .and_then(|timeout| started.values().min().map(|&at| at + timeout));

            let response = match next_deadline {
                Some(deadline) => match done_receiver.recv_deadline(deadline) {
                    Ok(response) => response,
                    Err(RecvTimeoutError::Timeout) => {
                        let timeout = self.config.chunk_timeout.unwrap_or_default();
                        for id in expired(&started, timeout, Instant::now()) {
                            started.remove(&id);
                            tracing::warn!(pos = %positions[id], "chunk decode timed out");
                            results[id] = Some(Err(ParseChunkError::TimedOut(timeout)));
                            remaining -= 1;
                        }
                        continue;
                    }
                    Err(RecvTimeoutError::Disconnected) => break,
                },
                None => match done_receiver.recv() {
                    Ok(response) => response,
                    Err(_) => break,
                },
            };

            match response {
                Response::Started(id, at) => {
                    if results[id].is_none() {
                        started.insert(id, at);
                    }
                }
                Response::Decoded(id, res) => {
                    started.remove(&id);
                    // Late answers for chunks that already timed out are dropped.
                    if results[id].is_some() {
                        continue;
                    }
                    if let Err(err) = &res {
                        tracing::warn!(pos = %positions[id], "failed to decode chunk: {err}");
                    }
                    results[id] = Some(res);
                    remaining -= 1;
                }
            }
        }

        let failed = results
            .iter()
            .filter(|r| !matches!(r, Some(Ok(_))))
            .count();
        tracing::info!("Decoded {} of {total} chunks.", total - failed);

        positions
            .into_iter()
            .zip(results)
            .map(|(pos, res)| (pos, res.unwrap_or(Err(ParseChunkError::WorkerDisconnected))))
            .collect()
    }
}

/// Jobs that have been running for at least `timeout` at `now`.
fn expired(started: &HashMap<usize, Instant>, timeout: Duration, now: Instant) -> Vec<usize> {
    let mut ids: Vec<usize> = started
        .iter()
        .filter(|&(_, &at)| now.saturating_duration_since(at) >= timeout)
        .map(|(&id, _)| id)
        .collect();
    ids.sort_unstable();
    ids
}

fn decode_worker(state: DecodeWorkerState) {
    let decoder = ChunkDecoder::new(&state.tables, state.config.clone());

    while let Ok(Job { id, root }) = state.receiver.recv() {
        if state.sender.send(Response::Started(id, Instant::now())).is_err() {
            break;
        }
        let res = (state.decode)(&decoder, &root);
        let _ = state.sender.send(Response::Decoded(id, res));
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;

    use assert_matches::assert_matches;
    use valence_nbt::{compound, List};

    use super::*;

    fn sleep_if_marked(decoder: &ChunkDecoder<'_>, root: &Compound) -> WorkerResult {
        if root.get("slow").is_some() {
            thread::sleep(Duration::from_millis(500));
        }
        decoder.decode(root)
    }

    fn empty_chunk(x: i32) -> (ChunkPos, Compound) {
        (
            ChunkPos::new(x, 0),
            compound! { "xPos" => x, "zPos" => 0, "sections" => List::End },
        )
    }

    #[test]
    fn slow_chunk_times_out_alone() {
        let timeout = Duration::from_millis(100);
        let config = BatchConfig {
            workers: NonZeroUsize::MIN,
            chunk_timeout: Some(timeout),
            decode: DecodeConfig::default(),
        };

        let mut slow = empty_chunk(0);
        slow.1.insert("slow", 1_i8);
        let chunks = vec![slow, empty_chunk(1), empty_chunk(2)];

        // One worker: the slow chunk's late answer arrives before the other
        // two are even started, and must not replace the timeout.
        let results = BatchDecoder::vanilla(config).run(chunks, sleep_if_marked);

        assert_eq!(results.len(), 3);
        assert_matches!(results[0].1, Err(ParseChunkError::TimedOut(t)) if t == timeout);
        assert_eq!(results[1].1.as_ref().map(Chunk::pos), Ok(ChunkPos::new(1, 0)));
        assert_eq!(results[2].1.as_ref().map(Chunk::pos), Ok(ChunkPos::new(2, 0)));
    }

    #[test]
    fn vanilla_batches_share_tables() {
        let a = BatchDecoder::vanilla(BatchConfig::default());
        let b = BatchDecoder::vanilla(BatchConfig::default());
        assert!(Arc::ptr_eq(&a.tables, &b.tables));
    }

    #[test]
    fn expired_picks_jobs_past_the_timeout() {
        let now = Instant::now();
        let timeout = Duration::from_millis(50);
        let mut started: HashMap<usize, Instant> = HashMap::new();
        started.insert(3, now - Duration::from_millis(80));
        started.insert(1, now - Duration::from_millis(50));
        started.insert(2, now - Duration::from_millis(10));

        assert_eq!(expired(&started, timeout, now), vec![1, 3]);
        assert!(expired(&HashMap::new(), timeout, now).is_empty());
    }

    #[test]
    fn chunk_pos_display() {
        assert_eq!(ChunkPos::new(-3, 7).to_string(), "(-3, 7)");
    }
}

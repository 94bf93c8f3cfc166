//! Dedicated terrain-edit thread.
//!
//! Stamps from any number of threads funnel through one bounded crossbeam
//! channel into a single thread that owns the deformer, so overlapping
//! footprints are applied one after another. A full channel drops the stamp,
//! matching the rate limiter's drop-don't-queue policy.

use std::thread::JoinHandle;

use crossbeam::channel::{bounded, Receiver, Sender, TrySendError};

use crate::crater::CraterRequest;
use crate::deformer::TerrainDeformer;
use crate::grid_source::HeightGridSource;

/// Default channel capacity for crater commands.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Work item for the edit thread
pub enum EditCommand {
    Stamp(CraterRequest),
    /// Restore the baseline, then acknowledge on the given channel.
    Reset(Sender<()>),
    Flush,
    Shutdown,
}

/// Cloneable handle collaborators use to request craters.
#[derive(Clone)]
pub struct CraterSender {
    command_tx: Sender<EditCommand>,
}

impl CraterSender {
    /// Queue a crater without blocking. Returns `false` if the stamp was
    /// dropped (channel full or worker gone).
    pub fn submit(&self, request: CraterRequest) -> bool {
        match self.command_tx.try_send(EditCommand::Stamp(request)) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                log::trace!("edit queue full, crater dropped");
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }
}

pub struct TerrainEditWorker<S: HeightGridSource + Send + 'static> {
    command_tx: Sender<EditCommand>,
    handle: Option<JoinHandle<TerrainDeformer<S>>>,
}

impl<S: HeightGridSource + Send + 'static> TerrainEditWorker<S> {
    pub fn spawn(deformer: TerrainDeformer<S>, channel_capacity: usize) -> std::io::Result<Self> {
        let (command_tx, command_rx) = bounded(channel_capacity.max(1));
        let handle = std::thread::Builder::new()
            .name("terrain-edit".into())
            .spawn(move || run_edits(deformer, command_rx))?;

        Ok(Self {
            command_tx,
            handle: Some(handle),
        })
    }

    pub fn sender(&self) -> CraterSender {
        CraterSender {
            command_tx: self.command_tx.clone(),
        }
    }

    /// Restore the baseline after everything queued so far. Blocks until the
    /// edit thread confirms; `false` if it is gone.
    pub fn reset_terrain(&self) -> bool {
        let (ack_tx, ack_rx) = bounded(1);
        if self.command_tx.send(EditCommand::Reset(ack_tx)).is_err() {
            return false;
        }
        ack_rx.recv().is_ok()
    }

    /// Push any coalesced sync once queued stamps are applied. `false` if
    /// the edit thread is gone.
    pub fn flush(&self) -> bool {
        self.command_tx.send(EditCommand::Flush).is_ok()
    }

    /// Stop the thread after it drains queued work and hand the deformer back.
    pub fn shutdown(mut self) -> Option<TerrainDeformer<S>> {
        self.stop()
    }

    fn stop(&mut self) -> Option<TerrainDeformer<S>> {
        let handle = self.handle.take()?;
        let _ = self.command_tx.send(EditCommand::Shutdown);
        match handle.join() {
            Ok(deformer) => Some(deformer),
            Err(_) => {
                log::warn!("terrain edit thread panicked");
                None
            }
        }
    }
}

impl<S: HeightGridSource + Send + 'static> Drop for TerrainEditWorker<S> {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_edits<S: HeightGridSource>(
    mut deformer: TerrainDeformer<S>,
    command_rx: Receiver<EditCommand>,
) -> TerrainDeformer<S> {
    for command in command_rx.iter() {
        match command {
            EditCommand::Stamp(request) => deformer.apply_crater(request),
            EditCommand::Reset(ack) => {
                deformer.reset_terrain();
                let _ = ack.send(());
            }
            EditCommand::Flush => deformer.flush_pending_sync(),
            EditCommand::Shutdown => break,
        }
    }
    deformer
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DeformerConfig;
    use crate::grid_source::InMemoryTerrain;

    fn terrain() -> InMemoryTerrain {
        InMemoryTerrain::flat([0.0; 3], [64.0, 16.0, 64.0], 65, 65, 0.6)
    }

    fn requests() -> Vec<CraterRequest> {
        (0..12)
            .map(|i| {
                CraterRequest::at([20.0 + i as f32 * 2.0, 0.0, 30.0 + (i % 3) as f32])
                    .with_radius(5.0)
                    .with_depth(1.5)
            })
            .collect()
    }

    #[test]
    fn test_worker_matches_direct_stamping() {
        let config = DeformerConfig::default();

        let mut direct = TerrainDeformer::new(terrain(), &config).unwrap();
        for request in requests() {
            direct.apply_crater(request);
        }

        let worker =
            TerrainEditWorker::spawn(TerrainDeformer::new(terrain(), &config).unwrap(), 64)
                .unwrap();
        let sender = worker.sender();
        for request in requests() {
            assert!(sender.submit(request));
        }
        let threaded = worker.shutdown().unwrap();

        assert_eq!(threaded.source().heights(), direct.source().heights());
        assert_eq!(threaded.stats().accepted, 12);
    }

    #[test]
    fn test_stamps_from_many_threads_are_all_applied() {
        let deformer = TerrainDeformer::new(terrain(), &DeformerConfig::precise()).unwrap();
        let worker = TerrainEditWorker::spawn(deformer, DEFAULT_CHANNEL_CAPACITY).unwrap();

        let threads: Vec<_> = (0..4)
            .map(|t| {
                let sender = worker.sender();
                std::thread::spawn(move || {
                    (0..10)
                        .filter(|i| {
                            sender.submit(CraterRequest::at([
                                8.0 + *i as f32 * 5.0,
                                0.0,
                                8.0 + t as f32 * 12.0,
                            ]))
                        })
                        .count()
                })
            })
            .collect();
        let submitted: usize = threads.into_iter().map(|h| h.join().unwrap()).sum();

        let deformer = worker.shutdown().unwrap();
        assert_eq!(submitted, 40);
        assert_eq!(deformer.stats().accepted, 40);
        assert_eq!(deformer.source().sync_count(), 40);
    }

    #[test]
    fn test_reset_through_worker_waits_for_queued_stamps() {
        let deformer = TerrainDeformer::new(terrain(), &DeformerConfig::default()).unwrap();
        let original = deformer.source().heights().clone();
        let worker = TerrainEditWorker::spawn(deformer, 64).unwrap();

        for request in requests() {
            worker.sender().submit(request);
        }
        assert!(worker.reset_terrain());
        assert!(worker.flush());

        let deformer = worker.shutdown().unwrap();
        assert_eq!(deformer.source().heights(), &original);
    }

    #[test]
    fn test_submit_after_shutdown_is_dropped() {
        let deformer = TerrainDeformer::new(terrain(), &DeformerConfig::default()).unwrap();
        let worker = TerrainEditWorker::spawn(deformer, 8).unwrap();
        let sender = worker.sender();
        assert!(worker.shutdown().is_some());
        assert!(!sender.submit(CraterRequest::at([1.0, 0.0, 1.0])));
    }

    #[test]
    fn test_flush_reports_stopped_worker() {
        let deformer = TerrainDeformer::new(terrain(), &DeformerConfig::default()).unwrap();
        let mut worker = TerrainEditWorker::spawn(deformer, 8).unwrap();
        assert!(worker.flush());

        assert!(worker.stop().is_some());
        assert!(!worker.flush());
        assert!(!worker.reset_terrain());
    }
}

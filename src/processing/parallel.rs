// src/processing/parallel.rs
use std::{
    sync::atomic::{AtomicBool, Ordering},
    thread,
    time::Instant,
};

use flume::{Receiver, Sender};
use log::{info, warn};
use parking_lot::Mutex;

use crate::catalog::SceneEntry;
use crate::error::{Error, Result};
use crate::io::{read_scene, GeoInfo};
use crate::processing::indices::SpectralIndices;
use crate::processing::mask::CloudMasker;
use crate::scene::{BandMap, Scene};
use crate::utils::gdal_ext::TypedBuffer;

/// Everything a worker needs to turn a catalog entry into index bands
pub struct SceneStages<'a> {
    pub bands: &'a BandMap,
    pub grid: &'a GeoInfo,
    pub masker: &'a CloudMasker,
    pub indices: &'a SpectralIndices,
    /// Bands kept once the indices are attached
    pub keep: &'a [&'a str],
}

impl SceneStages<'_> {
    /// read -> mask -> index -> select
    pub fn run(&self, entry: &SceneEntry) -> Result<Scene> {
        let scene = read_scene(entry, self.bands, self.grid)?;
        let scene = self.masker.apply(scene)?;
        let scene = self.indices.apply(scene)?;
        scene.select(self.keep)
    }
}

/// A scene left out of the composite, and why
#[derive(Debug, Clone)]
pub struct SkippedScene {
    pub id: String,
    pub reason: String,
}

#[derive(Debug)]
pub struct ProcessReport {
    /// Processed scenes in catalog (acquisition) order
    pub scenes: Vec<Scene>,
    pub skipped: Vec<SkippedScene>,
}

struct SceneRequest<'a> {
    position: usize,
    entry: &'a SceneEntry,
}

pub struct ParallelProcessor {
    io_threads: usize,
}

impl ParallelProcessor {
    pub fn new(io_threads: Option<usize>) -> Self {
        let io_threads = io_threads.unwrap_or_else(|| num_cpus::get().max(4));
        Self {
            io_threads: io_threads.max(1),
        }
    }

    pub fn io_threads(&self) -> usize {
        self.io_threads
    }

    /// Run every entry through `stages` on a pool of worker threads.
    ///
    /// A scene that fails is skipped and reported; it never aborts the
    /// others. Once `deadline` passes, workers stop taking scenes and the
    /// whole run fails with `Error::Timeout`.
    pub fn process_scenes(
        &self,
        entries: &[SceneEntry],
        stages: &SceneStages<'_>,
        deadline: Option<(Instant, u64)>,
    ) -> Result<ProcessReport> {
        let (req_tx, req_rx): (Sender<SceneRequest>, Receiver<SceneRequest>) = flume::unbounded();
        let (res_tx, res_rx) = flume::unbounded::<(usize, Scene)>();
        let skipped = Mutex::new(Vec::new());
        let abandoned = AtomicBool::new(false);

        for (position, entry) in entries.iter().enumerate() {
            // Receivers outlive this loop, so the send cannot fail
            let _ = req_tx.send(SceneRequest { position, entry });
        }
        drop(req_tx);

        let workers = self.io_threads.min(entries.len()).max(1);
        thread::scope(|scope| {
            for _ in 0..workers {
                let req_rx = req_rx.clone();
                let res_tx = res_tx.clone();
                let skipped = &skipped;
                let abandoned = &abandoned;

                scope.spawn(move || {
                    for request in req_rx {
                        if let Some((at, _)) = deadline {
                            if Instant::now() >= at {
                                abandoned.store(true, Ordering::Relaxed);
                                break;
                            }
                        }
                        if abandoned.load(Ordering::Relaxed) {
                            break;
                        }

                        match stages.run(request.entry) {
                            Ok(scene) => {
                                // res_rx is held by this function until the scope ends
                                let _ = res_tx.send((request.position, scene));
                            }
                            Err(e) => {
                                warn!("Skipping scene {}: {}", request.entry.id, e);
                                skipped.lock().push(SkippedScene {
                                    id: request.entry.id.clone(),
                                    reason: e.to_string(),
                                });
                            }
                        }
                    }
                });
            }
        });
        drop(res_tx);

        if let Some((_, secs)) = deadline {
            if abandoned.load(Ordering::Relaxed) {
                return Err(Error::Timeout(secs));
            }
        }

        let mut processed: Vec<(usize, Scene)> = res_rx.into_iter().collect();
        processed.sort_by_key(|(position, _)| *position);

        let skipped = skipped.into_inner();
        info!(
            "Processed {} scenes on {} threads, skipped {}",
            processed.len(),
            workers,
            skipped.len()
        );

        Ok(ProcessReport {
            scenes: processed.into_iter().map(|(_, scene)| scene).collect(),
            skipped,
        })
    }
}

/// Trait for spectral index calculators
pub trait IndexCalculator: Send + Sync {
    /// Calculate the index from the provided input bands
    fn calculate(&self, inputs: &[TypedBuffer]) -> Result<TypedBuffer>;

    /// Return the number of required input bands
    fn required_bands(&self) -> usize;

    /// Return the name of the index
    fn name(&self) -> &str;
}

//! Change recording for undo and redo.
//!
//! A [`ChangeLog`] covers one edit session. Every cell touched during the
//! session has its pixels copied out before the first write (`before`) and
//! after every write (`after`); cells allocated during the session are
//! remembered as `created`. Undo and redo replay those copies rather than
//! re-running any drawing, so they are exact inverses whatever the blend
//! operators did.

use crate::tiled::{CanvasId, CanvasStore};
use common::color::Pixel;
use common::error::{RasterError, RasterResult};
use common::geometry::CellKey;
use indexmap::{IndexMap, IndexSet};
use texture::{DisplaySink, PixelBuffer};

/// Lifecycle of a change log.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogState {
    /// Edits are being recorded.
    Recording,
    /// The session ended; the log can be undone or redone.
    Committed,
    /// The last replay restored the `before` state.
    Undone,
    /// The last replay restored the `after` state.
    Redone,
}

/// Everything one log recorded about one canvas.
#[derive(Clone, Debug)]
pub struct CanvasChange<P: Pixel> {
    before: IndexMap<CellKey, Vec<P>>,
    after: IndexMap<CellKey, Vec<P>>,
    created: IndexSet<CellKey>,
}

impl<P: Pixel> CanvasChange<P> {
    fn new() -> Self {
        Self {
            before: IndexMap::new(),
            after: IndexMap::new(),
            created: IndexSet::new(),
        }
    }

    /// Cell pixels as they were when the cell was first touched.
    pub fn before(&self, key: CellKey) -> Option<&[P]> {
        self.before.get(&key).map(Vec::as_slice)
    }

    /// Cell pixels as they were after the latest touch.
    pub fn after(&self, key: CellKey) -> Option<&[P]> {
        self.after.get(&key).map(Vec::as_slice)
    }

    pub fn is_created(&self, key: CellKey) -> bool {
        self.created.contains(&key)
    }

    pub fn created(&self) -> impl Iterator<Item = CellKey> + '_ {
        self.created.iter().copied()
    }

    pub fn touched(&self) -> impl Iterator<Item = CellKey> + '_ {
        self.before.keys().copied()
    }

    fn memory_bytes(&self) -> usize {
        let size = std::mem::size_of::<P>();
        self.before.values().chain(self.after.values()).map(|p| p.len() * size).sum()
    }
}

/// Cell snapshots for one edit session, across any number of canvases.
#[derive(Clone, Debug)]
pub struct ChangeLog<P: Pixel> {
    changes: IndexMap<CanvasId, CanvasChange<P>>,
    pending: IndexSet<(CanvasId, CellKey)>,
    state: LogState,
}

impl<P: Pixel> ChangeLog<P> {
    pub fn new() -> Self {
        Self {
            changes: IndexMap::new(),
            pending: IndexSet::new(),
            state: LogState::Recording,
        }
    }

    pub fn state(&self) -> LogState {
        self.state
    }

    pub fn is_recording(&self) -> bool {
        self.state == LogState::Recording
    }

    /// Fail unless edits may still be recorded.
    pub fn ensure_recording(&self) -> RasterResult<()> {
        if self.is_recording() {
            Ok(())
        } else {
            Err(RasterError::LogSealed)
        }
    }

    /// End the session. Further edits are rejected.
    pub fn finish(&mut self) {
        if self.state == LogState::Recording {
            self.state = LogState::Committed;
        }
    }

    /// The change recorded against `canvas`, if any.
    pub fn change(&self, canvas: CanvasId) -> Option<&CanvasChange<P>> {
        self.changes.get(&canvas)
    }

    pub fn is_empty(&self) -> bool {
        self.changes.values().all(|c| c.before.is_empty())
    }

    /// Number of distinct cells touched across all canvases.
    pub fn touched_cells(&self) -> usize {
        self.changes.values().map(|c| c.before.len()).sum()
    }

    /// Heap used by the stored snapshots.
    pub fn memory_bytes(&self) -> usize {
        self.changes.values().map(CanvasChange::memory_bytes).sum()
    }

    /// Cells waiting for [`ChangeLog::flush`].
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Note that a cell is about to be written. The first call per cell
    /// captures its `before` state.
    pub(crate) fn record_before(
        &mut self,
        canvas: CanvasId,
        key: CellKey,
        cell: &PixelBuffer<P>,
        created: bool,
    ) {
        let change = self.changes.entry(canvas).or_insert_with(CanvasChange::new);
        if created {
            change.created.insert(key);
        }
        change.before.entry(key).or_insert_with(|| cell.snapshot());
    }

    /// Note that a cell was written.
    pub(crate) fn record_after(&mut self, canvas: CanvasId, key: CellKey, cell: &PixelBuffer<P>) {
        let change = self.changes.entry(canvas).or_insert_with(CanvasChange::new);
        change.after.insert(key, cell.snapshot());
        self.pending.insert((canvas, key));
    }

    fn check_store<S: CanvasStore<P> + ?Sized>(&self, store: &mut S) -> RasterResult<()> {
        for &id in self.changes.keys() {
            if store.canvas_mut(id).is_none() {
                return Err(RasterError::invalid(format!("{id} is not in the store")));
            }
        }
        Ok(())
    }

    /// Restore every touched cell to its `before` state and drop the cells
    /// this session created. A log that is already undone is left alone.
    pub fn undo<S: CanvasStore<P> + ?Sized>(&mut self, store: &mut S) -> RasterResult<()> {
        self.finish();
        if self.state == LogState::Undone {
            return Ok(());
        }
        self.check_store(store)?;

        let mut restored = 0;
        let mut removed = 0;
        for (&id, change) in &self.changes {
            let Some(canvas) = store.canvas_mut(id) else {
                continue;
            };

            for (&key, pixels) in &change.before {
                canvas.restore_cell(key, pixels)?;
                if !change.created.contains(&key) {
                    self.pending.insert((id, key));
                    restored += 1;
                }
            }
            for &key in &change.created {
                if canvas.remove_cell(key) {
                    removed += 1;
                }
            }
        }

        tracing::info!("undo: restored {} cells, removed {} cells", restored, removed);
        self.state = LogState::Undone;
        Ok(())
    }

    /// Re-create the cells this session created and restore every touched
    /// cell to its `after` state. A log that is already redone is left
    /// alone.
    pub fn redo<S: CanvasStore<P> + ?Sized>(&mut self, store: &mut S) -> RasterResult<()> {
        self.finish();
        if self.state == LogState::Redone {
            return Ok(());
        }
        self.check_store(store)?;

        let mut restored = 0;
        for (&id, change) in &self.changes {
            let Some(canvas) = store.canvas_mut(id) else {
                continue;
            };

            for &key in &change.created {
                canvas.ensure_cell(key)?;
            }
            for (&key, pixels) in &change.after {
                canvas.restore_cell(key, pixels)?;
                self.pending.insert((id, key));
                restored += 1;
            }
        }

        tracing::info!("redo: restored {} cells", restored);
        self.state = LogState::Redone;
        Ok(())
    }

    /// Publish every cell this log has dirtied and report cells removed from
    /// its canvases. Cells that no longer exist are not uploaded. Returns the
    /// number of uploads.
    pub fn flush<S, D>(&mut self, store: &mut S, sink: &mut D) -> usize
    where
        S: CanvasStore<P> + ?Sized,
        D: DisplaySink<P> + ?Sized,
    {
        let mut uploads = 0;
        for (id, key) in self.pending.drain(..) {
            let Some(cell) = store.canvas_mut(id).and_then(|c| c.cell_mut(key)) else {
                continue;
            };
            if cell.commit(sink) {
                uploads += 1;
            }
        }
        let mut removed = 0;
        for &id in self.changes.keys() {
            if let Some(canvas) = store.canvas_mut(id) {
                removed += canvas.report_removed(sink);
            }
        }
        tracing::debug!("flushed {} cells, {} removed", uploads, removed);
        uploads
    }
}

impl<P: Pixel> Default for ChangeLog<P> {
    fn default() -> Self {
        Self::new()
    }
}

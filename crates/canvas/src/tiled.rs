//! Unbounded canvases made of fixed-size cells.

use crate::config::CanvasConfig;
use crate::history::ChangeLog;
use common::color::Pixel;
use common::error::{RasterError, RasterResult};
use common::geometry::{in_coordinate_range, CellKey, IntPoint, PixelRect};
use indexmap::map::Entry;
use indexmap::IndexMap;
use raster::{line_stroke, Stroke};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use texture::view::composite;
use texture::{Blend, BufferId, BufferPool, DisplaySink, PixelBuffer, View};

static NEXT_CANVAS_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a canvas, used to key change records.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CanvasId(u64);

impl CanvasId {
    fn next() -> Self {
        Self(NEXT_CANVAS_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for CanvasId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "canvas#{}", self.0)
    }
}

/// Resolves canvas ids to canvases during undo, redo and flush.
pub trait CanvasStore<P: Pixel> {
    fn canvas_mut(&mut self, id: CanvasId) -> Option<&mut TiledCanvas<P>>;
}

/// A sparse grid of square cells.
///
/// Cells are allocated the first time something is drawn into them. Reads
/// from cells that were never allocated return a caller-supplied default.
#[derive(Debug)]
pub struct TiledCanvas<P: Pixel> {
    id: CanvasId,
    cell_size: u32,
    cells: IndexMap<CellKey, PixelBuffer<P>>,
    /// Buffers of removed cells, not yet reported to a sink.
    retired: Vec<BufferId>,
}

impl<P: Pixel> TiledCanvas<P> {
    pub fn new(cell_size: u32) -> RasterResult<Self> {
        if cell_size == 0 {
            return Err(RasterError::invalid_dimensions(cell_size, cell_size));
        }
        Ok(Self {
            id: CanvasId::next(),
            cell_size,
            cells: IndexMap::new(),
            retired: Vec::new(),
        })
    }

    pub fn from_config(config: &CanvasConfig) -> RasterResult<Self> {
        config.validate()?;
        Self::new(config.cell_size)
    }

    #[inline]
    pub fn id(&self) -> CanvasId {
        self.id
    }

    #[inline]
    pub fn cell_size(&self) -> u32 {
        self.cell_size
    }

    /// Deep copy under a new id. The copy shares nothing with `self`.
    pub fn fork(&self) -> Self {
        Self {
            id: CanvasId::next(),
            cell_size: self.cell_size,
            cells: self.cells.clone(),
            retired: Vec::new(),
        }
    }

    pub fn cell(&self, key: CellKey) -> Option<&PixelBuffer<P>> {
        self.cells.get(&key)
    }

    pub(crate) fn cell_mut(&mut self, key: CellKey) -> Option<&mut PixelBuffer<P>> {
        self.cells.get_mut(&key)
    }

    pub fn cell_keys(&self) -> impl Iterator<Item = CellKey> + '_ {
        self.cells.keys().copied()
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Canvas-space rectangle covered by a cell.
    pub fn cell_rect(&self, key: CellKey) -> PixelRect {
        let size = self.cell_size;
        PixelRect::new(key.x * size as i32, key.y * size as i32, size, size)
    }

    /// Canvas-space rectangle covering every allocated cell.
    pub fn bounds(&self) -> Option<PixelRect> {
        self.cells
            .keys()
            .map(|&key| self.cell_rect(key))
            .reduce(|a, b| a.union(&b))
    }

    /// Read a canvas pixel. Never allocates.
    pub fn get_pixel(&self, position: IntPoint, default: P) -> P {
        let (key, local) = position.grid_coords(self.cell_size);
        self.cells
            .get(&key)
            .and_then(|cell| cell.get(local.x, local.y).ok())
            .unwrap_or(default)
    }

    /// Allocate a cleared cell if `key` has none. Returns whether it did.
    pub(crate) fn ensure_cell(&mut self, key: CellKey) -> RasterResult<bool> {
        if self.cells.contains_key(&key) {
            return Ok(false);
        }
        self.cells.insert(key, PixelBuffer::new(self.cell_size, self.cell_size)?);
        tracing::debug!("{}: allocated cell ({}, {})", self.id, key.x, key.y);
        Ok(true)
    }

    /// Overwrite a cell's pixels, allocating it if needed.
    pub(crate) fn restore_cell(&mut self, key: CellKey, pixels: &[P]) -> RasterResult<()> {
        let expected = self.cell_size as usize * self.cell_size as usize;
        if pixels.len() != expected {
            return Err(RasterError::size_mismatch(expected, pixels.len()));
        }
        self.ensure_cell(key)?;
        match self.cells.get_mut(&key) {
            Some(cell) => cell.restore(pixels),
            None => Err(RasterError::invalid(format!(
                "{}: cell ({}, {}) vanished",
                self.id, key.x, key.y
            ))),
        }
    }

    pub(crate) fn remove_cell(&mut self, key: CellKey) -> bool {
        match self.cells.shift_remove(&key) {
            Some(cell) => {
                self.retired.push(cell.id());
                true
            }
            None => false,
        }
    }

    /// Tell `sink` about every cell removed since the last report.
    pub(crate) fn report_removed<S: DisplaySink<P> + ?Sized>(&mut self, sink: &mut S) -> usize {
        let count = self.retired.len();
        for id in self.retired.drain(..) {
            sink.remove(id);
        }
        count
    }

    /// Load externally decoded pixels into a cell, allocating it if needed.
    /// This is an import and is not recorded for undo.
    pub fn load_cell(&mut self, key: CellKey, raw: &[P]) -> RasterResult<()> {
        let size = self.cell_size as i64;
        let (x, y) = (key.x as i64 * size, key.y as i64 * size);
        if !in_coordinate_range(x) || !in_coordinate_range(y) {
            return Err(RasterError::coordinate_range(x, y));
        }
        self.restore_cell(key, raw)
    }

    /// Inclusive range of cells a brush placed at `brush_position` covers.
    ///
    /// Fails if any corner of the brush box leaves the drawable range.
    fn cell_range(&self, brush: &View<P>, brush_position: IntPoint) -> RasterResult<(CellKey, CellKey)> {
        let left = brush_position.x as i64 - brush.pivot().x as i64;
        let top = brush_position.y as i64 - brush.pivot().y as i64;
        let right = left + brush.width() as i64 - 1;
        let bottom = top + brush.height() as i64 - 1;

        for (x, y) in [(left, top), (right, bottom)] {
            if !in_coordinate_range(x) || !in_coordinate_range(y) {
                return Err(RasterError::coordinate_range(x, y));
            }
        }

        // in range, so these fit
        let min = IntPoint::new(left as i32, top as i32);
        let max = IntPoint::new(right as i32, bottom as i32);
        Ok((min.cell_coords(self.cell_size), max.cell_coords(self.cell_size)))
    }

    /// Composite `brush` onto every cell it overlaps, recording the touched
    /// cells in `log`.
    pub fn blend(
        &mut self,
        log: &mut ChangeLog<P>,
        brush: &View<P>,
        brush_position: IntPoint,
        blend: &Blend<P>,
    ) -> RasterResult<()> {
        log.ensure_recording()?;

        let (first, last) = self.cell_range(brush, brush_position)?;
        let size = self.cell_size;
        tracing::trace!(
            "{}: {} brush at ({}, {}) over cells ({}, {})..=({}, {})",
            self.id,
            blend.name(),
            brush_position.x,
            brush_position.y,
            first.x,
            first.y,
            last.x,
            last.y
        );

        for y in first.y..=last.y {
            for x in first.x..=last.x {
                let key = CellKey::new(x, y);
                let (cell, created) = match self.cells.entry(key) {
                    Entry::Occupied(entry) => (entry.into_mut(), false),
                    Entry::Vacant(entry) => {
                        tracing::debug!("{}: allocated cell ({}, {})", self.id, x, y);
                        (entry.insert(PixelBuffer::new(size, size)?), true)
                    }
                };

                log.record_before(self.id, key, cell, created);
                composite(
                    cell,
                    PixelRect::from_size(size, size),
                    IntPoint::ZERO,
                    brush,
                    blend,
                    brush_position,
                    key * size as i32,
                );
                log.record_after(self.id, key, cell);
            }
        }

        Ok(())
    }

    /// Rasterize a stroke with a pooled brush and composite it.
    pub fn draw_stroke(
        &mut self,
        log: &mut ChangeLog<P>,
        pool: &mut BufferPool<P>,
        stroke: &Stroke<P>,
    ) -> RasterResult<()> {
        log.ensure_recording()?;

        let view = line_stroke(pool, stroke)?;
        let result = self.blend(log, &view, IntPoint::ZERO, &stroke.blend);
        pool.release_view(view)?;
        result
    }

    /// Report removed cells, then publish every dirty cell. Returns the
    /// number of uploads.
    pub fn commit_dirty<S: DisplaySink<P> + ?Sized>(&mut self, sink: &mut S) -> usize {
        let removed = self.report_removed(sink);
        if removed > 0 {
            tracing::debug!("{}: reported {} removed cells", self.id, removed);
        }
        self.cells
            .values_mut()
            .map(|cell| cell.commit(sink))
            .filter(|&uploaded| uploaded)
            .count()
    }

    /// Approximate heap size of all cells.
    pub fn memory_bytes(&self) -> usize {
        self.cells.values().map(PixelBuffer::memory_bytes).sum()
    }
}

impl<P: Pixel> CanvasStore<P> for TiledCanvas<P> {
    fn canvas_mut(&mut self, id: CanvasId) -> Option<&mut TiledCanvas<P>> {
        if id == self.id {
            Some(self)
        } else {
            None
        }
    }
}

/// A registry of canvases, for edits that span more than one.
#[derive(Debug)]
pub struct CanvasSet<P: Pixel> {
    canvases: IndexMap<CanvasId, TiledCanvas<P>>,
}

impl<P: Pixel> CanvasSet<P> {
    pub fn new() -> Self {
        Self {
            canvases: IndexMap::new(),
        }
    }

    pub fn insert(&mut self, canvas: TiledCanvas<P>) -> CanvasId {
        let id = canvas.id();
        self.canvases.insert(id, canvas);
        id
    }

    pub fn get(&self, id: CanvasId) -> Option<&TiledCanvas<P>> {
        self.canvases.get(&id)
    }

    pub fn get_mut(&mut self, id: CanvasId) -> Option<&mut TiledCanvas<P>> {
        self.canvases.get_mut(&id)
    }

    pub fn remove(&mut self, id: CanvasId) -> Option<TiledCanvas<P>> {
        self.canvases.shift_remove(&id)
    }

    pub fn ids(&self) -> impl Iterator<Item = CanvasId> + '_ {
        self.canvases.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.canvases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.canvases.is_empty()
    }
}

impl<P: Pixel> Default for CanvasSet<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Pixel> CanvasStore<P> for CanvasSet<P> {
    fn canvas_mut(&mut self, id: CanvasId) -> Option<&mut TiledCanvas<P>> {
        self.canvases.get_mut(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::color::Color;
    use texture::{CaptureSink, PixelBuffer};

    fn dot(value: u8) -> View<u8> {
        View::full(PixelBuffer::filled(1, 1, value).unwrap())
    }

    #[test]
    fn test_untouched_reads_default() {
        let canvas = TiledCanvas::<u8>::new(8).unwrap();
        assert_eq!(canvas.get_pixel(IntPoint::new(100, -40), 7), 7);
        assert_eq!(canvas.cell_count(), 0);
        assert!(canvas.bounds().is_none());
    }

    #[test]
    fn test_blend_then_read() {
        let mut canvas = TiledCanvas::<u8>::new(8).unwrap();
        let mut log = ChangeLog::new();
        canvas.blend(&mut log, &dot(42), IntPoint::new(-1, 9), &Blend::Replace).unwrap();

        assert_eq!(canvas.get_pixel(IntPoint::new(-1, 9), 0), 42);
        assert_eq!(canvas.get_pixel(IntPoint::new(0, 9), 0), 0);
        assert_eq!(canvas.cell_keys().collect::<Vec<_>>(), vec![IntPoint::new(-1, 1)]);
        assert_eq!(canvas.cell(IntPoint::new(-1, 1)).unwrap().get(7, 1).unwrap(), 42);
        assert_eq!(canvas.bounds(), Some(PixelRect::new(-8, 8, 8, 8)));
    }

    #[test]
    fn test_brush_spanning_four_cells() {
        let mut canvas = TiledCanvas::<u8>::new(4).unwrap();
        let mut log = ChangeLog::new();
        let brush = View::new(
            PixelBuffer::filled(2, 2, 1u8).unwrap(),
            PixelRect::from_size(2, 2),
            IntPoint::new(1, 1),
        )
        .unwrap();

        canvas.blend(&mut log, &brush, IntPoint::new(4, 4), &Blend::Replace).unwrap();

        assert_eq!(canvas.cell_count(), 4);
        for (x, y) in [(3, 3), (4, 3), (3, 4), (4, 4)] {
            assert_eq!(canvas.get_pixel(IntPoint::new(x, y), 0), 1, "({x}, {y})");
        }
        assert_eq!(canvas.get_pixel(IntPoint::new(5, 5), 0), 0);
    }

    #[test]
    fn test_brush_on_cell_edge_allocates_one_cell() {
        let mut canvas = TiledCanvas::<u8>::new(8).unwrap();
        let mut log = ChangeLog::new();
        let brush = View::full(PixelBuffer::filled(8, 8, 3u8).unwrap());

        canvas.blend(&mut log, &brush, IntPoint::new(8, 0), &Blend::Replace).unwrap();
        assert_eq!(canvas.cell_keys().collect::<Vec<_>>(), vec![IntPoint::new(1, 0)]);
    }

    #[test]
    fn test_brush_outside_drawable_range_rejected() {
        let mut canvas = TiledCanvas::<u8>::new(8).unwrap();
        let mut log = ChangeLog::new();

        let result = canvas.blend(&mut log, &dot(9), IntPoint::new(i32::MAX - 1, 0), &Blend::Replace);
        assert!(matches!(result, Err(RasterError::CoordinateRange { .. })));

        let edge = IntPoint::new(common::COORDINATE_LIMIT, -common::COORDINATE_LIMIT);
        canvas.blend(&mut log, &dot(9), edge, &Blend::Replace).unwrap();
        assert_eq!(canvas.get_pixel(edge, 0), 9);
        assert_eq!(canvas.cell_count(), 1);

        let raw = vec![0u8; 64];
        assert!(canvas.load_cell(IntPoint::new(i32::MAX, 0), &raw).is_err());
        assert_eq!(canvas.cell_count(), 1);
    }

    #[test]
    fn test_fork_is_independent() {
        let mut canvas = TiledCanvas::<Color>::new(4).unwrap();
        let mut log = ChangeLog::new();
        let red = View::full(PixelBuffer::filled(1, 1, Color::RED).unwrap());
        canvas.blend(&mut log, &red, IntPoint::ZERO, &Blend::Replace).unwrap();

        let mut copy = canvas.fork();
        assert_ne!(copy.id(), canvas.id());
        assert_eq!(copy.get_pixel(IntPoint::ZERO, Color::BLACK), Color::RED);

        let mut other = ChangeLog::new();
        let blue = View::full(PixelBuffer::filled(1, 1, Color::BLUE).unwrap());
        copy.blend(&mut other, &blue, IntPoint::ZERO, &Blend::Replace).unwrap();

        assert_eq!(canvas.get_pixel(IntPoint::ZERO, Color::BLACK), Color::RED);
        assert_eq!(copy.get_pixel(IntPoint::ZERO, Color::BLACK), Color::BLUE);
    }

    #[test]
    fn test_commit_dirty() {
        let mut canvas = TiledCanvas::<u8>::new(4).unwrap();
        let mut log = ChangeLog::new();
        canvas.blend(&mut log, &dot(1), IntPoint::ZERO, &Blend::Replace).unwrap();
        canvas.blend(&mut log, &dot(1), IntPoint::new(9, 9), &Blend::Replace).unwrap();

        let mut sink = CaptureSink::new();
        assert_eq!(canvas.commit_dirty(&mut sink), 2);
        assert_eq!(canvas.commit_dirty(&mut sink), 0);

        let id = canvas.cell(IntPoint::ZERO).unwrap().id();
        assert_eq!(sink.pixels(id).unwrap()[0], 1);
    }

    #[test]
    fn test_load_cell() {
        let mut canvas = TiledCanvas::<u8>::new(2).unwrap();
        canvas.load_cell(IntPoint::new(3, 3), &[1, 2, 3, 4]).unwrap();
        assert_eq!(canvas.get_pixel(IntPoint::new(7, 7), 0), 4);
        assert!(canvas.load_cell(IntPoint::ZERO, &[1]).is_err());
        assert_eq!(canvas.cell_count(), 1);
    }

    #[test]
    fn test_draw_stroke_returns_pool_buffers() {
        let mut canvas = TiledCanvas::<u8>::new(8).unwrap();
        let mut pool = BufferPool::with_buffer_size(16);
        let mut log = ChangeLog::new();
        let stroke = Stroke::new(IntPoint::new(0, 0), IntPoint::new(10, 0), 255u8);

        canvas.draw_stroke(&mut log, &mut pool, &stroke).unwrap();
        assert_eq!(pool.stats().live, 0);
        assert_eq!(canvas.get_pixel(IntPoint::new(10, 0), 0), 255);
    }
}

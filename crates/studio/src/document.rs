//! Editable documents.

use crate::config::StudioConfig;
use canvas::{ChangeLog, TiledCanvas};
use common::color::{Color, Pixel};
use common::error::RasterResult;
use common::geometry::{IntPoint, PixelRect};
use image::{GrayImage, RgbaImage};
use raster::Stroke;
use std::collections::VecDeque;
use texture::{Blend, BufferPool, DisplaySink, PixelBuffer, PoolStats, View};

/// A canvas with a brush pool and undo history.
///
/// Edits are grouped into sessions: [`Document::begin_edit`] hands out a
/// recording [`ChangeLog`], any number of strokes are drawn into it, and
/// [`Document::end_edit`] files it as one undo step.
pub struct Document<P: Pixel> {
    canvas: TiledCanvas<P>,
    pool: BufferPool<P>,
    config: StudioConfig,
    undo_stack: VecDeque<ChangeLog<P>>,
    redo_stack: VecDeque<ChangeLog<P>>,
    history_memory: usize,
}

impl<P: Pixel> Document<P> {
    pub fn new(config: StudioConfig) -> RasterResult<Self> {
        config.validate()?;
        let canvas = TiledCanvas::from_config(&config.canvas)?;
        let pool = config.canvas.build_pool();

        tracing::debug!(
            "new document {} with {}px cells",
            canvas.id(),
            canvas.cell_size()
        );

        Ok(Self {
            canvas,
            pool,
            config,
            undo_stack: VecDeque::new(),
            redo_stack: VecDeque::new(),
            history_memory: 0,
        })
    }

    pub fn canvas(&self) -> &TiledCanvas<P> {
        &self.canvas
    }

    pub fn config(&self) -> &StudioConfig {
        &self.config
    }

    pub fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }

    /// Start an edit session.
    pub fn begin_edit(&self) -> ChangeLog<P> {
        ChangeLog::new()
    }

    /// Draw a stroke as part of an edit session.
    pub fn stroke(&mut self, log: &mut ChangeLog<P>, stroke: &Stroke<P>) -> RasterResult<()> {
        self.canvas.draw_stroke(log, &mut self.pool, stroke)
    }

    /// Composite an arbitrary brush as part of an edit session.
    pub fn stamp(
        &mut self,
        log: &mut ChangeLog<P>,
        brush: &View<P>,
        position: IntPoint,
        blend: &Blend<P>,
    ) -> RasterResult<()> {
        self.canvas.blend(log, brush, position, blend)
    }

    /// Close an edit session and file it as one undo step. Empty sessions
    /// are dropped.
    pub fn end_edit(&mut self, mut log: ChangeLog<P>) {
        log.finish();
        if log.is_empty() {
            return;
        }

        for dropped in self.redo_stack.drain(..) {
            self.history_memory = self.history_memory.saturating_sub(dropped.memory_bytes());
        }

        self.history_memory += log.memory_bytes();
        self.undo_stack.push_back(log);
        self.prune();
    }

    /// Draw a single stroke as its own undo step.
    pub fn draw(&mut self, stroke: &Stroke<P>) -> RasterResult<()> {
        let mut log = self.begin_edit();
        let result = self.stroke(&mut log, stroke);
        self.end_edit(log);
        result
    }

    fn prune(&mut self) {
        while self.undo_stack.len() > self.config.history_limit {
            if let Some(removed) = self.undo_stack.pop_front() {
                self.history_memory = self.history_memory.saturating_sub(removed.memory_bytes());
            }
        }

        if let Some(max_bytes) = self.config.history_memory_limit {
            while self.history_memory > max_bytes && self.undo_stack.len() > 1 {
                if let Some(removed) = self.undo_stack.pop_front() {
                    self.history_memory =
                        self.history_memory.saturating_sub(removed.memory_bytes());
                }
            }
        }
    }

    /// Revert the most recent undo step. Returns false when there is none.
    pub fn undo(&mut self) -> RasterResult<bool> {
        let Some(mut log) = self.undo_stack.pop_back() else {
            return Ok(false);
        };

        if let Err(e) = log.undo(&mut self.canvas) {
            self.undo_stack.push_back(log);
            return Err(e);
        }
        self.redo_stack.push_back(log);
        Ok(true)
    }

    /// Reapply the most recently undone step. Returns false when there is
    /// none.
    pub fn redo(&mut self) -> RasterResult<bool> {
        let Some(mut log) = self.redo_stack.pop_back() else {
            return Ok(false);
        };

        if let Err(e) = log.redo(&mut self.canvas) {
            self.redo_stack.push_back(log);
            return Err(e);
        }
        self.undo_stack.push_back(log);
        Ok(true)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }

    /// Memory held by both history stacks.
    pub fn history_memory(&self) -> usize {
        self.history_memory
    }

    /// Report removed cells and publish every dirty cell. Returns the number
    /// of uploads.
    pub fn flush<S: DisplaySink<P> + ?Sized>(&mut self, sink: &mut S) -> usize {
        self.canvas.commit_dirty(sink)
    }

    /// Copy a canvas region into a standalone buffer, filling unpainted
    /// areas with `default`.
    pub fn read_region(&self, rect: PixelRect, default: P) -> RasterResult<PixelBuffer<P>> {
        let mut buffer = PixelBuffer::filled(rect.width, rect.height, default)?;
        let width = rect.width as usize;
        let pixels = buffer.pixels_mut();

        for y in 0..rect.height as i32 {
            for x in 0..rect.width as i32 {
                let position = IntPoint::new(rect.x + x, rect.y + y);
                pixels[y as usize * width + x as usize] = self.canvas.get_pixel(position, default);
            }
        }

        Ok(buffer)
    }
}

impl Document<Color> {
    /// Render a canvas region as an RGBA image over the configured
    /// background.
    pub fn export_region(&self, rect: PixelRect) -> RasterResult<RgbaImage> {
        let background = self.config.background;
        let mut region = self.read_region(rect, Color::TRANSPARENT)?;
        for pixel in region.pixels_mut() {
            *pixel = Blend::Alpha.apply(background, *pixel);
        }
        Ok(region.to_rgba_image())
    }

    /// Paste a decoded image with its top-left corner at `position`, as
    /// part of an edit session.
    pub fn import_image(
        &mut self,
        log: &mut ChangeLog<Color>,
        image: &RgbaImage,
        position: IntPoint,
    ) -> RasterResult<()> {
        let view = View::full(PixelBuffer::from_rgba_image(image)?);
        self.canvas.blend(log, &view, position, &Blend::Replace)
    }
}

impl Document<u8> {
    /// Render a canvas region of a coverage document as a grayscale image.
    pub fn export_mask(&self, rect: PixelRect) -> RasterResult<GrayImage> {
        Ok(self.read_region(rect, 0)?.to_luma_image())
    }

    /// Paste the alpha channel of a decoded image as coverage, as part of
    /// an edit session. Zero coverage leaves the canvas untouched.
    pub fn import_mask(
        &mut self,
        log: &mut ChangeLog<u8>,
        image: &RgbaImage,
        position: IntPoint,
    ) -> RasterResult<()> {
        let view = View::full(PixelBuffer::from_rgba_alpha(image)?);
        self.canvas.blend(log, &view, position, &Blend::Mask)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canvas::CanvasConfig;
    use texture::CaptureSink;

    fn config() -> StudioConfig {
        StudioConfig::new().with_canvas(CanvasConfig::small_tiles())
    }

    fn hline(x1: i32, value: u8) -> Stroke<u8> {
        Stroke::new(IntPoint::new(0, 0), IntPoint::new(x1, 0), value).with_blend(Blend::Mask)
    }

    #[test]
    fn test_draw_undo_redo() {
        let mut doc = Document::<u8>::new(config()).unwrap();
        doc.draw(&hline(3, 255)).unwrap();
        assert!(doc.can_undo());
        assert_eq!(doc.canvas().get_pixel(IntPoint::new(3, 0), 0), 255);

        assert!(doc.undo().unwrap());
        assert_eq!(doc.canvas().cell_count(), 0);
        assert!(doc.can_redo());

        assert!(doc.redo().unwrap());
        assert_eq!(doc.canvas().get_pixel(IntPoint::new(3, 0), 0), 255);
        assert!(!doc.redo().unwrap());
    }

    #[test]
    fn test_new_edit_clears_redo() {
        let mut doc = Document::<u8>::new(config()).unwrap();
        doc.draw(&hline(2, 10)).unwrap();
        doc.undo().unwrap();
        doc.draw(&hline(1, 20)).unwrap();

        assert!(!doc.can_redo());
        assert_eq!(doc.undo_count(), 1);
    }

    #[test]
    fn test_history_limit_drops_oldest() {
        let mut doc = Document::<u8>::new(config().with_history_limit(2)).unwrap();
        for value in [10, 20, 30] {
            doc.draw(&hline(0, value)).unwrap();
        }
        assert_eq!(doc.undo_count(), 2);

        doc.undo().unwrap();
        doc.undo().unwrap();
        assert!(!doc.undo().unwrap());
        assert_eq!(doc.canvas().get_pixel(IntPoint::ZERO, 0), 10);
    }

    #[test]
    fn test_session_groups_strokes() {
        let mut doc = Document::<u8>::new(config()).unwrap();
        let mut log = doc.begin_edit();
        doc.stroke(&mut log, &hline(4, 255)).unwrap();
        doc.stroke(
            &mut log,
            &Stroke::new(IntPoint::new(0, 20), IntPoint::new(0, 30), 255),
        )
        .unwrap();
        doc.end_edit(log);

        assert_eq!(doc.undo_count(), 1);
        doc.undo().unwrap();
        assert_eq!(doc.canvas().cell_count(), 0);
    }

    #[test]
    fn test_empty_session_not_recorded() {
        let mut doc = Document::<u8>::new(config()).unwrap();
        let log = doc.begin_edit();
        doc.end_edit(log);
        assert!(!doc.can_undo());
    }

    #[test]
    fn test_flush() {
        let mut doc = Document::<u8>::new(config()).unwrap();
        doc.draw(&hline(9, 1)).unwrap();
        let mut sink = CaptureSink::new();
        assert_eq!(doc.flush(&mut sink), 2);
        assert_eq!(doc.flush(&mut sink), 0);

        doc.undo().unwrap();
        assert_eq!(doc.flush(&mut sink), 0);
        assert_eq!(sink.remove_count, 2);
        assert!(sink.uploads.is_empty());
    }

    #[test]
    fn test_export_over_background() {
        let mut doc =
            Document::<Color>::new(config().with_background(Color::WHITE)).unwrap();
        doc.draw(&Stroke::new(IntPoint::new(1, 1), IntPoint::new(2, 1), Color::RED))
            .unwrap();

        let image = doc.export_region(PixelRect::new(0, 0, 4, 2)).unwrap();
        assert_eq!(image.get_pixel(1, 1).0, [255, 0, 0, 255]);
        assert_eq!(image.get_pixel(0, 0).0, [255, 255, 255, 255]);
        assert_eq!(image.get_pixel(3, 1).0, [255, 255, 255, 255]);
    }

    #[test]
    fn test_import_is_undoable() {
        let mut doc = Document::<Color>::new(config()).unwrap();
        let image = RgbaImage::from_pixel(3, 3, image::Rgba([1, 2, 3, 255]));

        let mut log = doc.begin_edit();
        doc.import_image(&mut log, &image, IntPoint::new(7, 7)).unwrap();
        doc.end_edit(log);

        assert_eq!(doc.canvas().get_pixel(IntPoint::new(9, 9), Color::BLACK), Color::rgb(1, 2, 3));
        assert_eq!(doc.canvas().cell_count(), 4);

        doc.undo().unwrap();
        assert_eq!(doc.canvas().cell_count(), 0);
    }

    #[test]
    fn test_import_mask_keeps_uncovered() {
        let mut doc = Document::<u8>::new(config()).unwrap();
        doc.draw(&hline(3, 50)).unwrap();

        let mut image = RgbaImage::new(4, 1);
        image.put_pixel(1, 0, image::Rgba([0, 0, 0, 255]));

        let mut log = doc.begin_edit();
        doc.import_mask(&mut log, &image, IntPoint::ZERO).unwrap();
        doc.end_edit(log);

        assert_eq!(doc.canvas().get_pixel(IntPoint::new(0, 0), 0), 50);
        assert_eq!(doc.canvas().get_pixel(IntPoint::new(1, 0), 0), 255);
        assert_eq!(doc.undo_count(), 2);
    }

    #[test]
    fn test_export_mask() {
        let mut doc = Document::<u8>::new(config()).unwrap();
        doc.draw(&hline(1, 200)).unwrap();
        let mask = doc.export_mask(PixelRect::new(0, 0, 3, 1)).unwrap();
        assert_eq!(mask.get_pixel(0, 0).0, [200]);
        assert_eq!(mask.get_pixel(2, 0).0, [0]);
    }
}

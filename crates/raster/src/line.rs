//! Bresenham line enumeration.

use common::geometry::IntPoint;

/// The grid cells approximating a segment, start to end inclusive.
///
/// Lines are normalized so that the major axis is x and x never decreases;
/// the iterator walks that normalized line from either end so the endpoint
/// swapped line is the exact reverse of this one.
#[derive(Clone, Debug)]
pub struct Line {
    steep: bool,
    reversed: bool,
    // Deltas and accumulators are 64-bit so endpoints anywhere in i32 work.
    dx: i64,
    dy: i64,
    ystep: i32,

    front_x: i32,
    front_y: i32,
    front_err: i64,

    back_x: i32,
    back_y: i32,
    back_err: i64,

    remaining: usize,
}

/// Enumerate the cells from `start` to `end`.
pub fn line(start: IntPoint, end: IntPoint) -> Line {
    Line::new(start, end)
}

impl Line {
    pub fn new(start: IntPoint, end: IntPoint) -> Self {
        let (mut x0, mut y0, mut x1, mut y1) = (start.x, start.y, end.x, end.y);

        let steep = y1.abs_diff(y0) > x1.abs_diff(x0);
        if steep {
            std::mem::swap(&mut x0, &mut y0);
            std::mem::swap(&mut x1, &mut y1);
        }

        let reversed = x0 > x1;
        if reversed {
            std::mem::swap(&mut x0, &mut x1);
            std::mem::swap(&mut y0, &mut y1);
        }

        let dx = x1 as i64 - x0 as i64;
        let dy = (y1 as i64 - y0 as i64).abs();
        let ystep = if y0 < y1 { 1 } else { -1 };
        let err = dx / 2;

        // State at the last index, solved from the forward recurrence. The
        // accumulator always stays in 0..dx, which pins down how many y
        // steps happened before it.
        let behind = dx * dy - err;
        let steps = if behind > 0 { (behind + dx - 1) / dx } else { 0 };
        let back_err = err - dx * dy + steps * dx;

        Self {
            steep,
            reversed,
            dx,
            dy,
            ystep,
            front_x: x0,
            front_y: y0,
            front_err: err,
            back_x: x1,
            // lies between y0 and y1, so it fits
            back_y: (y0 as i64 + ystep as i64 * steps) as i32,
            back_err,
            remaining: dx as usize + 1,
        }
    }

    #[inline]
    fn emit(&self, x: i32, y: i32) -> IntPoint {
        if self.steep {
            IntPoint::new(y, x)
        } else {
            IntPoint::new(x, y)
        }
    }

    fn take_front(&mut self) -> Option<IntPoint> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        let point = self.emit(self.front_x, self.front_y);
        if self.remaining == 0 {
            return Some(point);
        }

        self.front_x += 1;
        self.front_err -= self.dy;
        if self.front_err < 0 {
            self.front_y += self.ystep;
            self.front_err += self.dx;
        }

        Some(point)
    }

    fn take_back(&mut self) -> Option<IntPoint> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        let point = self.emit(self.back_x, self.back_y);
        if self.remaining == 0 {
            return Some(point);
        }

        self.back_x -= 1;
        let undone = self.back_err + self.dy;
        if undone >= self.dx {
            self.back_err = undone - self.dx;
            self.back_y -= self.ystep;
        } else {
            self.back_err = undone;
        }

        Some(point)
    }
}

impl Iterator for Line {
    type Item = IntPoint;

    fn next(&mut self) -> Option<IntPoint> {
        if self.reversed {
            self.take_back()
        } else {
            self.take_front()
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl DoubleEndedIterator for Line {
    fn next_back(&mut self) -> Option<IntPoint> {
        if self.reversed {
            self.take_front()
        } else {
            self.take_back()
        }
    }
}

impl ExactSizeIterator for Line {}

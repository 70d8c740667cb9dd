//! Per-frame span buffer for the software path.
//!
//! Map geometry arrives roughly front-to-back, so each scanline keeps a
//! sorted list of already covered pixel ranges; a new opaque span only
//! keeps the pieces that fall into gaps and then closes them. Surviving
//! pieces are bucketed by paint so the flush draws each pixmap/shade pair
//! in one run.
//!
//! Late spans (movables, the player) and see-through spans do not add
//! coverage; they are depth tested when flushed instead.

use std::collections::HashMap;

use smallvec::SmallVec;

use crate::{
    engine::raster::Span,
    error::RenderError,
    renderer::{Renderer, RendererExt, SpanMode, SpanPaint},
    world::{Rgb, TextureBank},
};

/// Where a span comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Layer {
    /// Grid blocks, traversed nearest first.
    Map,
    /// Drawn after the map in no particular order.
    Late,
}

/// Inclusive pixel range `first ..= last`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClipRange {
    pub first: i32,
    pub last: i32,
}

#[derive(Default)]
pub struct SpanBuffer {
    width: i32,
    rows: Vec<Vec<ClipRange>>,
    buckets: Vec<(SpanPaint, Vec<Span>)>,
    bucket_index: HashMap<SpanPaint, usize>,
    /// Buckets touched this frame; the rest keep their allocation.
    used: usize,
    solid: Vec<(Rgb, Span)>,
    late: Vec<(SpanPaint, Span)>,
    transparent: Vec<(SpanPaint, f32, Span)>,
}

impl SpanBuffer {
    /// Buffer for a `w`×`h` frame, reserving room for `spans` spans per
    /// list up front.
    pub fn with_capacity(w: usize, h: usize, spans: usize) -> Result<Self, RenderError> {
        let mut buf = Self::default();
        buf.rows
            .try_reserve_exact(h)
            .map_err(RenderError::scratch("span rows"))?;
        buf.solid
            .try_reserve(spans)
            .map_err(RenderError::scratch("solid spans"))?;
        buf.late
            .try_reserve(spans)
            .map_err(RenderError::scratch("late spans"))?;
        buf.transparent
            .try_reserve(spans)
            .map_err(RenderError::scratch("transparent spans"))?;
        buf.reset(w, h);
        Ok(buf)
    }

    /// Forget last frame's spans and open every row.
    pub fn reset(&mut self, w: usize, h: usize) {
        self.width = w as i32;
        self.rows.resize_with(h, Vec::new);
        let w = self.width;
        for row in &mut self.rows {
            row.clear();
            // Two sentinels so the gap walk never runs off either end.
            row.push(ClipRange { first: -w, last: -1 });
            row.push(ClipRange {
                first: w,
                last: w * 2,
            });
        }
        for (_, spans) in &mut self.buckets[..self.used] {
            spans.clear();
        }
        self.bucket_index.clear();
        self.used = 0;
        self.solid.clear();
        self.late.clear();
        self.transparent.clear();
    }

    /// Queue `span`; `blend` is `Some(alpha)` for see-through surfaces.
    /// Returns the number of visible pieces kept.
    pub fn insert(&mut self, span: Span, paint: SpanPaint, blend: Option<f32>, layer: Layer) -> usize {
        if span.is_empty() || span.y < 0 || span.y as usize >= self.rows.len() {
            return 0;
        }
        if layer == Layer::Late {
            match blend {
                Some(alpha) => self.transparent.push((paint, alpha, span)),
                None => self.late.push((paint, span)),
            }
            return 1;
        }

        let (first, last) = (span.x0, span.x1 - 1);
        let mut pieces: SmallVec<[Span; 4]> = SmallVec::new();
        for pair in self.rows[span.y as usize].windows(2) {
            let gap_first = (pair[0].last + 1).max(first);
            let gap_last = (pair[1].first - 1).min(last);
            if pair[0].last >= last {
                break;
            }
            if gap_first > gap_last {
                continue;
            }
            pieces.push(span.with_range(gap_first, gap_last + 1));
        }
        let kept = pieces.len();
        for piece in pieces {
            match blend {
                Some(alpha) => self.transparent.push((paint, alpha, piece)),
                None => self.push_opaque(paint, piece),
            }
        }
        if blend.is_none() && kept > 0 {
            self.add_solid_seg(span.y as usize, first, last);
        }
        kept
    }

    fn push_opaque(&mut self, paint: SpanPaint, span: Span) {
        match paint {
            SpanPaint::Solid(c) => self.solid.push((c, span)),
            SpanPaint::Textured { .. } => {
                let slot = match self.bucket_index.get(&paint) {
                    Some(&i) => i,
                    None => {
                        let i = self.used;
                        if i == self.buckets.len() {
                            self.buckets.push((paint, Vec::new()));
                        } else {
                            self.buckets[i].0 = paint;
                        }
                        self.bucket_index.insert(paint, i);
                        self.used += 1;
                        i
                    }
                };
                self.buckets[slot].1.push(span);
            }
        }
    }

    fn add_solid_seg(&mut self, y: usize, first: i32, last: i32) {
        let segs = &mut self.rows[y];
        let mut i = 0;
        // 1) skip all segments that end before ours minus one
        while i < segs.len() && segs[i].last < first - 1 {
            i += 1;
        }
        if i < segs.len() && first >= segs[i].first && last <= segs[i].last {
            return;
        }
        // 2) merge any overlapping or adjacent segments
        let mut new_first = first;
        let mut new_last = last;
        while i < segs.len() && segs[i].first <= new_last + 1 {
            new_first = new_first.min(segs[i].first);
            new_last = new_last.max(segs[i].last);
            segs.remove(i);
        }
        // 3) insert the coalesced segment in its sorted place
        segs.insert(
            i,
            ClipRange {
                first: new_first,
                last: new_last,
            },
        );
    }

    /// Pixel `(x, y)` already holds opaque map geometry.
    pub fn is_covered(&self, x: i32, y: i32) -> bool {
        usize::try_from(y)
            .ok()
            .and_then(|y| self.rows.get(y))
            .is_some_and(|row| row.iter().any(|r| x >= r.first && x <= r.last))
    }

    /// Every row is closed from edge to edge.
    pub fn is_full(&self) -> bool {
        // a closed row has merged into its sentinels
        self.rows.iter().all(|row| row.len() == 1)
    }

    /// Distinct textured buckets this frame.
    pub fn bucket_count(&self) -> usize {
        self.used
    }

    pub fn span_count(&self) -> usize {
        self.buckets[..self.used]
            .iter()
            .map(|(_, s)| s.len())
            .sum::<usize>()
            + self.solid.len()
            + self.late.len()
            + self.transparent.len()
    }

    /// Textured buckets, then flat colours, then late spans, then
    /// see-through spans farthest first.
    pub fn flush<R: Renderer + ?Sized>(&self, renderer: &mut R, bank: &TextureBank) {
        for (paint, spans) in &self.buckets[..self.used] {
            renderer.draw_spans(spans, *paint, SpanMode::Fill, bank);
        }
        for (c, span) in &self.solid {
            renderer.draw_span(span, SpanPaint::Solid(*c), SpanMode::Fill, bank);
        }
        for (paint, span) in &self.late {
            renderer.draw_span(span, *paint, SpanMode::DepthTest, bank);
        }
        for (paint, alpha, span) in self.transparent.iter().rev() {
            renderer.draw_span(span, *paint, SpanMode::Blend { alpha: *alpha }, bank);
        }
    }
}

//! Ribbon mesh construction.
//!
//! Waypoints come in pairs `(2i, 2i + 1)`; every pair becomes one quad that
//! hangs `vertical_extent` below the path segment (+y is down). The texture
//! is tiled along the path: `u` advances by segment length over the scaled
//! texture width, `v` tracks the slope so the pattern follows the ribbon.

use crate::coords::Vec2;

use super::config::RibbonMetrics;
use super::error::RibbonError;

/// Position floats per vertex (x, y, w).
pub const POSITION_COMPONENTS: usize = 3;
/// Texcoord floats per vertex (u, v, sampler slot, side flag).
pub const TEXCOORD_COMPONENTS: usize = 4;

const QUAD_INDICES: [u16; 6] = [0, 1, 2, 0, 2, 3];

/// CPU-side geometry for one upload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshBatch {
    pub positions: Vec<f32>,
    pub texcoords: Vec<f32>,
    pub indices: Vec<u16>,
}

impl MeshBatch {
    pub fn with_quad_capacity(quads: usize) -> Self {
        Self {
            positions: Vec::with_capacity(quads * 4 * POSITION_COMPONENTS),
            texcoords: Vec::with_capacity(quads * 4 * TEXCOORD_COMPONENTS),
            indices: Vec::with_capacity(quads * QUAD_INDICES.len()),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    #[inline]
    pub fn quad_count(&self) -> usize {
        self.indices.len() / QUAD_INDICES.len()
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / POSITION_COMPONENTS
    }

    fn push_vertex(&mut self, p: Vec2, uv: (f64, f64), side: f32) {
        self.positions.extend_from_slice(&[p.x, p.y, 1.0]);
        self.texcoords
            .extend_from_slice(&[uv.0 as f32, uv.1 as f32, 0.0, side]);
    }
}

/// Running texture coordinate offsets across the quads of one build.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
struct Accumulators {
    /// Always in `[0, 1)`.
    u: f64,
    /// Grows without bound along long, sloped paths. Precision degrades
    /// gradually; values are kept as-is so the tiling stays continuous.
    v: f64,
}

impl Accumulators {
    fn advance(&mut self, du: f64, dv: f64) {
        let next = self.u + du;
        let mut frac = next - next.floor();
        if frac >= 1.0 {
            frac = 0.0;
        }
        self.u = frac;
        self.v += dv;
    }
}

/// Builds ribbon quads for `points`, numbering vertices from `index_base`.
///
/// Returns the batch and the index base for the next build. An odd trailing
/// point is dropped with a warning.
pub fn build_ribbon(
    points: &[Vec2],
    metrics: RibbonMetrics,
    index_base: u32,
) -> Result<(MeshBatch, u32), RibbonError> {
    let metrics = RibbonMetrics::new("", metrics.scaled_texture_width, metrics.vertical_extent)?;

    if points.len() % 2 == 1 {
        log::warn!(
            "ribbon: odd waypoint count {}; trailing point ignored",
            points.len()
        );
    }
    let quads = points.len() / 2;
    let vertices_after = index_base as usize + quads * 4;
    if vertices_after > u16::MAX as usize + 1 {
        return Err(RibbonError::IndexRangeExhausted { vertices: vertices_after });
    }

    let width = metrics.scaled_texture_width as f64;
    let ext = metrics.vertical_extent as f64;
    let repeat_y = ext / width;

    let mut batch = MeshBatch::with_quad_capacity(quads);
    let mut acc = Accumulators::default();
    let mut base = index_base;

    for pair in points.chunks_exact(2) {
        let (p0, p1) = (pair[0], pair[1]);
        let ext32 = metrics.vertical_extent;

        let factor = (p1.x as f64 - p0.x as f64) / width;
        let bottom = p0.y as f64 + ext;
        let y1 = bottom - p0.y as f64;
        let y2 = bottom - p1.y as f64;
        let percent = (y1 - y2) / y1 * repeat_y;

        let (u, v) = (acc.u, acc.v);
        batch.push_vertex(Vec2::new(p0.x, p0.y + ext32), (u, repeat_y + v), 0.0);
        batch.push_vertex(p0, (u, v), 1.0);
        batch.push_vertex(p1, (factor + u, percent + v), 1.0);
        batch.push_vertex(Vec2::new(p1.x, p1.y + ext32), (factor + u, repeat_y + percent + v), 0.0);

        acc.advance(factor, percent);

        // Range checked above.
        let b = base as u16;
        batch.indices.extend(QUAD_INDICES.iter().map(|i| b + i));
        base += 4;
    }

    Ok((batch, base))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(width: f32, ext: f32) -> RibbonMetrics {
        RibbonMetrics::new("tex", width, ext).unwrap()
    }

    fn pts(raw: &[(f32, f32)]) -> Vec<Vec2> {
        raw.iter().map(|&(x, y)| Vec2::new(x, y)).collect()
    }

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    // ── shape ─────────────────────────────────────────────────────────────

    #[test]
    fn empty_input_gives_empty_batch() {
        let (batch, next) = build_ribbon(&[], metrics(100.0, 50.0), 0).unwrap();
        assert!(batch.is_empty());
        assert!(batch.positions.is_empty() && batch.texcoords.is_empty());
        assert_eq!(next, 0);
    }

    #[test]
    fn sizes_scale_with_pair_count() {
        let points: Vec<Vec2> = (0..10).map(|i| Vec2::new(i as f32 * 10.0, 0.0)).collect();
        let (batch, next) = build_ribbon(&points, metrics(100.0, 50.0), 0).unwrap();
        assert_eq!(batch.indices.len(), 30);
        assert_eq!(batch.positions.len(), 60);
        assert_eq!(batch.texcoords.len(), 80);
        assert_eq!(batch.vertex_count(), 20);
        assert_eq!(batch.quad_count(), 5);
        assert_eq!(next, 20);
    }

    #[test]
    fn odd_trailing_point_is_ignored() {
        let points = pts(&[(0.0, 0.0), (10.0, 0.0), (20.0, 0.0)]);
        let (batch, _) = build_ribbon(&points, metrics(100.0, 50.0), 0).unwrap();
        assert_eq!(batch.quad_count(), 1);
    }

    #[test]
    fn single_quad_vertices_and_indices() {
        let points = pts(&[(0.0, 0.0), (100.0, 0.0)]);
        let (batch, _) = build_ribbon(&points, metrics(100.0, 50.0), 0).unwrap();
        assert_eq!(batch.indices, vec![0, 1, 2, 0, 2, 3]);
        assert_eq!(
            batch.positions,
            vec![0.0, 50.0, 1.0, 0.0, 0.0, 1.0, 100.0, 0.0, 1.0, 100.0, 50.0, 1.0]
        );
    }

    #[test]
    fn indices_continue_from_base() {
        let points = pts(&[(0.0, 0.0), (1.0, 0.0), (1.0, 0.0), (2.0, 0.0)]);
        let (batch, next) = build_ribbon(&points, metrics(10.0, 5.0), 8).unwrap();
        assert_eq!(batch.indices, vec![8, 9, 10, 8, 10, 11, 12, 13, 14, 12, 14, 15]);
        assert_eq!(next, 16);
    }

    // ── texcoords ─────────────────────────────────────────────────────────

    #[test]
    fn flat_segment_texcoords() {
        // factor = 0.5, repeat_y = 0.5, percent = 0
        let points = pts(&[(0.0, 0.0), (50.0, 0.0)]);
        let (batch, _) = build_ribbon(&points, metrics(100.0, 50.0), 0).unwrap();
        let expected = [
            0.0, 0.5, 0.0, 0.0, //
            0.0, 0.0, 0.0, 1.0, //
            0.5, 0.0, 0.0, 1.0, //
            0.5, 0.5, 0.0, 0.0,
        ];
        for (got, want) in batch.texcoords.iter().zip(expected) {
            assert!(approx(*got, want), "{:?}", batch.texcoords);
        }
    }

    #[test]
    fn sloped_segment_shifts_v() {
        // p1 is 10 below p0: percent = (y1 - y2) / y1 * repeat_y = (10/50) * 0.5
        let points = pts(&[(0.0, 0.0), (50.0, 10.0)]);
        let (batch, _) = build_ribbon(&points, metrics(100.0, 50.0), 0).unwrap();
        let tr_v = batch.texcoords[9];
        let br_v = batch.texcoords[13];
        assert!(approx(tr_v, 0.1));
        assert!(approx(br_v, 0.6));
    }

    #[test]
    fn u_carries_fractional_part_between_quads() {
        // Each segment covers 0.75 of a repeat.
        let points = pts(&[(0.0, 0.0), (75.0, 0.0), (75.0, 0.0), (150.0, 0.0), (150.0, 0.0), (225.0, 0.0)]);
        let (batch, _) = build_ribbon(&points, metrics(100.0, 50.0), 0).unwrap();
        let left_u = |quad: usize| batch.texcoords[quad * 16];
        assert!(approx(left_u(0), 0.0));
        assert!(approx(left_u(1), 0.75));
        assert!(approx(left_u(2), 0.5));
    }

    #[test]
    fn u_offset_stays_in_unit_range() {
        let mut acc = Accumulators::default();
        for step in [0.3, 1.7, -0.4, 5.0, -1e-18, 0.999_999_999_999] {
            acc.advance(step, 0.0);
            assert!((0.0..1.0).contains(&acc.u), "u = {}", acc.u);
        }
    }

    #[test]
    fn v_offset_accumulates_without_wrapping() {
        let mut acc = Accumulators::default();
        for _ in 0..1000 {
            acc.advance(0.0, 0.25);
        }
        assert!((acc.v - 250.0).abs() < 1e-9);
    }

    #[test]
    fn side_flag_marks_path_edge() {
        let points = pts(&[(0.0, 0.0), (10.0, 0.0)]);
        let (batch, _) = build_ribbon(&points, metrics(100.0, 50.0), 0).unwrap();
        let flags: Vec<f32> = batch.texcoords.chunks(4).map(|c| c[3]).collect();
        assert_eq!(flags, vec![0.0, 1.0, 1.0, 0.0]);
    }

    // ── errors ────────────────────────────────────────────────────────────

    #[test]
    fn zero_width_is_rejected_before_dividing() {
        let bad = RibbonMetrics {
            scaled_texture_width: 0.0,
            vertical_extent: 50.0,
        };
        let points = pts(&[(0.0, 0.0), (10.0, 0.0)]);
        let err = build_ribbon(&points, bad, 0).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn index_base_exhaustion() {
        let points = pts(&[(0.0, 0.0), (10.0, 0.0)]);
        assert!(build_ribbon(&points, metrics(10.0, 5.0), 65_532).is_ok());
        let err = build_ribbon(&points, metrics(10.0, 5.0), 65_533).unwrap_err();
        assert!(matches!(err, RibbonError::IndexRangeExhausted { .. }));
    }
}

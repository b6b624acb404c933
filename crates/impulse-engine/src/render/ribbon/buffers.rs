//! Append-only device buffers with amortized growth.

use bytemuck::Pod;

use crate::gfx::{BufferId, BufferTarget, BufferUsage, GraphicsContext};

use super::error::RibbonError;

/// One device buffer plus the CPU copy it is re-uploaded from on growth.
///
/// `used <= capacity` always holds; capacity never shrinks.
#[derive(Debug)]
pub struct GrowableBuffer<T: Pod> {
    label: &'static str,
    target: BufferTarget,
    handle: Option<BufferId>,
    /// Length is the capacity; `[used..]` is zero fill.
    backing: Vec<T>,
    used: usize,
    growth_factor: f64,
    growth_events: u32,
}

impl<T: Pod> GrowableBuffer<T> {
    /// Creates the device buffer and allocates `capacity` elements of storage.
    pub fn new(
        gl: &mut dyn GraphicsContext,
        label: &'static str,
        target: BufferTarget,
        capacity: usize,
        growth_factor: f64,
    ) -> Result<Self, RibbonError> {
        let handle = gl.create_buffer().ok_or_else(|| RibbonError::UnsupportedContext {
            reason: format!("{} refused to create the {label} buffer", gl.backend_name()),
        })?;

        gl.bind_buffer(target, Some(handle));
        gl.buffer_data(target, capacity * size_of::<T>(), BufferUsage::StaticDraw);
        gl.bind_buffer(target, None);

        Ok(Self {
            label,
            target,
            handle: Some(handle),
            backing: vec![T::zeroed(); capacity],
            used: 0,
            growth_factor,
            growth_events: 0,
        })
    }

    #[inline]
    pub fn handle(&self) -> Option<BufferId> {
        self.handle
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.backing.len()
    }

    #[inline]
    pub fn used(&self) -> usize {
        self.used
    }

    #[inline]
    pub fn growth_events(&self) -> u32 {
        self.growth_events
    }

    /// Elements written so far.
    pub fn contents(&self) -> &[T] {
        &self.backing[..self.used]
    }

    /// Appends `data` after the current contents.
    ///
    /// Fits: one partial upload at the cursor. Overflow: the capacity grows
    /// until `data` fits, the device buffer is reallocated and everything
    /// written so far is uploaded again. Leaves `target` unbound.
    pub fn append(&mut self, gl: &mut dyn GraphicsContext, data: &[T]) {
        if data.is_empty() {
            return;
        }
        let Some(handle) = self.handle else {
            log::warn!("ribbon: append to released {} buffer ignored", self.label);
            return;
        };

        let start = self.used;
        let end = start + data.len();
        gl.bind_buffer(self.target, Some(handle));

        if end <= self.capacity() {
            self.backing[start..end].copy_from_slice(data);
            gl.buffer_sub_data(
                self.target,
                start * size_of::<T>(),
                bytemuck::cast_slice(&self.backing[start..end]),
            );
        } else {
            let old = self.capacity();
            let mut capacity = old.max(1);
            while capacity < end {
                capacity = ((capacity as f64 * self.growth_factor).floor() as usize).max(capacity + 1);
            }
            log::warn!(
                "ribbon: {} buffer full ({start} + {} > {old}); growing to {capacity}",
                self.label,
                data.len()
            );

            self.backing.resize(capacity, T::zeroed());
            self.backing[start..end].copy_from_slice(data);

            gl.buffer_data(self.target, capacity * size_of::<T>(), BufferUsage::DynamicDraw);
            gl.buffer_sub_data(self.target, 0, bytemuck::cast_slice(&self.backing[..end]));
            self.growth_events += 1;
        }

        gl.bind_buffer(self.target, None);
        self.used = end;
    }

    /// Deletes the device buffer and drops the CPU copy. Idempotent.
    pub fn release(&mut self, gl: &mut dyn GraphicsContext) {
        if let Some(handle) = self.handle.take() {
            gl.delete_buffer(handle);
        }
        self.backing = Vec::new();
        self.used = 0;
    }
}

/// Counters exposed for diagnostics.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct BufferStats {
    pub position_floats: usize,
    pub index_count: usize,
    pub texcoord_floats: usize,
    pub position_capacity: usize,
    pub index_capacity: usize,
    pub texcoord_capacity: usize,
    /// Reallocations across all three buffers.
    pub growth_events: u32,
}

/// The three parallel ribbon buffers.
#[derive(Debug)]
pub struct GpuBufferSet {
    pub positions: GrowableBuffer<f32>,
    pub indices: GrowableBuffer<u16>,
    pub texcoords: GrowableBuffer<f32>,
}

impl GpuBufferSet {
    /// Creates all three buffers with capacities in elements.
    pub fn new(
        gl: &mut dyn GraphicsContext,
        (positions, indices, texcoords): (usize, usize, usize),
        growth_factor: f64,
    ) -> Result<Self, RibbonError> {
        Ok(Self {
            positions: GrowableBuffer::new(gl, "position", BufferTarget::Array, positions, growth_factor)?,
            indices: GrowableBuffer::new(gl, "index", BufferTarget::ElementArray, indices, growth_factor)?,
            texcoords: GrowableBuffer::new(gl, "texcoord", BufferTarget::Array, texcoords, growth_factor)?,
        })
    }

    /// Appends one batch to each buffer independently. Returns the index count
    /// to draw afterwards.
    pub fn upload(
        &mut self,
        gl: &mut dyn GraphicsContext,
        positions: &[f32],
        indices: &[u16],
        texcoords: &[f32],
    ) -> u32 {
        self.positions.append(gl, positions);
        self.indices.append(gl, indices);
        self.texcoords.append(gl, texcoords);

        log::debug!(
            "ribbon: {} vertices, {} indices uploaded",
            self.positions.used() / 3,
            self.indices.used()
        );
        self.indices.used() as u32
    }

    pub fn release(&mut self, gl: &mut dyn GraphicsContext) {
        self.positions.release(gl);
        self.indices.release(gl);
        self.texcoords.release(gl);
    }

    pub fn stats(&self) -> BufferStats {
        BufferStats {
            position_floats: self.positions.used(),
            index_count: self.indices.used(),
            texcoord_floats: self.texcoords.used(),
            position_capacity: self.positions.capacity(),
            index_capacity: self.indices.capacity(),
            texcoord_capacity: self.texcoords.capacity(),
            growth_events: self.positions.growth_events()
                + self.indices.growth_events()
                + self.texcoords.growth_events(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::{Call, HeadlessContext};

    fn index_buffer(gl: &mut HeadlessContext, capacity: usize) -> GrowableBuffer<u16> {
        GrowableBuffer::new(gl, "index", BufferTarget::ElementArray, capacity, 1.5).unwrap()
    }

    // ── fits ──────────────────────────────────────────────────────────────

    #[test]
    fn append_within_capacity_is_a_partial_upload() {
        let mut gl = HeadlessContext::new();
        let mut buf = index_buffer(&mut gl, 12);
        gl.clear_calls();

        buf.append(&mut gl, &[1, 2, 3]);
        buf.append(&mut gl, &[4, 5]);

        assert_eq!(buf.used(), 5);
        assert_eq!(buf.capacity(), 12);
        assert_eq!(buf.growth_events(), 0);
        let handle = buf.handle().unwrap();
        assert_eq!(gl.buffer_allocations(handle), 1);
        assert!(gl.calls().contains(&Call::BufferSubData {
            target: BufferTarget::ElementArray,
            offset: 6,
            len: 4,
        }));
        let bytes = gl.buffer_contents(handle).unwrap();
        let written: Vec<u16> = bytes[..10]
            .chunks_exact(2)
            .map(|c| u16::from_ne_bytes([c[0], c[1]]))
            .collect();
        assert_eq!(written, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn exact_fit_does_not_grow() {
        let mut gl = HeadlessContext::new();
        let mut buf = index_buffer(&mut gl, 6);
        buf.append(&mut gl, &[0, 1, 2, 0, 2, 3]);
        assert_eq!(buf.growth_events(), 0);
        assert_eq!(buf.capacity(), 6);
    }

    #[test]
    fn append_unbinds_target() {
        let mut gl = HeadlessContext::new();
        let mut buf = index_buffer(&mut gl, 6);
        buf.append(&mut gl, &[7]);
        assert_eq!(gl.bound_buffer(BufferTarget::ElementArray), None);
    }

    // ── growth ────────────────────────────────────────────────────────────

    #[test]
    fn overflow_grows_once_and_preserves_contents() {
        let mut gl = HeadlessContext::new();
        let mut buf = index_buffer(&mut gl, 6);
        buf.append(&mut gl, &[10, 11, 12, 13]);
        let handle = buf.handle().unwrap();
        let before = gl.buffer_contents(handle).unwrap()[..8].to_vec();

        buf.append(&mut gl, &[20, 21, 22]);

        assert_eq!(buf.capacity(), 9);
        assert_eq!(buf.growth_events(), 1);
        assert_eq!(gl.buffer_allocations(handle), 2);
        assert_eq!(gl.buffer_usage(handle), Some(BufferUsage::DynamicDraw));
        let after = gl.buffer_contents(handle).unwrap();
        assert_eq!(after.len(), 18);
        assert_eq!(&after[..8], before.as_slice());
        assert_eq!(buf.contents(), &[10, 11, 12, 13, 20, 21, 22]);
    }

    #[test]
    fn large_overflow_repeats_growth_in_one_event() {
        let mut gl = HeadlessContext::new();
        let mut buf = index_buffer(&mut gl, 4);
        buf.append(&mut gl, &[0; 20]);
        // 4 -> 6 -> 9 -> 13 -> 19 -> 28
        assert_eq!(buf.capacity(), 28);
        assert_eq!(buf.growth_events(), 1);
        assert_eq!(buf.used(), 20);
    }

    #[test]
    fn release_deletes_the_device_buffer() {
        let mut gl = HeadlessContext::new();
        let mut buf = index_buffer(&mut gl, 4);
        let handle = buf.handle().unwrap();
        buf.release(&mut gl);
        buf.release(&mut gl);
        assert_eq!(gl.deleted_buffers(), &[handle]);
        assert_eq!(buf.handle(), None);

        buf.append(&mut gl, &[1]);
        assert_eq!(buf.used(), 0);
        assert!(gl.errors().is_empty());
    }

    // ── set ───────────────────────────────────────────────────────────────

    #[test]
    fn buffer_set_stats_track_each_buffer() {
        let mut gl = HeadlessContext::new();
        let mut set = GpuBufferSet::new(&mut gl, (12, 6, 16), 1.5).unwrap();
        let count = set.upload(&mut gl, &[0.0; 12], &[0, 1, 2, 0, 2, 3], &[0.0; 16]);
        assert_eq!(count, 6);

        set.upload(&mut gl, &[0.0; 12], &[4, 5, 6, 4, 6, 7], &[0.0; 16]);
        let stats = set.stats();
        assert_eq!(stats.index_count, 12);
        assert_eq!(stats.position_floats, 24);
        // 6 -> 9 -> 13
        assert_eq!(stats.index_capacity, 13);
        assert_eq!(stats.position_capacity, 27);
        assert_eq!(stats.texcoord_capacity, 36);
        assert_eq!(stats.growth_events, 3);
    }
}

use super::Primitive;

/// Number of `f32` slots per primitive record: `[x, y, z, shape_tag]`.
pub const RECORD_STRIDE: usize = 4;

/// Flat, shader-consumable encoding of the scene's primitives.
///
/// Two kinds of change are distinguishable by consumers:
/// - structural (add/remove): the storage is reallocated and
///   [`generation`](Self::generation) advances
/// - value (per-frame position refresh): contents are rewritten in place,
///   storage and generation stay the same
#[derive(Debug, Default, Clone)]
pub struct SceneBuffer {
    data: Vec<f32>,
    generation: u64,
}

impl SceneBuffer {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reallocates to `RECORD_STRIDE * primitives.len()` and encodes every record.
    pub(crate) fn rebuild<'a, I>(&mut self, primitives: I, count: usize)
    where
        I: IntoIterator<Item = &'a Primitive>,
    {
        self.data = vec![0.0; RECORD_STRIDE * count];
        self.generation = self.generation.wrapping_add(1);
        self.refresh(primitives);
    }

    /// Rewrites every record in place.
    pub(crate) fn refresh<'a, I>(&mut self, primitives: I)
    where
        I: IntoIterator<Item = &'a Primitive>,
    {
        for (record, p) in self.data.chunks_exact_mut(RECORD_STRIDE).zip(primitives) {
            record[0] = p.position.x;
            record[1] = p.position.y;
            record[2] = p.position.z;
            record[3] = p.shape().tag_f32();
        }
    }

    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.data)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of encoded primitives.
    #[inline]
    pub fn primitive_count(&self) -> usize {
        self.data.len() / RECORD_STRIDE
    }

    /// Advances on every reallocation.
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Iterates `(position, tag)` per record.
    pub fn records(&self) -> impl Iterator<Item = ([f32; 3], u32)> + '_ {
        self.data
            .chunks_exact(RECORD_STRIDE)
            .map(|r| ([r[0], r[1], r[2]], r[3] as u32))
    }
}

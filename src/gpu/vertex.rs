/// Vertex assembly (vertex pulling)
/// Resolves gl_VertexID through the optional index buffer and reads
/// vertex attributes from buffers.
use super::attrib::{InVertex, MAX_ATTRIBUTES};
use super::error::GpuError;
use super::memory::{Buffer, IndexType, VertexArray};

pub struct VertexPuller<'a> {
    vertex_array: &'a VertexArray,
    index_buffer: Option<(usize, &'a Buffer)>,
    attrib_buffers: [Option<(usize, &'a Buffer)>; MAX_ATTRIBUTES],
}

fn lookup(buffers: &[Buffer], id: usize) -> Result<(usize, &Buffer), GpuError> {
    buffers.get(id).map(|b| (id, b)).ok_or(GpuError::InvalidBuffer(id))
}

fn read_bytes<'a>(
    (id, buffer): (usize, &'a Buffer),
    offset: u64,
    len: usize,
) -> Result<&'a [u8], GpuError> {
    let overrun = GpuError::BufferOverrun { buffer: id, offset, len, size: buffer.size() };
    let start = usize::try_from(offset).map_err(|_| overrun.clone())?;
    start
        .checked_add(len)
        .and_then(|end| buffer.bytes().get(start..end))
        .ok_or(overrun)
}

impl<'a> VertexPuller<'a> {
    /// Resolve every buffer referenced by `vertex_array` up front.
    pub fn new(vertex_array: &'a VertexArray, buffers: &'a [Buffer]) -> Result<Self, GpuError> {
        let index_buffer = vertex_array
            .index_buffer_id
            .map(|id| lookup(buffers, id))
            .transpose()?;

        let mut attrib_buffers = [None; MAX_ATTRIBUTES];
        for (slot, attrib) in attrib_buffers.iter_mut().zip(&vertex_array.vertex_attrib) {
            if attrib.attrib_type.components() == 0 {
                continue;
            }
            *slot = attrib.buffer_id.map(|id| lookup(buffers, id)).transpose()?;
        }

        Ok(Self { vertex_array, index_buffer, attrib_buffers })
    }

    /// gl_VertexID of the `invocation`-th vertex of the draw.
    pub fn vertex_id(&self, invocation: u32) -> Result<u32, GpuError> {
        let Some(index_buffer) = self.index_buffer else {
            return Ok(invocation);
        };
        let index_type = self.vertex_array.index_type;
        let offset = self.vertex_array.index_offset + invocation as u64 * index_type.size() as u64;
        let bytes = read_bytes(index_buffer, offset, index_type.size())?;
        Ok(match index_type {
            IndexType::U8 => bytes[0] as u32,
            IndexType::U16 => u16::from_le_bytes([bytes[0], bytes[1]]) as u32,
            IndexType::U32 => u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
        })
    }

    pub fn pull(&self, invocation: u32) -> Result<InVertex, GpuError> {
        let mut vertex = InVertex {
            gl_vertex_id: self.vertex_id(invocation)?,
            ..InVertex::default()
        };

        for (a, attrib) in self.vertex_array.vertex_attrib.iter().enumerate() {
            let Some(buffer) = self.attrib_buffers[a] else {
                continue;
            };
            let offset = attrib.offset + attrib.stride * vertex.gl_vertex_id as u64;
            let bytes = read_bytes(buffer, offset, attrib.attrib_type.size())?;
            vertex.attributes[a].load_le_bytes(bytes);
        }

        Ok(vertex)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::attrib::AttribType;
    use crate::gpu::memory::VertexAttrib;
    use glam::{Vec3, Vec4};

    #[test]
    fn without_indices_vertex_id_is_invocation() {
        let va = VertexArray::default();
        let puller = VertexPuller::new(&va, &[]).unwrap();
        assert_eq!(puller.pull(5).unwrap().gl_vertex_id, 5);
        assert_eq!(puller.pull(5).unwrap().attributes[0].v4(), Vec4::ONE);
    }

    #[test]
    fn u16_indices_with_offset() {
        let buffers = [Buffer::from_slice(&[9u16, 0, 1, 2, 7])];
        let va = VertexArray {
            index_buffer_id: Some(0),
            index_offset: 2,
            index_type: IndexType::U16,
            ..VertexArray::default()
        };
        let puller = VertexPuller::new(&va, &buffers).unwrap();
        let ids: Vec<u32> = (0..4).map(|i| puller.vertex_id(i).unwrap()).collect();
        assert_eq!(ids, [0, 1, 2, 7]);
    }

    #[test]
    fn interleaved_attributes() {
        // position vec3 + uv vec2, stride 20 bytes
        let data: [f32; 10] = [0.0, 1.0, 2.0, 0.5, 0.25, 3.0, 4.0, 5.0, 0.75, 1.0];
        let buffers = [Buffer::from_slice(&data)];
        let mut va = VertexArray::default();
        va.vertex_attrib[0] = VertexAttrib::new(0, 20, 0, AttribType::Vec3);
        va.vertex_attrib[3] = VertexAttrib::new(0, 20, 12, AttribType::Vec2);
        let puller = VertexPuller::new(&va, &buffers).unwrap();

        let v = puller.pull(1).unwrap();
        assert_eq!(v.attributes[0].v3(), Vec3::new(3.0, 4.0, 5.0));
        // untouched lanes keep the default
        assert_eq!(v.attributes[0].v4().w, 1.0);
        assert_eq!(v.attributes[3].v2().x, 0.75);
        assert_eq!(v.attributes[1].v4(), Vec4::ONE);
    }

    #[test]
    fn reading_past_the_buffer_fails() {
        let buffers = [Buffer::from_slice(&[0u8, 1, 2])];
        let va = VertexArray {
            index_buffer_id: Some(0),
            index_type: IndexType::U8,
            ..VertexArray::default()
        };
        let puller = VertexPuller::new(&va, &buffers).unwrap();
        assert!(puller.vertex_id(2).is_ok());
        assert!(matches!(puller.vertex_id(3), Err(GpuError::BufferOverrun { buffer: 0, .. })));
    }

    #[test]
    fn unknown_buffer_is_rejected() {
        let mut va = VertexArray::default();
        va.vertex_attrib[0] = VertexAttrib::new(4, 12, 0, AttribType::Vec3);
        assert_eq!(VertexPuller::new(&va, &[]).err(), Some(GpuError::InvalidBuffer(4)));
    }
}

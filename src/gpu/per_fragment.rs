/// Per-fragment operations
/// Order: stencil test, depth test, fragment shader, discard,
/// stencil/depth update, blending and colour write.
use glam::Vec4;

use super::attrib::{InFragment, OutFragment, Program, ShaderInterface};
use super::framebuffer::Framebuffer;
use super::memory::{BlockWrites, StencilOp, StencilSettings};
use crate::count_call;
use crate::perf::FUNCTION_COUNTERS;

/// Fixed-function state applied to every fragment of a draw
pub struct FragmentStage<'a> {
    pub framebuffer: &'a Framebuffer,
    pub program: &'a Program,
    pub stencil: &'a StencilSettings,
    pub block_writes: BlockWrites,
    pub shader_interface: &'a ShaderInterface<'a>,
}

/// `dst * (1 - a) + src * a`, keeping the source alpha
#[inline]
pub fn blend(dst: Vec4, src: Vec4) -> Vec4 {
    let a = src.w;
    (dst.truncate() * (1.0 - a) + src.truncate() * a).extend(a)
}

impl<'a> FragmentStage<'a> {
    #[inline]
    fn update_stencil(&self, x: u32, row: u32, value: u8, op: StencilOp) {
        if self.block_writes.stencil || op == StencilOp::Keep {
            return;
        }
        self.framebuffer
            .stencil
            .write_stencil(x, row, op.apply(value, self.stencil.ref_value));
    }

    /// Run one fragment at framebuffer pixel (x, y).
    /// Returns `true` when the fragment reached the colour/depth write.
    pub fn process(&self, x: u32, y: u32, fragment: &InFragment, front_facing: bool) -> bool {
        let fb = self.framebuffer;
        if !fb.contains(x, y) {
            return false;
        }
        let row = fb.memory_row(y);
        let ops = self.stencil.ops(front_facing);

        // Stencil value is only tracked when the test is active
        let stencil_value = if self.stencil.enabled {
            fb.stencil.read_stencil(x, row)
        } else {
            None
        };

        if let Some(value) = stencil_value {
            if !self.stencil.func.test(value as u32, self.stencil.ref_value) {
                count_call!(FUNCTION_COUNTERS.stencil_test_failed);
                self.update_stencil(x, row, value, ops.sfail);
                return false;
            }
        }

        let depth = fragment.gl_frag_coord.z;
        if let Some(stored) = fb.depth.read_depth(x, row) {
            if !(depth < stored) {
                count_call!(FUNCTION_COUNTERS.depth_test_failed);
                if let Some(value) = stencil_value {
                    self.update_stencil(x, row, value, ops.dpfail);
                }
                return false;
            }
        }

        let mut out = OutFragment::default();
        if let Some(fragment_shader) = self.program.fragment_shader {
            fragment_shader(&mut out, fragment, self.shader_interface);
        }
        if out.discard {
            count_call!(FUNCTION_COUNTERS.fragments_discarded);
            return false;
        }

        if let Some(value) = stencil_value {
            self.update_stencil(x, row, value, ops.dppass);
        }

        if !self.block_writes.depth {
            fb.depth.write_depth(x, row, depth);
        }

        if !self.block_writes.color {
            let src = out.gl_frag_color.clamp(Vec4::ZERO, Vec4::ONE);
            fb.color.update_color(x, row, |dst| blend(dst, src));
        }

        count_call!(FUNCTION_COUNTERS.fragments_written);
        true
    }
}

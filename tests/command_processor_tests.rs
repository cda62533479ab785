use glam::Vec4;
use softgpu::gpu::{
    run, CommandBuffer, Framebuffer, GpuError, GpuLimits, GpuMemory, StencilFunc, StencilOp, StencilOps,
    StencilSettings, MAX_COMMANDS, MAX_SUB_COMMAND_DEPTH,
};
use std::sync::Arc;

/// Helper: memory with small tables and a `width x height` default framebuffer
fn small_memory(width: u32, height: u32) -> GpuMemory {
    let limits = GpuLimits {
        max_uniforms: 16,
        max_vertex_arrays: 4,
        max_textures: 4,
        max_buffers: 4,
        max_programs: 4,
        max_framebuffers: 2,
    };
    let mut mem = GpuMemory::new(limits);
    mem.set_default_framebuffer(Framebuffer::new(width, height));
    mem
}

fn close(a: Vec4, b: Vec4) -> bool {
    (a - b).abs().max_element() <= 2.0 / 255.0
}

#[test]
fn test_clears_fill_every_attachment() {
    let mut mem = small_memory(3, 2);
    let mut cb = CommandBuffer::new();
    cb.push_clear_color(Vec4::new(0.2, 0.4, 0.6, 1.0))
        .unwrap()
        .push_clear_depth(0.25)
        .unwrap()
        .push_clear_stencil(7)
        .unwrap();
    run(&mut mem, &cb).unwrap();

    let fb = &mem.framebuffers[0];
    for y in 0..2 {
        for x in 0..3 {
            assert!(close(fb.color_at(x, y).unwrap(), Vec4::new(0.2, 0.4, 0.6, 1.0)));
            assert_eq!(fb.depth_at(x, y), Some(0.25));
            assert_eq!(fb.stencil_at(x, y), Some(7));
        }
    }
}

#[test]
fn test_clear_targets_bound_framebuffer_only() {
    let mut mem = small_memory(2, 2);
    mem.framebuffers[1] = Framebuffer::new(2, 2);

    let mut cb = CommandBuffer::new();
    cb.push_bind_framebuffer(1).unwrap().push_clear_color(Vec4::new(1.0, 0.0, 0.0, 1.0)).unwrap();
    run(&mut mem, &cb).unwrap();

    assert_eq!(mem.framebuffers[1].color_at(1, 1), Some(Vec4::new(1.0, 0.0, 0.0, 1.0)));
    assert_eq!(mem.framebuffers[0].color_at(1, 1), Some(Vec4::ZERO));
}

#[test]
fn test_missing_attachment_clear_is_skipped() {
    let mut mem = small_memory(2, 2);
    mem.framebuffers[0] = Framebuffer::new(2, 2).without_stencil();

    let mut cb = CommandBuffer::new();
    cb.push_clear_stencil(3).unwrap().push_clear_depth(0.5).unwrap();
    run(&mut mem, &cb).unwrap();

    assert_eq!(mem.framebuffers[0].stencil_at(0, 0), None);
    assert_eq!(mem.framebuffers[0].depth_at(0, 0), Some(0.5));
}

#[test]
fn test_state_commands_update_memory() {
    let mut mem = small_memory(1, 1);
    let stencil = StencilSettings {
        enabled: true,
        func: StencilFunc::Greater,
        ref_value: 4,
        front_ops: StencilOps::all(StencilOp::Replace),
        back_ops: StencilOps::all(StencilOp::Zero),
    };

    let mut cb = CommandBuffer::new();
    cb.push_bind_program(2)
        .unwrap()
        .push_bind_vertex_array(3)
        .unwrap()
        .push_block_writes(true, false, true)
        .unwrap()
        .push_set_backface_culling(true)
        .unwrap()
        .push_set_front_face(false)
        .unwrap()
        .push_set_stencil(stencil)
        .unwrap();
    run(&mut mem, &cb).unwrap();

    assert_eq!(mem.activated_program, 2);
    assert_eq!(mem.activated_vertex_array, 3);
    assert!(mem.block_writes.color && !mem.block_writes.depth && mem.block_writes.stencil);
    assert!(mem.backface_culling.enabled);
    assert!(!mem.backface_culling.front_face_is_counter_clockwise);
    assert_eq!(mem.stencil_settings, stencil);

    mem.reset_state();
    assert_eq!(mem.activated_program, 0);
    assert!(!mem.backface_culling.enabled);
    assert_eq!(mem.stencil_settings, StencilSettings::default());
}

#[test]
fn test_draw_id_advances_across_sub_commands() {
    let mut mem = small_memory(1, 1);

    let mut sub = CommandBuffer::new();
    sub.push_draw(0)
        .unwrap()
        .push_user(|mem: &mut GpuMemory| {
            let id = mem.gl_draw_id;
            mem.uniforms[0].set_u1(id);
        })
        .unwrap();

    let mut cb = CommandBuffer::new();
    cb.push_set_draw_id(5)
        .unwrap()
        .push_draw(0)
        .unwrap()
        .push_sub_command(Arc::new(sub))
        .unwrap()
        .push_draw(0)
        .unwrap()
        .push_user(|mem: &mut GpuMemory| {
            let id = mem.gl_draw_id;
            mem.uniforms[1].set_u1(id);
        })
        .unwrap();
    run(&mut mem, &cb).unwrap();

    assert_eq!(mem.uniforms[0].u1(), 7);
    assert_eq!(mem.uniforms[1].u1(), 8);

    // every top-level run starts counting at zero
    let mut record = CommandBuffer::new();
    record
        .push_user(|mem: &mut GpuMemory| {
            let id = mem.gl_draw_id;
            mem.uniforms[2].set_u1(id);
        })
        .unwrap();
    mem.uniforms[2].set_u1(99);
    run(&mut mem, &record).unwrap();
    assert_eq!(mem.uniforms[2].u1(), 0);
}

#[test]
fn test_draw_id_wraps_at_the_top_of_the_range() {
    let mut mem = small_memory(1, 1);

    let mut cb = CommandBuffer::new();
    cb.push_set_draw_id(u32::MAX)
        .unwrap()
        .push_draw(0)
        .unwrap()
        .push_user(|mem: &mut GpuMemory| {
            let id = mem.gl_draw_id;
            mem.uniforms[0].set_u1(id);
        })
        .unwrap();
    mem.uniforms[0].set_u1(42);
    run(&mut mem, &cb).unwrap();
    assert_eq!(mem.uniforms[0].u1(), 0);
}

#[test]
fn test_shared_sub_command_runs_each_time() {
    let mut mem = small_memory(1, 1);

    let mut sub = CommandBuffer::new();
    sub.push_user(|mem: &mut GpuMemory| {
        let n = mem.uniforms[0].u1();
        mem.uniforms[0].set_u1(n + 1);
    })
    .unwrap();
    let sub = Arc::new(sub);

    let mut cb = CommandBuffer::new();
    cb.push_sub_command(sub.clone()).unwrap().push_sub_command(sub).unwrap();
    mem.uniforms[0].set_u1(0);
    run(&mut mem, &cb).unwrap();
    assert_eq!(mem.uniforms[0].u1(), 2);
}

fn nested(levels: usize) -> CommandBuffer {
    let mut cb = CommandBuffer::new();
    cb.push_clear_stencil(1).unwrap();
    for _ in 0..levels {
        let mut outer = CommandBuffer::new();
        outer.push_sub_command(Arc::new(cb)).unwrap();
        cb = outer;
    }
    cb
}

#[test]
fn test_nesting_limit() {
    let mut mem = small_memory(1, 1);
    run(&mut mem, &nested(MAX_SUB_COMMAND_DEPTH)).unwrap();
    assert_eq!(mem.framebuffers[0].stencil_at(0, 0), Some(1));

    let err = run(&mut mem, &nested(MAX_SUB_COMMAND_DEPTH + 1)).unwrap_err();
    assert_eq!(err, GpuError::NestingTooDeep(MAX_SUB_COMMAND_DEPTH));
}

#[test]
fn test_invalid_bindings_are_reported() {
    let mut mem = small_memory(1, 1);

    let mut cb = CommandBuffer::new();
    cb.push_bind_framebuffer(9).unwrap().push_clear_color(Vec4::ONE).unwrap();
    assert_eq!(run(&mut mem, &cb), Err(GpuError::InvalidFramebuffer(9)));

    mem.reset_state();
    let mut cb = CommandBuffer::new();
    cb.push_bind_program(4).unwrap().push_draw(3).unwrap();
    assert_eq!(run(&mut mem, &cb), Err(GpuError::InvalidProgram(4)));

    mem.reset_state();
    let mut cb = CommandBuffer::new();
    cb.push_bind_vertex_array(4).unwrap().push_draw(3).unwrap();
    assert_eq!(run(&mut mem, &cb), Err(GpuError::InvalidVertexArray(4)));
}

#[test]
fn test_command_buffer_capacity() {
    let mut cb = CommandBuffer::new();
    for _ in 0..MAX_COMMANDS {
        cb.push_draw(0).unwrap();
    }
    assert_eq!(cb.len(), MAX_COMMANDS);
    assert!(matches!(cb.push_draw(0), Err(GpuError::CommandBufferFull)));

    cb.clear();
    assert!(cb.is_empty());
    assert!(cb.push_draw(0).is_ok());
}

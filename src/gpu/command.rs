/// Command buffers
/// A command buffer is an ordered list of state changes, clears and draws
/// that `run` executes against a `GpuMemory`.
use glam::Vec4;
use std::fmt;
use std::sync::Arc;

use super::error::GpuError;
use super::memory::{BlockWrites, GpuMemory, StencilSettings};

/// Maximum number of commands in one buffer
pub const MAX_COMMANDS: usize = 10_000;

/// Clear depth of the methods whose depth buffer is never sampled
pub const DEFAULT_CLEAR_DEPTH: f32 = 1e10;

/// Clear depth just beyond the NDC far plane, for depth that is compared or sampled
pub const FAR_CLEAR_DEPTH: f32 = 2.0;

/// Host callback executed inside the command stream.
pub type UserCallback = Arc<dyn Fn(&mut GpuMemory) + Send + Sync>;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CommandType {
    Empty,
    BindFramebuffer,
    BindProgram,
    BindVertexArray,
    BlockWrites,
    SetBackfaceCulling,
    SetFrontFace,
    SetStencil,
    SetDrawId,
    User,
    ClearColor,
    ClearDepth,
    ClearStencil,
    Draw,
    SubCommand,
}

#[derive(Clone, Default)]
pub enum Command {
    #[default]
    Empty,
    BindFramebuffer(usize),
    BindProgram(usize),
    BindVertexArray(usize),
    BlockWrites(BlockWrites),
    SetBackfaceCulling(bool),
    /// `true` when counter-clockwise triangles face the viewer
    SetFrontFace(bool),
    SetStencil(StencilSettings),
    SetDrawId(u32),
    User(UserCallback),
    ClearColor(Vec4),
    ClearDepth(f32),
    ClearStencil(u8),
    /// Number of vertices
    Draw(u32),
    SubCommand(Arc<CommandBuffer>),
}

impl Command {
    pub fn command_type(&self) -> CommandType {
        match self {
            Command::Empty => CommandType::Empty,
            Command::BindFramebuffer(_) => CommandType::BindFramebuffer,
            Command::BindProgram(_) => CommandType::BindProgram,
            Command::BindVertexArray(_) => CommandType::BindVertexArray,
            Command::BlockWrites(_) => CommandType::BlockWrites,
            Command::SetBackfaceCulling(_) => CommandType::SetBackfaceCulling,
            Command::SetFrontFace(_) => CommandType::SetFrontFace,
            Command::SetStencil(_) => CommandType::SetStencil,
            Command::SetDrawId(_) => CommandType::SetDrawId,
            Command::User(_) => CommandType::User,
            Command::ClearColor(_) => CommandType::ClearColor,
            Command::ClearDepth(_) => CommandType::ClearDepth,
            Command::ClearStencil(_) => CommandType::ClearStencil,
            Command::Draw(_) => CommandType::Draw,
            Command::SubCommand(_) => CommandType::SubCommand,
        }
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Empty => write!(f, "Empty"),
            Command::BindFramebuffer(id) => write!(f, "BindFramebuffer({id})"),
            Command::BindProgram(id) => write!(f, "BindProgram({id})"),
            Command::BindVertexArray(id) => write!(f, "BindVertexArray({id})"),
            Command::BlockWrites(b) => write!(f, "BlockWrites({b:?})"),
            Command::SetBackfaceCulling(e) => write!(f, "SetBackfaceCulling({e})"),
            Command::SetFrontFace(ccw) => write!(f, "SetFrontFace(ccw={ccw})"),
            Command::SetStencil(s) => write!(f, "SetStencil({s:?})"),
            Command::SetDrawId(id) => write!(f, "SetDrawId({id})"),
            Command::User(_) => write!(f, "User(<callback>)"),
            Command::ClearColor(c) => write!(f, "ClearColor({c})"),
            Command::ClearDepth(d) => write!(f, "ClearDepth({d})"),
            Command::ClearStencil(s) => write!(f, "ClearStencil({s})"),
            Command::Draw(n) => write!(f, "Draw({n})"),
            Command::SubCommand(cb) => write!(f, "SubCommand({} commands)", cb.len()),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct CommandBuffer {
    commands: Vec<Command>,
}

impl CommandBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    /// Append a command, failing once `MAX_COMMANDS` is reached.
    pub fn push(&mut self, command: Command) -> Result<&mut Self, GpuError> {
        if self.commands.len() >= MAX_COMMANDS {
            return Err(GpuError::CommandBufferFull);
        }
        self.commands.push(command);
        Ok(self)
    }

    pub fn push_clear_color(&mut self, color: Vec4) -> Result<&mut Self, GpuError> {
        self.push(Command::ClearColor(color))
    }

    pub fn push_clear_depth(&mut self, depth: f32) -> Result<&mut Self, GpuError> {
        self.push(Command::ClearDepth(depth))
    }

    pub fn push_clear_stencil(&mut self, value: u8) -> Result<&mut Self, GpuError> {
        self.push(Command::ClearStencil(value))
    }

    pub fn push_draw(&mut self, nof_vertices: u32) -> Result<&mut Self, GpuError> {
        self.push(Command::Draw(nof_vertices))
    }

    pub fn push_bind_framebuffer(&mut self, id: usize) -> Result<&mut Self, GpuError> {
        self.push(Command::BindFramebuffer(id))
    }

    pub fn push_bind_program(&mut self, id: usize) -> Result<&mut Self, GpuError> {
        self.push(Command::BindProgram(id))
    }

    pub fn push_bind_vertex_array(&mut self, id: usize) -> Result<&mut Self, GpuError> {
        self.push(Command::BindVertexArray(id))
    }

    pub fn push_set_draw_id(&mut self, id: u32) -> Result<&mut Self, GpuError> {
        self.push(Command::SetDrawId(id))
    }

    pub fn push_sub_command(&mut self, sub: Arc<CommandBuffer>) -> Result<&mut Self, GpuError> {
        self.push(Command::SubCommand(sub))
    }

    pub fn push_set_stencil(&mut self, settings: StencilSettings) -> Result<&mut Self, GpuError> {
        self.push(Command::SetStencil(settings))
    }

    pub fn push_block_writes(
        &mut self,
        color: bool,
        depth: bool,
        stencil: bool,
    ) -> Result<&mut Self, GpuError> {
        self.push(Command::BlockWrites(BlockWrites { color, depth, stencil }))
    }

    pub fn push_set_backface_culling(&mut self, enabled: bool) -> Result<&mut Self, GpuError> {
        self.push(Command::SetBackfaceCulling(enabled))
    }

    pub fn push_set_front_face(&mut self, counter_clockwise: bool) -> Result<&mut Self, GpuError> {
        self.push(Command::SetFrontFace(counter_clockwise))
    }

    pub fn push_user<F>(&mut self, callback: F) -> Result<&mut Self, GpuError>
    where
        F: Fn(&mut GpuMemory) + Send + Sync + 'static,
    {
        self.push(Command::User(Arc::new(callback)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_helpers_chain() {
        let mut cb = CommandBuffer::new();
        cb.push_clear_color(Vec4::ZERO)
            .and_then(|cb| cb.push_clear_depth(FAR_CLEAR_DEPTH))
            .and_then(|cb| cb.push_draw(3))
            .unwrap();
        let types: Vec<_> = cb.commands().iter().map(Command::command_type).collect();
        assert_eq!(types, [CommandType::ClearColor, CommandType::ClearDepth, CommandType::Draw]);
    }

    #[test]
    fn clear_depth_keeps_the_pushed_value() {
        assert!(FAR_CLEAR_DEPTH > 1.0 && DEFAULT_CLEAR_DEPTH > FAR_CLEAR_DEPTH);

        let mut cb = CommandBuffer::new();
        cb.push_clear_depth(0.75).unwrap().push_clear_depth(DEFAULT_CLEAR_DEPTH).unwrap();
        assert!(matches!(cb.commands()[0], Command::ClearDepth(d) if d == 0.75));
        assert!(matches!(cb.commands()[1], Command::ClearDepth(d) if d == DEFAULT_CLEAR_DEPTH));
    }

    #[test]
    fn buffer_rejects_overflow() {
        let mut cb = CommandBuffer::new();
        for _ in 0..MAX_COMMANDS {
            cb.push(Command::Empty).unwrap();
        }
        assert_eq!(cb.push_draw(3).err(), Some(GpuError::CommandBufferFull));
        assert_eq!(cb.len(), MAX_COMMANDS);
    }

    #[test]
    fn command_type_ordinals() {
        assert_eq!(CommandType::Empty as u8, 0);
        assert_eq!(CommandType::User as u8, 9);
        assert_eq!(CommandType::SubCommand as u8, 14);
    }
}

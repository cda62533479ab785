use thiserror::Error;

use super::command::MAX_COMMANDS;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GpuError {
    #[error("command buffer is full ({MAX_COMMANDS} commands)")]
    CommandBufferFull,

    #[error("framebuffer {0} does not exist")]
    InvalidFramebuffer(usize),

    #[error("program {0} does not exist")]
    InvalidProgram(usize),

    #[error("vertex array {0} does not exist")]
    InvalidVertexArray(usize),

    #[error("buffer {0} does not exist")]
    InvalidBuffer(usize),

    #[error("texture {0} does not exist")]
    InvalidTexture(usize),

    #[error("uniform location {0} does not exist")]
    InvalidUniform(usize),

    #[error("read of {len} bytes at offset {offset} is outside buffer {buffer} ({size} bytes)")]
    BufferOverrun {
        buffer: usize,
        offset: u64,
        len: usize,
        size: usize,
    },

    #[error("sub command nesting exceeds {0} levels")]
    NestingTooDeep(usize),
}

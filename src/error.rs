// error.rs — construction-time failures. Nothing on the per-frame path
// returns these; invisible geometry is skipped and full buffers are flushed.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("{stage} shader failed to compile: {log}")]
    ShaderCompile { stage: &'static str, log: String },

    #[error("shader program failed to link: {0}")]
    ProgramLink(String),

    #[error("GPU buffer allocation failed: {0}")]
    BufferAllocation(String),

    #[error("invalid renderer config: {0}")]
    Config(String),

    #[error("config parse error: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("font error: {0}")]
    Font(String),
}

pub type Result<T, E = RenderError> = std::result::Result<T, E>;

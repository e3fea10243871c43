use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum RenderError {
    #[error("Terminal I/O error: {0}")]
    #[diagnostic(code(stepwatch::render::io))]
    Io(#[from] std::io::Error),

    #[error("Render task failed: {0}")]
    #[diagnostic(
        code(stepwatch::render::task),
        help("The renderer panicked or was aborted; tracked activities are unaffected")
    )]
    Task(#[from] tokio::task::JoinError),
}

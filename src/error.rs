/// Compile failure for an MML score. `offset` counts characters, not bytes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} at {offset} in MML\n{text}\n{pad}^", pad = caret(.offset))]
pub struct MmlSyntaxError {
    pub message: String,
    pub text: String,
    pub offset: usize,
}

impl MmlSyntaxError {
    pub fn new(message: impl Into<String>, text: &str, offset: usize) -> Self {
        MmlSyntaxError {
            message: message.into(),
            text: text.to_string(),
            offset,
        }
    }
}

fn caret(offset: &usize) -> String {
    " ".repeat(*offset)
}

#[derive(Debug, thiserror::Error)]
pub enum SynthError {
    #[error(transparent)]
    Mml(#[from] MmlSyntaxError),
    #[error("Parsing Error: {0}")]
    ParseError(String),
    #[error("File Error: {0}")]
    FileError(String),
    #[error("Audio Error: {0}")]
    AudioError(String),
    #[error("Buffer Error: {0}")]
    BufferError(String),
}

impl From<hound::Error> for SynthError {
    fn from(e: hound::Error) -> Self {
        SynthError::FileError(e.to_string())
    }
}

impl From<std::io::Error> for SynthError {
    fn from(e: std::io::Error) -> Self {
        SynthError::FileError(e.to_string())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Unknown studio: {0}")]
    UnknownStudio(String),

    #[error("Unknown playback action: {0}")]
    UnknownPlaybackAction(String),

    #[error("Validation failed: {0}")]
    Validation(String),
}

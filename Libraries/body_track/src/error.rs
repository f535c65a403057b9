//! Error type shared by the recorder, the track reader and the player.

/// Errors that can occur while recording or reading a body track.
///
/// - **Recording lifecycle**: [`SetupFailed`](Self::SetupFailed),
///   [`FinalizeFailed`](Self::FinalizeFailed),
///   [`NotRecording`](Self::NotRecording),
///   [`AlreadyRecording`](Self::AlreadyRecording),
///   [`StopInProgress`](Self::StopInProgress).
/// - **Reading**: [`TrackNotFound`](Self::TrackNotFound),
///   [`MalformedPayload`](Self::MalformedPayload).
/// - **Container and I/O**: [`Container`](Self::Container), [`Io`](Self::Io).
#[derive(Debug, thiserror::Error)]
pub enum BodyTrackError {
    /// The capture session or the output container could not be configured.
    #[error("setup failed: {0}")]
    SetupFailed(String),

    /// The container could not be closed cleanly. The output file is unusable.
    #[error("finalize failed: {0}")]
    FinalizeFailed(String),

    /// The movie has no metadata track declaring this identifier and data type.
    #[error("no metadata track with identifier {identifier} and data type {data_type}")]
    TrackNotFound { identifier: String, data_type: String },

    /// A metadata item or joint payload could not be decoded.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// The movie structure could not be parsed or written.
    #[error("container error: {0}")]
    Container(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A configuration file is not valid JSON for its type.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("not recording")]
    NotRecording,

    #[error("already recording")]
    AlreadyRecording,

    /// `stop` was called while a previous stop is still finalizing the file.
    #[error("stop already in progress")]
    StopInProgress,

    /// A capture instant lies before the start of the recording.
    #[error("invalid time: {0}")]
    InvalidTime(String),
}

/// Convenience alias for `Result<T, BodyTrackError>`.
pub type Result<T> = std::result::Result<T, BodyTrackError>;

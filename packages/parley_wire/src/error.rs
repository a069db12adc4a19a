use std::io;

/// Errors surfaced by the framing layer.
///
/// A clean close at a frame boundary is not an error; [`read_frame`]
/// reports it as `Ok(None)`. Everything here terminates the connection that
/// produced it — framing faults are never retried.
///
/// [`read_frame`]: crate::read_frame
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// The peer closed the stream in the middle of a frame.
    #[error("connection closed mid-frame")]
    Closed,

    /// The length prefix announced a frame above the protocol cap.
    #[error("frame too large: {len} bytes (max {max})")]
    FrameTooLarge { len: usize, max: usize },

    /// The frame payload was not valid UTF-8.
    #[error("frame payload is not valid UTF-8")]
    InvalidUtf8,

    /// Lower-level I/O fault (reset, broken pipe, ...).
    #[error(transparent)]
    Io(#[from] io::Error),
}

//! # Camera Client
//!
//! The camera client recieves frames from the forward camera feed. Frames arrive on a channel
//! filled by the feed and the client hands the most recent one to the caller, dropping any
//! backlog so the classifier only ever sees the latest view of the road.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::sync::mpsc::{channel, Receiver, Sender, TryRecvError};

use comms_if::eqpt::cam::CamFrame;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The camera client
pub struct CamClient {
    reciever: Receiver<CamFrame>
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum CamClientError {

    #[error("The camera feed has disconnected")]
    FeedDisconnected
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl CamClient {
    /// Create a new instance of the camera client.
    ///
    /// Also returns the sender the camera feed pushes frames into.
    pub fn new() -> (Self, Sender<CamFrame>) {
        let (sender, reciever) = channel();

        (Self { reciever }, sender)
    }

    /// Get the most recent frame from the feed, or `None` if no new frame has arrived since the
    /// last call.
    pub fn latest_frame(&mut self) -> Result<Option<CamFrame>, CamClientError> {
        let mut latest = None;

        loop {
            match self.reciever.try_recv() {
                Ok(frame) => latest = Some(frame),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    return Err(CamClientError::FeedDisconnected)
                }
            }
        }

        Ok(latest)
    }
}

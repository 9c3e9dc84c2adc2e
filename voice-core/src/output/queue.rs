use crossbeam_channel::{Receiver, Sender, TrySendError};

use crate::models::error::VoiceError;
use crate::output::stream::Stream;

/// Where a network-fed stream plays from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteSource {
    pub url: String,
    /// Seconds into the source to start at; 0 plays from the beginning.
    pub start_offset_secs: u32,
}

/// Receives the built stream, or the reason it couldn't be built.
///
/// Runs on the output control thread; keep it short.
pub type CreationCallback = Box<dyn FnOnce(Result<Stream, VoiceError>) + Send>;

/// One pending stream creation. `remote` absent means a local stream.
pub struct CreationRequest {
    pub remote: Option<RemoteSource>,
    pub on_created: CreationCallback,
}

impl CreationRequest {
    pub fn local(on_created: CreationCallback) -> Self {
        Self {
            remote: None,
            on_created,
        }
    }

    pub fn remote(source: RemoteSource, on_created: CreationCallback) -> Self {
        Self {
            remote: Some(source),
            on_created,
        }
    }

    /// Complete the request without building anything.
    pub(crate) fn fail(self, error: VoiceError) {
        (self.on_created)(Err(error));
    }
}

/// Caller side of the stream creation queue.
#[derive(Clone)]
pub struct RequestSender {
    tx: Sender<CreationRequest>,
}

impl RequestSender {
    /// Enqueue without blocking.
    ///
    /// Fails with `QueueFull` when the queue is at capacity and
    /// `EngineStopped` when the control thread is gone. The request's
    /// callback is dropped uncalled in both cases.
    pub fn submit(&self, request: CreationRequest) -> Result<(), VoiceError> {
        self.tx.try_send(request).map_err(|e| match e {
            TrySendError::Full(_) => VoiceError::QueueFull,
            TrySendError::Disconnected(_) => VoiceError::EngineStopped,
        })
    }

    pub fn pending(&self) -> usize {
        self.tx.len()
    }
}

/// Control-thread side of the stream creation queue.
pub struct RequestReceiver {
    rx: Receiver<CreationRequest>,
}

impl RequestReceiver {
    /// Everything queued right now, in submission order.
    pub fn drain(&self) -> impl Iterator<Item = CreationRequest> + '_ {
        self.rx.try_iter()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

/// Bounded MPSC queue carrying creation requests to the control thread.
pub fn creation_queue(capacity: usize) -> (RequestSender, RequestReceiver) {
    let (tx, rx) = crossbeam_channel::bounded(capacity.max(1));
    (RequestSender { tx }, RequestReceiver { rx })
}

/// Identifies one requested animation frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRequest(u64);

/// Schedule/cancel handle for a per-frame loop.
///
/// Holds at most one pending request: scheduling cancels whatever was pending
/// first, so a loop can never be queued twice. The owner checks
/// [`FrameLoop::take`] when the host delivers a frame and reschedules only if
/// it wants another one.
#[derive(Debug, Default)]
pub struct FrameLoop {
    issued: u64,
    pending: Option<FrameRequest>,
}

impl FrameLoop {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self) -> FrameRequest {
        self.cancel();
        self.issued += 1;
        let request = FrameRequest(self.issued);
        self.pending = Some(request);
        request
    }

    /// Returns whether a request was actually pending.
    pub fn cancel(&mut self) -> bool {
        self.pending.take().is_some()
    }

    /// Consumes the pending request, if any, for the frame being delivered.
    pub fn take(&mut self) -> Option<FrameRequest> {
        self.pending.take()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending(&self) -> Option<FrameRequest> {
        self.pending
    }
}

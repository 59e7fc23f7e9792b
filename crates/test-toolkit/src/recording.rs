use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use watcher::{header_line, termination_line, BlockHeader, HeaderReporter, SubscriptionError};

/// Captures the lines the watcher would log, in order. Clones share the
/// same buffer, so a test can keep one while the watcher owns another.
#[derive(Clone, Default)]
pub struct RecordingReporter {
    lines: Arc<Mutex<Vec<String>>>,
    acks: Option<mpsc::UnboundedSender<BlockHeader>>,
}

impl RecordingReporter {
    /// A reporter that echoes every reported header back to the test, so the
    /// test can wait for a header to be handled before sending the next event.
    pub fn acknowledging() -> (Self, mpsc::UnboundedReceiver<BlockHeader>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let reporter = Self {
            lines: Arc::default(),
            acks: Some(tx),
        };
        (reporter, rx)
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }
}

impl HeaderReporter for RecordingReporter {
    fn on_header(&mut self, header: &BlockHeader) {
        self.lines.lock().unwrap().push(header_line(header));
        if let Some(acks) = &self.acks {
            let _ = acks.send(header.clone());
        }
    }

    fn on_termination(&mut self, reason: &SubscriptionError) {
        log::debug!("recorded termination: {reason}");
        self.lines.lock().unwrap().push(termination_line(reason));
    }
}

use crate::errors::SubscriptionError;
use crate::header::BlockHeader;
use crate::source::HeaderSubscription;
use futures_util::StreamExt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherState {
    Running,
    Terminated,
}

/// Receives what the watcher observes. Called from the watcher's single loop,
/// one event at a time.
pub trait HeaderReporter {
    fn on_header(&mut self, header: &BlockHeader);

    /// Called exactly once, when the watcher terminates.
    fn on_termination(&mut self, reason: &SubscriptionError);
}

pub fn header_line(header: &BlockHeader) -> String {
    format!("New block: {}", header.number)
}

pub fn termination_line(reason: &SubscriptionError) -> String {
    format!("Subscription terminated: {reason}")
}

/// Reports through the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl HeaderReporter for LogReporter {
    fn on_header(&mut self, header: &BlockHeader) {
        log::info!("{}", header_line(header));
        log::debug!(
            "block {} hash={} parent={} timestamp={} gas_used={} base_fee={:?}",
            header.number,
            header.hash,
            header.parent_hash,
            header.timestamp,
            header.gas_used,
            header.base_fee_per_gas,
        );
    }

    fn on_termination(&mut self, reason: &SubscriptionError) {
        log::error!("{}", termination_line(reason));
    }
}

/// How a watcher ended, handed back so the caller can pick an exit policy.
#[derive(Debug)]
pub struct Termination<R> {
    pub reason: SubscriptionError,
    pub reporter: R,
}

/// Consumes one new-heads subscription until it fails.
///
/// `Running` -> `Terminated` is the only transition. There is no way back, so a
/// restart means a new connection, a new subscription and a new watcher.
pub struct HeaderWatcher<R> {
    subscription: HeaderSubscription,
    reporter: R,
    termination: Option<SubscriptionError>,
}

impl<R: HeaderReporter> HeaderWatcher<R> {
    pub fn new(subscription: HeaderSubscription, reporter: R) -> Self {
        Self {
            subscription,
            reporter,
            termination: None,
        }
    }

    pub fn state(&self) -> WatcherState {
        match self.termination {
            Some(_) => WatcherState::Terminated,
            None => WatcherState::Running,
        }
    }

    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    /// Handles exactly one event. A pending error always wins over buffered
    /// headers.
    pub async fn step(&mut self) -> WatcherState {
        if self.termination.is_some() {
            return WatcherState::Terminated;
        }

        let subscription = &mut self.subscription;
        let reason = tokio::select! {
            biased;

            error = &mut subscription.errors => error.unwrap_or(SubscriptionError::Closed),
            header = subscription.headers.next() => match header {
                Some(header) => {
                    self.reporter.on_header(&header);
                    return WatcherState::Running;
                }
                // The header side ended first; the error side says why.
                None => (&mut subscription.errors)
                    .await
                    .unwrap_or(SubscriptionError::Closed),
            },
        };

        self.reporter.on_termination(&reason);
        self.termination = Some(reason);
        WatcherState::Terminated
    }

    pub async fn run(mut self) -> Termination<R> {
        while self.step().await == WatcherState::Running {}

        Termination {
            reason: self.termination.unwrap_or(SubscriptionError::Closed),
            reporter: self.reporter,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::subscription_channel;
    use alloy_primitives::U256;

    #[derive(Default)]
    struct Lines(Vec<String>);

    impl HeaderReporter for Lines {
        fn on_header(&mut self, header: &BlockHeader) {
            self.0.push(header_line(header));
        }

        fn on_termination(&mut self, reason: &SubscriptionError) {
            self.0.push(termination_line(reason));
        }
    }

    fn header(number: u64) -> BlockHeader {
        BlockHeader::with_number(U256::from(number))
    }

    #[tokio::test]
    async fn reports_headers_one_step_at_a_time() {
        let (feed, subscription) = subscription_channel();
        let mut watcher = HeaderWatcher::new(subscription, Lines::default());
        assert_eq!(watcher.state(), WatcherState::Running);

        feed.announce(header(100));
        assert_eq!(watcher.step().await, WatcherState::Running);
        feed.announce(header(101));
        assert_eq!(watcher.step().await, WatcherState::Running);

        assert_eq!(watcher.reporter().0, vec!["New block: 100", "New block: 101"]);
    }

    #[tokio::test]
    async fn pending_error_wins_over_buffered_headers() {
        let (feed, subscription) = subscription_channel();
        feed.announce(header(1));
        feed.announce(header(2));
        feed.terminate(SubscriptionError::Terminated("connection reset".into()));

        let termination = HeaderWatcher::new(subscription, Lines::default()).run().await;

        assert_eq!(
            termination.reason,
            SubscriptionError::Terminated("connection reset".into())
        );
        assert_eq!(
            termination.reporter.0,
            vec!["Subscription terminated: connection reset"]
        );
    }

    #[tokio::test]
    async fn dropped_feed_terminates_as_closed() {
        let (feed, subscription) = subscription_channel();
        drop(feed);

        let termination = HeaderWatcher::new(subscription, Lines::default()).run().await;

        assert_eq!(termination.reason, SubscriptionError::Closed);
        assert_eq!(termination.reporter.0.len(), 1);
    }

    #[tokio::test]
    async fn terminated_watcher_stays_terminated() {
        let (feed, subscription) = subscription_channel();
        let mut watcher = HeaderWatcher::new(subscription, Lines::default());
        feed.terminate(SubscriptionError::Closed);

        assert_eq!(watcher.step().await, WatcherState::Terminated);
        assert_eq!(watcher.step().await, WatcherState::Terminated);
        assert_eq!(watcher.state(), WatcherState::Terminated);
        assert_eq!(watcher.reporter().0.len(), 1);
    }

    #[tokio::test]
    async fn block_numbers_past_u64_are_reported_exactly() {
        let (feed, subscription) = subscription_channel();
        let mut watcher = HeaderWatcher::new(subscription, Lines::default());

        feed.announce(BlockHeader::with_number(U256::from(u64::MAX) + U256::from(1)));
        watcher.step().await;

        assert_eq!(watcher.reporter().0, vec!["New block: 18446744073709551616"]);
    }
}

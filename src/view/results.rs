use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};
use url::Url;

use super::list::ResultsList;
use super::source::ResultsSource;
use crate::api::{ApiError, ResultsCollection};

/// Where a [`ResultsView`] is in its fetch cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum LoadStatus {
    /// Not mounted yet, or torn down.
    #[default]
    Empty,
    Loading,
    Loaded,
    /// The last fetch failed. Whatever was stored before is kept.
    Failed(FetchFailure),
}

/// What went wrong with the last fetch, kept so a renderer can offer a retry.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchFailure {
    pub url: String,
    pub status: Option<u16>,
    pub message: String,
}

impl FetchFailure {
    fn new(url: &Url, err: &ApiError) -> Self {
        FetchFailure {
            url: url.to_string(),
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }
}

/// Latest stored state of a view. Renderers only ever see these, never the
/// request in flight.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultsSnapshot {
    pub data: ResultsCollection,
    pub status: LoadStatus,
}

/// A results panel bound to one URL.
///
/// Mounting issues a single fetch. Changing the URL while mounted cancels
/// the fetch in flight and starts a new one. Every fetch is tagged with a
/// generation number; a completion only lands if its generation is still
/// current, so nothing is written after [`unmount`](Self::unmount) or drop.
pub struct ResultsView<S: ?Sized> {
    source: Arc<S>,
    url: Url,
    state: Arc<watch::Sender<ResultsSnapshot>>,
    generation: Arc<AtomicU64>,
    inflight: Option<JoinHandle<()>>,
    mounted: bool,
}

impl<S: ResultsSource + ?Sized + 'static> ResultsView<S> {
    pub fn new(source: Arc<S>, url: Url) -> Self {
        let (state, _) = watch::channel(ResultsSnapshot::default());
        ResultsView {
            source,
            url,
            state: Arc::new(state),
            generation: Arc::new(AtomicU64::new(0)),
            inflight: None,
            mounted: false,
        }
    }

    /// Start the initial fetch. Further calls do nothing.
    pub fn mount(&mut self) {
        if self.mounted {
            return;
        }
        self.mounted = true;
        self.start_fetch();
    }

    /// Fetch again from the current URL, superseding any fetch in flight.
    /// A successful reload replaces the stored collection outright. Does
    /// nothing unless the view is mounted.
    #[allow(dead_code)]
    pub fn reload(&mut self) {
        if !self.mounted {
            return;
        }
        self.start_fetch();
    }

    /// Point the view at a new URL. Returns whether the URL changed; a
    /// mounted view refetches when it does.
    #[allow(dead_code)]
    pub fn set_url(&mut self, url: Url) -> bool {
        if url == self.url {
            return false;
        }
        debug!(from = %self.url, to = %url, "Results URL changed");
        self.url = url;
        if self.mounted {
            self.start_fetch();
        }
        true
    }

    /// Tear the view down: cancel any fetch and drop the stored results.
    #[allow(dead_code)]
    pub fn unmount(&mut self) {
        if !self.mounted {
            return;
        }
        self.mounted = false;
        self.invalidate();
        self.state.send_replace(ResultsSnapshot::default());
    }

    /// Wait for the fetch in flight, if any, to finish.
    pub async fn settled(&mut self) {
        let Some(handle) = self.inflight.take() else {
            return;
        };
        if let Err(e) = handle.await {
            if !e.is_cancelled() {
                error!("Results fetch task failed: {}", e);
            }
        }
    }

    #[allow(dead_code)]
    pub fn url(&self) -> &Url {
        &self.url
    }

    #[allow(dead_code)]
    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn snapshot(&self) -> ResultsSnapshot {
        self.state.borrow().clone()
    }

    /// Receiver that observes every snapshot the view publishes.
    #[allow(dead_code)]
    pub fn subscribe(&self) -> watch::Receiver<ResultsSnapshot> {
        self.state.subscribe()
    }

    pub fn render(&self) -> String {
        let snapshot = self.state.borrow();
        let mut out = String::from("Results\n");
        out.push_str(&ResultsList::new(&snapshot.data).render());
        if let LoadStatus::Failed(failure) = &snapshot.status {
            out.push_str(&format!("  could not load results: {}\n", failure.message));
        }
        out
    }

    fn start_fetch(&mut self) {
        self.invalidate();
        let generation = self.generation.load(Ordering::SeqCst);
        self.state.send_modify(|s| s.status = LoadStatus::Loading);

        let source = Arc::clone(&self.source);
        let url = self.url.clone();
        let state = Arc::clone(&self.state);
        let current = Arc::clone(&self.generation);

        debug!(%url, generation, "Fetching results");
        self.inflight = Some(tokio::spawn(async move {
            let outcome = source.fetch_results(&url).await;

            let mut landed = None;
            state.send_if_modified(|snapshot| {
                if current.load(Ordering::SeqCst) != generation {
                    return false;
                }
                match outcome {
                    Ok(data) => {
                        landed = Some(Ok(data.len()));
                        snapshot.data = data;
                        snapshot.status = LoadStatus::Loaded;
                    }
                    Err(err) => {
                        snapshot.status = LoadStatus::Failed(FetchFailure::new(&url, &err));
                        landed = Some(Err(err));
                    }
                }
                true
            });

            match landed {
                None => debug!(%url, generation, "Discarding results from a superseded fetch"),
                Some(Ok(count)) => info!(%url, "Loaded {} results", count),
                Some(Err(err)) => error!(
                    %url,
                    status = ?err.status(),
                    "Failed to load results: {}",
                    err
                ),
            }
        }));
    }
}

impl<S: ?Sized> ResultsView<S> {
    fn invalidate(&mut self) {
        // Bumped under the state lock so a finishing fetch cannot slip a
        // write in between the check and the bump.
        let generation = &self.generation;
        self.state.send_if_modified(|_| {
            generation.fetch_add(1, Ordering::SeqCst);
            false
        });
        if let Some(handle) = self.inflight.take() {
            handle.abort();
        }
    }
}

impl<S: ?Sized> Drop for ResultsView<S> {
    fn drop(&mut self) {
        self.invalidate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{LadderClient, MatchResult};
    use async_trait::async_trait;
    use reqwest::StatusCode;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;
    use tokio::sync::oneshot;

    enum Reply {
        Data(ResultsCollection),
        Fail(StatusCode),
        Gate(oneshot::Receiver<ResultsCollection>),
    }

    /// Replies are queued per URL and handed out in order.
    #[derive(Default)]
    struct ScriptedSource {
        replies: Mutex<HashMap<String, VecDeque<Reply>>>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedSource {
        fn push(&self, url: &Url, reply: Reply) {
            self.replies
                .lock()
                .unwrap()
                .entry(url.to_string())
                .or_default()
                .push_back(reply);
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ResultsSource for ScriptedSource {
        async fn fetch_results(&self, url: &Url) -> Result<ResultsCollection, ApiError> {
            self.calls.lock().unwrap().push(url.to_string());
            let reply = self
                .replies
                .lock()
                .unwrap()
                .get_mut(url.as_str())
                .and_then(|q| q.pop_front());
            let status_err = |status| ApiError::Status {
                url: url.to_string(),
                status,
                body: String::new(),
            };
            match reply {
                Some(Reply::Data(data)) => Ok(data),
                Some(Reply::Fail(status)) => Err(status_err(status)),
                Some(Reply::Gate(rx)) => Ok(rx.await.unwrap_or_default()),
                None => Err(status_err(StatusCode::NOT_FOUND)),
            }
        }
    }

    fn url(path: &str) -> Url {
        Url::parse("http://localhost:5000").unwrap().join(path).unwrap()
    }

    fn pair(black: &str, white: &str) -> ResultsCollection {
        ResultsCollection::from(vec![MatchResult::new(black, white)])
    }

    #[tokio::test]
    async fn test_initial_state_is_empty() {
        let view = ResultsView::new(Arc::new(ScriptedSource::default()), url("/result"));
        assert_eq!(view.snapshot(), ResultsSnapshot::default());
        assert!(!view.is_mounted());
        assert_eq!(view.render(), "Results\n");
    }

    #[tokio::test]
    async fn test_mount_loads_and_renders() {
        let source = Arc::new(ScriptedSource::default());
        source.push(&url("/result"), Reply::Data(pair("A", "B")));

        let mut view = ResultsView::new(source.clone(), url("/result"));
        view.mount();
        assert_eq!(view.snapshot().status, LoadStatus::Loading);
        // The empty state still renders while the fetch is pending.
        assert_eq!(view.render(), "Results\n");

        view.settled().await;
        let snapshot = view.snapshot();
        assert_eq!(snapshot.status, LoadStatus::Loaded);
        assert_eq!(snapshot.data, pair("A", "B"));
        assert_eq!(view.render(), "Results\n  1. black = A, white = B\n");
    }

    #[tokio::test]
    async fn test_empty_response_renders_no_rows() {
        let source = Arc::new(ScriptedSource::default());
        source.push(&url("/result"), Reply::Data(ResultsCollection::default()));

        let mut view = ResultsView::new(source, url("/result"));
        view.mount();
        view.settled().await;
        assert_eq!(view.snapshot().status, LoadStatus::Loaded);
        assert_eq!(view.render(), "Results\n");
    }

    #[tokio::test]
    async fn test_mount_fetches_once() {
        let source = Arc::new(ScriptedSource::default());
        source.push(&url("/result"), Reply::Data(pair("A", "B")));

        let mut view = ResultsView::new(source.clone(), url("/result"));
        view.mount();
        view.mount();
        view.settled().await;
        view.mount();
        view.settled().await;
        assert_eq!(source.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_transport_failure_keeps_empty_collection() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = LadderClient::new(&format!("http://{}", addr)).unwrap();
        let results_url = client.results_url();
        let mut view = ResultsView::new(Arc::new(client), results_url.clone());
        view.mount();
        view.settled().await;

        let snapshot = view.snapshot();
        assert!(snapshot.data.is_empty());
        match snapshot.status {
            LoadStatus::Failed(failure) => {
                assert_eq!(failure.url, results_url.to_string());
                assert_eq!(failure.status, None);
                assert!(failure.message.contains(results_url.as_str()));
            }
            other => panic!("expected Failed, got {other:?}"),
        }
        assert!(view.render().contains("could not load results"));
    }

    #[tokio::test]
    async fn test_failed_reload_keeps_previous_results() {
        let source = Arc::new(ScriptedSource::default());
        source.push(&url("/result"), Reply::Data(pair("A", "B")));
        source.push(&url("/result"), Reply::Fail(StatusCode::SERVICE_UNAVAILABLE));

        let mut view = ResultsView::new(source, url("/result"));
        view.mount();
        view.settled().await;
        view.reload();
        view.settled().await;

        let snapshot = view.snapshot();
        assert_eq!(snapshot.data, pair("A", "B"));
        match snapshot.status {
            LoadStatus::Failed(failure) => assert_eq!(failure.status, Some(503)),
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_reload_replaces_rather_than_appends() {
        let source = Arc::new(ScriptedSource::default());
        source.push(&url("/result"), Reply::Data(pair("A", "A2")));
        source.push(&url("/result"), Reply::Data(pair("B", "B2")));

        let mut view = ResultsView::new(source, url("/result"));
        view.mount();
        view.settled().await;
        assert_eq!(view.snapshot().data, pair("A", "A2"));

        view.reload();
        view.settled().await;
        assert_eq!(view.snapshot().data, pair("B", "B2"));
        assert_eq!(view.snapshot().status, LoadStatus::Loaded);
    }

    #[tokio::test]
    async fn test_url_change_supersedes_inflight_fetch() {
        let source = Arc::new(ScriptedSource::default());
        let (tx, rx) = oneshot::channel();
        source.push(&url("/slow"), Reply::Gate(rx));
        source.push(&url("/fast"), Reply::Data(pair("B", "B2")));

        let mut view = ResultsView::new(source.clone(), url("/slow"));
        view.mount();
        tokio::task::yield_now().await;

        assert!(view.set_url(url("/fast")));
        view.settled().await;
        // The stale fetch finishing now must not overwrite anything.
        let _ = tx.send(pair("A", "A2"));
        tokio::task::yield_now().await;

        assert_eq!(view.snapshot().data, pair("B", "B2"));
        assert_eq!(
            source.calls(),
            vec![url("/slow").to_string(), url("/fast").to_string()]
        );
    }

    #[tokio::test]
    async fn test_same_url_does_not_refetch() {
        let source = Arc::new(ScriptedSource::default());
        source.push(&url("/result"), Reply::Data(pair("A", "B")));

        let mut view = ResultsView::new(source.clone(), url("/result"));
        view.mount();
        view.settled().await;
        assert!(!view.set_url(url("/result")));
        view.settled().await;
        assert_eq!(source.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_url_change_before_mount_waits_for_mount() {
        let source = Arc::new(ScriptedSource::default());
        source.push(&url("/other"), Reply::Data(pair("A", "B")));

        let mut view = ResultsView::new(source.clone(), url("/result"));
        assert!(view.set_url(url("/other")));
        assert!(source.calls().is_empty());

        view.mount();
        view.settled().await;
        assert_eq!(source.calls(), vec![url("/other").to_string()]);
        assert_eq!(view.url(), &url("/other"));
    }

    #[tokio::test]
    async fn test_unmount_discards_late_completion() {
        let source = Arc::new(ScriptedSource::default());
        let (tx, rx) = oneshot::channel();
        source.push(&url("/result"), Reply::Gate(rx));

        let mut view = ResultsView::new(source, url("/result"));
        view.mount();
        tokio::task::yield_now().await;
        view.unmount();

        let _ = tx.send(pair("A", "B"));
        tokio::task::yield_now().await;
        view.settled().await;

        assert!(!view.is_mounted());
        assert_eq!(view.snapshot(), ResultsSnapshot::default());
    }

    #[tokio::test]
    async fn test_drop_cancels_fetch() {
        let source = Arc::new(ScriptedSource::default());
        let (tx, rx) = oneshot::channel();
        source.push(&url("/result"), Reply::Gate(rx));

        let mut view = ResultsView::new(source, url("/result"));
        let watcher = view.subscribe();
        view.mount();
        tokio::task::yield_now().await;
        drop(view);

        let _ = tx.send(pair("A", "B"));
        tokio::task::yield_now().await;
        assert_eq!(watcher.borrow().status, LoadStatus::Loading);
        assert!(watcher.borrow().data.is_empty());
    }

    #[tokio::test]
    async fn test_subscribers_see_loaded_snapshot() {
        let source = Arc::new(ScriptedSource::default());
        source.push(&url("/result"), Reply::Data(pair("A", "B")));

        let mut view = ResultsView::new(source, url("/result"));
        let mut watcher = view.subscribe();
        view.mount();
        view.settled().await;

        assert!(watcher.has_changed().unwrap());
        let seen = watcher.borrow_and_update().clone();
        assert_eq!(seen.status, LoadStatus::Loaded);
        assert_eq!(seen.data.len(), 1);
    }

    #[tokio::test]
    async fn test_reload_requires_mounted_view() {
        let source = Arc::new(ScriptedSource::default());
        source.push(&url("/result"), Reply::Data(pair("A", "B")));
        source.push(&url("/result"), Reply::Data(pair("C", "D")));

        let mut view = ResultsView::new(source.clone(), url("/result"));
        view.reload();
        view.settled().await;
        assert!(!view.is_mounted());
        assert!(source.calls().is_empty());

        view.mount();
        view.settled().await;
        view.unmount();
        view.reload();
        view.settled().await;
        assert!(!view.is_mounted());
        assert_eq!(source.calls().len(), 1);
        assert_eq!(view.snapshot(), ResultsSnapshot::default());
    }

    /// Collects the `url` field of every ERROR event.
    #[derive(Clone, Default)]
    struct ErrorUrls(Arc<Mutex<Vec<String>>>);

    struct UrlField(Option<String>);

    impl tracing::field::Visit for UrlField {
        fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
            if field.name() == "url" {
                self.0 = Some(format!("{:?}", value));
            }
        }
    }

    impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for ErrorUrls {
        fn on_event(
            &self,
            event: &tracing::Event<'_>,
            _ctx: tracing_subscriber::layer::Context<'_, S>,
        ) {
            if *event.metadata().level() != tracing::Level::ERROR {
                return;
            }
            let mut field = UrlField(None);
            event.record(&mut field);
            if let Some(url) = field.0 {
                self.0.lock().unwrap().push(url);
            }
        }
    }

    #[tokio::test]
    async fn test_failure_is_logged_with_request_url() {
        use tracing_subscriber::layer::SubscriberExt;

        let logged = ErrorUrls::default();
        let _guard =
            tracing::subscriber::set_default(tracing_subscriber::registry().with(logged.clone()));

        let source = Arc::new(ScriptedSource::default());
        source.push(&url("/result"), Reply::Fail(StatusCode::BAD_GATEWAY));

        let mut view = ResultsView::new(source, url("/result"));
        view.mount();
        view.settled().await;

        assert_eq!(*logged.0.lock().unwrap(), vec![url("/result").to_string()]);
    }
}

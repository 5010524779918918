//! QueryCoordinator - 検索・フィルタ入力から「表示中の一覧」を一本化する
//!
//! # 入力チャネル
//! - free text: キー入力ごとに debounce タイマーをリセットし、静止後に 1 回だけ発行
//! - 構造化フィルタ（job / status）: 即時発行。ただし free text が空でなければ抑制
//!
//! # 優先順位
//! `QueryCriteria::effective()` を参照。タイマー発火時点の raw 入力から計算する。
//!
//! # Staleness guard
//! 発行のたびに単調増加の seq を振り、レスポンスは「最後に発行した seq」と一致する時だけ反映。
//! 実行中のリクエスト自体はキャンセルしない（到着時に捨てる）。
//!
//! # 楽観的更新との共存
//! 楽観的パッチはレコードのキーごとの overlay として保持し、その間に届いた一覧レスポンスにも
//! 再適用する。overlay はサーバー呼び出しの完了時に外す。
//!
//! # ロック
//! `std::sync::Mutex` は await を跨いで保持しない。

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::domain::{
    ApplicationStatus, AtsError, EffectiveQuery, JobId, QueryCriteria, Record,
};
use crate::ports::{Notice, NoticeSink};

/// Where a coordinated list comes from.
#[async_trait]
pub trait ListSource: Send + Sync + 'static {
    type Item: Record;

    /// Plural noun for messages, e.g. "applications".
    fn label(&self) -> &'static str;

    async fn fetch(&self, query: &EffectiveQuery) -> Result<Vec<Self::Item>, AtsError>;
}

/// Snapshot of what a list view should render.
#[derive(Debug, Clone)]
pub struct ListView<T> {
    /// Server order, never re-sorted.
    pub items: Vec<T>,
    /// True only while the most recently issued query is outstanding.
    pub loading: bool,
    /// A free-text edit is waiting out the quiescence window.
    pub debouncing: bool,
    /// Raw input, including filters currently suppressed by free text.
    pub criteria: QueryCriteria,
    /// The query whose result `items` shows.
    pub applied: Option<EffectiveQuery>,
    /// Set when the latest query failed; `items` still holds the previous result.
    pub last_error: Option<AtsError>,
}

impl<T> Default for ListView<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            loading: false,
            debouncing: false,
            criteria: QueryCriteria::default(),
            applied: None,
            last_error: None,
        }
    }
}

impl<T> ListView<T> {
    pub fn is_settled(&self) -> bool {
        !self.loading && !self.debouncing
    }
}

/// Identifies one optimistic patch; a newer patch on the same record supersedes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlayToken<K> {
    key: K,
    id: u64,
}

impl<K: Copy> OverlayToken<K> {
    pub fn key(&self) -> K {
        self.key
    }
}

type Patch<T> = Arc<dyn Fn(&mut T) + Send + Sync>;

struct Overlay<T> {
    id: u64,
    patch: Patch<T>,
}

struct DebounceTimer {
    generation: u64,
    handle: Option<JoinHandle<()>>,
}

struct State<T: Record> {
    criteria: QueryCriteria,
    /// seq of the most recently issued query
    issued: u64,
    timer: DebounceTimer,
    items: Vec<T>,
    loading: bool,
    applied: Option<EffectiveQuery>,
    last_error: Option<AtsError>,
    overlays: HashMap<T::Key, Overlay<T>>,
    next_overlay: u64,
}

impl<T: Record> State<T> {
    fn new() -> Self {
        Self {
            criteria: QueryCriteria::default(),
            issued: 0,
            timer: DebounceTimer {
                generation: 0,
                handle: None,
            },
            items: Vec::new(),
            loading: false,
            applied: None,
            last_error: None,
            overlays: HashMap::new(),
            next_overlay: 1,
        }
    }

    fn cancel_timer(&mut self) {
        self.timer.generation += 1;
        if let Some(handle) = self.timer.handle.take() {
            handle.abort();
        }
    }

    fn debouncing(&self) -> bool {
        self.timer.handle.is_some()
    }

    fn snapshot(&self) -> ListView<T> {
        ListView {
            items: self.items.clone(),
            loading: self.loading,
            debouncing: self.debouncing(),
            criteria: self.criteria.clone(),
            applied: self.applied.clone(),
            last_error: self.last_error.clone(),
        }
    }

    fn patch_items(&mut self, key: T::Key, patch: &dyn Fn(&mut T)) {
        for item in self.items.iter_mut().filter(|item| item.key() == key) {
            patch(item);
        }
    }
}

struct Inner<S: ListSource> {
    source: S,
    debounce: Duration,
    notices: Arc<dyn NoticeSink>,
    state: Mutex<State<S::Item>>,
    view: watch::Sender<ListView<S::Item>>,
}

/// Turns a stream of criteria edits into one authoritative list.
///
/// Methods that issue queries spawn tokio tasks, so they must be called from
/// within a runtime.
pub struct QueryCoordinator<S: ListSource> {
    inner: Arc<Inner<S>>,
}

impl<S: ListSource> Clone for QueryCoordinator<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: ListSource> QueryCoordinator<S> {
    pub fn new(source: S, debounce: Duration, notices: Arc<dyn NoticeSink>) -> Self {
        let (view, _) = watch::channel(ListView::default());
        Self {
            inner: Arc::new(Inner {
                source,
                debounce,
                notices,
                state: Mutex::new(State::new()),
                view,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, State<S::Item>> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn publish(&self, state: &State<S::Item>) {
        self.inner.view.send_replace(state.snapshot());
    }

    // ========================================
    // Inputs
    // ========================================

    /// Record a free-text edit and restart the quiescence window.
    ///
    /// Clearing the text is an edit like any other; when the window closes
    /// the query is derived from whatever the criteria hold at that moment.
    pub fn set_free_text(&self, text: impl Into<String>) {
        let mut state = self.state();
        state.criteria.free_text = text.into();
        state.cancel_timer();
        let generation = state.timer.generation;

        let weak = Arc::downgrade(&self.inner);
        let debounce = self.inner.debounce;
        state.timer.handle = Some(tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            if let Some(inner) = weak.upgrade() {
                QueryCoordinator { inner }.debounce_elapsed(generation);
            }
        }));
        self.publish(&state);
    }

    pub fn set_job_filter(&self, job: Option<JobId>) {
        let mut state = self.state();
        state.criteria.job_filter = job;
        self.filter_changed(state);
    }

    pub fn set_status_filter(&self, status: Option<ApplicationStatus>) {
        let mut state = self.state();
        state.criteria.status_filter = status;
        self.filter_changed(state);
    }

    fn filter_changed(&self, mut state: MutexGuard<'_, State<S::Item>>) {
        if state.criteria.search_text().is_some() {
            tracing::debug!(
                list = self.inner.source.label(),
                "filter change suppressed by free-text search"
            );
            self.publish(&state);
            return;
        }
        // the immediate query already reflects any pending (empty) free-text edit
        state.cancel_timer();
        let query = state.criteria.effective();
        self.issue(&mut state, query);
    }

    /// Reset free text and both filters and show the unfiltered list.
    pub fn clear(&self) {
        let mut state = self.state();
        state.criteria = QueryCriteria::default();
        state.cancel_timer();
        self.issue(&mut state, EffectiveQuery::All);
    }

    /// Re-issue the current effective query immediately.
    pub fn refresh(&self) {
        let mut state = self.state();
        state.cancel_timer();
        let query = state.criteria.effective();
        self.issue(&mut state, query);
    }

    /// Refresh and wait until the result (or failure) is in.
    pub async fn load(&self) -> ListView<S::Item> {
        self.refresh();
        self.settled().await
    }

    fn debounce_elapsed(&self, generation: u64) {
        let mut state = self.state();
        if state.timer.generation != generation {
            // a newer edit restarted the window after this timer fired
            return;
        }
        state.timer.handle = None;
        let query = state.criteria.effective();
        self.issue(&mut state, query);
    }

    // ========================================
    // Issue / complete
    // ========================================

    fn issue(&self, state: &mut State<S::Item>, query: EffectiveQuery) {
        state.issued += 1;
        let seq = state.issued;
        state.loading = true;
        tracing::debug!(list = self.inner.source.label(), seq, %query, "issuing query");
        self.publish(state);

        let weak: Weak<Inner<S>> = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let result = inner.source.fetch(&query).await;
            QueryCoordinator { inner }.complete(seq, query, result);
        });
    }

    fn complete(&self, seq: u64, query: EffectiveQuery, result: Result<Vec<S::Item>, AtsError>) {
        let label = self.inner.source.label();
        let failure = {
            let mut state = self.state();
            if seq != state.issued {
                tracing::debug!(
                    list = label,
                    seq,
                    latest = state.issued,
                    %query,
                    "discarding stale response"
                );
                return;
            }
            state.loading = false;
            let failure = match result {
                Ok(mut items) => {
                    for item in items.iter_mut() {
                        if let Some(overlay) = state.overlays.get(&item.key()) {
                            (overlay.patch)(item);
                        }
                    }
                    tracing::debug!(list = label, seq, count = items.len(), "query applied");
                    state.items = items;
                    state.applied = Some(query);
                    state.last_error = None;
                    None
                }
                Err(e) => {
                    // previous items stay on screen
                    tracing::warn!(list = label, seq, %query, error = %e, "query failed");
                    state.last_error = Some(e.clone());
                    Some(e)
                }
            };
            self.publish(&state);
            failure
        };
        if let Some(e) = failure {
            self.inner
                .notices
                .notify(Notice::error(format!("Failed to load {label}: {e}")));
        }
    }

    // ========================================
    // Output
    // ========================================

    pub fn view(&self) -> ListView<S::Item> {
        self.inner.view.borrow().clone()
    }

    pub fn items(&self) -> Vec<S::Item> {
        self.state().items.clone()
    }

    pub fn criteria(&self) -> QueryCriteria {
        self.state().criteria.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ListView<S::Item>> {
        self.inner.view.subscribe()
    }

    /// Wait until no query is outstanding and no free-text edit is pending.
    pub async fn settled(&self) -> ListView<S::Item> {
        let mut rx = self.subscribe();
        match rx.wait_for(ListView::is_settled).await {
            Ok(view) => view.clone(),
            // unreachable while `self` holds the sender
            Err(_) => self.view(),
        }
    }

    pub fn get(&self, key: <S::Item as Record>::Key) -> Option<S::Item> {
        self.state().items.iter().find(|item| item.key() == key).cloned()
    }

    /// Drop a record from the displayed list (after the server confirmed a delete).
    pub fn remove_item(&self, key: <S::Item as Record>::Key) -> bool {
        let mut state = self.state();
        let before = state.items.len();
        state.items.retain(|item| item.key() != key);
        state.overlays.remove(&key);
        let removed = state.items.len() != before;
        if removed {
            self.publish(&state);
        }
        removed
    }

    // ========================================
    // Optimistic overlays
    // ========================================

    /// Patch the displayed record now and keep re-applying the patch to any
    /// list response that lands until the token is settled or reverted.
    pub fn apply_optimistic(
        &self,
        key: <S::Item as Record>::Key,
        patch: impl Fn(&mut S::Item) + Send + Sync + 'static,
    ) -> OverlayToken<<S::Item as Record>::Key> {
        let mut state = self.state();
        let id = state.next_overlay;
        state.next_overlay += 1;
        let patch: Patch<S::Item> = Arc::new(patch);
        state.patch_items(key, patch.as_ref());
        state.overlays.insert(key, Overlay { id, patch });
        self.publish(&state);
        OverlayToken { key, id }
    }

    /// Stop re-applying the patch; the displayed record keeps its current value.
    pub fn settle_optimistic(&self, token: OverlayToken<<S::Item as Record>::Key>) {
        let mut state = self.state();
        if state
            .overlays
            .get(&token.key)
            .is_some_and(|overlay| overlay.id == token.id)
        {
            state.overlays.remove(&token.key);
        }
    }

    /// Undo the patch with `restore`, unless a newer patch on the same record
    /// has been applied since. Returns whether anything was restored.
    pub fn revert_optimistic(
        &self,
        token: OverlayToken<<S::Item as Record>::Key>,
        restore: impl Fn(&mut S::Item),
    ) -> bool {
        let mut state = self.state();
        let current = state
            .overlays
            .get(&token.key)
            .is_some_and(|overlay| overlay.id == token.id);
        if !current {
            return false;
        }
        state.overlays.remove(&token.key);
        state.patch_items(token.key, &restore);
        self.publish(&state);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::sources::ApplicationSource;
    use crate::app::{AuthedApi, SessionStore};
    use crate::domain::Application;
    use crate::impls::{
        ApiCall, ApiCallKind, CollectingNoticeSink, InMemoryAtsApi, InMemorySessionStorage,
    };
    use rstest::rstest;

    const DEBOUNCE: Duration = Duration::from_millis(300);

    struct Fixture {
        api: Arc<InMemoryAtsApi>,
        notices: Arc<CollectingNoticeSink>,
        list: QueryCoordinator<ApplicationSource>,
        backend: JobId,
        design: JobId,
    }

    async fn fixture() -> Fixture {
        let api = Arc::new(InMemoryAtsApi::new());
        api.seed_user("Rita", "rita@example.com", "pw");
        let backend = api.seed_job("Backend Engineer", true).id;
        let design = api.seed_job("Product Designer", true).id;
        api.seed_application(backend, "Anna Smith", "anna@example.com", ApplicationStatus::New)
            .unwrap();
        api.seed_application(backend, "Bob Jones", "bob@example.com", ApplicationStatus::Hired)
            .unwrap();
        api.seed_application(design, "Annika Berg", "annika@example.com", ApplicationStatus::New)
            .unwrap();

        let session = SessionStore::new(api.clone(), Arc::new(InMemorySessionStorage::new()));
        session.login("rita@example.com", "pw").await.unwrap();
        api.clear_calls();

        let notices = Arc::new(CollectingNoticeSink::new());
        let list = QueryCoordinator::new(
            ApplicationSource::new(AuthedApi::new(api.clone(), session)),
            DEBOUNCE,
            notices.clone(),
        );
        Fixture {
            api,
            notices,
            list,
            backend,
            design,
        }
    }

    fn names(view: &ListView<Application>) -> Vec<&str> {
        view.items
            .iter()
            .map(|application| application.candidate_name.as_str())
            .collect()
    }

    fn query_calls(api: &InMemoryAtsApi) -> Vec<ApiCall> {
        api.calls()
            .into_iter()
            .filter(|call| {
                matches!(
                    call.kind(),
                    ApiCallKind::ListApplications | ApiCallKind::SearchApplications
                )
            })
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn filters_issue_immediately() {
        let f = fixture().await;
        f.list.set_job_filter(Some(f.backend));
        f.list.set_status_filter(Some(ApplicationStatus::New));

        // no debounce: both requests are already on their way
        assert!(f.list.view().loading);
        let view = f.list.settled().await;

        assert_eq!(names(&view), vec!["Anna Smith"]);
        assert_eq!(
            query_calls(&f.api).last(),
            Some(&ApiCall::ListApplications {
                job: Some(f.backend),
                status: Some(ApplicationStatus::New),
            })
        );
        assert_eq!(
            view.applied.map(|query| query.to_string()),
            Some(format!("filter jobId={}&status=NEW", f.backend))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn typing_within_the_window_issues_one_search() {
        let f = fixture().await;
        f.list.set_free_text("ann");
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(query_calls(&f.api).is_empty());

        f.list.set_free_text("anna");
        assert!(f.list.view().debouncing);
        let view = f.list.settled().await;

        assert_eq!(
            query_calls(&f.api),
            vec![ApiCall::SearchApplications {
                query: "anna".into()
            }]
        );
        assert_eq!(names(&view), vec!["Anna Smith"]);
    }

    #[tokio::test(start_paused = true)]
    async fn free_text_suppresses_filters() {
        let f = fixture().await;
        f.list.set_free_text("ann");
        f.list.set_status_filter(Some(ApplicationStatus::Hired));

        let view = f.list.settled().await;
        assert_eq!(
            query_calls(&f.api),
            vec![ApiCall::SearchApplications { query: "ann".into() }]
        );
        // the filter is still held as raw input
        assert_eq!(view.criteria.status_filter, Some(ApplicationStatus::Hired));
        assert_eq!(names(&view), vec!["Annika Berg", "Anna Smith"]);
    }

    #[tokio::test(start_paused = true)]
    async fn clearing_text_falls_back_to_filters_then_to_all() {
        let f = fixture().await;
        f.list.set_status_filter(Some(ApplicationStatus::Hired));
        f.list.set_free_text("ann");
        f.list.settled().await;

        f.list.set_free_text("");
        let view = f.list.settled().await;
        assert_eq!(names(&view), vec!["Bob Jones"]);
        assert_eq!(
            query_calls(&f.api).last(),
            Some(&ApiCall::ListApplications {
                job: None,
                status: Some(ApplicationStatus::Hired),
            })
        );

        f.list.set_status_filter(None);
        let view = f.list.settled().await;
        assert_eq!(view.items.len(), 3);
        assert_eq!(view.applied, Some(EffectiveQuery::All));
    }

    #[tokio::test(start_paused = true)]
    async fn late_response_from_an_older_query_is_discarded() {
        let f = fixture().await;
        // the unfiltered list is slow, the filtered one fast
        f.api.set_latency(|call| match call {
            ApiCall::ListApplications { status: None, .. } => Duration::from_millis(500),
            _ => Duration::from_millis(10),
        });

        f.list.refresh();
        f.list.set_status_filter(Some(ApplicationStatus::Hired));
        let view = f.list.settled().await;
        assert_eq!(names(&view), vec!["Bob Jones"]);

        // let the slow response arrive; it must not replace the newer result
        tokio::time::sleep(Duration::from_secs(1)).await;
        let view = f.list.view();
        assert_eq!(names(&view), vec!["Bob Jones"]);
        assert!(!view.loading);
        assert_eq!(query_calls(&f.api).len(), 2);
    }

    #[rstest]
    #[case::search_then_filter_arrives_first(true)]
    #[case::filter_then_search_arrives_first(false)]
    #[tokio::test(start_paused = true)]
    async fn final_list_matches_last_issued_query(#[case] search_last: bool) {
        let f = fixture().await;
        // whichever query is issued first answers last
        let slow_first = Arc::new(std::sync::atomic::AtomicBool::new(true));
        f.api.set_latency(move |_| {
            if slow_first.swap(false, std::sync::atomic::Ordering::SeqCst) {
                Duration::from_millis(900)
            } else {
                Duration::from_millis(20)
            }
        });

        if search_last {
            f.list.set_job_filter(Some(f.design));
            f.list.set_free_text("bob");
        } else {
            f.list.set_free_text("bob");
            tokio::time::sleep(DEBOUNCE + Duration::from_millis(1)).await;
            f.list.set_free_text("");
            f.list.set_job_filter(Some(f.design));
        }
        f.list.settled().await;
        tokio::time::sleep(Duration::from_secs(2)).await;

        let view = f.list.view();
        if search_last {
            assert_eq!(names(&view), vec!["Bob Jones"]);
        } else {
            assert_eq!(names(&view), vec!["Annika Berg"]);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn failed_query_keeps_the_previous_list() {
        let f = fixture().await;
        let before = f.list.load().await;
        assert_eq!(before.items.len(), 3);

        f.api.fail_next(
            ApiCallKind::ListApplications,
            AtsError::Transient("503".into()),
        );
        f.list.set_status_filter(Some(ApplicationStatus::New));
        let view = f.list.settled().await;

        assert_eq!(view.items.len(), 3);
        assert_eq!(view.applied, Some(EffectiveQuery::All));
        assert_eq!(view.last_error, Some(AtsError::Transient("503".into())));
        assert_eq!(f.notices.errors().len(), 1);
        assert!(f.notices.errors()[0].starts_with("Failed to load applications"));
    }

    #[tokio::test(start_paused = true)]
    async fn clear_resets_everything_and_cancels_the_timer() {
        let f = fixture().await;
        f.list.set_job_filter(Some(f.backend));
        f.list.set_free_text("anna");
        f.list.clear();

        let view = f.list.settled().await;
        tokio::time::sleep(DEBOUNCE * 2).await;

        assert_eq!(view.criteria, QueryCriteria::default());
        assert_eq!(view.items.len(), 3);
        assert!(!query_calls(&f.api)
            .iter()
            .any(|call| call.kind() == ApiCallKind::SearchApplications));
    }

    #[tokio::test(start_paused = true)]
    async fn overlays_survive_a_refetch_until_settled() {
        let f = fixture().await;
        f.list.load().await;
        let anna = f.list.view().items[2].id;

        let token = f
            .list
            .apply_optimistic(anna, |application| {
                application.status = ApplicationStatus::Interviewed
            });
        assert_eq!(
            f.list.get(anna).map(|application| application.status),
            Some(ApplicationStatus::Interviewed)
        );

        // the server still says NEW, the overlay wins while it is pending
        f.list.load().await;
        assert_eq!(
            f.list.get(anna).map(|application| application.status),
            Some(ApplicationStatus::Interviewed)
        );

        f.list.settle_optimistic(token);
        f.list.load().await;
        assert_eq!(
            f.list.get(anna).map(|application| application.status),
            Some(ApplicationStatus::New)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn revert_skips_superseded_overlays() {
        let f = fixture().await;
        f.list.load().await;
        let anna = f.list.view().items[2].id;

        let first = f.list.apply_optimistic(anna, |a| a.status = ApplicationStatus::Shortlisted);
        let second = f.list.apply_optimistic(anna, |a| a.status = ApplicationStatus::Rejected);

        assert!(!f.list.revert_optimistic(first, |a| a.status = ApplicationStatus::New));
        assert_eq!(
            f.list.get(anna).map(|a| a.status),
            Some(ApplicationStatus::Rejected)
        );

        assert!(f.list.revert_optimistic(second, |a| a.status = ApplicationStatus::Shortlisted));
        assert_eq!(
            f.list.get(anna).map(|a| a.status),
            Some(ApplicationStatus::Shortlisted)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn remove_item_updates_the_view() {
        let f = fixture().await;
        f.list.load().await;
        let bob = f.list.view().items[1].id;

        assert!(f.list.remove_item(bob));
        assert!(!f.list.remove_item(bob));
        assert_eq!(names(&f.list.view()), vec!["Annika Berg", "Anna Smith"]);
    }
}

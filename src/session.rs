use indextree::NodeId;
use tracing::{debug, error};

use crate::expand_state::ExpansionState;
use crate::gateway::{DetailRequest, FetchError, FetchEvent};
use crate::model::{BucketDetail, BucketSummary};
use crate::render_tree::{build_tree_rows, SortCache, TreeRow};
use crate::tree::BucketTree;

/// Which page the client is on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    /// Default view: pick a bucket, or the empty state.
    Home,
    /// One bucket's breakdown.
    Bucket(String),
    /// Terminal display for a failed detail fetch.
    Error,
}

/// The shared bucket list, fetched once per root entry and read by
/// every view.
#[derive(Debug)]
pub enum BucketListState {
    Loading,
    Ready(Vec<BucketSummary>),
    Failed(String),
}

/// Fetch state of the bucket currently being viewed.
pub enum DetailState {
    Idle,
    Loading(DetailRequest),
    Loaded(LoadedBucket),
    Failed { bucket_name: String, message: String },
}

/// One successfully fetched bucket, mounted for display.
///
/// The tree, expansion state and sort cache are created together from
/// each snapshot and replaced together, so re-entering a bucket always
/// starts collapsed and freshly sorted.
pub struct LoadedBucket {
    pub bucket_name: String,
    pub datetime: String,
    pub manual: bool,
    tree: BucketTree,
    expansion: ExpansionState,
    cache: SortCache,
}

impl LoadedBucket {
    fn new(bucket_name: String, detail: &BucketDetail) -> Self {
        Self {
            tree: BucketTree::from_detail(&bucket_name, detail),
            bucket_name,
            datetime: detail.datetime.clone(),
            manual: detail.manual,
            expansion: ExpansionState::default(),
            cache: SortCache::default(),
        }
    }

    pub fn total_size(&self) -> u64 {
        self.tree.total_size()
    }

    pub fn folder_count(&self) -> usize {
        self.tree.folder_count()
    }

    /// The rows visible this frame, in display order.
    pub fn rows(&mut self) -> Vec<TreeRow> {
        build_tree_rows(&self.tree, &self.expansion, &mut self.cache)
    }

    /// Toggle one row's expansion; leaves stay put.
    pub fn toggle(&mut self, id: NodeId) -> bool {
        self.expansion.toggle(id, &self.tree)
    }

    pub fn collapse_all(&mut self) {
        self.expansion.collapse_all();
    }
}

/// Client-side navigation and data orchestration.
///
/// Owns the route, the shared bucket list and the per-bucket fetch
/// state. Frontends feed it user selections and fetch completions and
/// paint whatever it holds; they never talk to the gateway directly.
/// Each detail fetch carries the request sequence current at initiation,
/// and completions are only accepted while theirs is still the one in
/// flight, so a superseded fetch can never overwrite newer state and a
/// stale failure never reaches the error view.
pub struct Session {
    view: View,
    buckets: BucketListState,
    detail: DetailState,
    next_seq: u64,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            view: View::Home,
            buckets: BucketListState::Loading,
            detail: DetailState::Idle,
            next_seq: 0,
        }
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    pub fn buckets(&self) -> &BucketListState {
        &self.buckets
    }

    pub fn detail(&self) -> &DetailState {
        &self.detail
    }

    pub fn detail_mut(&mut self) -> &mut DetailState {
        &mut self.detail
    }

    /// The surfaced bucket list, empty until ready.
    pub fn bucket_list(&self) -> &[BucketSummary] {
        match &self.buckets {
            BucketListState::Ready(list) => list,
            _ => &[],
        }
    }

    /// Home's empty state: the list failed, or came back with nothing.
    pub fn list_is_empty(&self) -> bool {
        match &self.buckets {
            BucketListState::Failed(_) => true,
            BucketListState::Ready(list) => list.is_empty(),
            BucketListState::Loading => false,
        }
    }

    pub fn list_error(&self) -> Option<&str> {
        match &self.buckets {
            BucketListState::Failed(message) => Some(message),
            _ => None,
        }
    }

    /// True while any fetch is in flight. Drives spinners and repaints.
    pub fn is_fetching(&self) -> bool {
        matches!(self.buckets, BucketListState::Loading)
            || matches!(self.detail, DetailState::Loading(_))
    }

    /// Enter the root: the shared list is (re)fetched. The caller pairs
    /// this with `Fetcher::request_bucket_list`.
    pub fn begin_bucket_list(&mut self) {
        self.buckets = BucketListState::Loading;
    }

    /// Select a bucket. Always re-fetches, including re-selecting the
    /// one already shown. The caller passes the returned request to
    /// `Fetcher::request_bucket_detail`.
    pub fn open_bucket(&mut self, bucket_name: &str) -> DetailRequest {
        self.next_seq += 1;
        let request = DetailRequest {
            seq: self.next_seq,
            bucket_name: bucket_name.to_string(),
        };
        debug!("opening bucket '{}' (request {})", bucket_name, request.seq);
        self.view = View::Bucket(bucket_name.to_string());
        self.detail = DetailState::Loading(request.clone());
        request
    }

    /// Back to the default view, unmounting whatever bucket was shown.
    pub fn go_home(&mut self) {
        self.view = View::Home;
        self.detail = DetailState::Idle;
    }

    /// Apply one fetch completion.
    pub fn apply(&mut self, event: FetchEvent) {
        match event {
            FetchEvent::BucketList(Ok(list)) => {
                debug!("bucket list ready: {} surfaced", list.len());
                self.buckets = BucketListState::Ready(list);
            }
            FetchEvent::BucketList(Err(err)) => {
                // Navigation keeps working; Home degrades to the empty state.
                error!("bucket list fetch failed: {}", err);
                self.buckets = BucketListState::Failed(err.to_string());
            }
            FetchEvent::BucketDetail { request, result } => {
                self.apply_detail(request, result);
            }
        }
    }

    fn apply_detail(&mut self, request: DetailRequest, result: Result<BucketDetail, FetchError>) {
        if !self.is_current(&request) {
            debug!(
                "discarding stale result for '{}' (request {})",
                request.bucket_name, request.seq
            );
            return;
        }

        match result {
            Ok(detail) => {
                let loaded = LoadedBucket::new(request.bucket_name, &detail);
                debug!(
                    "bucket '{}' loaded: {} folders",
                    loaded.bucket_name,
                    loaded.folder_count()
                );
                self.detail = DetailState::Loaded(loaded);
            }
            Err(err) => {
                error!("bucket '{}' fetch failed: {}", request.bucket_name, err);
                self.detail = DetailState::Failed {
                    bucket_name: request.bucket_name,
                    message: err.to_string(),
                };
                self.view = View::Error;
            }
        }
    }

    fn is_current(&self, request: &DetailRequest) -> bool {
        matches!(&self.detail, DetailState::Loading(current) if current.seq == request.seq)
    }
}

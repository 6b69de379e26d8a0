// Test doubles shared by the controller, strategy and route tests.

use std::{
    collections::VecDeque,
    sync::{Mutex, PoisonError},
};

use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::{
    api::CarsApi,
    error::ApiError,
    filters::CarFilters,
    models::{Listing, Page, Pagination, tests::listing},
};

struct Reply<T> {
    gate: Option<oneshot::Receiver<()>>,
    result: Result<T, ApiError>,
}

/// Scripted `CarsApi`: replies are handed out in the order they were queued.
/// A gated reply resolves only once its sender fires, which lets tests pick
/// the order in which in-flight requests complete.
#[derive(Default)]
pub struct FakeCarsApi {
    list_replies: Mutex<VecDeque<Reply<Page<Listing>>>>,
    detail_replies: Mutex<VecDeque<Reply<Listing>>>,
    mine_replies: Mutex<VecDeque<Reply<Vec<Listing>>>>,
    list_calls: Mutex<Vec<CarFilters>>,
    detail_calls: Mutex<Vec<String>>,
    mine_calls: Mutex<usize>,
}

impl FakeCarsApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply_list(&self, result: Result<Page<Listing>, ApiError>) {
        push(&self.list_replies, None, result);
    }

    pub fn reply_list_gated(&self, result: Result<Page<Listing>, ApiError>) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        push(&self.list_replies, Some(rx), result);
        tx
    }

    pub fn reply_detail(&self, result: Result<Listing, ApiError>) {
        push(&self.detail_replies, None, result);
    }

    pub fn reply_detail_gated(&self, result: Result<Listing, ApiError>) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        push(&self.detail_replies, Some(rx), result);
        tx
    }

    pub fn reply_mine(&self, result: Result<Vec<Listing>, ApiError>) {
        push(&self.mine_replies, None, result);
    }

    pub fn list_calls(&self) -> Vec<CarFilters> {
        lock(&self.list_calls).clone()
    }

    pub fn detail_calls(&self) -> Vec<String> {
        lock(&self.detail_calls).clone()
    }

    pub fn mine_calls(&self) -> usize {
        *lock(&self.mine_calls)
    }

    // Yields until `n` listing requests have been issued
    pub async fn wait_for_list_calls(&self, n: usize) {
        while self.list_calls().len() < n {
            tokio::task::yield_now().await;
        }
    }
}

#[async_trait]
impl CarsApi for FakeCarsApi {
    async fn get_cars(&self, filters: &CarFilters) -> Result<Page<Listing>, ApiError> {
        lock(&self.list_calls).push(filters.clone());
        let reply = lock(&self.list_replies).pop_front();
        resolve(reply).await
    }

    async fn get_car(&self, id: &str) -> Result<Listing, ApiError> {
        lock(&self.detail_calls).push(id.to_string());
        let reply = lock(&self.detail_replies).pop_front();
        resolve(reply).await
    }

    async fn get_my_cars(&self) -> Result<Vec<Listing>, ApiError> {
        *lock(&self.mine_calls) += 1;
        let reply = lock(&self.mine_replies).pop_front();
        resolve(reply).await
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn push<T>(queue: &Mutex<VecDeque<Reply<T>>>, gate: Option<oneshot::Receiver<()>>, result: Result<T, ApiError>) {
    lock(queue).push_back(Reply { gate, result });
}

async fn resolve<T>(reply: Option<Reply<T>>) -> Result<T, ApiError> {
    let Some(reply) = reply else {
        return Err(ApiError::Network("no scripted reply".into()));
    };
    if let Some(gate) = reply.gate {
        let _ = gate.await;
    }
    reply.result
}

// A page of Honda City listings with the given ids
pub fn page_of(ids: &[&str], total: u64, total_pages: u32) -> Page<Listing> {
    Page {
        items: ids.iter().map(|id| listing(id, "Honda", "City", 2019)).collect(),
        pagination: Some(Pagination {
            page: 1,
            limit: 12,
            total,
            total_pages,
            has_next: total_pages > 1,
            has_prev: false,
        }),
    }
}

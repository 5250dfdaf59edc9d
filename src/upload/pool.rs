//! Bounded fan-out over a finite work list.
//!
//! A fixed number of worker threads drain a shared queue; each worker runs
//! one fully synchronous job at a time and pushes its result onto a
//! channel. Results arrive in completion order, not input order. Dropping
//! the pool stops feeding workers; jobs already in flight run to
//! completion.

use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

/// A running pool draining work into an iterator of results.
pub struct WorkerPool<T> {
    results: Option<Receiver<T>>,
    workers: Vec<JoinHandle<()>>,
}

impl<T: Send + 'static> WorkerPool<T> {
    /// Start `num_workers` threads mapping `job` over `items`.
    ///
    /// In-flight work is bounded by the worker count; the input list is
    /// only consumed as workers free up.
    pub fn run<I, F>(items: Vec<I>, num_workers: usize, job: F) -> WorkerPool<T>
    where
        I: Send + 'static,
        F: Fn(I) -> T + Send + Sync + 'static,
    {
        let queue = Arc::new(Mutex::new(items.into_iter()));
        let job = Arc::new(job);
        let (sender, results) = mpsc::channel();

        let count = num_workers.max(1);
        let mut workers = Vec::with_capacity(count);
        for _ in 0..count {
            let queue = Arc::clone(&queue);
            let job = Arc::clone(&job);
            let sender = sender.clone();
            workers.push(thread::spawn(move || loop {
                let next = queue.lock().map(|mut items| items.next());
                let Ok(Some(item)) = next else {
                    break;
                };
                // receiver gone means the caller stopped consuming
                if sender.send(job(item)).is_err() {
                    break;
                }
            }));
        }

        WorkerPool {
            results: Some(results),
            workers,
        }
    }

    fn join_workers(&mut self) {
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

impl<T: Send + 'static> Iterator for WorkerPool<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        match self.results.as_ref().and_then(|rx| rx.recv().ok()) {
            Some(result) => Some(result),
            None => {
                self.join_workers();
                None
            }
        }
    }
}

impl<T> Drop for WorkerPool<T> {
    fn drop(&mut self) {
        // dropping the receiver first makes further sends fail, so workers
        // stop after their current item instead of draining the queue
        self.results.take();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn every_item_produces_exactly_one_result() {
        let items: Vec<u64> = (0..100).collect();
        let pool = WorkerPool::run(items, 4, |n| n * 2);

        let results: BTreeSet<u64> = pool.collect();
        assert_eq!(results.len(), 100);
        assert_eq!(results, (0..100).map(|n| n * 2).collect());
    }

    #[test]
    fn single_worker_still_drains_everything() {
        let pool = WorkerPool::run(vec![1, 2, 3], 1, |n| n);
        assert_eq!(pool.count(), 3);
    }

    #[test]
    fn zero_workers_is_clamped_to_one() {
        let pool = WorkerPool::run(vec![1, 2, 3], 0, |n| n);
        assert_eq!(pool.count(), 3);
    }

    #[test]
    fn empty_input_finishes_immediately() {
        let pool = WorkerPool::run(Vec::<u64>::new(), 4, |n| n);
        assert_eq!(pool.count(), 0);
    }

    #[test]
    fn dropping_the_pool_abandons_queued_items() {
        let ran = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&ran);
        let mut pool = WorkerPool::run((0..10_000).collect::<Vec<u64>>(), 2, move |n| {
            counter.fetch_add(1, Ordering::SeqCst);
            thread::sleep(std::time::Duration::from_millis(1));
            n
        });

        let _first = pool.next();
        drop(pool);

        // workers stop after in-flight items rather than draining the queue
        assert!(ran.load(Ordering::SeqCst) < 10_000);
    }
}

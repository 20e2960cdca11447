//! A fixed-size worker pool dispatching data-parallel jobs over index ranges.
//!
//! The source this was distilled from overloads a single condition variable
//! for both "work is available" and "all work is done", which is correct but
//! subtle to reason about. This splits that into two condvars — one workers
//! wait on for new tasks, one `complete_all` waits on for the pending count
//! to reach zero — per the re-architecture spec.md §9 calls for.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};

use thiserror::Error;
use tracing::trace;

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("task pool thread count must be at least 1")]
    ZeroThreads,
}

type Job = Box<dyn FnOnce() + Send + 'static>;

struct Shared {
    queue: Mutex<VecDeque<Job>>,
    not_empty: Condvar,
    pending: Mutex<usize>,
    completed: Condvar,
    stop: AtomicBool,
}

pub struct TaskPool {
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
    pub thread_count: usize,
}

impl TaskPool {
    pub fn new(thread_count: usize) -> Result<Self, PoolError> {
        if thread_count == 0 {
            return Err(PoolError::ZeroThreads);
        }

        let shared = Arc::new(Shared {
            queue: Mutex::new(VecDeque::new()),
            not_empty: Condvar::new(),
            pending: Mutex::new(0),
            completed: Condvar::new(),
            stop: AtomicBool::new(false),
        });

        let workers = (0..thread_count)
            .map(|id| {
                let shared = Arc::clone(&shared);
                thread::Builder::new()
                    .name(format!("task-pool-{id}"))
                    .spawn(move || worker_loop(shared))
                    .expect("failed to spawn task pool worker thread")
            })
            .collect();

        Ok(Self {
            shared,
            workers,
            thread_count,
        })
    }

    pub fn enqueue<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        {
            let mut pending = self.shared.pending.lock().unwrap();
            *pending += 1;
        }
        {
            let mut queue = self.shared.queue.lock().unwrap();
            queue.push_back(Box::new(job));
        }
        self.shared.not_empty.notify_one();
    }

    /// Blocks until every enqueued task has finished.
    pub fn complete_all(&self) {
        let mut pending = self.shared.pending.lock().unwrap();
        while *pending > 0 {
            pending = self.shared.completed.wait(pending).unwrap();
        }
    }

    /// Splits `[0, count)` into `thread_count` equal batches, enqueues one
    /// task per batch, runs the remainder on the calling thread, then waits
    /// for every batch to finish. `f` is called exactly once per index in
    /// total, covering the full range as a disjoint union.
    pub fn dispatch<F>(&self, count: u32, f: F)
    where
        F: Fn(u32, u32) + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        let batch_size = count / self.thread_count as u32;

        for i in 0..self.thread_count as u32 {
            let start = batch_size * i;
            let end = start + batch_size;
            let f = Arc::clone(&f);
            self.enqueue(move || f(start, end));
        }

        let tail_start = batch_size * self.thread_count as u32;
        if tail_start < count {
            f(tail_start, count);
        }

        self.complete_all();
    }
}

fn worker_loop(shared: Arc<Shared>) {
    loop {
        let job = {
            let mut queue = shared.queue.lock().unwrap();
            loop {
                if let Some(job) = queue.pop_front() {
                    break Some(job);
                }
                if shared.stop.load(Ordering::Acquire) {
                    break None;
                }
                queue = shared.not_empty.wait(queue).unwrap();
            }
        };

        let Some(job) = job else {
            return;
        };

        job();

        let mut pending = shared.pending.lock().unwrap();
        *pending -= 1;
        trace!(remaining = *pending, "task pool job finished");
        if *pending == 0 {
            shared.completed.notify_all();
        }
    }
}

impl Drop for TaskPool {
    fn drop(&mut self) {
        self.shared.stop.store(true, Ordering::Release);
        self.shared.not_empty.notify_all();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    #[test]
    fn dispatch_covers_every_index_exactly_once() {
        let pool = TaskPool::new(4).unwrap();
        let hits: Arc<Vec<AtomicU32>> = Arc::new((0..97).map(|_| AtomicU32::new(0)).collect());
        let hits_for_closure = Arc::clone(&hits);
        pool.dispatch(97, move |start, end| {
            for i in start..end {
                hits_for_closure[i as usize].fetch_add(1, Ordering::SeqCst);
            }
        });
        for hit in hits.iter() {
            assert_eq!(hit.load(Ordering::SeqCst), 1);
        }
    }

    #[test]
    fn zero_threads_is_an_error() {
        assert!(matches!(TaskPool::new(0), Err(PoolError::ZeroThreads)));
    }

    #[test]
    fn complete_all_returns_once_queue_drains() {
        let pool = TaskPool::new(2).unwrap();
        let counter = Arc::new(std::sync::atomic::AtomicU32::new(0));
        for _ in 0..20 {
            let counter = Arc::clone(&counter);
            pool.enqueue(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
        pool.complete_all();
        assert_eq!(counter.load(Ordering::SeqCst), 20);
    }
}

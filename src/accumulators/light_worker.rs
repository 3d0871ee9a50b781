// Copyright (c) 2022 Octavian Oncescu
// Copyright (c) 2022-2023 The Purplecoin Core developers
// Licensed under the Apache License, Version 2.0 see LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0 or the MIT license, see
// LICENSE-MIT or http://opensource.org/licenses/MIT

//! Background witness generation. A single thread drains a FIFO queue of
//! witness requests and answers each of them on its own channel.

use crate::accumulators::{
    ChecksumStore, GeneratedWitness, WitnessErr, WitnessGenerator, WitnessRequest,
};
use crate::chain::{ChainBackend, SharedChainState};
use crate::consensus::WITNESS_SCAN_CEILING;
use crate::primitives::{BloomFilterHash256, PublicCoin};
use crossbeam_channel::{bounded, select, unbounded, Receiver, Sender};
use log::*;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::thread::JoinHandle;
use triomphe::Arc;

/// Witness generation request
#[derive(Debug)]
pub struct GenWit {
    pub request_id: u64,
    pub coin: PublicCoin,
    pub security_level: u8,
    pub start_height: u64,
    pub target_height: Option<u64>,
    pub filter: Option<BloomFilterHash256>,
    sink: Sender<WitnessResponse>,
}

impl GenWit {
    /// Returns the request and the receiving end of its response channel
    #[must_use]
    pub fn new(
        request_id: u64,
        coin: PublicCoin,
        security_level: u8,
        start_height: u64,
    ) -> (Self, Receiver<WitnessResponse>) {
        let (sink, recv) = bounded(1);
        let req = Self {
            request_id,
            coin,
            security_level,
            start_height,
            target_height: None,
            filter: None,
            sink,
        };

        (req, recv)
    }

    #[must_use]
    pub fn with_target(mut self, height: u64) -> Self {
        self.target_height = Some(height);
        self
    }

    #[must_use]
    pub fn with_filter(mut self, filter: BloomFilterHash256) -> Self {
        self.filter = Some(filter);
        self
    }

    fn respond(self, result: Result<GeneratedWitness, WorkerErr>) {
        let response = WitnessResponse {
            request_id: self.request_id,
            result,
        };

        if self.sink.send(response).is_err() {
            debug!("Witness request {} was abandoned by its requester", self.request_id);
        }
    }
}

#[derive(Debug)]
pub struct WitnessResponse {
    pub request_id: u64,
    pub result: Result<GeneratedWitness, WorkerErr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerErr {
    /// Not enough coins were accumulated within the scan ceiling. Retry later.
    NotEnoughMints,

    /// Any other failure, including the worker stopping before the request
    /// was answered
    NonDetermined,
}

impl From<WitnessErr> for WorkerErr {
    fn from(other: WitnessErr) -> Self {
        match other {
            WitnessErr::NotEnoughMints { .. } => Self::NotEnoughMints,
            _ => Self::NonDetermined,
        }
    }
}

/// Light zerocoin witness worker
pub struct LightWorker<B: ChainBackend + 'static, S: ChecksumStore + 'static> {
    chain: SharedChainState<B, S>,
    max_blocks: u64,
    requests: Mutex<Option<Sender<GenWit>>>,
    shutdown: Mutex<Option<Sender<()>>>,
    running: Arc<AtomicBool>,
    handle: Mutex<Option<JoinHandle<Receiver<GenWit>>>>,
}

impl<B: ChainBackend + 'static, S: ChecksumStore + 'static> LightWorker<B, S> {
    #[must_use]
    pub fn new(chain: SharedChainState<B, S>) -> Self {
        Self::with_max_blocks(chain, WITNESS_SCAN_CEILING)
    }

    #[must_use]
    pub fn with_max_blocks(chain: SharedChainState<B, S>, max_blocks: u64) -> Self {
        Self {
            chain,
            max_blocks,
            requests: Mutex::new(None),
            shutdown: Mutex::new(None),
            running: Arc::new(AtomicBool::new(false)),
            handle: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Spawns the worker thread. Returns false if it is already running.
    pub fn start(&self) -> bool {
        let mut requests = self.requests.lock();
        let mut handle = self.handle.lock();

        if requests.is_some() || handle.is_some() {
            return false;
        }

        let (req_send, req_recv) = unbounded::<GenWit>();
        let (shutdown_send, shutdown_recv) = bounded::<()>(1);
        let chain = self.chain.clone();
        let running = self.running.clone();
        let max_blocks = self.max_blocks;

        running.store(true, Ordering::SeqCst);
        *handle = Some(thread::spawn(move || {
            Self::serve(&chain, max_blocks, &running, &shutdown_recv, req_recv)
        }));
        *requests = Some(req_send);
        *self.shutdown.lock() = Some(shutdown_send);
        info!("Light worker started");
        true
    }

    /// Stops the worker thread. Requests still queued are answered with
    /// `WorkerErr::NonDetermined`.
    pub fn stop(&self) {
        // No new request is accepted past this point
        let requests = self.requests.lock().take();

        if requests.is_none() {
            return;
        }

        self.running.store(false, Ordering::SeqCst);

        if let Some(shutdown) = self.shutdown.lock().take() {
            let _ = shutdown.try_send(());
        }

        drop(requests);
        let handle = self.handle.lock().take();

        if let Some(handle) = handle {
            match handle.join() {
                Ok(pending) => {
                    let mut dropped = 0;

                    for req in pending.try_iter() {
                        req.respond(Err(WorkerErr::NonDetermined));
                        dropped += 1;
                    }

                    if dropped > 0 {
                        warn!("Light worker stopped with {dropped} pending requests");
                    }
                }

                Err(_) => error!("Light worker thread panicked"),
            }
        }

        info!("Light worker stopped");
    }

    /// Queues `req` without blocking. Returns false if the worker is not running,
    /// in which case the request is dropped unanswered.
    pub fn submit(&self, req: GenWit) -> bool {
        let requests = self.requests.lock();

        match requests.as_ref() {
            Some(sender) if self.is_running() => {
                let request_id = req.request_id;

                if sender.send(req).is_err() {
                    warn!("Light worker rejected request {request_id}");
                    return false;
                }

                true
            }

            _ => {
                warn!("Light worker is not running, rejecting request {}", req.request_id);
                false
            }
        }
    }

    /// Worker thread loop. Returns the request queue so that requests left
    /// in it can be answered once the thread is joined.
    fn serve(
        chain: &SharedChainState<B, S>,
        max_blocks: u64,
        running: &AtomicBool,
        shutdown_recv: &Receiver<()>,
        req_recv: Receiver<GenWit>,
    ) -> Receiver<GenWit> {
        loop {
            select! {
                recv(shutdown_recv) -> _ => break,
                recv(req_recv) -> req => {
                    let Ok(req) = req else {
                        break;
                    };

                    // Shutdown may be pending even when the request was picked
                    if !running.load(Ordering::SeqCst) {
                        req.respond(Err(WorkerErr::NonDetermined));
                        break;
                    }

                    let result = Self::process(chain, max_blocks, &req);

                    // In flight work is abandoned once stopped
                    if !running.load(Ordering::SeqCst) {
                        req.respond(Err(WorkerErr::NonDetermined));
                        break;
                    }

                    req.respond(result);
                }
            }
        }

        req_recv
    }

    fn process(
        chain: &SharedChainState<B, S>,
        max_blocks: u64,
        req: &GenWit,
    ) -> Result<GeneratedWitness, WorkerErr> {
        let state = chain.read();
        let witness_req = WitnessRequest {
            coin: req.coin.clone(),
            start_height: req.start_height,
            security_level: req.security_level,
            max_blocks,
            target_height: req.target_height,
            filter: req.filter.as_ref(),
        };

        WitnessGenerator::new(state.backend(), state.accumulators())
            .generate(&witness_req)
            .map_err(|err| {
                if !matches!(err, WitnessErr::NotEnoughMints { .. }) {
                    warn!("Witness request {} failed: {err:?}", req.request_id);
                }

                WorkerErr::from(err)
            })
    }
}

impl<B: ChainBackend + 'static, S: ChecksumStore + 'static> Drop for LightWorker<B, S> {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accumulators::MemoryChecksumStore;
    use crate::chain::tests::{coin, TestChain};
    use crate::chain::MemoryBackend;
    use crate::primitives::Denomination;
    use parking_lot::RwLock;
    use std::time::Duration;

    type Worker = LightWorker<MemoryBackend, MemoryChecksumStore>;

    fn shared_chain(others: u64) -> (SharedChainState<MemoryBackend, MemoryChecksumStore>, PublicCoin) {
        let mut chain = TestChain::new();
        let target = coin(0, Denomination::Ten);
        chain.mine(vec![target.clone()]);

        for i in 1..=others {
            chain.mine(vec![coin(i, Denomination::Ten)]);
        }

        (Arc::new(RwLock::new(chain.state)), target)
    }

    #[test]
    fn submit_on_stopped_worker_is_rejected() {
        let (chain, target) = shared_chain(1);
        let worker = Worker::new(chain);
        let (req, recv) = GenWit::new(1, target, 10, 0);

        assert!(!worker.is_running());
        assert!(!worker.submit(req));
        assert!(recv.recv_timeout(Duration::from_millis(10)).is_err());
    }

    #[test]
    fn it_answers_requests_in_order() {
        let (chain, target) = shared_chain(12);
        let worker = Worker::new(chain);
        assert!(worker.start());
        assert!(!worker.start());

        let (first, first_recv) = GenWit::new(1, target.clone(), 100, 0);
        let (second, second_recv) = GenWit::new(2, target, 10, 0);
        assert!(worker.submit(first));
        assert!(worker.submit(second));

        let first = first_recv.recv().unwrap();
        let second = second_recv.recv().unwrap();
        assert_eq!(first.request_id, 1);
        assert_eq!(first.result.unwrap().mints_added, 10);
        assert_eq!(second.request_id, 2);
        assert_eq!(second.result.unwrap().mints_added, 1);

        worker.stop();
        assert!(!worker.is_running());
    }

    #[test]
    fn failures_are_reported_coarsely() {
        let (chain, target) = shared_chain(3);
        let worker = Worker::with_max_blocks(chain, 2);
        assert!(worker.start());

        let (short, short_recv) = GenWit::new(1, target, 100, 0);
        let (unknown, unknown_recv) = GenWit::new(2, coin(99, Denomination::Ten), 1, 0);
        assert!(worker.submit(short));
        assert!(worker.submit(unknown));

        assert_eq!(
            short_recv.recv().unwrap().result.unwrap_err(),
            WorkerErr::NotEnoughMints
        );
        assert_eq!(
            unknown_recv.recv().unwrap().result.unwrap_err(),
            WorkerErr::NonDetermined
        );
    }

    #[test]
    fn it_restarts_after_stop() {
        let (chain, target) = shared_chain(2);
        let worker = Worker::new(chain);
        assert!(worker.start());
        worker.stop();
        assert!(!worker.submit(GenWit::new(1, target.clone(), 10, 0).0));

        assert!(worker.start());
        let (req, recv) = GenWit::new(2, target, 10, 0);
        assert!(worker.submit(req));
        assert!(recv.recv().unwrap().result.is_ok());
    }

    #[test]
    fn queued_requests_are_answered_on_stop() {
        let (chain, target) = shared_chain(12);
        let worker = Arc::new(Worker::new(chain.clone()));
        assert!(worker.start());

        // Keep the worker blocked on the chain state lock
        let guard = chain.write();
        let receivers: Vec<_> = (0..3)
            .map(|id| {
                let (req, recv) = GenWit::new(id, target.clone(), 100, 0);
                assert!(worker.submit(req));
                recv
            })
            .collect();

        let stopper = {
            let worker = worker.clone();
            thread::spawn(move || worker.stop())
        };

        while worker.is_running() {
            thread::sleep(Duration::from_millis(1));
        }

        drop(guard);
        stopper.join().unwrap();

        for (id, recv) in receivers.into_iter().enumerate() {
            let response = recv.recv().unwrap();
            assert_eq!(response.request_id, id as u64);
            assert_eq!(response.result.unwrap_err(), WorkerErr::NonDetermined);
        }
    }

    #[test]
    fn stopping_worker_does_not_start_new_scans() {
        let (chain, target) = shared_chain(12);
        let running = Arc::new(AtomicBool::new(false));
        let (req_send, req_recv) = unbounded();
        let (shutdown_send, shutdown_recv) = bounded(1);
        let (done_send, done_recv) = bounded(1);
        let receivers: Vec<_> = (0..4)
            .map(|id| {
                let (req, recv) = GenWit::new(id, target.clone(), 100, 0);
                req_send.send(req).unwrap();
                recv
            })
            .collect();
        shutdown_send.send(()).unwrap();

        // A scan would block on the chain state lock held here
        let guard = chain.write();
        let handle = {
            let chain = chain.clone();
            thread::spawn(move || {
                let pending = Worker::serve(&chain, WITNESS_SCAN_CEILING, &running, &shutdown_recv, req_recv);
                done_send.send(()).unwrap();
                pending
            })
        };

        let finished = done_recv.recv_timeout(Duration::from_secs(5));
        drop(guard);
        assert!(finished.is_ok());

        let pending = handle.join().unwrap();
        let answered: Vec<_> = receivers.iter().filter_map(|recv| recv.try_recv().ok()).collect();
        assert!(answered.len() <= 1);
        assert!(answered
            .iter()
            .all(|response| response.result.as_ref().unwrap_err() == &WorkerErr::NonDetermined));
        assert_eq!(pending.len() + answered.len(), 4);
    }
}

use crossbeam_channel::Receiver;
use hex_literal::hex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use xmr_idle_miner_rs::miner::engine::{DIGEST_SIZE, Digest};
use xmr_idle_miner_rs::miner::job::NONCE_OFFSET;
use xmr_idle_miner_rs::miner::regulator::LoadFactor;
use xmr_idle_miner_rs::miner::worker::{JobMailbox, SearchSession};
use xmr_idle_miner_rs::miner::{EngineFactory, HashEngine, Hashrate, Nonce, Regulator};
use xmr_idle_miner_rs::{Candidate, Job, JobMessage, MinerError, Pool, PoolConfig, Target};

const SEED_A: [u8; 32] = hex!("0101010101010101010101010101010101010101010101010101010101010101");
const SEED_B: [u8; 32] = hex!("0202020202020202020202020202020202020202020202020202020202020202");

/// Engine meeting a zero target on every eighth hash it computes
struct CountingEngine {
    hashes: u64,
    /// Rekeys of this engine alone
    own_rekeys: Arc<AtomicUsize>,
    rekeys: Arc<AtomicUsize>,
    seen: Arc<Mutex<Vec<Nonce>>>,
    fail_rekey: bool,
}

impl HashEngine for CountingEngine {
    fn rekey(&mut self, _seed: &[u8]) -> Result<(), MinerError> {
        if self.fail_rekey {
            return Err(MinerError::EngineInit("rekey refused".into()));
        }
        self.own_rekeys.fetch_add(1, Ordering::SeqCst);
        self.rekeys.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn hash(&mut self, blob: &[u8]) -> Digest {
        let mut nonce = [0u8; 4];
        nonce.copy_from_slice(&blob[NONCE_OFFSET..NONCE_OFFSET + 4]);
        self.seen.lock().unwrap().push(Nonce::from_le_bytes(nonce));

        self.hashes += 1;
        // keep the candidate stream small
        thread::sleep(Duration::from_micros(200));
        if self.hashes % 8 == 0 {
            [0u8; DIGEST_SIZE]
        } else {
            [0xffu8; DIGEST_SIZE]
        }
    }
}

#[derive(Default)]
struct CountingFactory {
    creates: AtomicUsize,
    rekeys: Arc<AtomicUsize>,
    /// One rekey counter per created engine, in creation order
    engine_rekeys: Mutex<Vec<Arc<AtomicUsize>>>,
    seen: Arc<Mutex<Vec<Nonce>>>,
    fail_rekey: bool,
}

impl CountingFactory {
    fn rekeys_per_engine(&self) -> Vec<usize> {
        self.engine_rekeys
            .lock()
            .unwrap()
            .iter()
            .map(|count| count.load(Ordering::SeqCst))
            .collect()
    }
}

impl EngineFactory for CountingFactory {
    fn create(&self, _seed: &[u8]) -> Result<Box<dyn HashEngine>, MinerError> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        let own_rekeys = Arc::new(AtomicUsize::new(0));
        self.engine_rekeys.lock().unwrap().push(Arc::clone(&own_rekeys));
        Ok(Box::new(CountingEngine {
            hashes: 0,
            own_rekeys,
            rekeys: Arc::clone(&self.rekeys),
            seen: Arc::clone(&self.seen),
            fail_rekey: self.fail_rekey,
        }))
    }

    fn name(&self) -> &str {
        "counting"
    }
}

fn job(id: &str, seed: [u8; 32]) -> Job {
    Job::new(id, vec![0u8; 76], seed.to_vec(), 7, Target::new([0; 4])).unwrap()
}

fn pool_with(workers: usize, factory: &Arc<CountingFactory>) -> (Pool, Receiver<Candidate>) {
    let (tx, rx) = crossbeam_channel::unbounded();
    let pool = Pool::new(
        PoolConfig {
            worker_threads: Some(workers),
            ..PoolConfig::default()
        },
        factory.clone(),
        Arc::new(tx),
    );
    (pool, rx)
}

fn wait_until(deadline: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    cond()
}

#[test]
fn sessions_cover_the_nonce_space_without_overlap() {
    const WORKERS: Nonce = 4;
    const STEPS: usize = 64;

    let factory = CountingFactory::default();
    let (tx, _rx) = crossbeam_channel::unbounded::<Candidate>();
    let sink = Arc::new(tx);

    let mut sessions: Vec<SearchSession> = (0..WORKERS)
        .map(|index| {
            let mailbox = Arc::new(JobMailbox::new());
            mailbox.publish(job("a", SEED_A));
            SearchSession::start(
                index,
                WORKERS,
                mailbox,
                &factory,
                Hashrate::new(),
                Regulator::new(LoadFactor::new(2, 0.5)),
                sink.clone(),
            )
            .unwrap()
        })
        .collect();

    for _ in 0..STEPS {
        for session in sessions.iter_mut() {
            session.step().unwrap();
        }
    }

    let seen = factory.seen.lock().unwrap();
    assert_eq!(seen.len(), WORKERS as usize * STEPS);
    let unique: HashSet<Nonce> = seen.iter().copied().collect();
    assert_eq!(unique.len(), seen.len(), "a nonce was hashed twice");
    let expected: HashSet<Nonce> = (0..(WORKERS as usize * STEPS) as Nonce).collect();
    assert_eq!(unique, expected);
}

#[test]
fn job_switch_rekeys_each_worker_once() {
    let factory = Arc::new(CountingFactory::default());
    let (pool, rx) = pool_with(4, &factory);

    pool.submit_job(job("a", SEED_A));
    assert_eq!(pool.worker_count(), 4);
    assert!(wait_until(Duration::from_secs(5), || {
        factory.creates.load(Ordering::SeqCst) == 4
    }));
    assert!(wait_until(Duration::from_secs(5), || rx.try_recv().is_ok()));

    // same seed: no rekey
    pool.submit_job(job("a2", SEED_A));
    pool.submit_job(job("b", SEED_B));
    assert!(wait_until(Duration::from_secs(5), || {
        factory.rekeys.load(Ordering::SeqCst) >= 4
    }));
    while rx.try_recv().is_ok() {}

    let later = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(later.job_id, "b");

    pool.stop();
    assert_eq!(factory.creates.load(Ordering::SeqCst), 4);
    assert_eq!(factory.rekeys_per_engine(), vec![1, 1, 1, 1]);
}

#[test]
fn dead_workers_drop_out_of_the_aggregate_hashrate() {
    let factory = Arc::new(CountingFactory {
        fail_rekey: true,
        ..Default::default()
    });
    let (pool, _rx) = pool_with(1, &factory);

    pool.submit_job(job("a", SEED_A));
    assert!(wait_until(Duration::from_secs(5), || pool.hashrate() > 0.0));

    // the new seed makes the only worker's rekey fail and its thread exit
    pool.submit_job(job("b", SEED_B));
    assert!(wait_until(Duration::from_secs(5), || pool.live_workers() == 0));
    assert_eq!(pool.worker_count(), 1);
    assert_eq!(pool.hashrate(), 0.0);

    pool.stop();
}

#[test]
fn stop_joins_workers_and_next_job_restarts() {
    let factory = Arc::new(CountingFactory::default());
    let (pool, rx) = pool_with(2, &factory);

    pool.submit_job(job("a", SEED_A));
    assert!(pool.is_running());
    assert!(wait_until(Duration::from_secs(5), || pool.hashrate() > 0.0));

    pool.stop();
    assert!(!pool.is_running());
    assert_eq!(pool.worker_count(), 0);
    assert_eq!(pool.live_workers(), 0);
    assert_eq!(pool.hashrate(), 0.0);

    // nothing is hashed once stop has returned
    let hashed = factory.seen.lock().unwrap().len();
    thread::sleep(Duration::from_millis(50));
    assert_eq!(factory.seen.lock().unwrap().len(), hashed);
    while rx.try_recv().is_ok() {}

    pool.submit_job(job("b", SEED_B));
    assert_eq!(pool.worker_count(), 2);
    assert!(wait_until(Duration::from_secs(5), || {
        factory.creates.load(Ordering::SeqCst) == 4
    }));
    let candidate = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(candidate.job_id, "b");

    pool.stop();
    pool.stop();
}

#[test]
fn load_factor_changes_are_idempotent() {
    let factory = Arc::new(CountingFactory::default());
    let (pool, _rx) = pool_with(2, &factory);

    pool.set_load_factor(0.3);
    pool.set_load_factor(0.3);
    assert_eq!(pool.load_factor(), 0.3);

    pool.submit_job(job("a", SEED_A));
    pool.set_load_factor(0.1);
    pool.set_load_factor(0.1);
    assert_eq!(pool.load_factor(), 0.1);
    assert_eq!(pool.live_workers(), 2);
    pool.stop();
}

#[test]
fn malformed_jobs_leave_the_pool_idle() {
    let factory = Arc::new(CountingFactory::default());
    let (pool, _rx) = pool_with(2, &factory);

    assert!(!pool.start_job("short", &[0u8; 10], &SEED_A, 1, &[0; 4]));
    assert!(!pool.start_job("seed", &[0u8; 76], &SEED_A[..16], 1, &[0; 4]));
    assert!(!pool.start_job("target", &[0u8; 76], &SEED_A, 1, &[0; 8]));

    let message: JobMessage = serde_json::from_str(
        r#"{"job_id":"hex","blob":"zz","seed_hash":"00","target":"ffffffff"}"#,
    )
    .unwrap();
    assert!(pool.submit(message).is_err());

    assert!(!pool.is_running());
    assert_eq!(factory.creates.load(Ordering::SeqCst), 0);
}

#[test]
fn json_job_is_mined_and_reported() {
    let factory = Arc::new(CountingFactory::default());
    let (pool, rx) = pool_with(1, &factory);

    let message: JobMessage = serde_json::from_str(&format!(
        r#"{{"job_id":"j1","blob":"{}","seed_hash":"{}","height":42,"target":"00000000"}}"#,
        hex::encode([0u8; 76]),
        hex::encode(SEED_A)
    ))
    .unwrap();
    pool.submit(message).unwrap();

    let candidate = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    pool.stop();

    assert_eq!(candidate.job_id, "j1");
    let submission = candidate.to_submission();
    assert_eq!(submission.result, hex::encode([0u8; DIGEST_SIZE]));
    assert_eq!(submission.nonce, hex::encode(candidate.nonce.to_le_bytes()));
}

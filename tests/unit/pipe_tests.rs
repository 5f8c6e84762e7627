use crate::common::{init_test_logging, new_log, record};
use ordered_pipe::{
    LockFreePipe, LoggingFaultHandler, PipeConfig, PipeError, SequenceTicket, Task, TaskFailure,
    Ticket, TicketIssuer, WaitStrategy,
};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Barrier, Mutex};
use std::thread;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_rounding() {
        assert_eq!(LockFreePipe::new(5).capacity(), 8);
        assert_eq!(LockFreePipe::new(8).capacity(), 8);
        assert_eq!(LockFreePipe::new(9).capacity(), 16);
        assert_eq!(LockFreePipe::new(0).capacity(), 1);
    }

    #[test]
    fn test_pipeline_with_logging_handler() {
        init_test_logging();

        let pipe = LockFreePipe::with_fault_handler(8, LoggingFaultHandler);
        let issuer = TicketIssuer::new();
        let log = new_log();

        let t0 = issuer.issue();
        let t1 = issuer.issue();
        let t2 = issuer.issue();

        assert!(!pipe.submit(&t2, record(&log, 2)).unwrap());
        assert!(!pipe
            .submit(&t1, Task::new(|| Err("upstream gone".into())).with_name("fetch"))
            .unwrap());
        assert!(pipe.submit(&t0, record(&log, 0)).unwrap());

        assert_eq!(*log.lock().unwrap(), vec![0, 2]);
        assert_eq!(pipe.tail(), 3);
        for ticket in [&t0, &t1, &t2] {
            assert_eq!(ticket.processed(), 1);
        }
    }

    #[test]
    fn test_config_from_json() {
        init_test_logging();

        let config: PipeConfig = serde_json::from_str(
            r#"{ "name": "orders", "capacity": 100, "wait_strategy": "backoff" }"#,
        )
        .unwrap();
        let pipe = LockFreePipe::with_config(config, None).unwrap();

        assert_eq!(pipe.name(), "orders");
        assert_eq!(pipe.capacity(), 128);
        assert_eq!(pipe.wait_strategy(), WaitStrategy::Backoff);
    }

    #[test]
    fn test_config_rejects_oversized_capacity() {
        let config = PipeConfig::default().with_capacity(usize::MAX);
        assert!(matches!(
            LockFreePipe::with_config(config, None),
            Err(PipeError::InvalidCapacity { .. })
        ));
    }

    #[test]
    fn test_duplicate_and_close_semantics() {
        let pipe = LockFreePipe::new(4);
        let log = new_log();

        assert!(pipe.submit(&Ticket::new(0), record(&log, 0)).unwrap());
        assert_eq!(
            pipe.submit(&Ticket::new(0), record(&log, 0)),
            Err(PipeError::DuplicateSequence { seq: 0, tail: 1 })
        );

        let consumed = Ticket::new(0);
        assert!(!pipe.close(&consumed));
        assert!(!pipe.close(&consumed));
        assert_eq!(*log.lock().unwrap(), vec![0]);
    }

    #[test]
    fn test_scenario_three_one_zero_two() {
        init_test_logging();

        for _ in 0..100 {
            let pipe = Arc::new(LockFreePipe::new(4));
            let log = new_log();
            let barrier = Arc::new(Barrier::new(4));

            let handles: Vec<_> = [3u64, 1, 0, 2]
                .into_iter()
                .map(|seq| {
                    let (pipe, log, barrier) = (pipe.clone(), log.clone(), barrier.clone());
                    thread::spawn(move || {
                        let ticket = Ticket::new(seq);
                        barrier.wait();
                        let ran = pipe.submit(&ticket, record(&log, seq)).unwrap();
                        (ran, ticket.processed())
                    })
                })
                .collect();

            let outcomes: Vec<(bool, u32)> =
                handles.into_iter().map(|h| h.join().unwrap()).collect();

            assert_eq!(*log.lock().unwrap(), vec![0, 1, 2, 3]);
            assert!(outcomes.iter().any(|(ran, _)| *ran));
            assert!(outcomes.iter().all(|(_, processed)| *processed == 1));
        }
    }

    #[test]
    fn test_fault_handler_sees_every_failure_under_contention() {
        const THREADS: usize = 4;
        const PER_THREAD: u64 = 500;

        let failures = Arc::new(AtomicU32::new(0));
        let counter = failures.clone();
        let pipe = Arc::new(LockFreePipe::with_fault_handler(
            8,
            move |_: &Task, failure: &TaskFailure| {
                assert_eq!(failure.seq() % 10, 0);
                counter.fetch_add(1, Ordering::Relaxed);
            },
        ));
        let issuer = Arc::new(TicketIssuer::new());
        let ran = Arc::new(Mutex::new(Vec::new()));

        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let (pipe, issuer, ran) = (pipe.clone(), issuer.clone(), ran.clone());
                thread::spawn(move || {
                    for _ in 0..PER_THREAD {
                        let ticket = issuer.issue();
                        let seq = ticket.seq();
                        let ran = ran.clone();
                        let task = Task::new(move || {
                            if seq % 10 == 0 {
                                return Err(format!("seq {seq} rejected").into());
                            }
                            ran.lock().unwrap().push(seq);
                            Ok(())
                        });
                        pipe.submit(&ticket, task).unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let total = THREADS as u64 * PER_THREAD;
        assert_eq!(u64::from(failures.load(Ordering::Relaxed)), total / 10);
        assert_eq!(
            *ran.lock().unwrap(),
            (0..total).filter(|s| s % 10 != 0).collect::<Vec<_>>()
        );
        assert_eq!(pipe.tail(), total);
    }

    #[test]
    fn test_dropping_pipe_releases_deposited_tasks() {
        let marker = Arc::new(());
        let pipe = LockFreePipe::new(8);

        for seq in 1..5 {
            let held = marker.clone();
            let task = Task::infallible(move || {
                let _keep = &held;
            });
            assert!(!pipe.submit(&Ticket::new(seq), task).unwrap());
        }
        assert_eq!(Arc::strong_count(&marker), 5);

        drop(pipe);
        assert_eq!(Arc::strong_count(&marker), 1);
    }

    #[test]
    fn test_issuer_ahead_of_pipe_waits_for_gap_to_close() {
        let pipe = LockFreePipe::new(8);
        let issuer = TicketIssuer::with_start(2);
        let log = new_log();

        let ticket = issuer.issue();
        assert_eq!(ticket.seq(), 2);
        assert!(!pipe.submit(&ticket, record(&log, 2)).unwrap());
        assert!(log.lock().unwrap().is_empty());

        assert!(pipe.close(&Ticket::new(0)));
        assert!(pipe.close(&Ticket::new(1)));
        assert_eq!(*log.lock().unwrap(), vec![2]);
        assert_eq!(pipe.tail(), 3);
    }
}

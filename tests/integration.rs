// ABOUTME: Integration tests for average-rate convergence under concurrency.
// ABOUTME: Hammers a shared Limiter from many tasks on a paused clock.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use pacer::prelude::*;
use pacer::MAX_NEXT_CALL_LAG_STREAK;
use tokio::time::Instant;

/// Drive `concurrent` tasks calling `wait` in a loop for `test_time` and
/// check the number of grants matches the configured rate.
///
/// With `cancel_context`, roughly every third call gets a deadline somewhere
/// inside one interval; cancellations must not change the average rate.
async fn assert_rate_converges(
    count: u32,
    per: Duration,
    concurrent: usize,
    test_time: Duration,
    cancel_context: bool,
) {
    let limiter = Arc::new(Limiter::new(count, per));
    let counter = Arc::new(AtomicU64::new(0));
    let interval = limiter.interval();

    let mut handles = Vec::new();
    for _ in 0..concurrent {
        let limiter = limiter.clone();
        let counter = counter.clone();
        handles.push(tokio::spawn(async move {
            let background = Context::background();
            loop {
                let ctx = if cancel_context && rand::random::<f64>() < 1.0 / 3.0 {
                    let timeout = interval.mul_f64(rand::random::<f64>());
                    background.with_timeout(timeout)
                } else {
                    background.clone()
                };

                if limiter.wait(&ctx).await.is_ok() {
                    counter.fetch_add(1, Ordering::Relaxed);
                }
                tokio::task::yield_now().await;
            }
        }));
    }

    tokio::time::sleep(test_time).await;
    let granted = counter.load(Ordering::Relaxed) as f64;
    for handle in &handles {
        handle.abort();
    }

    let expected = test_time.as_secs_f64() / per.as_secs_f64() * f64::from(count);
    let delta = f64::from(MAX_NEXT_CALL_LAG_STREAK);
    assert!(
        (granted - expected).abs() <= delta,
        "count: {}, per: {:?}, tasks: {}, cancel_context: {}: granted {} expected {}",
        count,
        per,
        concurrent,
        cancel_context,
        granted,
        expected
    );
}

async fn assert_rate_converges_both_ways(count: u32, per: Duration) {
    let test_time = Duration::from_secs(5);
    assert_rate_converges(count, per, 10, test_time, false).await;
    assert_rate_converges(count, per, 10, test_time, true).await;
}

#[tokio::test(start_paused = true)]
async fn test_rate_one_per_second() {
    assert_rate_converges_both_ways(1, Duration::from_secs(1)).await;
}

#[tokio::test(start_paused = true)]
async fn test_rate_hundred_per_second() {
    assert_rate_converges_both_ways(100, Duration::from_secs(1)).await;
}

#[tokio::test(start_paused = true)]
async fn test_rate_thousand_per_second() {
    assert_rate_converges_both_ways(1000, Duration::from_secs(1)).await;
}

#[tokio::test(start_paused = true)]
async fn test_rate_ten_per_minute() {
    assert_rate_converges_both_ways(10, Duration::from_secs(60)).await;
}

#[tokio::test(start_paused = true)]
async fn test_rate_thousand_per_minute() {
    assert_rate_converges_both_ways(1000, Duration::from_secs(60)).await;
}

#[tokio::test(start_paused = true)]
async fn test_rate_thousand_per_five_seconds() {
    assert_rate_converges_both_ways(1000, Duration::from_secs(5)).await;
}

#[tokio::test(start_paused = true)]
async fn test_rate_single_caller() {
    let test_time = Duration::from_secs(5);
    assert_rate_converges(100, Duration::from_secs(1), 1, test_time, false).await;
    assert_rate_converges(100, Duration::from_secs(1), 1, test_time, true).await;
}

#[tokio::test(start_paused = true)]
async fn test_ten_per_second_scenario() {
    let limiter = Limiter::new(10, Duration::from_secs(1));
    let ctx = Context::background();

    let start = Instant::now();
    limiter.wait(&ctx).await.unwrap();
    assert_eq!(start.elapsed(), Duration::ZERO, "first call must not wait");

    limiter.wait(&ctx).await.unwrap();
    let second = start.elapsed();
    assert!(second >= Duration::from_millis(100), "second call waited {:?}", second);
    assert!(second < Duration::from_millis(102), "second call waited {:?}", second);

    let (cancelled, handle) = ctx.with_cancel();
    handle.cancel();
    let before = Instant::now();
    assert_eq!(limiter.wait(&cancelled).await, Err(Interrupted::Cancelled));
    assert_eq!(before.elapsed(), Duration::ZERO);

    // The cancelled call reserved nothing: the next slot is one interval on.
    limiter.wait(&ctx).await.unwrap();
    let third = start.elapsed();
    assert!(third >= Duration::from_millis(200), "third call waited {:?}", third);
    assert!(third < Duration::from_millis(202), "third call waited {:?}", third);
}

#[tokio::test(start_paused = true)]
async fn test_shared_by_reference_across_tasks() {
    let config = RateConfig::new(50, 1000);
    let limiter = Arc::new(Limiter::from_config(&config).unwrap());
    let start = Instant::now();

    let tasks: Vec<_> = (0..5)
        .map(|_| {
            let limiter = limiter.clone();
            tokio::spawn(async move {
                for _ in 0..10 {
                    limiter.wait(&Context::background()).await.unwrap();
                }
            })
        })
        .collect();
    futures::future::join_all(tasks).await;

    // 50 grants, the first one free: 49 intervals of 20ms.
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(980), "finished early: {:?}", elapsed);
    assert!(elapsed < Duration::from_millis(1000), "finished late: {:?}", elapsed);
}

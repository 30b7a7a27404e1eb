use std::sync::Arc;
use std::time::Duration;

use mediaflow_core::impls::{ChannelEventSink, CopyProcessor, SimulateProcessor};
use mediaflow_core::{
    Priority, ProcessorRegistry, QueueConfig, QueueEvent, TaskQueue, TaskSpec, TaskStatus,
};
use serde_json::json;
use tokio::sync::broadcast;

fn registry() -> ProcessorRegistry {
    ProcessorRegistry::new()
        .with(Arc::new(SimulateProcessor::default()))
        .and_then(|r| r.with(Arc::new(CopyProcessor)))
        .unwrap()
}

async fn next_queue_empty(rx: &mut broadcast::Receiver<QueueEvent>) {
    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            match rx.recv().await {
                Ok(QueueEvent::QueueEmpty) => return,
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => panic!("event channel closed"),
            }
        }
    })
    .await
    .expect("queue never drained");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn tick_drains_a_mixed_batch() {
    let sink = Arc::new(ChannelEventSink::new(1024));
    let mut rx = sink.subscribe();
    let queue = TaskQueue::builder(registry())
        .config(
            QueueConfig::default()
                .with_max_workers(3)
                .with_tick_interval(Duration::from_millis(5)),
        )
        .event_sink(sink.clone())
        .expect_processors(&["simulate", "copy"])
        .build()
        .unwrap();
    let handle = queue.start().await.unwrap();

    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("clip.mov");
    tokio::fs::write(&input, b"not really a movie").await.unwrap();

    let mut ids = Vec::new();
    for i in 0..6 {
        let spec = TaskSpec::new("simulate", &input, dir.path().join(format!("sim-{i}.mov")))
            .with_config("steps", json!(5))
            .with_config("step_ms", json!(1));
        ids.push(queue.submit(spec, Priority::Normal).await);
    }
    let copy = queue
        .submit_preview(TaskSpec::new("copy", &input, dir.path().join("out/clip.mov")))
        .await;

    // an early tick may drain the queue before every submit lands
    while queue.counts().await.completed < 7 {
        next_queue_empty(&mut rx).await;
    }

    let counts = queue.counts().await;
    assert_eq!(counts.completed, 7);
    assert!(counts.is_idle());
    for task_id in ids.iter().chain([&copy]) {
        assert_eq!(queue.status(*task_id).await, Some(TaskStatus::Completed));
    }
    assert_eq!(
        tokio::fs::read(dir.path().join("out/clip.mov")).await.unwrap(),
        b"not really a movie"
    );

    assert_eq!(queue.clear_completed().await, 7);
    assert_eq!(queue.counts().await.total(), 0);
    handle.shutdown_and_join().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn cancel_running_task_through_the_tick() {
    let sink = Arc::new(ChannelEventSink::new(1024));
    let mut rx = sink.subscribe();
    let queue = TaskQueue::builder(registry())
        .config(
            QueueConfig::default()
                .with_max_workers(1)
                .with_tick_interval(Duration::from_millis(5)),
        )
        .event_sink(sink.clone())
        .build()
        .unwrap();
    let handle = queue.start().await.unwrap();

    let slow = TaskSpec::new("simulate", "in.mov", "out.mov").with_config("step_ms", json!(20));
    let task_id = queue.submit(slow, Priority::Normal).await;
    tokio::time::timeout(Duration::from_secs(5), async {
        while queue.status(task_id).await != Some(TaskStatus::Processing) {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .unwrap();

    assert!(queue.cancel(task_id).await);
    next_queue_empty(&mut rx).await;

    let record = queue.task(task_id).await.unwrap();
    assert_eq!(record.status, TaskStatus::Cancelled);
    assert!(record.progress < 1.0);
    assert_eq!(queue.counts().await.cancelled, 1);
    handle.shutdown_and_join().await;
}

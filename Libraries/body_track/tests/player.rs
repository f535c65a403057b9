mod common;

use std::{path::Path, sync::Arc, time::Duration};

use body_track::{metadata::joints_sample_entry, BodyPlayer, EmissionPolicy, PlayerConfig, PlayerEvent};
use bytes::Bytes;
use tokio::{
    sync::mpsc,
    time::{timeout, Instant},
};

use common::{joints_at, record, write_movie};

fn open(path: &Path, start_paused: bool) -> (BodyPlayer, mpsc::UnboundedReceiver<PlayerEvent>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    let callback = Arc::new(move |event: PlayerEvent| {
        let _ = sender.send(event);
    });
    let player = BodyPlayer::open(path, PlayerConfig { start_paused }, callback).unwrap();
    (player, receiver)
}

/// Collects events up to and including `ReachedEnd`, with the playback
/// clock offset of each one.
async fn until_end(events: &mut mpsc::UnboundedReceiver<PlayerEvent>, start: Instant) -> Vec<(Duration, PlayerEvent)> {
    let mut seen = Vec::new();
    loop {
        let event = timeout(Duration::from_secs(30), events.recv()).await.unwrap().unwrap();
        let end = matches!(event, PlayerEvent::ReachedEnd);
        seen.push((start.elapsed(), event));
        if end {
            return seen;
        }
    }
}

fn lifecycle(events: &[(Duration, PlayerEvent)]) -> Vec<(bool, Duration)> {
    events
        .iter()
        .filter_map(|(_, event)| match event {
            PlayerEvent::SubjectPresent { time } => Some((true, *time)),
            PlayerEvent::SubjectAbsent { time } => Some((false, *time)),
            _ => None,
        })
        .collect()
}

#[tokio::test(start_paused = true)]
async fn presence_then_absence_is_reported_for_every_policy() {
    for policy in [EmissionPolicy::Dense, EmissionPolicy::Transitions, EmissionPolicy::SparseAbsence] {
        let path = record(policy, 40, |i| i < 20);
        let start = Instant::now();
        let (player, mut events) = open(&path, false);
        assert_eq!(player.duration(), Duration::from_secs(2));

        let seen = until_end(&mut events, start).await;
        assert_eq!(
            lifecycle(&seen),
            vec![(true, Duration::ZERO), (false, Duration::from_secs(1))],
            "{:?}",
            policy
        );
        std::fs::remove_file(path).unwrap();
    }
}

#[tokio::test(start_paused = true)]
async fn samples_are_delivered_when_the_clock_reaches_them() {
    let path = record(EmissionPolicy::Dense, 10, |_| true);
    let start = Instant::now();
    let (_player, mut events) = open(&path, false);

    let seen = until_end(&mut events, start).await;
    let mut joints = 0;
    for (elapsed, event) in &seen {
        match event {
            PlayerEvent::Joints { time, sample } => {
                assert!(*elapsed >= *time, "{:?} delivered at {:?}", time, elapsed);
                assert!(*elapsed < *time + Duration::from_millis(5));
                assert!(sample.root().is_some());
                joints += 1;
            }
            PlayerEvent::ReachedEnd => assert!(*elapsed >= Duration::from_millis(500)),
            _ => {}
        }
    }
    assert_eq!(joints, 10);
    std::fs::remove_file(path).unwrap();
}

#[tokio::test(start_paused = true)]
async fn play_after_the_end_rewinds_in_lock_step() {
    let path = record(EmissionPolicy::Transitions, 20, |i| i < 10);
    let start = Instant::now();
    let (player, mut events) = open(&path, false);

    until_end(&mut events, start).await;
    assert!(!player.is_playing());
    assert_eq!(player.position(), Duration::from_secs(1));

    let rewound = Instant::now();
    player.play();
    let replay = until_end(&mut events, rewound).await;
    assert!(matches!(replay[0], (_, PlayerEvent::SubjectPresent { time }) if time == Duration::ZERO));
    assert!(matches!(replay[1], (elapsed, PlayerEvent::Joints { time, .. }) if time == Duration::ZERO && elapsed < Duration::from_millis(5)));
    assert_eq!(lifecycle(&replay), vec![(true, Duration::ZERO), (false, Duration::from_millis(500))]);
    std::fs::remove_file(path).unwrap();
}

#[tokio::test(start_paused = true)]
async fn paused_player_delivers_nothing() {
    let path = record(EmissionPolicy::Dense, 20, |_| true);
    let (player, mut events) = open(&path, true);

    assert!(timeout(Duration::from_secs(5), events.recv()).await.is_err());
    assert_eq!(player.position(), Duration::ZERO);

    player.play();
    assert!(matches!(events.recv().await, Some(PlayerEvent::SubjectPresent { .. })));
    assert!(matches!(events.recv().await, Some(PlayerEvent::Joints { .. })));
    tokio::time::sleep(Duration::from_millis(120)).await;
    player.pause();

    // Let the pause land before reading the frozen position
    tokio::task::yield_now().await;
    let position = player.position();
    assert!(!player.is_playing());
    while let Ok(event) = events.try_recv() {
        assert!(!matches!(event, PlayerEvent::ReachedEnd));
    }
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(events.try_recv().is_err());
    assert_eq!(player.position(), position);
    std::fs::remove_file(path).unwrap();
}

#[tokio::test(start_paused = true)]
async fn decode_failure_is_reported_and_playback_goes_on() {
    let mut samples: Vec<Bytes> = (0..4).map(|i| joints_at(i as f32)).collect();
    samples[1] = Bytes::from_static(&[0, 0, 0, 64, 0, 0, 0, 1]);
    let path = write_movie(joints_sample_entry(), 4, &samples);
    let (_player, mut events) = open(&path, false);

    let seen = until_end(&mut events, Instant::now()).await;
    let failed: Vec<usize> = seen
        .iter()
        .filter_map(|(_, event)| match event {
            PlayerEvent::DecodeFailed { index, .. } => Some(*index),
            _ => None,
        })
        .collect();
    let joints = seen.iter().filter(|(_, event)| matches!(event, PlayerEvent::Joints { .. })).count();

    assert_eq!(failed, vec![1]);
    assert_eq!(joints, 3);
    std::fs::remove_file(path).unwrap();
}

#[tokio::test(start_paused = true)]
async fn closed_player_stops_delivering() {
    let path = record(EmissionPolicy::Dense, 20, |_| true);
    let (player, mut events) = open(&path, false);
    assert!(events.recv().await.is_some());

    player.close();
    // The task drops the callback, which closes the channel
    let drained = timeout(Duration::from_secs(5), async {
        let mut count = 0;
        while let Some(event) = events.recv().await {
            assert!(!matches!(event, PlayerEvent::ReachedEnd));
            count += 1;
        }
        count
    })
    .await
    .unwrap();
    assert!(drained < 20);
    std::fs::remove_file(path).unwrap();
}

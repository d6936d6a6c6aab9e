use crowdwatch_rs::{Detection, TrackState, Tracker, TrackerConfig};
use ndarray::array;

fn person_at(x: f64, y: f64) -> Detection {
    Detection::new(x, y, x + 100.0, y + 200.0, 0.9)
}

#[test]
fn test_basic_tracking() {
    let mut tracker = Tracker::new(TrackerConfig::default());

    // Tentative for the first two frames
    assert!(tracker.step(vec![person_at(100.0, 100.0)], 0.0).is_empty());
    assert!(tracker.step(vec![person_at(102.0, 100.0)], 1.0 / 30.0).is_empty());

    // Third consecutive hit confirms
    let tracks = tracker.step(vec![person_at(104.0, 100.0)], 2.0 / 30.0);
    assert_eq!(tracks.len(), 1);
    assert_eq!(tracks[0].state, TrackState::Confirmed);
    assert_eq!(tracks[0].hits, 3);
    let id = tracks[0].id;

    for frame in 3..20 {
        let x = 100.0 + 2.0 * frame as f64;
        let tracks = tracker.step(vec![person_at(x, 100.0)], frame as f64 / 30.0);
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].id, id);
    }

    let history: Vec<_> = tracker.track_history(id).unwrap().collect();
    assert_eq!(history.len(), 20);
}

#[test]
fn test_confirmed_track_coasts_until_max_age() {
    let mut tracker = Tracker::new(TrackerConfig::default());
    for frame in 1..=3 {
        tracker.step(vec![person_at(100.0, 100.0)], frame as f64);
    }
    let id = tracker.confirmed()[0].id;

    // Frames 4..=33 leave time_since_update at 1..=30, still within max_age
    for frame in 4..=33 {
        let tracks = tracker.step(vec![], frame as f64);
        assert_eq!(tracks.len(), 1, "track lost early at frame {frame}");
        assert_eq!(tracks[0].time_since_update, frame - 3);
        assert!(tracker.removed_tracks().is_empty());
    }

    let tracks = tracker.step(vec![], 34.0);
    assert!(tracks.is_empty());
    assert_eq!(tracker.removed_tracks(), &[id]);
    assert!(tracker.track(id).is_none());
}

#[test]
fn test_tentative_track_deleted_on_first_miss() {
    let mut tracker = Tracker::new(TrackerConfig::default());
    tracker.step(vec![person_at(0.0, 0.0)], 0.0);
    assert_eq!(tracker.len(), 1);

    tracker.step(vec![], 0.1);
    assert_eq!(tracker.len(), 0);
    assert_eq!(tracker.removed_tracks().len(), 1);
}

#[test]
fn test_invalid_detections_are_dropped() {
    let config = TrackerConfig {
        min_hits: 1,
        ..TrackerConfig::default()
    };
    let mut tracker = Tracker::new(config);
    let tracks = tracker.step(
        vec![
            person_at(0.0, 0.0),
            // x2 < x1
            Detection::new(500.0, 0.0, 400.0, 100.0, 0.9),
            Detection::new(f64::NAN, 0.0, 10.0, 10.0, 0.9),
            Detection::new(300.0, 0.0, 400.0, 200.0, 1.5),
        ],
        0.0,
    );
    assert_eq!(tracks.len(), 1);
    assert_eq!(tracker.len(), 1);
}

#[test]
fn test_two_people_keep_separate_ids() {
    let mut tracker = Tracker::new(TrackerConfig::default());
    let mut last = Vec::new();
    for frame in 0..10 {
        let dx = 3.0 * frame as f64;
        last = tracker.step(
            vec![person_at(50.0 + dx, 100.0), person_at(600.0 - dx, 100.0)],
            frame as f64 / 30.0,
        );
    }
    assert_eq!(last.len(), 2);
    assert_ne!(last[0].id, last[1].id);
    assert!(last[0].id < last[1].id);
    // Lower id was spawned from the left-hand person
    assert!(last[0].bbox.x < last[1].bbox.x);
}

#[test]
fn test_ids_never_reused() {
    let config = TrackerConfig {
        min_hits: 1,
        max_age: 0,
        ..TrackerConfig::default()
    };
    let mut tracker = Tracker::new(config);
    let first = tracker.step(vec![person_at(0.0, 0.0)], 0.0)[0].id;
    tracker.step(vec![], 0.1);
    assert!(tracker.is_empty());

    let second = tracker.step(vec![person_at(0.0, 0.0)], 0.2)[0].id;
    assert!(second > first);
}

#[test]
fn test_stationary_person_confirms_at_min_hits() {
    let config = TrackerConfig::default();
    let min_hits = config.min_hits as usize;
    let mut tracker = Tracker::new(config);

    let mut confirmed_at = None;
    let mut ids = Vec::new();
    for frame in 1..=50usize {
        let tracks = tracker.step(vec![person_at(300.0, 200.0)], frame as f64 / 30.0);
        assert!(tracks.len() <= 1);
        if let Some(track) = tracks.first() {
            confirmed_at.get_or_insert(frame);
            ids.push(track.id);
        }
    }
    assert_eq!(confirmed_at, Some(min_hits));
    assert!(ids.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(tracker.len(), 1);
}

#[test]
fn test_crossing_people_keep_ids_by_appearance() {
    let mut tracker = Tracker::new(TrackerConfig::default());
    let look_a = array![1.0f32, 0.0, 0.0, 0.0];
    let look_b = array![0.0f32, 1.0, 0.0, 0.0];

    let mut last = Vec::new();
    for frame in 0..30 {
        let dx = 10.0 * frame as f64;
        last = tracker.step(
            vec![
                person_at(100.0 + dx, 100.0).with_embedding(look_a.clone()),
                person_at(400.0 - dx, 100.0).with_embedding(look_b.clone()),
            ],
            frame as f64 / 30.0,
        );
    }

    assert_eq!(tracker.len(), 2);
    assert_eq!(last.len(), 2);
    assert_eq!((last[0].id, last[1].id), (1, 2));
    // Track 1 started on the left and has walked past track 2
    assert!(last[0].bbox.x > last[1].bbox.x);
    let kept = tracker.track(1).unwrap().embedding().unwrap();
    assert!((kept.dot(&look_a) - 1.0).abs() < 1e-5);
}

use physiocheck_lib::exercise::{
    AngleThresholds, CalibrationStrategy, ExerciseConfig, ExerciseKind, LimbConfig, LimbId,
};
use physiocheck_lib::pose::landmarks::{
    Landmark, LEFT_ELBOW, LEFT_HIP, LEFT_SHOULDER, LEFT_WRIST,
};
use physiocheck_lib::pose::{calculate_angle, measure_joint, JointAngle, JointTriple, LandmarkFrame};
use physiocheck_lib::reps::{LimbStage, RepCounter, RepCounterSettings};
use physiocheck_lib::{
    detailed_analytics, score_pose, Database, ReferencePose, ScoringConfig, SessionManager,
    SessionPhase, StopReason, TrackingController, TrackingError,
};

const ELBOW: JointTriple = JointTriple::new(LEFT_SHOULDER, LEFT_ELBOW, LEFT_WRIST);

fn thresholds() -> AngleThresholds {
    AngleThresholds {
        lower: 160.0,
        upper: 45.0,
        over_extension_margin: 15.0,
        over_contraction_margin: 15.0,
    }
}

fn curl_config() -> ExerciseConfig {
    let mut config = ExerciseConfig::new(
        "curl-left",
        ExerciseKind::Custom,
        vec![LimbConfig {
            id: LimbId::left(),
            joint: ELBOW,
        }],
        thresholds(),
    );
    config.calibration = CalibrationStrategy::Stability {
        frames: 1,
        tolerance_deg: 10.0,
    };
    config.countdown_ms = 0;
    config
}

/// Left arm with the elbow bent to `degrees`.
fn arm(t: u64, degrees: f32) -> LandmarkFrame {
    let theta = degrees.to_radians();
    LandmarkFrame::new(t)
        .with_landmark(LEFT_SHOULDER, Landmark::new(0.5, 0.3, 1.0))
        .with_landmark(LEFT_ELBOW, Landmark::new(0.5, 0.5, 1.0))
        .with_landmark(
            LEFT_WRIST,
            Landmark::new(0.5 + 0.2 * theta.sin(), 0.5 - 0.2 * theta.cos(), 1.0),
        )
        .with_landmark(LEFT_HIP, Landmark::new(0.5, 0.8, 1.0))
}

fn counter() -> RepCounter {
    RepCounter::new(
        LimbId::left(),
        RepCounterSettings {
            thresholds: thresholds(),
            min_rep_duration_ms: 200,
            compliment_ms: 2_000,
            smoothing_window: 1,
        },
    )
}

#[test]
fn reference_trace_counts_one_rep() {
    let trace = [170.0, 170.0, 160.0, 100.0, 50.0, 40.0, 50.0, 100.0, 160.0, 170.0];
    // Uneven frame spacing so the timing assertion pins the exact boundary frames.
    let times: Vec<u64> = (0..trace.len() as u64).map(|i| i * 100 + i * i).collect();

    let mut c = counter();
    for (&deg, &t) in trace.iter().zip(&times) {
        c.update(JointAngle::from_degrees(deg), t);
    }

    let state = c.state();
    assert_eq!(state.rep_count, 1);
    assert_eq!(state.stage, LimbStage::Down);
    assert_eq!(state.last_rep_ms, Some(times[8] - times[3]));
}

#[test]
fn shallow_trace_counts_nothing() {
    let trace = [170.0, 170.0, 160.0, 100.0, 80.0, 80.0, 100.0, 160.0, 170.0];
    let mut c = counter();
    for (i, &deg) in trace.iter().enumerate() {
        c.update(JointAngle::from_degrees(deg), i as u64 * 100);
    }

    assert_eq!(c.state().rep_count, 0);
    assert_eq!(c.state().stage, LimbStage::Down);
}

#[test]
fn angle_geometry_edges() {
    let straight = calculate_angle((0.0, 0.0), (1.0, 0.0), (2.0, 0.0)).unwrap();
    assert!((straight.degrees() - 180.0).abs() < 1e-3);

    let folded = calculate_angle((0.0, 0.0), (1.0, 0.0), (0.0, 0.0)).unwrap();
    assert!(folded.degrees().abs() < 1e-3);

    let mut frame = arm(0, 90.0);
    frame.insert(LEFT_WRIST, Landmark::new(0.7, 0.5, 0.2));
    assert_eq!(measure_joint(&frame, &ELBOW, 0.6), None);
}

#[test]
fn full_session_through_manager() {
    let mut manager = SessionManager::new();
    let info = manager.start_session(curl_config()).unwrap();

    let degrees = [170.0, 170.0, 100.0, 40.0, 100.0, 170.0, 100.0, 40.0, 100.0, 170.0];
    for (i, &deg) in degrees.iter().enumerate() {
        manager.push_frame(&arm(i as u64 * 150, deg)).unwrap();
    }
    assert_eq!(manager.phase(), SessionPhase::Active);

    let summary = manager.stop_session().unwrap();
    assert_eq!(summary.session_id, info.session_id);
    assert_eq!(summary.total_reps(), 2);
    assert_eq!(summary.stop_reason, StopReason::UserRequested);
    // Active from the first frame at t=0 to the last at t=1350.
    assert_eq!(summary.duration_ms, 1_350);
}

#[test]
fn double_start_keeps_first_session() {
    let mut manager = SessionManager::new();
    let first = manager.start_session(curl_config()).unwrap();
    manager.push_frame(&arm(0, 170.0)).unwrap();
    manager.push_frame(&arm(100, 100.0)).unwrap();
    let before = manager.live_snapshot();

    assert_eq!(
        manager.start_session(curl_config()),
        Err(TrackingError::AlreadyActive)
    );
    assert_eq!(manager.live_snapshot(), before);
    assert_eq!(before.session_id(), Some(first.session_id.as_str()));
}

#[test]
fn stop_during_calibration_reports_zeros() {
    let mut config = curl_config();
    config.calibration = CalibrationStrategy::Stability {
        frames: 10,
        tolerance_deg: 5.0,
    };
    let mut manager = SessionManager::new();
    manager.start_session(config).unwrap();
    for i in 0..3 {
        manager.push_frame(&arm(i * 100, 170.0)).unwrap();
    }
    assert_eq!(manager.phase(), SessionPhase::Calibrating);

    let summary = manager.stop_session().unwrap();
    assert_eq!(summary.total_reps(), 0);
    assert_eq!(summary.duration_ms, 0);
    assert_eq!(summary.min_rep_ms(), None);
}

#[test]
fn pose_score_is_bounded_and_repeatable() {
    let reference = ReferencePose::from_frame("curl-top", &arm(0, 45.0));
    let config = ScoringConfig::default();

    for deg in [45.0, 60.0, 120.0, 180.0] {
        let frame = arm(0, deg);
        let first = score_pose(&frame, &reference, &config);
        let second = score_pose(&frame, &reference, &config);
        assert_eq!(first, second);
        assert!((0.0..=100.0).contains(&first.accuracy));
    }

    let perfect = score_pose(&arm(0, 45.0), &reference, &config);
    assert_eq!(perfect.accuracy, 100.0);

    let empty = score_pose(&LandmarkFrame::new(0), &reference, &config);
    assert!(!empty.has_match());
    assert_eq!(empty.accuracy, 0.0);
}

#[tokio::test]
async fn controller_saves_sessions_for_analytics() {
    let db = Database::open_in_memory().unwrap();
    let controller = TrackingController::new(Some(db.clone()));

    for round in 0..2u64 {
        controller.start_session(curl_config()).await.unwrap();
        for (i, deg) in [170.0, 170.0, 100.0, 40.0, 100.0, 170.0].iter().enumerate() {
            assert!(controller.submit_frame(arm(round * 10_000 + i as u64 * 100, *deg)).await);
        }
        let summary = controller.stop_session().await.unwrap();
        assert_eq!(summary.total_reps(), 1);
    }

    let stored = db.list_summaries().await.unwrap();
    assert_eq!(stored.len(), 2);
    assert!(stored.iter().all(|s| s.reps_for("left") == 1));

    let analytics = detailed_analytics(&stored);
    assert_eq!(analytics.exercise_stats.len(), 1);
    assert_eq!(analytics.exercise_stats[0].total_reps, 2);
    assert_eq!(analytics.average_accuracy, 100);
}

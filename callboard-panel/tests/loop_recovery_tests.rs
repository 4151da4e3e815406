//! Loop continuity and play-rejection fallback tests

mod helpers;

use callboard_common::events::EngineState;
use callboard_panel::media::MediaEngine;
use callboard_panel::playback::SurfaceRole;
use helpers::{rig, wait_for};

#[tokio::test]
async fn ended_engine_is_restarted_from_zero() {
    let rig = rig();
    let _main = rig.surface(SurfaceRole::Main);
    let engine = rig.factory.engine(0);
    engine.make_ready();

    let store = rig.store.clone();
    wait_for("playback to start", || store.snapshot().playing).await;

    // The item runs out.
    engine.set_position(89.9);
    engine.report_state(EngineState::Ended);

    wait_for("loop restart to reach the store", || {
        let status = store.snapshot();
        status.position_secs == 0.0
            && status.playing
            && status.engine_state == EngineState::Playing
    })
    .await;

    assert!(engine.op_count("seek:0") >= 1);
    assert_eq!(engine.state(), EngineState::Playing);
}

#[tokio::test]
async fn repeated_ends_keep_looping() {
    let rig = rig();
    let _main = rig.surface(SurfaceRole::Main);
    let engine = rig.factory.engine(0);
    engine.make_ready();

    let store = rig.store.clone();
    wait_for("playback to start", || store.snapshot().playing).await;

    for _ in 0..3 {
        engine.set_position(89.9);
        engine.report_state(EngineState::Ended);
        let engine_probe = engine.clone();
        wait_for("engine to be playing again", || {
            engine_probe.state() == EngineState::Playing
        })
        .await;
    }
    assert!(engine.op_count("seek:0") >= 3);
}

#[tokio::test]
async fn play_rejection_triggers_exactly_one_fallback() {
    let rig = rig();
    let _main = rig.surface(SurfaceRole::Main);
    let engine = rig.factory.engine(0);
    engine.set_play_rejected(true);
    engine.make_ready();

    let factory = rig.factory.clone();
    wait_for("fallback engine to be constructed", || {
        factory.fallback_count() == 1
    })
    .await;

    let spare = rig.factory.fallback_engine(0);
    wait_for("fallback engine to load and play", || {
        spare.op_count("load") == 1 && spare.op_count("play") == 1
    })
    .await;

    // The primary keeps rejecting, the telemetry loop keeps correcting,
    // but there is never a second fallback attempt.
    tokio::time::sleep(std::time::Duration::from_millis(150)).await;
    assert!(engine.op_count("play") > 1);
    assert_eq!(rig.factory.fallback_count(), 1);
}

//! Telemetry loop integration tests
//!
//! The poll loop runs only on the main surface: it publishes engine
//! telemetry through the gated write path and actively fights any engine
//! state that is neither playing nor ended.

mod helpers;

use std::time::Duration;

use callboard_common::events::EngineState;
use callboard_panel::media::MediaEngine;
use callboard_panel::playback::SurfaceRole;
use helpers::{rig, wait_for};

#[tokio::test]
async fn telemetry_flows_into_the_store() {
    let rig = rig();
    let _main = rig.surface(SurfaceRole::Main);
    let engine = rig.factory.engine(0);
    engine.make_ready();

    let store = rig.store.clone();
    wait_for("playback to start", || store.snapshot().playing).await;

    engine.set_position(42.5);
    wait_for("position to reach the store", || {
        store.snapshot().position_secs == 42.5
    })
    .await;

    let status = store.snapshot();
    assert_eq!(status.engine_state, EngineState::Playing);
    assert!(status.playing);
}

#[tokio::test]
async fn paused_engine_is_pushed_back_to_playing() {
    let rig = rig();
    let _main = rig.surface(SurfaceRole::Main);
    let engine = rig.factory.engine(0);
    engine.make_ready();

    let store = rig.store.clone();
    wait_for("playback to start", || store.snapshot().playing).await;
    let plays_before = engine.op_count("play");

    // Something paused the engine behind the board's back.
    engine.report_state(EngineState::Paused);

    let engine_probe = engine.clone();
    wait_for("corrective play to land", || {
        engine_probe.state() == EngineState::Playing
    })
    .await;
    assert!(engine.op_count("play") > plays_before);
}

#[tokio::test]
async fn buffering_engine_is_also_corrected() {
    let rig = rig();
    let _main = rig.surface(SurfaceRole::Main);
    let engine = rig.factory.engine(0);
    engine.make_ready();

    let store = rig.store.clone();
    wait_for("playback to start", || store.snapshot().playing).await;

    engine.report_state(EngineState::Buffering);
    let engine_probe = engine.clone();
    wait_for("corrective play after buffering stall", || {
        engine_probe.state() == EngineState::Playing
    })
    .await;
}

#[tokio::test]
async fn destroyed_surface_stops_contributing() {
    let rig = rig();
    let main = rig.surface(SurfaceRole::Main);
    let engine = rig.factory.engine(0);
    engine.make_ready();

    let store = rig.store.clone();
    wait_for("playback to start", || store.snapshot().playing).await;

    main.destroy();
    let flushed = rig.store.snapshot().revision;

    // Telemetry after teardown never reaches the store.
    engine.set_position(55.0);
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(rig.store.snapshot().revision, flushed);
    assert_ne!(rig.store.snapshot().position_secs, 55.0);
}

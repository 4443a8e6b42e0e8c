//! End-to-end command flows through the public API.

use std::sync::Arc;
use std::time::Duration;

use beamlink_core::backend::ConnectBehavior;
use beamlink_core::events::{DiscoveryNotice, PlaybackNotice, SessionNotice};
use beamlink_core::{
    bootstrap_services, BootstrappedServices, BroadcastEvent, CastConfig, CastError, CommandReply,
    MediaCommand, SessionState, SimulatedBackend,
};
use serde_json::{json, Value};

fn boot(
    backend: SimulatedBackend,
    config: CastConfig,
) -> (BootstrappedServices, Arc<SimulatedBackend>) {
    let backend = Arc::new(backend);
    let services = bootstrap_services(&config, backend.clone(), backend.clone()).unwrap();
    (services, backend)
}

async fn call(
    services: &BootstrappedServices,
    name: &str,
    args: Value,
) -> Result<CommandReply, CastError> {
    services.dispatcher.dispatch(name, &args).await
}

#[tokio::test(start_paused = true)]
async fn discover_connect_share_control_disconnect() {
    let (services, backend) = boot(
        SimulatedBackend::new()
            .with_device("abc", "Living Room TV")
            .with_device("def", "Bedroom"),
        CastConfig::default(),
    );
    let mut events = services.event_bridge.subscribe();

    assert_eq!(call(&services, "initializeCast", Value::Null).await, Ok(CommandReply::Bool(true)));

    let devices = call(&services, "discoverDevices", Value::Null).await.unwrap();
    let devices = devices.as_devices().unwrap();
    assert_eq!(devices.len(), 2);
    assert!(devices.iter().all(|d| !d.connected));

    let reply = call(
        &services,
        "connectToDevice",
        json!({ "deviceId": "abc", "deviceName": "Living Room TV" }),
    )
    .await;
    assert_eq!(reply, Ok(CommandReply::Bool(true)));

    let reply = call(
        &services,
        "shareVideo",
        json!({
            "videoUrl": "https://cdn.example/show/master.M3U8?token=1",
            "title": "Pilot",
            "description": "Episode 1",
            "thumbnailUrl": "https://cdn.example/show/poster.jpg"
        }),
    )
    .await;
    assert_eq!(reply, Ok(CommandReply::Bool(true)));

    let snapshot = call(&services, "getSessionState", Value::Null).await.unwrap();
    let snapshot = snapshot.as_session().unwrap();
    assert_eq!(snapshot.state, SessionState::Connected);
    assert_eq!(snapshot.device.as_ref().map(|d| d.id.as_str()), Some("abc"));

    let reply = call(
        &services,
        "controlPlayback",
        json!({ "action": "seek", "position": 12.5 }),
    )
    .await;
    assert_eq!(reply, Ok(CommandReply::Bool(true)));

    assert_eq!(call(&services, "disconnect", Value::Null).await, Ok(CommandReply::Bool(true)));

    let client = backend.media_client();
    let loads = client.loads();
    assert_eq!(loads.len(), 1);
    assert_eq!(loads[0].content_type(), "application/vnd.apple.mpegurl");
    assert_eq!(loads[0].subtitle(), Some("Episode 1"));
    assert!(client.calls().contains(&MediaCommand::Seek { position_ms: 12_500 }));
    assert_eq!(client.calls().last(), Some(&MediaCommand::Stop));

    let mut saw_window_closed = false;
    let mut saw_media_loaded = false;
    let mut last_state = None;
    while let Ok(event) = events.try_recv() {
        match event {
            BroadcastEvent::Discovery(DiscoveryNotice::WindowClosed { devices, .. }) => {
                saw_window_closed = devices.len() == 2;
            }
            BroadcastEvent::Playback(PlaybackNotice::MediaLoaded { title, .. }) => {
                saw_media_loaded = title == "Pilot";
            }
            BroadcastEvent::Session(SessionNotice::StateChanged { state, .. }) => {
                last_state = Some(state);
            }
            _ => {}
        }
    }
    assert!(saw_window_closed);
    assert!(saw_media_loaded);
    assert_eq!(last_state, Some(SessionState::Idle));

    services.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn discovery_window_is_clamped_to_bounds() {
    let (services, _backend) = boot(SimulatedBackend::new(), CastConfig::default());

    let started = tokio::time::Instant::now();
    call(&services, "discoverDevices", json!({ "durationMs": 10 })).await.unwrap();
    assert_eq!(started.elapsed(), Duration::from_millis(500));

    let started = tokio::time::Instant::now();
    call(&services, "discoverDevices", json!({ "durationMs": 3_600_000 })).await.unwrap();
    assert_eq!(started.elapsed(), Duration::from_millis(60_000));
}

#[tokio::test(start_paused = true)]
async fn connect_requires_a_discovered_device() {
    let (services, backend) = boot(
        SimulatedBackend::new().with_device("abc", "Living Room TV"),
        CastConfig::default(),
    );

    // Nothing discovered yet.
    let err = call(&services, "connectToDevice", json!({ "deviceId": "abc" }))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "device_not_found");
    assert_eq!(backend.calls().connect, 0);
}

#[tokio::test(start_paused = true)]
async fn reconnect_after_failed_start() {
    let (services, backend) = boot(
        SimulatedBackend::new()
            .with_device("abc", "Living Room TV")
            .with_connect_behavior(ConnectBehavior::Fail("launch failed".into())),
        CastConfig::default(),
    );
    call(&services, "discoverDevices", Value::Null).await.unwrap();

    let err = call(&services, "connectToDevice", json!({ "deviceId": "abc" }))
        .await
        .unwrap_err();
    assert_eq!(err, CastError::ConnectionError("launch failed".into()));

    backend.set_connect_behavior(ConnectBehavior::Start);
    let reply = call(&services, "connectToDevice", json!({ "deviceId": "abc" })).await;
    assert_eq!(reply, Ok(CommandReply::Bool(true)));
    assert_eq!(backend.calls().connect, 2);
}

#[tokio::test(start_paused = true)]
async fn malformed_commands_are_rejected_before_dispatch() {
    let (services, backend) = boot(SimulatedBackend::new(), CastConfig::default());

    let err = call(&services, "controlPlayback", json!({ "action": "rewind" }))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "invalid_argument");

    let err = call(&services, "controlPlayback", json!({ "action": "seek", "position": -3 }))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "invalid_argument");

    let err = call(&services, "showCastDialog", Value::Null).await.unwrap_err();
    assert_eq!(err.code(), "not_implemented");

    assert_eq!(backend.calls(), Default::default());
}

#[tokio::test(start_paused = true)]
async fn platform_version_names_os_and_arch() {
    let (services, _backend) = boot(SimulatedBackend::new(), CastConfig::default());

    let reply = call(&services, "getPlatformVersion", Value::Null).await.unwrap();
    let text = reply.as_text().unwrap();
    assert!(text.contains(std::env::consts::ARCH));
}

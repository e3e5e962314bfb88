//! End-to-end behaviour of `Player` against a scripted transport
//!
//! All tests run on a paused tokio clock, so delays and intervals cost no
//! real time and call timestamps are exact.

use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use bdp_client::mock::{MockTransport, Reply};
use bdp_client::TransportError;
use panasonic_bdp::{
    Dialect, DispatchError, Endpoint, Player, PlayerConfig, PlayerState, PollPhase,
};
use tokio::time::Instant;

// ============================================================================
// Test Helpers
// ============================================================================

const OK: &str = "00,\"\",1\r\n";
const REFUSED: &str = "FE,\"\",0\r\n";
const BD_EXTENDED: &str = "00,\"\",1\r\n2,0,0,754,7260,4,18\r\n";
const BD_STANDBY: &str = "00,\"\",1\r\n0,0,0,0,0\r\n";
const PST_PLAYING: &str = "00,\"\",1\r\n1,754,0,00000000\r\n";
const PST_STOPPED: &str = "00,\"\",1\r\n0,0,0,00000000\r\n";
const NONCE: &str = "00,\"\",1\r\n5A3C9F01\r\n";
const KEY: &str = "00112233445566778899aabbccddeeff";
/// Matches `PST` only when it carries auth fields
const AUTHENTICATED_PST: &str = "cCMD_PST.y=100&cAUTH";

fn host(last: u8) -> Ipv4Addr {
    Ipv4Addr::new(192, 168, 1, last)
}

fn config(last: u8) -> PlayerConfig {
    PlayerConfig::new(host(last))
}

fn player(mock: &Arc<MockTransport>, config: PlayerConfig) -> Player {
    Player::with_transport(config, mock.clone()).unwrap()
}

/// A BD player that is on and playing
fn script_bd(mock: &MockTransport) {
    mock.push(Reply::body("cCMD_GET_STATUS", BD_EXTENDED))
        .push(Reply::body("cCMD_PST", PST_PLAYING))
        .push(Reply::body("cCMD_RC_", OK));
}

/// A UHD player: no extended status, `PST` refused until authenticated
fn script_uhd_detection(mock: &MockTransport) {
    mock.push(Reply::body("cCMD_GET_STATUS", REFUSED))
        .push(Reply::body("cCMD_PST", REFUSED));
}

fn script_uhd_auth(mock: &MockTransport) {
    mock.push(Reply::body("cCMD_GET_NONCE", NONCE))
        .push(Reply::body("cCMD_AUTH", OK));
}

/// An authenticated UHD player that is playing; push before detection
fn script_uhd_playing(mock: &MockTransport) {
    mock.push(Reply::body(AUTHENTICATED_PST, PST_PLAYING));
}

fn key_presses(mock: &MockTransport) -> Vec<String> {
    mock.calls()
        .into_iter()
        .filter(|c| c.request.contains("cCMD_RC_"))
        .map(|c| c.request)
        .collect()
}

// ============================================================================
// Serialization
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_requests_never_overlap_on_one_player() {
    let mock = Arc::new(MockTransport::new());
    mock.push(Reply::body("cCMD_GET_STATUS", BD_EXTENDED).delayed(Duration::from_millis(700)))
        .push(Reply::body("cCMD_PST", PST_PLAYING).delayed(Duration::from_millis(300)))
        .push(Reply::body("cCMD_RC_", OK).delayed(Duration::from_secs(2)));
    let player = player(&mock, config(10));
    player.poll_once().await;

    let (first, poll, second) = tokio::join!(
        player.dispatch(&["PLAYBACK"], Duration::ZERO, 2),
        player.poll_once(),
        player.dispatch(&["PAUSE"], Duration::ZERO, 1),
    );

    assert_eq!(first.unwrap().transmissions, 2);
    assert_eq!(second.unwrap().transmissions, 1);
    assert!(poll.available);

    let endpoint = Endpoint::new(host(10));
    assert_eq!(mock.peak_in_flight(&endpoint), 1);

    let calls = mock.calls();
    for pair in calls.windows(2) {
        assert!(pair[0].finished.unwrap() <= pair[1].started);
    }

    // Dispatches are queued whole, never interleaved
    let presses = key_presses(&mock);
    assert_eq!(presses.len(), 3);
    assert!(presses[0].contains("RC_PLAYBACK"));
    assert!(presses[1].contains("RC_PLAYBACK"));
    assert!(presses[2].contains("RC_PAUSE"));
}

#[tokio::test(start_paused = true)]
async fn test_delay_is_observed_between_repeats() {
    let mock = Arc::new(MockTransport::new());
    script_bd(&mock);
    let player = player(&mock, config(11));

    let report = player
        .dispatch(&["PLAYBACK"], Duration::from_millis(500), 3)
        .await
        .unwrap();

    assert_eq!(report.transmissions, 3);
    let starts: Vec<Instant> = mock
        .calls()
        .into_iter()
        .filter(|c| c.request.contains("cCMD_RC_PLAYBACK"))
        .map(|c| c.started)
        .collect();
    assert_eq!(starts.len(), 3);
    for pair in starts.windows(2) {
        assert!(pair[1] - pair[0] >= Duration::from_millis(500));
    }
}

#[tokio::test(start_paused = true)]
async fn test_unknown_token_sends_nothing() {
    let mock = Arc::new(MockTransport::new());
    script_bd(&mock);
    let player = player(&mock, config(12));

    let err = player
        .dispatch(&["PLAYBACK", "WARP_SPEED"], Duration::ZERO, 1)
        .await
        .unwrap_err();

    assert_eq!(err, DispatchError::InvalidToken("WARP_SPEED".to_string()));
    assert!(mock.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_queue_timeout_behind_slow_dispatch() {
    let mock = Arc::new(MockTransport::new());
    mock.push(Reply::body("cCMD_GET_STATUS", BD_EXTENDED))
        .push(Reply::body("cCMD_PST", PST_PLAYING))
        .push(Reply::body("cCMD_RC_", OK).delayed(Duration::from_secs(4)));
    let player = player(&mock, config(13).with_queue_timeout(Duration::from_secs(1)));
    player.poll_once().await;

    let (slow, queued) = tokio::join!(
        player.dispatch(&["PLAYBACK"], Duration::ZERO, 1),
        player.send_command("PAUSE"),
    );

    assert_eq!(slow.unwrap().transmissions, 1);
    assert_eq!(
        queued.unwrap_err(),
        DispatchError::QueueTimeout(Duration::from_secs(1))
    );
    assert_eq!(mock.count("cCMD_RC_PAUSE"), 0);
}

// ============================================================================
// Authentication
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_uhd_reauthenticates_once_then_fails() {
    let mock = Arc::new(MockTransport::new());
    script_uhd_detection(&mock);
    script_uhd_auth(&mock);
    mock.push(Reply::body("cCMD_RC_PLAYBACK", OK))
        .push(Reply::body("cCMD_RC_PAUSE", REFUSED));
    let player = player(&mock, config(20).with_player_key(KEY.parse().unwrap()));

    let err = player
        .dispatch(&["PLAYBACK", "PAUSE", "STOP"], Duration::ZERO, 1)
        .await
        .unwrap_err();

    assert!(matches!(err, DispatchError::AuthFailed { completed: 1, .. }));
    assert_eq!(player.device_class(), Some(Dialect::Uhd));
    assert_eq!(mock.count("cCMD_GET_NONCE"), 2);
    assert_eq!(mock.count("cCMD_RC_PLAYBACK"), 1);
    assert_eq!(mock.count("cCMD_RC_PAUSE"), 2);
    assert_eq!(mock.count("cCMD_RC_STOP"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_uhd_credential_is_reused() {
    let mock = Arc::new(MockTransport::new());
    script_uhd_detection(&mock);
    script_uhd_auth(&mock);
    mock.push(Reply::body("cCMD_RC_", OK));
    let player = player(&mock, config(21).with_player_key(KEY.parse().unwrap()));

    let report = player
        .dispatch(&["UP", "DOWN", "SELECT"], Duration::ZERO, 1)
        .await
        .unwrap();

    assert_eq!(report.transmissions, 3);
    assert_eq!(mock.count("cCMD_GET_NONCE"), 1);
    assert!(key_presses(&mock)
        .iter()
        .all(|request| request.contains("cAUTH_FORM=C4")));
}

#[tokio::test(start_paused = true)]
async fn test_uhd_without_key_requires_auth() {
    let mock = Arc::new(MockTransport::new());
    script_uhd_detection(&mock);
    let player = player(&mock, config(22));

    let err = player.play().await.unwrap_err();

    assert_eq!(err, DispatchError::AuthRequired { completed: 0 });
    assert!(key_presses(&mock).is_empty());
    assert_eq!(mock.count("cCMD_GET_NONCE"), 0);
}

// ============================================================================
// Polling
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_availability_hysteresis() {
    let mock = Arc::new(MockTransport::new());
    script_bd(&mock);
    let player = player(&mock, config(30));

    let snapshot = player.poll_once().await;
    assert!(snapshot.available);
    let playing = snapshot.state.clone().unwrap();
    assert_eq!(playing.state, PlayerState::Playing);
    assert_eq!(playing.position, Some(754));
    assert_eq!(playing.duration, Some(7260));

    mock.clear_replies();
    mock.push(Reply::error("cCMD_", TransportError::Unreachable("no route".into())));

    for failures in 1..3 {
        let snapshot = player.poll_once().await;
        assert!(snapshot.available, "still available after {} failures", failures);
        assert_eq!(snapshot.consecutive_failures, failures);
    }

    let snapshot = player.poll_once().await;
    assert!(!snapshot.available);
    assert_eq!(snapshot.phase, PollPhase::Degraded);
    // Last known state survives the outage
    assert_eq!(player.get_normalized_state(), (false, Some(playing)));

    mock.clear_replies();
    script_bd(&mock);
    let snapshot = player.poll_once().await;
    assert!(snapshot.available);
    assert_eq!(snapshot.phase, PollPhase::Polling);
    assert_eq!(snapshot.consecutive_failures, 0);
}

#[tokio::test(start_paused = true)]
async fn test_undetectable_player_keeps_polling() {
    let mock = Arc::new(MockTransport::new());
    let player = player(&mock, config(31));

    player.start();
    tokio::time::sleep(Duration::from_secs(35)).await;

    assert!(player.is_running());
    let snapshot = player.snapshot();
    assert!(!snapshot.available);
    assert!(snapshot.state.is_none());
    assert_eq!(snapshot.phase, PollPhase::Detecting);
    assert!(snapshot.consecutive_failures >= 3);
    assert_eq!(player.device_class(), None);

    player.stop();
}

#[tokio::test(start_paused = true)]
async fn test_redetects_after_long_degradation() {
    let mock = Arc::new(MockTransport::new());
    script_bd(&mock);
    let player = player(
        &mock,
        config(32)
            .with_failure_threshold(1)
            .with_redetect_after(Duration::from_secs(60)),
    );
    player.poll_once().await;
    assert_eq!(player.device_class(), Some(Dialect::Bd));

    mock.clear_replies();
    let snapshot = player.poll_once().await;
    assert_eq!(snapshot.phase, PollPhase::Degraded);
    assert_eq!(player.device_class(), Some(Dialect::Bd));

    tokio::time::advance(Duration::from_secs(61)).await;
    let snapshot = player.poll_once().await;
    assert_eq!(snapshot.phase, PollPhase::Detecting);
    assert_eq!(player.device_class(), None);

    script_bd(&mock);
    let snapshot = player.poll_once().await;
    assert!(snapshot.available);
    assert_eq!(snapshot.phase, PollPhase::Polling);
    assert_eq!(player.device_class(), Some(Dialect::Bd));
}

#[tokio::test(start_paused = true)]
async fn test_forced_refresh_is_rate_limited() {
    let mock = Arc::new(MockTransport::new());
    script_bd(&mock);
    let player = player(&mock, config(33));

    player.refresh().await;
    assert_eq!(mock.count("cCMD_PST"), 1);

    let snapshot = player.refresh().await;
    assert!(snapshot.available);
    assert_eq!(mock.count("cCMD_PST"), 1);

    tokio::time::advance(Duration::from_secs(1)).await;
    player.refresh().await;
    assert_eq!(mock.count("cCMD_PST"), 2);
}

#[tokio::test(start_paused = true)]
async fn test_dispatch_wakes_poll_loop() {
    let mock = Arc::new(MockTransport::new());
    script_bd(&mock);
    let player = player(&mock, config(34));
    let mut updates = player.subscribe();

    player.start();
    updates.changed().await.unwrap();
    assert_eq!(mock.count("cCMD_PST"), 1);

    let sent_at = Instant::now();
    player.send_command("PAUSE").await.unwrap();
    updates.changed().await.unwrap();

    assert!(sent_at.elapsed() < Duration::from_secs(10));
    assert_eq!(mock.count("cCMD_PST"), 2);
    player.stop();
}

#[tokio::test(start_paused = true)]
async fn test_uhd_polling_with_key() {
    let mock = Arc::new(MockTransport::new());
    script_uhd_playing(&mock);
    script_uhd_detection(&mock);
    script_uhd_auth(&mock);
    mock.push(Reply::body("cCMD_RC_", OK));
    let player = player(&mock, config(35).with_player_key(KEY.parse().unwrap()));

    player.send_command("PLAYBACK").await.unwrap();
    for _ in 0..5 {
        let snapshot = player.poll_once().await;
        assert!(snapshot.available);
        assert_eq!(snapshot.dialect, Some(Dialect::Uhd));
        assert_eq!(snapshot.consecutive_failures, 0);
    }

    let (available, state) = player.get_normalized_state();
    assert!(available);
    let state = state.unwrap();
    assert_eq!(state.state, PlayerState::Playing);
    assert_eq!(state.position, Some(754));
    assert_eq!(state.duration, None);
    assert_eq!(state.chapter, None);
    assert_eq!(state.chapters, None);

    // The session from the key press serves every poll
    assert_eq!(mock.count("cCMD_GET_NONCE"), 1);
    assert_eq!(mock.count(AUTHENTICATED_PST), 5);
    assert_eq!(mock.count("cCMD_GET_STATUS"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_uhd_refused_poll_reauthenticates() {
    let mock = Arc::new(MockTransport::new());
    mock.push(Reply::body(AUTHENTICATED_PST, PST_PLAYING).once())
        .push(Reply::body(AUTHENTICATED_PST, REFUSED).once());
    script_uhd_playing(&mock);
    script_uhd_detection(&mock);
    script_uhd_auth(&mock);
    let player = player(&mock, config(36).with_player_key(KEY.parse().unwrap()));

    assert!(player.poll_once().await.available);
    assert_eq!(mock.count("cCMD_GET_NONCE"), 1);

    // Session expired on the player side
    let snapshot = player.poll_once().await;
    assert!(snapshot.available);
    assert_eq!(snapshot.consecutive_failures, 0);
    assert_eq!(snapshot.state.unwrap().state, PlayerState::Playing);
    assert_eq!(mock.count("cCMD_GET_NONCE"), 2);
    assert_eq!(mock.count(AUTHENTICATED_PST), 3);

    player.poll_once().await;
    assert_eq!(mock.count("cCMD_GET_NONCE"), 2);
}

#[tokio::test(start_paused = true)]
async fn test_uhd_without_key_is_reachable_but_unknown() {
    let mock = Arc::new(MockTransport::new());
    script_uhd_detection(&mock);
    let player = player(&mock, config(37));

    for _ in 0..5 {
        let snapshot = player.poll_once().await;
        assert!(snapshot.available);
        assert_eq!(snapshot.phase, PollPhase::Polling);
        assert_eq!(snapshot.consecutive_failures, 0);
    }

    assert_eq!(player.get_normalized_state(), (true, None));
    assert_eq!(player.device_class(), Some(Dialect::Uhd));
    assert_eq!(mock.count("cAUTH"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_bd_missed_detection_retries_as_bd() {
    let mock = Arc::new(MockTransport::new());
    mock.push(
        Reply::error(
            "cCMD_GET_STATUS",
            TransportError::Timeout(Duration::from_secs(5)),
        )
        .once(),
    );
    script_bd(&mock);
    let player = player(&mock, config(38));

    let snapshot = player.poll_once().await;
    assert!(!snapshot.available);
    assert_eq!(snapshot.dialect, None);
    assert_eq!(mock.count("cCMD_PST"), 0);

    for _ in 0..2 {
        player.poll_once().await;
    }

    let snapshot = player.snapshot();
    assert!(snapshot.available);
    assert_eq!(snapshot.dialect, Some(Dialect::Bd));
    assert_eq!(snapshot.state.unwrap().duration, Some(7260));
    assert_eq!(player.send_command("PLAYBACK").await.unwrap().transmissions, 1);
}

// ============================================================================
// Isolation and media controls
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_endpoints_are_independent() {
    let mock = Arc::new(MockTransport::new());
    let broken = Endpoint::new(host(40));
    let healthy = Endpoint::new(host(41));
    mock.push(
        Reply::error("cCMD_", TransportError::Unreachable("down".into()))
            .on(broken)
            .delayed(Duration::from_secs(4)),
    )
    .push(Reply::body("cCMD_GET_STATUS", BD_EXTENDED).on(healthy))
    .push(Reply::body("cCMD_PST", PST_PLAYING).on(healthy))
    .push(Reply::body("cCMD_RC_", OK).on(healthy));

    let a = player(&mock, config(40).with_failure_threshold(1));
    let b = player(&mock, config(41));

    let started = Instant::now();
    let (a_snapshot, b_result) = tokio::join!(a.poll_once(), async {
        let report = b.send_command("STOP").await;
        (report, started.elapsed())
    });

    assert!(!a_snapshot.available);
    let (report, elapsed) = b_result;
    assert_eq!(report.unwrap().transmissions, 1);
    assert!(elapsed < Duration::from_secs(1));

    let b_snapshot = b.poll_once().await;
    assert!(b_snapshot.available);
    assert_eq!(b_snapshot.consecutive_failures, 0);
    assert_eq!(mock.count_for(&broken), 1);
}

#[tokio::test(start_paused = true)]
async fn test_power_controls_follow_last_state() {
    let mock = Arc::new(MockTransport::new());
    mock.push(Reply::body("cCMD_GET_STATUS", BD_STANDBY))
        .push(Reply::body("cCMD_PST", PST_STOPPED))
        .push(Reply::body("cCMD_RC_", OK));
    let player = player(&mock, config(50));

    let snapshot = player.poll_once().await;
    assert_eq!(snapshot.state.unwrap().state, PlayerState::Off);

    assert_eq!(player.turn_off().await.unwrap().transmissions, 0);
    assert_eq!(player.turn_on().await.unwrap().transmissions, 1);

    mock.clear_replies();
    script_bd(&mock);
    player.poll_once().await;

    assert_eq!(player.turn_on().await.unwrap().transmissions, 0);
    assert_eq!(player.turn_off().await.unwrap().transmissions, 1);
    assert_eq!(mock.count("cCMD_RC_POWER"), 2);
}

#[tokio::test(start_paused = true)]
async fn test_media_controls_send_expected_keys() {
    let mock = Arc::new(MockTransport::new());
    script_bd(&mock);
    let player = player(&mock, config(51));

    player.play().await.unwrap();
    player.pause().await.unwrap();
    player.stop_playback().await.unwrap();
    player.next_chapter().await.unwrap();
    player.previous_chapter().await.unwrap();

    let presses = key_presses(&mock);
    let expected = ["RC_PLAYBACK", "RC_PAUSE", "RC_STOP", "RC_SKIPFWD", "RC_SKIPREV"];
    assert_eq!(presses.len(), expected.len());
    for (request, action) in presses.iter().zip(expected) {
        assert!(request.contains(action), "{} not in {}", action, request);
    }
}

#[tokio::test(start_paused = true)]
async fn test_bd_rejection_is_reported() {
    let mock = Arc::new(MockTransport::new());
    mock.push(Reply::body("cCMD_GET_STATUS", BD_EXTENDED))
        .push(Reply::body("cCMD_RC_", REFUSED));
    let player = player(&mock, config(52));

    let err = player.send_command("miracast").await.unwrap_err();

    assert!(matches!(
        err,
        DispatchError::CommandRejected { completed: 0, ref code, .. } if code == "FE"
    ));
}

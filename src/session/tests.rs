use super::*;
use crate::audio_session::AudioSession;
use crate::autostop::AutoStopPolicy;
use crate::cover::{CoverFetcher, CoverReply};
use crate::engine::{DurationReply, ItemStatus, TrackEvents};
use crate::error::{AudioSessionError, PlayerError};
use crate::media::LoopPolicy;
use crate::nowplaying::{NowPlayingDisplay, TransportCommands};
use crate::options::{AfterAutoStopAction, SessionConfig};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Default)]
struct TrackState {
    locator: String,
    playing: bool,
    position: f64,
    rate: f32,
    seeks: Vec<f64>,
    dropped: bool,
    events: Option<TrackEvents>,
    duration: Option<DurationReply>,
}

#[derive(Default)]
struct EngineLog {
    tracks: Vec<Arc<Mutex<TrackState>>>,
    failing: Vec<String>,
}

struct FakeEngine(Arc<Mutex<EngineLog>>);

impl MediaEngine for FakeEngine {
    fn open(
        &mut self,
        file: &MediaFile,
        events: TrackEvents,
    ) -> Result<Box<dyn TrackHandle>, EngineError> {
        let mut log = self.0.lock().unwrap();
        if log.failing.contains(&file.locator) {
            return Err(EngineError::Read {
                locator: file.locator.clone(),
                reason: "no such file".into(),
            });
        }
        let state = Arc::new(Mutex::new(TrackState {
            locator: file.locator.clone(),
            events: Some(events),
            ..TrackState::default()
        }));
        log.tracks.push(state.clone());
        Ok(Box::new(FakeTrack(state)))
    }
}

struct FakeTrack(Arc<Mutex<TrackState>>);

impl TrackHandle for FakeTrack {
    fn play(&mut self) {
        self.0.lock().unwrap().playing = true;
    }
    fn pause(&mut self) {
        self.0.lock().unwrap().playing = false;
    }
    fn seek(&mut self, seconds: f64) {
        let mut s = self.0.lock().unwrap();
        s.position = seconds;
        s.seeks.push(seconds);
    }
    fn set_rate(&mut self, rate: f32) {
        self.0.lock().unwrap().rate = rate;
    }
    fn is_playing(&self) -> bool {
        self.0.lock().unwrap().playing
    }
    fn position(&self) -> f64 {
        self.0.lock().unwrap().position
    }
    fn resolve_duration(&mut self, reply: DurationReply) {
        self.0.lock().unwrap().duration = Some(reply);
    }
}

impl Drop for FakeTrack {
    fn drop(&mut self) {
        self.0.lock().unwrap().dropped = true;
    }
}

#[derive(Default)]
struct AudioLog {
    active: bool,
    remote_events: bool,
    fail_activate: bool,
    fail_deactivate: bool,
}

struct FakeAudio(Arc<Mutex<AudioLog>>);

impl AudioSession for FakeAudio {
    fn configure(&mut self, _config: &SessionConfig) -> Result<(), AudioSessionError> {
        Ok(())
    }
    fn set_active(&mut self, active: bool) -> Result<(), AudioSessionError> {
        let mut log = self.0.lock().unwrap();
        if active && log.fail_activate {
            return Err(AudioSessionError("device busy".into()));
        }
        if !active && log.fail_deactivate {
            return Err(AudioSessionError("still in use".into()));
        }
        log.active = active;
        Ok(())
    }
    fn set_remote_control_events(&mut self, enabled: bool) {
        self.0.lock().unwrap().remote_events = enabled;
    }
}

#[derive(Default)]
struct DisplayLog {
    infos: Vec<Option<NowPlayingInfo>>,
    commands: Vec<TransportCommands>,
    registrations: usize,
}

struct FakeDisplay(Arc<Mutex<DisplayLog>>);

impl NowPlayingDisplay for FakeDisplay {
    fn set_info(&mut self, info: Option<NowPlayingInfo>) {
        self.0.lock().unwrap().infos.push(info);
    }
    fn set_commands(&mut self, commands: TransportCommands) {
        self.0.lock().unwrap().commands.push(commands);
    }
    fn register_handlers(&mut self, _remote: RemoteControl) {
        self.0.lock().unwrap().registrations += 1;
    }
}

type PendingCovers = Arc<Mutex<Vec<(String, CoverReply)>>>;

struct FakeCovers(PendingCovers);

impl CoverFetcher for FakeCovers {
    fn fetch(&self, locator: &str, done: CoverReply) {
        self.0.lock().unwrap().push((locator.to_string(), done));
    }
}

struct Harness {
    session: PlayerSession,
    events: Receiver<PlayerEvent>,
    engine: Arc<Mutex<EngineLog>>,
    audio: Arc<Mutex<AudioLog>>,
    display: Arc<Mutex<DisplayLog>>,
    covers: PendingCovers,
}

fn files(n: usize) -> Vec<MediaFile> {
    (0..n)
        .map(|i| MediaFile::new(format!("/music/{i}.flac")).with_title(format!("Track {i}")))
        .collect()
}

fn harness() -> Harness {
    let engine = Arc::new(Mutex::new(EngineLog::default()));
    let audio = Arc::new(Mutex::new(AudioLog::default()));
    let display = Arc::new(Mutex::new(DisplayLog::default()));
    let covers: PendingCovers = Arc::new(Mutex::new(Vec::new()));

    let bridge = NowPlayingBridge::new(
        Box::new(FakeDisplay(display.clone())),
        Box::new(FakeCovers(covers.clone())),
    );
    let mut session = PlayerSession::new(
        Box::new(FakeEngine(engine.clone())),
        Box::new(FakeAudio(audio.clone())),
        bridge,
    );
    let events = session.subscribe();
    Harness {
        session,
        events,
        engine,
        audio,
        display,
        covers,
    }
}

fn with_playlist(files: Vec<MediaFile>, options: PlaybackOptions) -> Harness {
    let mut h = harness();
    h.session.set_playlist(files, options);
    h.drain();
    h
}

impl Harness {
    fn drain(&self) -> Vec<PlayerEvent> {
        self.events.try_iter().collect()
    }

    fn opened(&self) -> usize {
        self.engine.lock().unwrap().tracks.len()
    }

    fn track(&self, n: usize) -> Arc<Mutex<TrackState>> {
        self.engine.lock().unwrap().tracks[n].clone()
    }

    fn current(&self) -> Arc<Mutex<TrackState>> {
        let n = self.opened() - 1;
        self.track(n)
    }

    fn resolve(&mut self, n: usize, result: Result<f64, EngineError>) {
        let reply = self.track(n).lock().unwrap().duration.take().unwrap();
        reply(result);
        self.session.dispatch();
    }

    fn resolve_current(&mut self, seconds: f64) {
        let n = self.opened() - 1;
        self.resolve(n, Ok(seconds));
    }

    fn send_current(&mut self, event: EngineEvent) {
        let events = self.current().lock().unwrap().events.clone().unwrap();
        assert!(events.send(event));
        self.session.dispatch();
    }

    fn end_current(&mut self) {
        self.current().lock().unwrap().playing = false;
        self.send_current(EngineEvent::PlayedToEnd);
    }

    fn remote(&mut self, command: RemoteCommand) -> CommandStatus {
        let (tx, rx) = mpsc::channel();
        self.session
            .tx
            .send(SessionMsg::Remote {
                command,
                reply: Some(tx),
            })
            .unwrap();
        self.session.dispatch();
        rx.try_recv().unwrap()
    }
}

fn count(events: &[PlayerEvent], wanted: &PlayerEvent) -> usize {
    events.iter().filter(|e| *e == wanted).count()
}

#[test]
fn set_playlist_loads_first_track_without_playing() {
    let mut h = harness();
    h.session.set_playlist(files(3), PlaybackOptions::default());

    assert_eq!(h.opened(), 1);
    assert_eq!(h.current().lock().unwrap().locator, "/music/0.flac");
    assert_eq!(h.session.state(), SessionState::Loading);
    assert_eq!(h.session.current_index(), 0);
    assert!(h.session.has_observers());
    assert!(!h.session.is_playing());
    assert!(h.drain().is_empty());
    assert!(h.audio.lock().unwrap().active);
}

#[test]
fn empty_playlist_is_idle() {
    let mut h = harness();
    h.session.set_playlist(Vec::new(), PlaybackOptions::default());
    assert_eq!(h.session.state(), SessionState::Idle);
    assert!(!h.session.can_play_next());
    assert!(!h.session.can_play_previous());

    h.session.play();
    assert_eq!(h.opened(), 0);
    assert!(h.drain().is_empty());
}

#[test]
fn resolved_duration_emits_start_time_and_enables_time_observer() {
    let mut h = with_playlist(files(2), PlaybackOptions::default());
    assert!(!h.session.has_time_observer());

    h.resolve_current(180.0);

    assert_eq!(
        h.drain(),
        vec![PlayerEvent::TimeUpdated(PlaybackTime::start_of(180.0))]
    );
    assert!(h.session.has_time_observer());
    assert_eq!(h.session.state(), SessionState::Ready);
    assert_eq!(h.session.current_time().unwrap().duration(), 180.0);
}

#[test]
fn failed_duration_is_reported_and_treated_as_zero() {
    let mut h = with_playlist(files(1), PlaybackOptions::default());
    h.resolve(0, Err(EngineError::Duration("unknown length".into())));

    let events = h.drain();
    assert_eq!(
        events[0],
        PlayerEvent::Error(PlayerError::DurationResolutionFailed {
            index: 0,
            source: EngineError::Duration("unknown length".into()),
        })
    );
    assert_eq!(events[1], PlayerEvent::TimeUpdated(PlaybackTime::start_of(0.0)));
}

#[test]
fn stale_duration_does_not_touch_the_new_track() {
    let mut h = with_playlist(files(3), PlaybackOptions::default());
    h.session.play_track(1);
    h.drain();

    h.resolve(0, Ok(300.0));

    assert!(h.drain().is_empty());
    assert!(!h.session.has_time_observer());
    assert!(h.session.current_time().is_none());
}

#[test]
fn stale_end_of_track_is_ignored() {
    let mut h = with_playlist(files(3), PlaybackOptions::default());
    let old_events = h.track(0).lock().unwrap().events.clone().unwrap();
    h.session.play_track(2);
    h.drain();

    old_events.send(EngineEvent::PlayedToEnd);
    h.session.dispatch();

    assert!(h.drain().is_empty());
    assert_eq!(h.session.current_index(), 2);
}

#[test]
fn switching_tracks_tears_down_the_previous_handle() {
    let mut h = with_playlist(files(2), PlaybackOptions::default());
    h.session.play();
    h.session.play_track(1);

    assert!(h.track(0).lock().unwrap().dropped);
    assert!(!h.track(0).lock().unwrap().playing);
    assert!(!h.track(1).lock().unwrap().dropped);
    assert!(h.session.is_playing());
}

#[test]
fn play_track_emits_one_switch_event() {
    let mut h = with_playlist(files(3), PlaybackOptions::default());
    h.session.play_track(2);

    assert_eq!(
        h.drain(),
        vec![
            PlayerEvent::Stopped,
            PlayerEvent::StartedPlaying,
            PlayerEvent::SwitchedToTrack(2),
        ]
    );
    assert_eq!(h.session.current_index(), 2);
    assert_eq!(h.session.state(), SessionState::Playing);
}

#[test]
fn out_of_range_play_track_is_a_no_op() {
    let mut h = with_playlist(files(3), PlaybackOptions::default());
    h.session.play_track(3);
    h.session.play_track(usize::MAX);

    assert!(h.drain().is_empty());
    assert_eq!(h.session.current_index(), 0);
    assert_eq!(h.opened(), 1);
}

#[test]
fn next_past_the_end_stops() {
    let mut h = with_playlist(files(3), PlaybackOptions::default());
    h.session.play();
    h.session.play_next_track();
    h.session.play_next_track();
    assert_eq!(h.session.current_index(), 2);
    assert!(h.session.is_playing());
    h.drain();

    h.session.play_next_track();

    assert_eq!(h.session.current_index(), 2);
    assert!(!h.session.is_playing());
    assert_eq!(h.session.state(), SessionState::Stopped);
    assert_eq!(h.session.auto_stop_policy(), AutoStopPolicy::Disabled);
    assert_eq!(h.drain(), vec![PlayerEvent::Stopped]);
}

#[test]
fn previous_on_first_track_does_nothing() {
    let mut h = with_playlist(files(2), PlaybackOptions::default());
    h.session.play();
    h.drain();

    h.session.play_previous_track();

    assert!(h.drain().is_empty());
    assert!(h.session.is_playing());

    h.session.play_track(1);
    h.session.play_previous_track();
    assert_eq!(h.session.current_index(), 0);
}

#[test]
fn stop_is_idempotent() {
    let mut h = with_playlist(files(2), PlaybackOptions::default());
    h.session.play();
    h.session.stop();
    let first = (
        h.session.state(),
        h.session.auto_stop_policy(),
        h.session.has_observers(),
    );
    h.session.stop();
    let second = (
        h.session.state(),
        h.session.auto_stop_policy(),
        h.session.has_observers(),
    );

    assert_eq!(first, second);
    assert_eq!(first.0, SessionState::Stopped);
    assert!(!first.2);
    assert!(!h.audio.lock().unwrap().active);
    assert!(!h.audio.lock().unwrap().remote_events);
}

#[test]
fn stop_rewinds_and_releases_the_track() {
    let mut h = with_playlist(files(1), PlaybackOptions::default());
    h.session.play();
    h.current().lock().unwrap().position = 42.0;

    h.session.stop();

    let track = h.track(0);
    let track = track.lock().unwrap();
    assert_eq!(track.seeks, vec![0.0]);
    assert!(track.dropped);
    assert!(!track.playing);
}

#[test]
fn play_after_stop_reloads_the_current_track() {
    let mut h = with_playlist(files(2), PlaybackOptions::default());
    h.session.play_track(1);
    h.session.stop();
    h.drain();

    h.session.play();

    assert_eq!(h.opened(), 3);
    assert_eq!(h.current().lock().unwrap().locator, "/music/1.flac");
    assert!(h.session.is_playing());
    assert_eq!(h.drain(), vec![PlayerEvent::StartedPlaying]);
}

#[test]
fn rate_is_clamped_and_applied() {
    let mut h = with_playlist(files(1), PlaybackOptions::default());

    h.session.set_playback_rate(5.0);
    assert_eq!(h.session.playback_rate(), MAX_RATE);
    assert_eq!(h.current().lock().unwrap().rate, MAX_RATE);

    h.session.set_playback_rate(0.1);
    assert_eq!(h.session.playback_rate(), MIN_RATE);

    h.session.set_playback_rate(1.25);
    assert_eq!(h.session.playback_rate(), 1.25);

    h.session.set_playback_rate(f32::NAN);
    assert_eq!(h.session.playback_rate(), 1.0);

    h.session.set_playback_rate(f32::INFINITY);
    assert_eq!(h.session.playback_rate(), MAX_RATE);
}

#[test]
fn rate_survives_track_switches() {
    let mut h = with_playlist(files(2), PlaybackOptions::default());
    h.session.set_playback_rate(1.5);
    h.session.play_track(1);
    assert_eq!(h.current().lock().unwrap().rate, 1.5);
}

#[test]
fn relative_seeks_are_clamped_to_the_track() {
    let mut h = with_playlist(files(1), PlaybackOptions::default());
    h.resolve_current(100.0);

    h.current().lock().unwrap().position = 95.0;
    h.session.seek_forward(10.0);
    assert_eq!(h.current().lock().unwrap().position, 100.0);

    h.current().lock().unwrap().position = 3.0;
    h.session.seek_backward(10.0);
    assert_eq!(h.current().lock().unwrap().position, 0.0);

    h.current().lock().unwrap().position = 30.0;
    h.session.seek_forward(15.0);
    assert_eq!(h.current().lock().unwrap().position, 45.0);
}

#[test]
fn relative_seek_without_duration_only_clamps_at_zero() {
    let mut h = with_playlist(files(1), PlaybackOptions::default());
    h.current().lock().unwrap().position = f64::NAN;

    h.session.seek_forward(1000.0);
    assert_eq!(h.current().lock().unwrap().position, 1000.0);

    h.session.seek_backward(2000.0);
    assert_eq!(h.current().lock().unwrap().position, 0.0);
}

#[test]
fn ticks_emit_time_only_while_playing() {
    let mut h = with_playlist(files(1), PlaybackOptions::default());
    h.resolve_current(60.0);
    h.drain();

    h.session.tick();
    assert!(h.drain().is_empty());

    h.session.play();
    h.current().lock().unwrap().position = 5.0;
    h.drain();
    h.session.tick();
    assert_eq!(
        h.drain(),
        vec![PlayerEvent::TimeUpdated(PlaybackTime::new(5.0, 60.0))]
    );

    h.session.pause();
    h.drain();
    h.session.tick();
    assert!(h.drain().is_empty());
}

#[test]
fn unknown_engine_position_reads_as_zero() {
    let mut h = with_playlist(files(1), PlaybackOptions::default());
    h.resolve_current(60.0);
    h.current().lock().unwrap().position = f64::NAN;
    assert_eq!(h.session.current_time().unwrap().current(), 0.0);
}

#[test]
fn status_changes_are_forwarded() {
    let mut h = with_playlist(files(1), PlaybackOptions::default());
    h.send_current(EngineEvent::StatusChanged(ItemStatus::ReadyToPlay));

    assert_eq!(
        h.drain(),
        vec![PlayerEvent::StatusUpdated(ItemStatus::ReadyToPlay)]
    );
    assert_eq!(h.session.state(), SessionState::Ready);
}

#[test]
fn track_end_advances_to_the_next_track() {
    let mut h = with_playlist(files(2), PlaybackOptions::default());
    h.session.play();
    h.drain();

    h.end_current();

    assert_eq!(
        h.drain(),
        vec![
            PlayerEvent::FinishedPlaying,
            PlayerEvent::Stopped,
            PlayerEvent::StartedPlaying,
            PlayerEvent::SwitchedToTrack(1),
        ]
    );
    assert_eq!(h.session.current_index(), 1);
}

#[test]
fn end_of_last_track_stops() {
    let mut h = with_playlist(files(1), PlaybackOptions::default());
    h.session.play();
    h.drain();

    h.end_current();

    assert_eq!(
        h.drain(),
        vec![PlayerEvent::FinishedPlaying, PlayerEvent::Stopped]
    );
    assert_eq!(h.session.state(), SessionState::Stopped);
}

#[test]
fn playback_failure_is_reported() {
    let mut h = with_playlist(files(1), PlaybackOptions::default());
    let err = EngineError::Decode {
        locator: "/music/0.flac".into(),
        reason: "corrupt frame".into(),
    };
    h.send_current(EngineEvent::FailedToPlayToEnd(err.clone()));

    assert_eq!(
        h.drain(),
        vec![PlayerEvent::Error(PlayerError::TrackPlaybackFailed {
            index: 0,
            source: err,
        })]
    );
}

#[test]
fn failed_track_stops_driving_playback() {
    let mut h = with_playlist(files(2), PlaybackOptions::default());
    h.session.play();
    h.session.setup_auto_stop(AutoStopPolicy::After(10.0));
    h.drain();

    let err = EngineError::Decode {
        locator: "/music/0.flac".into(),
        reason: "not audio".into(),
    };
    h.send_current(EngineEvent::StatusChanged(ItemStatus::Failed));
    assert!(!h.session.is_playing());
    assert_eq!(h.session.state(), SessionState::Stopped);

    h.send_current(EngineEvent::FailedToPlayToEnd(err.clone()));
    // The duration lookup of the failed load reports the same failure again.
    h.resolve(0, Err(EngineError::Duration(err.to_string())));

    assert_eq!(
        h.drain(),
        vec![
            PlayerEvent::StatusUpdated(ItemStatus::Failed),
            PlayerEvent::Error(PlayerError::TrackPlaybackFailed {
                index: 0,
                source: err,
            }),
        ]
    );
    assert!(!h.session.has_observers());
    assert!(h.track(0).lock().unwrap().dropped);

    // Nothing keeps ticking for the dead track.
    h.session.tick();
    assert!(h.drain().is_empty());
    assert_eq!(h.session.auto_stop_remaining(), Some(10.0));

    // Playing again reloads the track.
    assert_eq!(h.remote(RemoteCommand::Play), CommandStatus::Success);
    assert_eq!(h.opened(), 2);
    assert!(h.session.is_playing());
}

#[test]
fn load_failure_is_reported() {
    let mut h = harness();
    h.engine
        .lock()
        .unwrap()
        .failing
        .push("/music/0.flac".to_string());
    h.session.set_playlist(files(2), PlaybackOptions::default());

    let events = h.drain();
    assert!(matches!(
        events.as_slice(),
        [PlayerEvent::Error(PlayerError::TrackLoadFailed { index: 0, .. })]
    ));
    assert!(!h.session.has_observers());
    assert_eq!(h.session.state(), SessionState::Stopped);

    // The rest of the playlist still works.
    h.session.play_track(1);
    assert!(h.session.is_playing());
}

#[test]
fn audio_session_activation_failure_is_reported_not_fatal() {
    let mut h = harness();
    h.audio.lock().unwrap().fail_activate = true;
    h.session.set_playlist(files(1), PlaybackOptions::default());

    let events = h.drain();
    assert!(matches!(
        events.as_slice(),
        [PlayerEvent::Error(PlayerError::AudioSessionActivationFailed(_))]
    ));

    h.session.play();
    assert!(h.session.is_playing());
}

#[test]
fn audio_session_deactivation_failure_is_reported_on_stop() {
    let mut h = with_playlist(files(1), PlaybackOptions::default());
    h.session.play();
    h.audio.lock().unwrap().fail_deactivate = true;
    h.drain();

    h.session.stop();

    let events = h.drain();
    assert!(matches!(
        events.as_slice(),
        [
            PlayerEvent::Error(PlayerError::AudioSessionDeactivationFailed(_)),
            PlayerEvent::Stopped
        ]
    ));
}

#[test]
fn countdown_stops_playback_once() {
    let mut h = with_playlist(files(2), PlaybackOptions::default());
    h.session.play();
    h.drain();
    h.session.setup_auto_stop(AutoStopPolicy::After(3.0));
    assert_eq!(
        h.drain(),
        vec![
            PlayerEvent::AutoStopPolicyUpdated(AutoStopPolicy::After(3.0)),
            PlayerEvent::AutoStopTimeUpdated(3.0),
        ]
    );

    for _ in 0..5 {
        h.session.tick();
    }

    assert_eq!(
        h.drain(),
        vec![
            PlayerEvent::AutoStopTimeUpdated(2.0),
            PlayerEvent::AutoStopTimeUpdated(1.0),
            PlayerEvent::AutoStopTimeUpdated(0.0),
            PlayerEvent::Stopped,
            PlayerEvent::AutoStopPolicyUpdated(AutoStopPolicy::Disabled),
        ]
    );
    assert!(!h.session.is_playing());
    assert_eq!(h.session.auto_stop_policy(), AutoStopPolicy::Disabled);
}

#[test]
fn pausing_holds_the_countdown() {
    let mut h = with_playlist(files(1), PlaybackOptions::default());
    h.session.play();
    h.session.setup_auto_stop(AutoStopPolicy::After(10.0));
    h.session.tick();
    h.session.pause();
    h.session.tick();
    h.session.tick();
    assert_eq!(h.session.auto_stop_remaining(), Some(9.0));

    h.session.play();
    h.session.tick();
    assert_eq!(h.session.auto_stop_remaining(), Some(8.0));
}

#[test]
fn countdown_set_while_paused_waits_for_play() {
    let mut h = with_playlist(files(1), PlaybackOptions::default());
    h.session.setup_auto_stop(AutoStopPolicy::After(5.0));
    h.session.tick();
    assert_eq!(h.session.auto_stop_remaining(), Some(5.0));

    h.session.play();
    h.session.tick();
    assert_eq!(h.session.auto_stop_remaining(), Some(4.0));
}

#[test]
fn switching_tracks_cancels_the_countdown() {
    let mut h = with_playlist(files(3), PlaybackOptions::default());
    h.session.play();
    h.session.setup_auto_stop(AutoStopPolicy::After(30.0));
    h.session.tick();
    h.drain();

    h.session.play_next_track();

    assert_eq!(
        h.drain(),
        vec![
            PlayerEvent::Stopped,
            PlayerEvent::AutoStopPolicyUpdated(AutoStopPolicy::Disabled),
            PlayerEvent::StartedPlaying,
            PlayerEvent::SwitchedToTrack(1),
        ]
    );
    assert_eq!(h.session.auto_stop_policy(), AutoStopPolicy::Disabled);
    assert_eq!(h.session.auto_stop_remaining(), None);
    assert!(h.session.is_playing());

    h.session.tick();
    assert!(
        h.drain()
            .iter()
            .all(|e| !matches!(e, PlayerEvent::AutoStopTimeUpdated(_)))
    );
}

#[test]
fn switching_tracks_clears_a_track_end_policy() {
    let mut h = with_playlist(files(3), PlaybackOptions::default());
    h.session.play();
    h.session.play_track(1);
    h.session.setup_auto_stop(AutoStopPolicy::AfterTrackEnd);
    h.session.play_track(2);

    assert_eq!(h.session.auto_stop_policy(), AutoStopPolicy::Disabled);
    assert!(h.session.is_playing());
    assert!(h.audio.lock().unwrap().active);
}

#[test]
fn explicit_stop_cancels_the_countdown() {
    let mut h = with_playlist(files(1), PlaybackOptions::default());
    h.session.play();
    h.session.setup_auto_stop(AutoStopPolicy::After(30.0));
    h.drain();

    h.session.stop();

    assert_eq!(
        h.drain(),
        vec![
            PlayerEvent::Stopped,
            PlayerEvent::AutoStopPolicyUpdated(AutoStopPolicy::Disabled),
        ]
    );
    assert_eq!(h.session.auto_stop_remaining(), None);
}

fn end_with_track_end_policy(action: AfterAutoStopAction) -> (Harness, Vec<PlayerEvent>) {
    let options = PlaybackOptions::default().with_after_auto_stop(action);
    let mut h = with_playlist(files(3), options);
    h.session.play();
    h.session.setup_auto_stop(AutoStopPolicy::AfterTrackEnd);
    h.drain();
    h.end_current();
    let events = h.drain();
    (h, events)
}

#[test]
fn track_end_policy_pauses_current_track() {
    let (h, events) = end_with_track_end_policy(AfterAutoStopAction::PauseCurrentTrack);
    assert_eq!(
        events,
        vec![
            PlayerEvent::FinishedPlaying,
            PlayerEvent::AutoStopPolicyUpdated(AutoStopPolicy::Disabled),
            PlayerEvent::Paused,
        ]
    );
    assert_eq!(h.session.current_index(), 0);
    assert_eq!(h.session.state(), SessionState::Paused);
    assert_eq!(h.session.auto_stop_policy(), AutoStopPolicy::Disabled);
    assert_eq!(h.opened(), 1);
}

#[test]
fn track_end_policy_can_load_the_next_track_paused() {
    let (h, events) = end_with_track_end_policy(AfterAutoStopAction::PauseAndLoadNextTrack);
    assert_eq!(events.last(), Some(&PlayerEvent::SwitchedToTrack(1)));
    assert_eq!(count(&events, &PlayerEvent::StartedPlaying), 0);
    assert_eq!(h.session.current_index(), 1);
    assert_eq!(h.opened(), 2);
    assert!(!h.session.is_playing());
}

#[test]
fn track_end_policy_can_reset_the_current_track() {
    let (h, events) = end_with_track_end_policy(AfterAutoStopAction::ResetCurrentTrack);
    assert_eq!(count(&events, &PlayerEvent::Paused), 1);
    assert_eq!(h.session.current_index(), 0);
    assert_eq!(h.opened(), 2);
    assert_eq!(h.current().lock().unwrap().locator, "/music/0.flac");
    assert!(!h.session.is_playing());
}

#[test]
fn track_end_policy_can_stop() {
    let (h, events) = end_with_track_end_policy(AfterAutoStopAction::Stop);
    assert_eq!(events.last(), Some(&PlayerEvent::Stopped));
    assert_eq!(h.session.state(), SessionState::Stopped);
    assert!(!h.session.has_observers());
}

#[test]
fn looping_file_replays_before_advancing() {
    let mut list = files(2);
    list[0].loop_policy = LoopPolicy::Times(2);
    let mut h = with_playlist(list, PlaybackOptions::default());
    h.session.play();
    h.drain();

    h.end_current();
    assert_eq!(
        h.drain(),
        vec![PlayerEvent::FinishedPlaying, PlayerEvent::StartedPlaying]
    );
    assert_eq!(h.opened(), 1);
    assert_eq!(h.current().lock().unwrap().seeks, vec![0.0]);
    assert!(h.session.is_playing());

    h.end_current();
    assert_eq!(h.session.current_index(), 1);
    assert_eq!(h.opened(), 2);
}

#[test]
fn loop_delay_waits_whole_ticks() {
    let mut list = files(1);
    list[0].loop_policy = LoopPolicy::Infinite;
    let options = PlaybackOptions::default().with_loop_delay(1.5);
    let mut h = with_playlist(list, options);
    h.session.play();
    h.end_current();
    assert!(!h.session.is_playing());

    h.session.tick();
    assert!(!h.session.is_playing());
    h.session.tick();
    assert!(h.session.is_playing());
}

#[test]
fn pause_cancels_a_pending_loop_restart() {
    let mut list = files(1);
    list[0].loop_policy = LoopPolicy::Infinite;
    let mut h = with_playlist(list, PlaybackOptions::default().with_loop_delay(1.0));
    h.session.play();
    h.end_current();
    h.session.pause();

    h.session.tick();
    h.session.tick();
    assert!(!h.session.is_playing());
}

#[test]
fn now_playing_is_published_before_playback() {
    let mut list = files(2);
    list[0].cover = Some(Artwork::from_bytes(vec![7u8; 4]));
    let mut h = with_playlist(list, PlaybackOptions::new(true));

    h.session.play();

    let display = h.display.lock().unwrap();
    assert_eq!(display.registrations, 1);
    let first = display.infos[0].as_ref().unwrap();
    assert!(!first.playing);
    assert_eq!(first.title, "Track 0");
    assert_eq!(first.artwork, Some(Artwork::from_bytes(vec![7u8; 4])));
    let last = display.infos.last().unwrap().as_ref().unwrap();
    assert!(last.playing);
    assert_eq!(last.artwork, first.artwork);
    assert!(last.commands.next);
    assert!(!last.commands.previous);
    assert!(h.session.now_playing_published());
}

#[test]
fn next_track_loaded_paused_does_not_inherit_the_old_cover() {
    let mut list = files(3);
    let cover = Artwork::from_bytes(vec![9u8; 3]);
    list[0].cover = Some(cover.clone());
    let options = PlaybackOptions::new(true)
        .with_after_auto_stop(AfterAutoStopAction::PauseAndLoadNextTrack);
    let mut h = with_playlist(list, options);
    h.session.play();
    h.session.setup_auto_stop(AutoStopPolicy::AfterTrackEnd);

    h.end_current();
    assert_eq!(h.session.current_index(), 1);
    h.resolve_current(200.0);
    h.session.set_playback_rate(1.5);
    h.session.seek(10.0);

    {
        let display = h.display.lock().unwrap();
        let stale = display
            .infos
            .iter()
            .flatten()
            .filter(|info| info.index == 1)
            .any(|info| info.artwork.as_ref() == Some(&cover));
        assert!(!stale);
    }

    h.session.play();
    let display = h.display.lock().unwrap();
    let last = display.infos.last().unwrap().as_ref().unwrap();
    assert_eq!(last.index, 1);
    assert_eq!(last.title, "Track 1");
    assert!(last.artwork.is_none());
}

#[test]
fn handlers_are_registered_once_across_tracks() {
    let mut h = with_playlist(files(3), PlaybackOptions::new(true));
    h.session.play();
    h.session.play_next_track();
    h.session.play_next_track();
    assert_eq!(h.display.lock().unwrap().registrations, 1);
}

#[test]
fn disabled_now_playing_publishes_nothing() {
    let mut h = with_playlist(files(1), PlaybackOptions::new(false));
    h.session.play();
    assert!(h.display.lock().unwrap().infos.is_empty());
    assert!(!h.session.now_playing_published());
}

#[test]
fn remote_cover_delays_playback_until_fetched() {
    let mut list = files(1);
    list[0].cover_locator = Some("https://covers.example/0.jpg".into());
    let mut h = with_playlist(list, PlaybackOptions::new(true));

    h.session.play();
    assert!(!h.session.is_playing());
    assert!(h.drain().is_empty());

    let (locator, reply) = h.covers.lock().unwrap().pop().unwrap();
    assert_eq!(locator, "https://covers.example/0.jpg");
    reply(Some(Artwork::from_bytes(vec![1u8, 2, 3]).with_source(locator)));
    h.session.dispatch();

    assert!(h.session.is_playing());
    assert_eq!(h.drain(), vec![PlayerEvent::StartedPlaying]);
    let display = h.display.lock().unwrap();
    let info = display.infos.last().unwrap().as_ref().unwrap();
    assert_eq!(&*info.artwork.as_ref().unwrap().data, &[1u8, 2, 3]);
}

#[test]
fn failed_cover_fetch_still_plays_without_art() {
    let mut list = files(1);
    list[0].cover_locator = Some("https://covers.example/missing.jpg".into());
    let mut h = with_playlist(list, PlaybackOptions::new(true));

    h.session.play();
    let (_, reply) = h.covers.lock().unwrap().pop().unwrap();
    reply(None);
    h.session.dispatch();

    assert!(h.session.is_playing());
    let display = h.display.lock().unwrap();
    assert!(display.infos.last().unwrap().as_ref().unwrap().artwork.is_none());
}

#[test]
fn late_cover_for_an_old_track_is_ignored() {
    let mut list = files(2);
    list[0].cover_locator = Some("https://covers.example/0.jpg".into());
    let mut h = with_playlist(list, PlaybackOptions::new(true));
    h.session.play();
    let (_, stale) = h.covers.lock().unwrap().pop().unwrap();

    h.session.play_track(1);
    assert!(h.session.is_playing());
    h.drain();

    stale(Some(Artwork::from_bytes(vec![0u8])));
    h.session.dispatch();

    assert!(h.drain().is_empty());
    assert_eq!(h.session.current_index(), 1);
    let display = h.display.lock().unwrap();
    let info = display.infos.last().unwrap().as_ref().unwrap();
    assert_eq!(info.index, 1);
    assert!(info.artwork.is_none());
}

#[test]
fn pause_cancels_a_play_waiting_on_cover_art() {
    let mut list = files(1);
    list[0].cover_locator = Some("https://covers.example/0.jpg".into());
    let mut h = with_playlist(list, PlaybackOptions::new(true));
    h.session.play();
    h.session.pause();

    let (_, reply) = h.covers.lock().unwrap().pop().unwrap();
    reply(None);
    h.session.dispatch();

    assert!(!h.session.is_playing());
}

#[test]
fn stop_dismisses_now_playing() {
    let mut h = with_playlist(files(1), PlaybackOptions::new(true));
    h.session.play();
    h.session.stop();

    let display = h.display.lock().unwrap();
    assert_eq!(display.infos.last(), Some(&None));
    assert_eq!(display.commands.last(), Some(&TransportCommands::none()));
    assert!(!h.session.now_playing_published());
}

#[test]
fn remote_play_and_pause_follow_playback_state() {
    let mut h = with_playlist(files(2), PlaybackOptions::new(true));

    assert_eq!(h.remote(RemoteCommand::Pause), CommandStatus::CommandFailed);
    assert_eq!(h.remote(RemoteCommand::Play), CommandStatus::Success);
    assert!(h.session.is_playing());
    assert_eq!(h.remote(RemoteCommand::Play), CommandStatus::CommandFailed);
    assert_eq!(h.remote(RemoteCommand::TogglePlayPause), CommandStatus::Success);
    assert!(!h.session.is_playing());
}

#[test]
fn remote_navigation_needs_a_neighbour() {
    let mut h = with_playlist(files(2), PlaybackOptions::new(true));
    h.session.play();

    assert_eq!(
        h.remote(RemoteCommand::Previous),
        CommandStatus::NoActionableItem
    );
    assert_eq!(h.remote(RemoteCommand::Next), CommandStatus::Success);
    assert_eq!(h.session.current_index(), 1);
    assert_eq!(h.remote(RemoteCommand::Next), CommandStatus::NoActionableItem);
    assert_eq!(h.session.current_index(), 1);
    assert!(h.session.is_playing());
}

#[test]
fn remote_commands_on_an_empty_session_have_nothing_to_act_on() {
    let mut h = harness();
    assert_eq!(h.remote(RemoteCommand::Play), CommandStatus::NoActionableItem);
    assert_eq!(h.remote(RemoteCommand::Stop), CommandStatus::NoActionableItem);
}

#[test]
fn remote_control_works_across_threads() {
    let mut h = with_playlist(files(2), PlaybackOptions::default());
    h.session.play();
    let remote = h.session.remote_control();

    let worker = thread::spawn(move || remote.request(RemoteCommand::Next, Duration::from_secs(5)));
    while !worker.is_finished() {
        h.session.dispatch();
        thread::sleep(Duration::from_millis(1));
    }

    assert_eq!(worker.join().unwrap(), CommandStatus::Success);
    assert_eq!(h.session.current_index(), 1);
}

#[test]
fn replacing_the_playlist_drops_the_old_track() {
    let mut h = with_playlist(files(2), PlaybackOptions::default());
    h.session.play_track(1);
    let old_events = h.current().lock().unwrap().events.clone().unwrap();

    h.session.set_playlist(files(1), PlaybackOptions::default());
    h.drain();
    old_events.send(EngineEvent::PlayedToEnd);
    h.session.dispatch();

    assert!(h.track(1).lock().unwrap().dropped);
    assert_eq!(h.session.current_index(), 0);
    assert!(h.drain().is_empty());
}

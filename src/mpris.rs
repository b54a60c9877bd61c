//! MPRIS now-playing display.
//!
//! Serves `org.mpris.MediaPlayer2` on the session bus from a background
//! thread. Transport calls from desktop widgets and media keys are forwarded
//! to the session through a `RemoteControl` and rejected with a D-Bus error
//! when the session refuses them.

use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_io::{Timer, block_on};
use zbus::{Connection, fdo, interface};
use zvariant::{ObjectPath, OwnedValue, Value};

use crate::media::is_remote_locator;
use crate::nowplaying::{
    CommandStatus, NowPlayingDisplay, NowPlayingInfo, RemoteCommand, RemoteControl,
    TransportCommands,
};

const OBJECT_PATH: &str = "/org/mpris/MediaPlayer2";
const NO_TRACK: &str = "/org/mpris/MediaPlayer2/TrackList/NoTrack";
const REPLY_TIMEOUT: Duration = Duration::from_millis(500);
const REPLY_POLL: Duration = Duration::from_millis(10);

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
enum Status {
    #[default]
    Stopped,
    Playing,
    Paused,
}

#[derive(Debug, Default)]
struct SharedState {
    status: Status,
    title: Option<String>,
    url: Option<String>,
    art_url: Option<String>,
    length_micros: Option<i64>,
    position_micros: i64,
    rate: f64,
    track_id: Option<String>,
    commands: TransportCommands,
    remote: Option<RemoteControl>,
}

impl SharedState {
    fn apply(&mut self, info: Option<NowPlayingInfo>) {
        let Some(info) = info else {
            *self = SharedState {
                remote: self.remote.take(),
                commands: self.commands,
                ..SharedState::default()
            };
            return;
        };
        self.status = if info.playing {
            Status::Playing
        } else {
            Status::Paused
        };
        self.title = Some(info.title);
        self.url = Some(to_url(&info.locator));
        self.art_url = info
            .artwork
            .and_then(|art| art.source)
            .map(|source| to_url(&source));
        self.length_micros = info.duration.map(seconds_to_micros);
        self.position_micros = info.elapsed.map(seconds_to_micros).unwrap_or(0);
        self.rate = f64::from(info.rate);
        self.track_id = Some(format!("{OBJECT_PATH}/track/{}", info.index));
        self.commands = info.commands;
    }
}

fn seconds_to_micros(seconds: f64) -> i64 {
    (seconds.max(0.0) * 1_000_000.0) as i64
}

fn to_url(locator: &str) -> String {
    if is_remote_locator(locator) || locator.starts_with("file://") {
        locator.to_string()
    } else {
        format!("file://{locator}")
    }
}

fn owned(value: Value<'_>) -> Option<OwnedValue> {
    OwnedValue::try_from(value).ok()
}

/// Handle to the MPRIS service; implements the now-playing display.
pub struct MprisDisplay {
    state: Arc<Mutex<SharedState>>,
    notify: Sender<()>,
}

impl MprisDisplay {
    /// Start serving as `org.mpris.MediaPlayer2.<name>`.
    pub fn spawn(name: &str) -> Self {
        let state = Arc::new(Mutex::new(SharedState::default()));
        let (notify, notify_rx) = mpsc::channel();

        let bus_name = format!("org.mpris.MediaPlayer2.{name}");
        let identity = name.to_string();
        let state_for_thread = state.clone();
        let spawned = std::thread::Builder::new()
            .name("segue-mpris".into())
            .spawn(move || {
                block_on(serve(bus_name, identity, state_for_thread, notify_rx));
            });
        if let Err(e) = spawned {
            tracing::warn!("MPRIS: failed to spawn service thread: {e}");
        }

        Self { state, notify }
    }

    fn update(&self, f: impl FnOnce(&mut SharedState)) {
        if let Ok(mut s) = self.state.lock() {
            f(&mut s);
        }
        let _ = self.notify.send(());
    }
}

impl NowPlayingDisplay for MprisDisplay {
    fn set_info(&mut self, info: Option<NowPlayingInfo>) {
        self.update(|s| s.apply(info));
    }

    fn set_commands(&mut self, commands: TransportCommands) {
        self.update(|s| s.commands = commands);
    }

    fn register_handlers(&mut self, remote: RemoteControl) {
        self.update(|s| s.remote = Some(remote));
    }
}

async fn serve(
    bus_name: String,
    identity: String,
    state: Arc<Mutex<SharedState>>,
    notify: Receiver<()>,
) {
    let connection = match Connection::session().await {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!("MPRIS: failed to connect to session bus: {e}");
            return;
        }
    };

    if let Err(e) = connection.request_name(bus_name.as_str()).await {
        tracing::warn!("MPRIS: failed to acquire name {bus_name}: {e}");
        return;
    }

    let object_server = connection.object_server();

    if let Err(e) = object_server.at(OBJECT_PATH, RootIface { identity }).await {
        tracing::warn!("MPRIS: failed to register root iface: {e}");
        return;
    }

    if let Err(e) = object_server.at(OBJECT_PATH, PlayerIface { state }).await {
        tracing::warn!("MPRIS: failed to register player iface: {e}");
        return;
    }
    tracing::info!(%bus_name, "MPRIS service registered");

    let player = match object_server.interface::<_, PlayerIface>(OBJECT_PATH).await {
        Ok(iface) => iface,
        Err(e) => {
            tracing::warn!("MPRIS: player iface lookup failed: {e}");
            return;
        }
    };

    // Coalesce display updates into one PropertiesChanged burst per poll.
    loop {
        Timer::after(Duration::from_millis(250)).await;
        let mut changed = false;
        loop {
            match notify.try_recv() {
                Ok(()) => changed = true,
                Err(mpsc::TryRecvError::Empty) => break,
                Err(mpsc::TryRecvError::Disconnected) => return,
            }
        }
        if !changed {
            continue;
        }

        let emitter = player.signal_emitter();
        let iface = player.get().await;
        let results = [
            iface.playback_status_changed(emitter).await,
            iface.metadata_changed(emitter).await,
            iface.rate_changed(emitter).await,
            iface.can_play_changed(emitter).await,
            iface.can_pause_changed(emitter).await,
            iface.can_go_next_changed(emitter).await,
            iface.can_go_previous_changed(emitter).await,
        ];
        if let Some(Err(e)) = results.into_iter().find(|r| r.is_err()) {
            tracing::debug!("MPRIS: failed to emit PropertiesChanged: {e}");
        }
    }
}

/// Wait for the session's verdict without blocking the D-Bus executor.
async fn await_reply(reply: Receiver<CommandStatus>, timeout: Duration) -> CommandStatus {
    let deadline = Instant::now() + timeout;
    loop {
        let polled = reply.try_recv();
        match polled {
            Ok(status) => return status,
            Err(mpsc::TryRecvError::Disconnected) => return CommandStatus::CommandFailed,
            Err(mpsc::TryRecvError::Empty) if Instant::now() >= deadline => {
                return CommandStatus::CommandFailed;
            }
            Err(mpsc::TryRecvError::Empty) => {
                Timer::after(REPLY_POLL).await;
            }
        }
    }
}

struct RootIface {
    identity: String,
}

#[interface(name = "org.mpris.MediaPlayer2")]
impl RootIface {
    fn raise(&self) {
        // No-op for TUI.
    }

    fn quit(&self) {
        // Quitting is left to the terminal UI.
    }

    #[zbus(property)]
    fn can_quit(&self) -> bool {
        false
    }

    #[zbus(property)]
    fn can_raise(&self) -> bool {
        false
    }

    #[zbus(property)]
    fn has_track_list(&self) -> bool {
        false
    }

    #[zbus(property)]
    fn identity(&self) -> String {
        self.identity.clone()
    }

    #[zbus(property)]
    fn supported_uri_schemes(&self) -> Vec<String> {
        vec!["file".to_string(), "http".to_string(), "https".to_string()]
    }

    #[zbus(property)]
    fn supported_mime_types(&self) -> Vec<String> {
        vec![]
    }
}

struct PlayerIface {
    state: Arc<Mutex<SharedState>>,
}

impl PlayerIface {
    async fn command(&self, command: RemoteCommand) -> fdo::Result<()> {
        let remote = self.state.lock().ok().and_then(|s| s.remote.clone());
        let Some(remote) = remote else {
            return Err(fdo::Error::Failed("player is not ready".into()));
        };
        let Some(reply) = remote.submit(command) else {
            return Err(fdo::Error::Failed("player has shut down".into()));
        };
        match await_reply(reply, REPLY_TIMEOUT).await {
            CommandStatus::Success => Ok(()),
            CommandStatus::CommandFailed => {
                Err(fdo::Error::Failed(format!("{command:?} rejected")))
            }
            CommandStatus::NoActionableItem => {
                Err(fdo::Error::Failed(format!("nothing to {command:?}")))
            }
        }
    }

    fn commands(&self) -> TransportCommands {
        self.state
            .lock()
            .map(|s| s.commands)
            .unwrap_or_default()
    }
}

#[interface(name = "org.mpris.MediaPlayer2.Player")]
impl PlayerIface {
    async fn next(&self) -> fdo::Result<()> {
        self.command(RemoteCommand::Next).await
    }

    async fn previous(&self) -> fdo::Result<()> {
        self.command(RemoteCommand::Previous).await
    }

    async fn play(&self) -> fdo::Result<()> {
        self.command(RemoteCommand::Play).await
    }

    async fn pause(&self) -> fdo::Result<()> {
        self.command(RemoteCommand::Pause).await
    }

    async fn play_pause(&self) -> fdo::Result<()> {
        self.command(RemoteCommand::TogglePlayPause).await
    }

    async fn stop(&self) -> fdo::Result<()> {
        self.command(RemoteCommand::Stop).await
    }

    #[zbus(property)]
    fn playback_status(&self) -> &str {
        let Ok(s) = self.state.lock() else {
            return "Stopped";
        };
        match s.status {
            Status::Stopped => "Stopped",
            Status::Playing => "Playing",
            Status::Paused => "Paused",
        }
    }

    #[zbus(property)]
    fn rate(&self) -> f64 {
        self.state.lock().map(|s| s.rate).unwrap_or(1.0)
    }

    #[zbus(property)]
    fn minimum_rate(&self) -> f64 {
        f64::from(crate::session::MIN_RATE)
    }

    #[zbus(property)]
    fn maximum_rate(&self) -> f64 {
        f64::from(crate::session::MAX_RATE)
    }

    #[zbus(property)]
    fn position(&self) -> i64 {
        self.state.lock().map(|s| s.position_micros).unwrap_or(0)
    }

    #[zbus(property)]
    fn can_control(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_seek(&self) -> bool {
        false
    }

    #[zbus(property)]
    fn can_play(&self) -> bool {
        self.commands().play
    }

    #[zbus(property)]
    fn can_pause(&self) -> bool {
        self.commands().pause
    }

    #[zbus(property)]
    fn can_go_next(&self) -> bool {
        self.commands().next
    }

    #[zbus(property)]
    fn can_go_previous(&self) -> bool {
        self.commands().previous
    }

    #[zbus(property)]
    fn metadata(&self) -> HashMap<String, OwnedValue> {
        let mut map = HashMap::new();
        let Ok(s) = self.state.lock() else {
            return map;
        };

        let track_id = s
            .track_id
            .as_deref()
            .and_then(|id| ObjectPath::try_from(id).ok())
            .unwrap_or_else(|| ObjectPath::from_static_str_unchecked(NO_TRACK));
        if let Some(v) = owned(Value::from(track_id)) {
            map.insert("mpris:trackid".to_string(), v);
        }
        if let Some(v) = s.title.clone().and_then(|t| owned(Value::from(t))) {
            map.insert("xesam:title".to_string(), v);
        }
        if let Some(v) = s.url.clone().and_then(|u| owned(Value::from(u))) {
            map.insert("xesam:url".to_string(), v);
        }
        if let Some(v) = s.art_url.clone().and_then(|u| owned(Value::from(u))) {
            map.insert("mpris:artUrl".to_string(), v);
        }
        if let Some(v) = s.length_micros.and_then(|l| owned(Value::from(l))) {
            map.insert("mpris:length".to_string(), v);
        }
        map
    }
}

//! Now-playing bridge.
//!
//! Publishes what is playing to the desktop's media surface and decides
//! whether transport commands coming back from that surface are accepted.
//! Commands are checked against `PlaybackQuery` predicates before the session
//! acts on them.

use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Duration;

use crate::cover::{CoverFetcher, CoverReply};
use crate::media::{Artwork, MediaFile};
use crate::session::SessionMsg;

/// Read-only view of the session used when publishing and evaluating commands.
pub trait PlaybackQuery {
    fn is_playing_now(&self) -> bool;
    fn can_play_next(&self) -> bool;
    fn can_play_previous(&self) -> bool;
    fn current_index(&self) -> Option<usize>;
    fn current_file(&self) -> Option<&MediaFile>;
    fn elapsed(&self) -> Option<f64>;
    fn duration(&self) -> Option<f64>;
    fn rate(&self) -> f32;
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RemoteCommand {
    Play,
    Pause,
    TogglePlayPause,
    Stop,
    Next,
    Previous,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CommandStatus {
    Success,
    /// The command makes no sense in the current state (e.g. play while playing).
    CommandFailed,
    /// There is nothing to act on (no next/previous track, empty playlist).
    NoActionableItem,
}

/// Which transport buttons the display should offer.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct TransportCommands {
    pub play: bool,
    pub pause: bool,
    pub next: bool,
    pub previous: bool,
}

impl TransportCommands {
    pub fn none() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NowPlayingInfo {
    pub index: usize,
    pub title: String,
    pub locator: String,
    pub artwork: Option<Artwork>,
    pub elapsed: Option<f64>,
    pub duration: Option<f64>,
    pub rate: f32,
    pub playing: bool,
    pub commands: TransportCommands,
}

impl NowPlayingInfo {
    /// Snapshot the current track, or `None` when nothing is selected.
    pub fn capture(query: &dyn PlaybackQuery, artwork: Option<Artwork>) -> Option<Self> {
        let file = query.current_file()?;
        Some(Self {
            index: query.current_index().unwrap_or(0),
            title: file.display_title(),
            locator: file.locator.clone(),
            artwork,
            elapsed: query.elapsed(),
            duration: query.duration(),
            rate: query.rate(),
            playing: query.is_playing_now(),
            commands: TransportCommands {
                play: true,
                pause: true,
                next: query.can_play_next(),
                previous: query.can_play_previous(),
            },
        })
    }
}

/// The desktop media surface (MPRIS, SMTC, ...).
pub trait NowPlayingDisplay {
    fn set_info(&mut self, info: Option<NowPlayingInfo>);
    fn set_commands(&mut self, commands: TransportCommands);
    /// Route transport presses into the session from now on.
    fn register_handlers(&mut self, remote: RemoteControl);
}

/// Display that shows nothing; for headless sessions.
#[derive(Debug, Default)]
pub struct NoDisplay;

impl NowPlayingDisplay for NoDisplay {
    fn set_info(&mut self, _info: Option<NowPlayingInfo>) {}

    fn set_commands(&mut self, _commands: TransportCommands) {}

    fn register_handlers(&mut self, _remote: RemoteControl) {}
}

/// Sends remote transport commands into a session from any thread.
#[derive(Debug, Clone)]
pub struct RemoteControl {
    tx: Sender<SessionMsg>,
}

impl RemoteControl {
    pub(crate) fn new(tx: Sender<SessionMsg>) -> Self {
        Self { tx }
    }

    /// Fire and forget.
    pub fn send(&self, command: RemoteCommand) -> bool {
        self.tx
            .send(SessionMsg::Remote {
                command,
                reply: None,
            })
            .is_ok()
    }

    /// Send and wait for the session to evaluate the command. Gives up with
    /// `CommandFailed` if the session does not dispatch within `timeout`.
    pub fn request(&self, command: RemoteCommand, timeout: Duration) -> CommandStatus {
        let Some(reply) = self.submit(command) else {
            return CommandStatus::CommandFailed;
        };
        reply
            .recv_timeout(timeout)
            .unwrap_or(CommandStatus::CommandFailed)
    }

    /// Send without waiting. The session answers on the returned receiver
    /// when it dispatches the command; `None` if the session is gone.
    pub fn submit(&self, command: RemoteCommand) -> Option<Receiver<CommandStatus>> {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.tx
            .send(SessionMsg::Remote {
                command,
                reply: Some(reply_tx),
            })
            .ok()?;
        Some(reply_rx)
    }
}

/// Outcome of looking up cover art for a track about to be published.
#[derive(Debug)]
pub enum ArtworkLookup {
    Ready(Option<Artwork>),
    /// A fetch is in flight; the reply carries the result.
    Pending,
}

pub struct NowPlayingBridge {
    display: Box<dyn NowPlayingDisplay>,
    covers: Box<dyn CoverFetcher>,
    remote: Option<RemoteControl>,
    handlers_registered: bool,
    published: bool,
    artwork: Option<Artwork>,
}

impl NowPlayingBridge {
    pub fn new(display: Box<dyn NowPlayingDisplay>, covers: Box<dyn CoverFetcher>) -> Self {
        Self {
            display,
            covers,
            remote: None,
            handlers_registered: false,
            published: false,
            artwork: None,
        }
    }

    pub fn disabled() -> Self {
        Self::new(Box::new(NoDisplay), Box::new(crate::cover::NoCovers))
    }

    pub(crate) fn attach(&mut self, remote: RemoteControl) {
        self.remote = Some(remote);
        self.handlers_registered = false;
    }

    pub fn is_published(&self) -> bool {
        self.published
    }

    pub fn artwork(&self) -> Option<&Artwork> {
        self.artwork.as_ref()
    }

    /// Prefer a cover locator over in-memory art, like the display would.
    pub fn lookup_artwork(&self, file: &MediaFile, done: CoverReply) -> ArtworkLookup {
        match file.cover_locator.as_deref() {
            Some(locator) => {
                self.covers.fetch(locator, done);
                ArtworkLookup::Pending
            }
            None => ArtworkLookup::Ready(file.cover.clone()),
        }
    }

    pub fn publish(&mut self, info: Option<NowPlayingInfo>) {
        if !self.handlers_registered {
            if let Some(remote) = self.remote.clone() {
                self.display.register_handlers(remote);
                self.handlers_registered = true;
            }
        }

        let Some(info) = info else {
            self.display.set_info(None);
            return;
        };
        tracing::debug!(title = %info.title, "publishing now-playing info");
        self.artwork = info.artwork.clone();
        self.display.set_commands(info.commands);
        self.display.set_info(Some(info));
        self.published = true;
    }

    /// Re-publish state changes (rate, pause, position) keeping the cached artwork.
    pub fn refresh(&mut self, info: Option<NowPlayingInfo>) {
        if !self.published {
            return;
        }
        self.publish(info);
    }

    pub fn dismiss(&mut self) {
        self.display.set_commands(TransportCommands::none());
        self.display.set_info(None);
        self.published = false;
        self.artwork = None;
    }

    pub fn evaluate(command: RemoteCommand, query: &dyn PlaybackQuery) -> CommandStatus {
        if query.current_file().is_none() {
            return CommandStatus::NoActionableItem;
        }
        match command {
            RemoteCommand::Play if query.is_playing_now() => CommandStatus::CommandFailed,
            RemoteCommand::Pause if !query.is_playing_now() => CommandStatus::CommandFailed,
            RemoteCommand::Next if !query.can_play_next() => CommandStatus::NoActionableItem,
            RemoteCommand::Previous if !query.can_play_previous() => {
                CommandStatus::NoActionableItem
            }
            _ => CommandStatus::Success,
        }
    }
}

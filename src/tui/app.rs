//! TUI application state and main event loop

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use futures::StreamExt;
use ratatui::DefaultTerminal;
use tokio::sync::watch;

use super::backend::{Backend, BackendCommand, BackendResponse};
use super::compose::{ComposeView, InputLine};
use super::log_capture::{LogBuffer, LogTail};
use super::messages::MessagesState;
use super::sidebar::{SidebarItem, SidebarState};
use super::ui;
use crate::auth::oauth::GoogleSignIn;
use crate::auth::AuthSession;
use crate::models::{ChannelId, Identity, Topic};
use crate::notice::Notice;
use crate::services::ClientContext;
use crate::sync::{
    Attachment, Composer, DirectChannel, ForumChannel, MessageChannel, SubscriptionSlot,
};

/// How often captured log lines are pulled into the status bar.
const LOG_TICK_MS: u64 = 250;

/// Lines moved per PageUp/PageDown in the messages pane.
const PAGE_LINES: usize = 10;

/// Active pane in the TUI
#[derive(Default, Clone, Copy, PartialEq, Eq, Debug)]
pub enum Pane {
    #[default]
    Sidebar,
    Messages,
    Compose,
}

impl Pane {
    pub fn as_str(&self) -> &'static str {
        match self {
            Pane::Sidebar => "sidebar",
            Pane::Messages => "messages",
            Pane::Compose => "compose",
        }
    }

    fn next(self) -> Self {
        match self {
            Pane::Sidebar => Pane::Messages,
            Pane::Messages => Pane::Compose,
            Pane::Compose => Pane::Sidebar,
        }
    }

    fn prev(self) -> Self {
        match self {
            Pane::Sidebar => Pane::Compose,
            Pane::Messages => Pane::Sidebar,
            Pane::Compose => Pane::Messages,
        }
    }
}

/// Which conversation a feed or a send belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ChannelKey {
    Direct(ChannelId),
    /// Topic id.
    Forum(&'static str),
}

/// Application state
pub struct App {
    ctx: ClientContext,
    backend: Backend,
    pub sidebar: SidebarState,
    pub messages: MessagesState,
    pub compose: ComposeView,
    pub composer: Composer,
    /// The open conversation. Its feed lives in `feed`.
    active: Option<Arc<dyn MessageChannel>>,
    feed: SubscriptionSlot<ChannelKey>,
    /// One handle per topic, so every send appends to the same history.
    forums: HashMap<&'static str, Arc<ForumChannel>>,
    /// Attachments still uploading, by the conversation that sent them.
    uploads: HashMap<ChannelKey, Attachment>,
    /// Outcome of the last action, shown until the next key press.
    pub notice: Option<Notice>,
    pub logs: LogTail,
    pub show_help: bool,
    pub show_logs: bool,
    pub active_pane: Pane,
    pub should_exit: bool,
}

impl App {
    pub fn new(ctx: ClientContext, backend: Backend) -> Self {
        backend.send(BackendCommand::LoadUsers);
        Self {
            ctx,
            backend,
            sidebar: SidebarState::default(),
            messages: MessagesState::default(),
            compose: ComposeView::default(),
            composer: Composer::default(),
            active: None,
            feed: SubscriptionSlot::default(),
            forums: HashMap::new(),
            uploads: HashMap::new(),
            notice: None,
            logs: LogTail::default(),
            show_help: false,
            show_logs: false,
            active_pane: Pane::default(),
            should_exit: false,
        }
    }

    pub fn me(&self) -> &Identity {
        &self.ctx.me
    }

    /// Display name of the open conversation, if any.
    pub fn target(&self) -> Option<String> {
        self.active.as_ref().map(|c| c.title())
    }

    // -----------------------------------------------------------------------
    // Opening conversations
    // -----------------------------------------------------------------------

    fn open_selected(&mut self) {
        let opened = match self.sidebar.selected_item() {
            Some(SidebarItem::Topic(topic)) => self.forum(topic).map(|channel| {
                let header = format!("{} - {}", channel.title(), channel.topic().description);
                let channel: Arc<dyn MessageChannel> = channel;
                (ChannelKey::Forum(topic.id), header, channel)
            }),
            Some(SidebarItem::User(user)) => {
                let channel = DirectChannel::new(
                    self.ctx.services.clone(),
                    self.ctx.me.clone(),
                    user,
                    self.ctx.poll_interval,
                );
                let header = match channel.recipient().email.as_str() {
                    "" => channel.title(),
                    email => format!("{} <{}>", channel.title(), email),
                };
                let key = ChannelKey::Direct(channel.channel().clone());
                let channel: Arc<dyn MessageChannel> = Arc::new(channel);
                Ok((key, header, channel))
            }
            _ => return,
        };

        match opened {
            Ok((key, header, channel)) => self.open(key, header, channel),
            Err(e) => {
                tracing::warn!("Failed to open conversation: {:#}", e);
                self.notice = Some(Notice::destructive("Error", "Failed to load messages"));
            }
        }
    }

    /// The forum handle for `topic`, loaded from the local store on first use.
    fn forum(&mut self, topic: &'static Topic) -> Result<Arc<ForumChannel>> {
        if let Some(channel) = self.forums.get(topic.id) {
            return Ok(Arc::clone(channel));
        }
        let local = Arc::clone(&self.ctx.services.local);
        let channel = Arc::new(ForumChannel::open(local, self.ctx.me.clone(), topic)?);
        self.forums.insert(topic.id, Arc::clone(&channel));
        Ok(channel)
    }

    /// Make `channel` the open conversation. Reopening the current one only
    /// moves focus to the compose box.
    fn open(&mut self, key: ChannelKey, header: String, channel: Arc<dyn MessageChannel>) {
        if !self.feed.is_watching(&key) {
            self.composer = Composer::for_channel(channel.as_ref());
            if let Some(attachment) = self.uploads.get(&key) {
                self.composer.resume_upload(attachment.clone());
            }
            self.compose = ComposeView {
                input: InputLine::with_text(self.composer.text()),
                attach_prompt: None,
            };
            self.messages.open(header);
            // Replacing the slot drops the previous feed listener.
            self.feed.replace(key, channel.subscribe());
            self.active = Some(channel);
        }
        self.active_pane = Pane::Compose;
    }

    fn close(&mut self) {
        self.feed.release();
        self.active = None;
        self.forums.clear();
        self.composer = Composer::default();
        self.compose = ComposeView::default();
        self.messages = MessagesState::default();
    }

    // -----------------------------------------------------------------------
    // Input
    // -----------------------------------------------------------------------

    pub fn handle_key(&mut self, key: KeyEvent) {
        self.notice = None;
        self.logs.dismiss_warning();

        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        if ctrl && key.code == KeyCode::Char('c') {
            self.should_exit = true;
            return;
        }

        if key.code == KeyCode::F(12) {
            self.show_logs = !self.show_logs;
            return;
        }

        if self.show_help {
            if matches!(key.code, KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q')) {
                self.show_help = false;
            }
            return;
        }

        if ctrl {
            match key.code {
                KeyCode::Char('o') => {
                    self.backend.send(BackendCommand::SignOut);
                    return;
                }
                KeyCode::Char('r') => {
                    self.sidebar.loading = true;
                    self.backend.send(BackendCommand::LoadUsers);
                    return;
                }
                _ => {}
            }
        }

        match key.code {
            KeyCode::Tab if self.compose.attach_prompt.is_none() => {
                self.active_pane = self.active_pane.next();
                return;
            }
            KeyCode::BackTab if self.compose.attach_prompt.is_none() => {
                self.active_pane = self.active_pane.prev();
                return;
            }
            _ => {}
        }

        match self.active_pane {
            Pane::Sidebar => self.handle_sidebar_key(key),
            Pane::Messages => self.handle_messages_key(key),
            Pane::Compose => self.handle_compose_key(key),
        }
    }

    fn handle_sidebar_key(&mut self, key: KeyEvent) {
        if self.sidebar.searching {
            match key.code {
                KeyCode::Esc => self.sidebar.clear_filter(),
                KeyCode::Enter => self.sidebar.searching = false,
                KeyCode::Backspace => self.sidebar.pop_filter(),
                KeyCode::Up => self.sidebar.move_up(),
                KeyCode::Down => self.sidebar.move_down(),
                KeyCode::Char(c) => self.sidebar.push_filter(c),
                _ => {}
            }
            return;
        }

        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.sidebar.move_up(),
            KeyCode::Down | KeyCode::Char('j') => self.sidebar.move_down(),
            KeyCode::Enter => self.open_selected(),
            KeyCode::Char('/') => self.sidebar.searching = true,
            KeyCode::Esc if !self.sidebar.filter.is_empty() => self.sidebar.clear_filter(),
            KeyCode::Char('?') => self.show_help = true,
            KeyCode::Char('q') => self.should_exit = true,
            _ => {}
        }
    }

    fn handle_messages_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.messages.scroll_up(1),
            KeyCode::Down | KeyCode::Char('j') => self.messages.scroll_down(1),
            KeyCode::PageUp => self.messages.scroll_up(PAGE_LINES),
            KeyCode::PageDown => self.messages.scroll_down(PAGE_LINES),
            KeyCode::End => self.messages.scroll_to_bottom(),
            KeyCode::Esc => self.active_pane = Pane::Sidebar,
            KeyCode::Char('?') => self.show_help = true,
            KeyCode::Char('q') => self.should_exit = true,
            _ => {}
        }
    }

    fn handle_compose_key(&mut self, key: KeyEvent) {
        if self.compose.attach_prompt.is_some() {
            self.handle_attach_prompt_key(key);
            return;
        }
        if key.code == KeyCode::Esc {
            self.active_pane = Pane::Sidebar;
            return;
        }
        if self.active.is_none() || self.composer.is_uploading() {
            return;
        }

        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let alt = key.modifiers.contains(KeyModifiers::ALT);
        let input = &mut self.compose.input;
        let before = input.text.len();
        let mut edited = false;

        match key.code {
            KeyCode::Enter if alt => {
                input.insert_char('\n');
                edited = true;
            }
            KeyCode::Enter => {
                self.submit();
                return;
            }
            KeyCode::Char('a') if ctrl => {
                self.compose.attach_prompt = Some(InputLine::default());
                return;
            }
            KeyCode::Char('x') if ctrl => {
                self.composer.detach();
                return;
            }
            KeyCode::Char('u') if ctrl => {
                input.clear();
                edited = true;
            }
            KeyCode::Char(c) if !ctrl => {
                input.insert_char(c);
                edited = true;
            }
            KeyCode::Backspace => {
                input.backspace();
                edited = input.text.len() != before;
            }
            KeyCode::Delete => {
                input.delete();
                edited = input.text.len() != before;
            }
            KeyCode::Left => input.move_left(),
            KeyCode::Right => input.move_right(),
            KeyCode::Home => input.move_home(),
            KeyCode::End => input.move_end(),
            _ => {}
        }

        if edited {
            let text = self.compose.input.text.clone();
            self.composer.set_text(text);
        }
    }

    fn handle_attach_prompt_key(&mut self, key: KeyEvent) {
        let Some(ref mut prompt) = self.compose.attach_prompt else {
            return;
        };
        match key.code {
            KeyCode::Esc => self.compose.attach_prompt = None,
            KeyCode::Enter => {
                let path = PathBuf::from(prompt.text.trim());
                self.compose.attach_prompt = None;
                if path.as_os_str().is_empty() {
                    return;
                }
                if let Some(key) = self.feed.key() {
                    self.backend.send(BackendCommand::Attach {
                        key: key.clone(),
                        path,
                    });
                }
            }
            KeyCode::Char(c) => prompt.insert_char(c),
            KeyCode::Backspace => prompt.backspace(),
            KeyCode::Delete => prompt.delete(),
            KeyCode::Left => prompt.move_left(),
            KeyCode::Right => prompt.move_right(),
            KeyCode::Home => prompt.move_home(),
            KeyCode::End => prompt.move_end(),
            _ => {}
        }
    }

    fn submit(&mut self) {
        let (Some(channel), Some(key)) = (self.active.as_ref(), self.feed.key()) else {
            return;
        };
        match self.composer.prepare() {
            Ok(outgoing) => {
                if let Some(ref attachment) = outgoing.attachment {
                    self.uploads.insert(key.clone(), attachment.clone());
                }
                self.backend.send(BackendCommand::Send {
                    key: key.clone(),
                    channel: Arc::clone(channel),
                    outgoing,
                });
            }
            Err(e) => self.notice = Some(e.notice()),
        }
    }

    // -----------------------------------------------------------------------
    // Backend responses
    // -----------------------------------------------------------------------

    pub fn handle_response(&mut self, response: BackendResponse) {
        match response {
            BackendResponse::Users(Ok(users)) => {
                tracing::debug!("Loaded {} users", users.len());
                self.sidebar.set_users(users);
            }
            BackendResponse::Users(Err(e)) => {
                tracing::warn!("Failed to load users: {:#}", e);
                self.sidebar.loading = false;
                self.notice = Some(Notice::destructive("Error", "Failed to load users"));
            }
            BackendResponse::Attached { key, result } => match result {
                Ok(attachment) if self.feed.is_watching(&key) => self.composer.attach(attachment),
                Ok(attachment) => {
                    tracing::debug!("Dropped {}: conversation closed", attachment.file_name);
                }
                Err(e) => self.notice = Some(e.notice()),
            },
            BackendResponse::UploadFinished { key } => {
                self.uploads.remove(&key);
                if self.feed.is_watching(&key) {
                    self.composer.upload_finished();
                }
            }
            BackendResponse::Sent { key, result } => {
                self.uploads.remove(&key);
                if self.feed.is_watching(&key) {
                    match self.composer.finish(result) {
                        Ok(()) => {
                            self.compose.input.clear();
                            self.messages.scroll_to_bottom();
                        }
                        Err(e) => self.notice = Some(e.notice()),
                    }
                } else if let Err(e) = result {
                    self.notice = Some(e.notice());
                }
            }
            BackendResponse::Notice(notice) => {
                if !notice.is_error() {
                    self.close();
                }
                self.notice = Some(notice);
            }
        }
    }
}

/// Run the TUI until the user quits or signs out.
pub async fn run(logs: LogBuffer) -> Result<()> {
    let session = Arc::new(AuthSession::new(GoogleSignIn::new(false)));
    if session.current().is_none() {
        bail!("Not signed in. Run 'chatapp login' first.");
    }
    let identity = session.subscribe();

    let ctx = ClientContext::connect().await?;
    let backend = Backend::start(ctx.clone(), session);
    let mut app = App::new(ctx, backend);

    let mut terminal = ratatui::init();
    let result = run_app(&mut terminal, &mut app, identity, &logs).await;
    ratatui::restore();
    result
}

async fn run_app(
    terminal: &mut DefaultTerminal,
    app: &mut App,
    mut identity: watch::Receiver<Option<Identity>>,
    logs: &LogBuffer,
) -> Result<()> {
    let mut events = EventStream::new();
    let mut ticker = tokio::time::interval(Duration::from_millis(LOG_TICK_MS));

    while !app.should_exit {
        terminal.draw(|frame| ui::render(frame, app))?;

        tokio::select! {
            event = events.next() => match event {
                Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => app.handle_key(key),
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
                None => app.should_exit = true,
            },
            Some(response) = app.backend.recv() => app.handle_response(response),
            snapshot = app.feed.changed() => app.messages.replace(snapshot),
            changed = identity.changed() => {
                if changed.is_err() || identity.borrow().is_none() {
                    tracing::info!("Signed out, leaving chat");
                    app.should_exit = true;
                }
            }
            _ = ticker.tick() => app.logs.absorb(logs),
        }
    }

    Ok(())
}

use std::io::{self, Stdout, Write};
use std::path::Path;
use std::time::{Duration, Instant};

use crossbeam_channel::Receiver;
use crossterm::cursor::MoveToColumn;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::queue;
use crossterm::style::Print;
use crossterm::terminal::{Clear, ClearType};

use crate::app::{App, Command, PlayerEvent};
use crate::config::{self, ControlsSettings};
use crate::library::{ThumbnailState, TrackRef};
use crate::playlist::PlaybackSession;

pub const KEYS: &str = "space play/pause  n/p next/prev  x stop  h/l seek  +/- volume  [/] rate  \
s shuffle  r repeat  a/v audio/video  / search  j/k move  enter play  L list  t preview  o reload  q quit";

/// State tracked by the runtime event loop across iterations.
#[derive(Debug, Default)]
pub struct EventLoopState {
    /// Typing goes into the search query instead of triggering commands.
    pub search_mode: bool,
    pub query: String,
    /// Position of the highlighted row in the visible list.
    pub cursor: usize,
}

/// What a key press asks the loop to do.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Quit,
    Send(Command),
    ShowCursor,
    ListTracks,
    Nothing,
}

/// Translate a key into an action. Toggles and steps are computed from the
/// current session so the resulting command carries an absolute value.
pub fn map_key(
    key: KeyEvent,
    state: &mut EventLoopState,
    session: &PlaybackSession,
    visible: &[usize],
    controls: &ControlsSettings,
    folder: Option<&Path>,
) -> Action {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Action::Quit;
    }

    if state.search_mode {
        return match key.code {
            KeyCode::Esc => {
                state.search_mode = false;
                state.query.clear();
                state.cursor = 0;
                Action::Send(Command::Search(String::new()))
            }
            KeyCode::Enter => {
                state.search_mode = false;
                Action::ListTracks
            }
            KeyCode::Backspace => {
                state.query.pop();
                state.cursor = 0;
                Action::Send(Command::Search(state.query.clone()))
            }
            KeyCode::Char(c) if !c.is_control() => {
                state.query.push(c);
                state.cursor = 0;
                Action::Send(Command::Search(state.query.clone()))
            }
            _ => Action::Nothing,
        };
    }

    let highlighted = visible.get(state.cursor.min(visible.len().saturating_sub(1)));
    match key.code {
        KeyCode::Char('q') => Action::Quit,
        KeyCode::Char(' ') => Action::Send(Command::PlayPause),
        KeyCode::Char('n') => Action::Send(Command::Next),
        KeyCode::Char('p') => Action::Send(Command::Previous),
        KeyCode::Char('x') => Action::Send(Command::Stop),
        KeyCode::Char('s') => Action::Send(Command::SetShuffle(!session.shuffle)),
        KeyCode::Char('r') => Action::Send(Command::SetRepeat(!session.repeat)),
        KeyCode::Char('+') | KeyCode::Char('=') => {
            Action::Send(Command::SetVolume(session.volume + controls.volume_step))
        }
        KeyCode::Char('-') => Action::Send(Command::SetVolume(session.volume - controls.volume_step)),
        KeyCode::Char(']') => Action::Send(Command::SetRate(session.rate + controls.rate_step)),
        KeyCode::Char('[') => Action::Send(Command::SetRate(session.rate - controls.rate_step)),
        KeyCode::Char('h') | KeyCode::Left => Action::Send(Command::SkipBack),
        KeyCode::Char('l') | KeyCode::Right => Action::Send(Command::SkipForward),
        KeyCode::Char('a') => Action::Send(Command::SetAudioEnabled(!session.audio_enabled)),
        KeyCode::Char('v') => Action::Send(Command::SetVideoEnabled(!session.video_enabled)),
        KeyCode::Char('/') => {
            state.search_mode = true;
            Action::Nothing
        }
        KeyCode::Char('j') | KeyCode::Down => {
            if state.cursor + 1 < visible.len() {
                state.cursor += 1;
            }
            Action::ShowCursor
        }
        KeyCode::Char('k') | KeyCode::Up => {
            state.cursor = state.cursor.saturating_sub(1);
            Action::ShowCursor
        }
        KeyCode::Enter => match highlighted {
            Some(&i) => Action::Send(Command::SelectTrack(i)),
            None => Action::Nothing,
        },
        KeyCode::Char('t') => match highlighted {
            Some(&i) => Action::Send(Command::RegenerateThumbnail(i)),
            None => Action::Nothing,
        },
        KeyCode::Char('L') => Action::ListTracks,
        KeyCode::Char('o') => match folder {
            Some(dir) => Action::Send(Command::OpenFolder(dir.to_path_buf())),
            None => Action::Nothing,
        },
        _ => Action::Nothing,
    }
}

/// Line-oriented output for a raw-mode terminal. The time label lives on
/// the last line and is overwritten in place.
struct Screen {
    out: Stdout,
    label_shown: bool,
}

impl Screen {
    fn new(out: Stdout) -> Self {
        Self {
            out,
            label_shown: false,
        }
    }

    fn line(&mut self, text: &str) -> io::Result<()> {
        if self.label_shown {
            queue!(self.out, MoveToColumn(0), Clear(ClearType::CurrentLine))?;
            self.label_shown = false;
        }
        queue!(self.out, Print(text), Print("\r\n"))?;
        self.out.flush()
    }

    fn label(&mut self, text: &str) -> io::Result<()> {
        queue!(
            self.out,
            MoveToColumn(0),
            Clear(ClearType::CurrentLine),
            Print(text)
        )?;
        self.label_shown = true;
        self.out.flush()
    }
}

fn row(app: &App, index: usize, track: &TrackRef, highlighted: bool) -> String {
    let playing = app.navigator().current() == Some(index);
    let preview = match track.thumbnail().state() {
        ThumbnailState::Ready => " [preview]",
        ThumbnailState::Failed => " [no preview]",
        _ => "",
    };
    format!(
        "{}{} {:>4}  {}{}",
        if highlighted { '>' } else { ' ' },
        if playing { '*' } else { ' ' },
        index,
        track.title(),
        preview
    )
}

fn render(screen: &mut Screen, app: &App, event: PlayerEvent) -> io::Result<()> {
    match event {
        PlayerEvent::TimeUpdate(update) => {
            let suffix = if update.position.is_none() {
                " (scrubbing)"
            } else {
                ""
            };
            screen.label(&format!("{}{suffix}", update.label))
        }
        PlayerEvent::PlaybackError { kind, message } => {
            screen.line(&format!("error ({kind}): {message}"))
        }
        PlayerEvent::TrackChanged { index, title } => {
            screen.line(&format!("Now playing [{index}] {title}"))
        }
        PlayerEvent::ThumbnailBatchReady => {
            let (ready, failed) = app.navigator().tracks().iter().fold((0, 0), |(r, f), t| {
                match t.thumbnail().state() {
                    ThumbnailState::Ready => (r + 1, f),
                    ThumbnailState::Failed => (r, f + 1),
                    _ => (r, f),
                }
            });
            screen.line(&format!("Previews: {ready} ready, {failed} failed"))
        }
        PlayerEvent::Status(text) => screen.line(&text),
        PlayerEvent::EndOfStream | PlayerEvent::ListExhausted => Ok(()),
    }
}

fn list_tracks(screen: &mut Screen, app: &App, state: &EventLoopState) -> io::Result<()> {
    if app.navigator().visible().is_empty() {
        return screen.line("(no matching tracks)");
    }
    for (pos, (index, track)) in app.navigator().visible_tracks().enumerate() {
        screen.line(&row(app, index, track, pos == state.cursor))?;
    }
    Ok(())
}

/// Main terminal event loop. Returns `Ok(())` when the user quits.
pub fn run(
    app: &mut App,
    settings: &config::Settings,
    events: &Receiver<PlayerEvent>,
    state: &mut EventLoopState,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut screen = Screen::new(io::stdout());
    screen.line(KEYS)?;

    loop {
        app.tick(Instant::now());
        for event in events.try_iter() {
            render(&mut screen, app, event)?;
        }

        if !event::poll(Duration::from_millis(50))? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        let visible = app.navigator().visible().to_vec();
        let action = map_key(
            key,
            state,
            app.navigator().session(),
            &visible,
            &settings.controls,
            app.folder(),
        );
        match action {
            Action::Quit => break,
            Action::Send(cmd) => {
                let searching = matches!(cmd, Command::Search(_));
                app.handle(cmd, Instant::now());
                if searching {
                    let matches = app.navigator().visible().len();
                    screen.line(&format!("/{}  ({matches} match(es))", state.query))?;
                }
            }
            Action::ShowCursor => {
                if let Some((index, track)) = app.navigator().visible_tracks().nth(state.cursor) {
                    screen.line(&row(app, index, track, true))?;
                }
            }
            Action::ListTracks => list_tracks(&mut screen, app, state)?,
            Action::Nothing => {
                if state.search_mode {
                    screen.line(&format!("/{}", state.query))?;
                }
            }
        }
    }

    screen.line("")?;
    Ok(())
}

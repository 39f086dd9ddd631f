mod app;
mod enrich;
mod model;
mod msg;
mod storage;

use std::io;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tracing_subscriber::EnvFilter;

use app::App;
use enrich::EnrichClient;
use model::config::AppConfig;
use model::store::NoteStore;
use model::theme::Theme;
use msg::Msg;
use storage::{FileStore, KeyValueStore, MemoryStore};

fn main() -> Result<()> {
    // Initialize logging to file (never stdout)
    let log_dir = directories::ProjectDirs::from("", "", "inkpad")
        .map(|d| d.data_dir().to_path_buf())
        .unwrap_or_else(|| std::path::PathBuf::from("/tmp"));
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = tracing_appender::rolling::daily(&log_dir, "inkpad.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("inkpad=info"));
    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(filter)
        .init();

    tracing::info!("inkpad starting");

    let config = AppConfig::load()?;

    // Terminal setup
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run(&mut terminal, config);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(e) = result {
        eprintln!("inkpad error: {e:?}");
    }

    Ok(())
}

fn open_store(config: &AppConfig) -> NoteStore {
    let kv: Box<dyn KeyValueStore> = match FileStore::open(config.data_dir()) {
        Ok(store) => {
            tracing::info!("storing notes in {}", store.root().display());
            Box::new(store)
        }
        Err(err) => {
            tracing::warn!("cannot open data dir, notes will not persist: {err}");
            Box::new(MemoryStore::new())
        }
    };

    let default_theme = Theme::parse(&config.general.default_theme).unwrap_or_else(|| {
        tracing::warn!(
            "unknown default_theme {:?}, using dark",
            config.general.default_theme
        );
        Theme::default()
    });

    NoteStore::load(kv, default_theme)
}

fn run(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, config: AppConfig) -> Result<()> {
    let (tx, rx) = mpsc::channel::<Msg>();
    let store = open_store(&config);
    let enricher = EnrichClient::from_config(&config);
    let mut app = App::new(config, store, enricher, tx.clone());

    // Input thread: terminal events forwarded as Msg
    let tx_input = tx.clone();
    thread::spawn(move || {
        loop {
            if let Ok(event) = event::read() {
                let msg = match event {
                    Event::Key(k) => Msg::Key(k),
                    Event::Resize(w, h) => Msg::Resize(w, h),
                    _ => continue,
                };
                if tx_input.send(msg).is_err() {
                    break;
                }
            }
        }
    });

    // Tick thread expires status notifications
    let tx_tick = tx.clone();
    thread::spawn(move || {
        loop {
            thread::sleep(Duration::from_millis(250));
            if tx_tick.send(Msg::Tick).is_err() {
                break;
            }
        }
    });

    let size = terminal.size()?;
    app.update(Msg::Resize(size.width, size.height))?;
    terminal.draw(|f| app.view(f))?;

    // ── Main event loop ──
    loop {
        // Batch-drain all pending messages
        let first = rx.recv()?;
        app.update(first)?;

        while let Ok(msg) = rx.try_recv() {
            app.update(msg)?;
        }

        if app.should_quit {
            tracing::info!("inkpad exiting");
            break;
        }

        terminal.draw(|f| app.view(f))?;
    }

    Ok(())
}

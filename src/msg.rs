use crossterm::event::KeyEvent;

use crate::enrich::Enrichment;

/// All possible messages that drive state transitions.
#[derive(Debug)]
pub enum Msg {
    // -- Input events (raw)
    Key(KeyEvent),
    Resize(u16, u16),

    // -- Palette
    Command(String),

    // -- Background results
    EnrichmentReady {
        note_id: String,
        enrichment: Option<Enrichment>,
    },

    // -- System
    Tick,
    Quit,
}

//! # Title card: attribution shown around a module's content.
//!
//! The card enters when the module finishes fading in and exits when it
//! begins fading out (and again on disposal, just in case). The renderer
//! decides what "shown" looks like; this type only tracks the contract.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::library::Credit;

/// Attribution card for one module instance.
#[derive(Debug)]
pub struct TitleCard {
    credit: Credit,
    shown: AtomicBool,
}

impl TitleCard {
    /// Creates a card for the given credit.
    pub fn new(credit: Credit) -> Self {
        Self {
            credit,
            shown: AtomicBool::new(false),
        }
    }

    /// The credit this card displays.
    pub fn credit(&self) -> &Credit {
        &self.credit
    }

    /// Shows the card. Idempotent.
    pub fn enter(&self) {
        self.shown.store(true, Ordering::SeqCst);
    }

    /// Hides the card. Idempotent.
    pub fn exit(&self) {
        self.shown.store(false, Ordering::SeqCst);
    }

    /// Whether the card is currently shown.
    pub fn is_shown(&self) -> bool {
        self.shown.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enter_and_exit_toggle_visibility() {
        let card = TitleCard::new(Credit::Title {
            title: "Clock".into(),
            author: None,
        });
        assert!(!card.is_shown());
        card.enter();
        card.enter();
        assert!(card.is_shown());
        card.exit();
        assert!(!card.is_shown());
    }
}

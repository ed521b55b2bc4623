use log::warn;
use starmap_core::settings::{
    ADDRESS_HISTORY_KEY, FormSnapshot, History, SETTINGS_KEY, TEXT_HISTORY_KEY, ZIP_HISTORY_KEY,
};
use web_sys::{Document, Storage, Window};

use crate::dom;

fn local_storage(window: &Window) -> Option<Storage> {
    window.local_storage().ok().flatten()
}

fn read(window: &Window, key: &str) -> Option<String> {
    local_storage(window)?.get_item(key).ok().flatten()
}

fn write(window: &Window, key: &str, value: &str) {
    let Some(storage) = local_storage(window) else {
        return;
    };
    if storage.set_item(key, value).is_err() {
        warn!("could not persist {key}");
    }
}

pub fn save_form(window: &Window, document: &Document) {
    write(window, SETTINGS_KEY, &dom::snapshot(document).to_json());
}

/// Put the saved form values back. Returns false when nothing was saved.
pub fn restore_form(window: &Window, document: &Document) -> bool {
    let Some(json) = read(window, SETTINGS_KEY) else {
        return false;
    };
    dom::restore(document, &FormSnapshot::from_json(&json));
    true
}

/// Which MRU list an entry belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HistoryKind {
    Text,
    Zip,
    Address,
}

impl HistoryKind {
    fn key(self) -> &'static str {
        match self {
            HistoryKind::Text => TEXT_HISTORY_KEY,
            HistoryKind::Zip => ZIP_HISTORY_KEY,
            HistoryKind::Address => ADDRESS_HISTORY_KEY,
        }
    }

    fn datalist(self) -> &'static str {
        match self {
            HistoryKind::Text => dom::TEXT_HISTORY_LIST,
            HistoryKind::Zip => dom::ZIP_HISTORY_LIST,
            HistoryKind::Address => dom::ADDRESS_HISTORY_LIST,
        }
    }
}

pub fn load_history(window: &Window, kind: HistoryKind) -> History {
    read(window, kind.key())
        .map(|j| History::from_json(&j))
        .unwrap_or_default()
}

/// Record entries and refresh the matching suggestion list.
pub fn remember<'a>(
    window: &Window,
    document: &Document,
    kind: HistoryKind,
    entries: impl IntoIterator<Item = &'a str>,
) {
    let mut h = load_history(window, kind);
    let mut changed = false;
    for e in entries {
        changed |= h.push(e);
    }
    if changed {
        write(window, kind.key(), &h.to_json());
    }
    dom::fill_datalist(document, kind.datalist(), h.entries());
}

pub fn show_histories(window: &Window, document: &Document) {
    for kind in [HistoryKind::Text, HistoryKind::Zip, HistoryKind::Address] {
        let h = load_history(window, kind);
        dom::fill_datalist(document, kind.datalist(), h.entries());
    }
}

use std::cell::RefCell;
use std::rc::Rc;

use starmap_core::dimensions::DimensionController;
use starmap_core::store::FormStore;
use web_sys::{CanvasRenderingContext2d, Document, HtmlCanvasElement, Window};

use crate::dom;
use crate::maps::MapLocationPicker;

/// User actions that start a fetch. Each may only run once at a time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Trigger {
    Generate,
    Download,
}

impl Trigger {
    pub fn button_id(self) -> &'static str {
        match self {
            Trigger::Generate => dom::GENERATE_BTN,
            Trigger::Download => dom::DOWNLOAD_BTN,
        }
    }

    pub fn busy_message(self) -> &'static str {
        match self {
            Trigger::Generate => "A preview is already being generated.",
            Trigger::Download => "A download is already in progress.",
        }
    }
}

/// Global application state stored behind an `Rc<RefCell<_>>` so it can be
/// shared across the WASM callbacks.
pub struct State {
    pub window: Window,
    pub document: Document,
    /// Visible preview canvas; downloads never draw here.
    pub canvas: HtmlCanvasElement,
    pub ctx: CanvasRenderingContext2d,
    pub store: FormStore,
    pub dimensions: DimensionController,
    pub map: Option<MapLocationPicker>,
    pub proxy_url: String,
    /// Set once a preview has rendered successfully.
    pub preview_ok: bool,
    pub generating: bool,
    pub downloading: bool,
}

impl State {
    fn flag(&mut self, trigger: Trigger) -> &mut bool {
        match trigger {
            Trigger::Generate => &mut self.generating,
            Trigger::Download => &mut self.downloading,
        }
    }
}

/// Held for the duration of a render or download. Dropping it re-enables the
/// button and hides the loading indicator, whatever the outcome.
pub struct InFlight {
    state: Rc<RefCell<State>>,
    trigger: Trigger,
}

impl InFlight {
    pub fn begin(state: &Rc<RefCell<State>>, trigger: Trigger) -> Option<Self> {
        let mut s = state.borrow_mut();
        let flag = s.flag(trigger);
        if *flag {
            return None;
        }
        *flag = true;
        dom::set_disabled(&s.document, trigger.button_id(), true);
        dom::set_visible(&s.document, dom::LOADER, true);
        drop(s);
        Some(Self {
            state: state.clone(),
            trigger,
        })
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        let Ok(mut s) = self.state.try_borrow_mut() else {
            return;
        };
        *s.flag(self.trigger) = false;
        dom::set_disabled(&s.document, self.trigger.button_id(), false);
        if !s.generating && !s.downloading {
            dom::set_visible(&s.document, dom::LOADER, false);
        }
    }
}

/// Thread local storage for the single runtime state instance.
thread_local! {
    pub static STATE: RefCell<Option<Rc<RefCell<State>>>> = const { RefCell::new(None) };
}

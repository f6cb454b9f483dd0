//! Log page session
//!
//! An open log page holds exactly one notification listener. The listener
//! only keeps a weak handle to the controller, and the registration is
//! released when the page is closed or dropped.

use std::cell::{Ref, RefCell, RefMut};
use std::rc::{Rc, Weak};

use log::{debug, warn};

use fl_core::notifier::{ListenerId, LogEvent, LogEventKinds, NotificationChannel};
use fl_core::types::TabId;

use crate::collab::LogSource;
use crate::labels::Labels;
use crate::log_view::{LogRenderer, LogViewController};

pub struct LogPage<R: LogRenderer + 'static> {
    controller: Rc<RefCell<LogViewController<R>>>,
    channel: Rc<dyn NotificationChannel>,
    source: Rc<dyn LogSource>,
    listener: Option<ListenerId>,
}

impl<R: LogRenderer + 'static> LogPage<R> {
    /// Open the page: subscribe to every notification kind, then load the
    /// tabs the engine already knows and select `initial_tab`.
    pub fn open(
        channel: Rc<dyn NotificationChannel>,
        source: Rc<dyn LogSource>,
        renderer: R,
        labels: Labels,
        initial_tab: Option<TabId>,
    ) -> Self {
        let controller = Rc::new(RefCell::new(LogViewController::new(renderer, labels)));

        source.on_log_page_opened();

        let weak: Weak<RefCell<LogViewController<R>>> = Rc::downgrade(&controller);
        let listener = channel.add_listener(
            LogEventKinds::ALL,
            Box::new(move |event: &LogEvent| {
                let Some(controller) = weak.upgrade() else {
                    return;
                };
                match controller.try_borrow_mut() {
                    Ok(mut controller) => controller.handle(event),
                    Err(_) => warn!("log view busy, dropping {:?}", event.kind()),
                };
            }),
        );

        let tabs = source.open_tabs();
        controller.borrow_mut().synchronize(tabs, initial_tab);

        Self {
            controller,
            channel,
            source,
            listener: Some(listener),
        }
    }

    pub fn controller(&self) -> Ref<'_, LogViewController<R>> {
        self.controller.borrow()
    }

    pub fn controller_mut(&self) -> RefMut<'_, LogViewController<R>> {
        self.controller.borrow_mut()
    }

    /// Reload the selected tab in the browser.
    pub fn reload_selected_tab(&self) -> bool {
        let Some(tab_id) = self.selected_tab() else {
            return false;
        };
        self.source.reload_tab(tab_id);
        true
    }

    /// Ask the engine to clear the selected tab's events. Rows go away when
    /// the resulting reset notification arrives.
    pub fn clear_selected_tab(&self) -> bool {
        let Some(tab_id) = self.selected_tab() else {
            return false;
        };
        self.source.clear_events(tab_id);
        true
    }

    pub fn is_open(&self) -> bool {
        self.listener.is_some()
    }

    /// Release the subscription. Safe to call more than once.
    pub fn close(&mut self) {
        let Some(listener) = self.listener.take() else {
            return;
        };
        if !self.channel.remove_listener(listener) {
            debug!("listener {:?} already gone", listener);
        }
        if let Ok(mut controller) = self.controller.try_borrow_mut() {
            controller.close();
        }
        self.source.on_log_page_closed();
    }

    fn selected_tab(&self) -> Option<TabId> {
        self.controller.borrow().selected_tab()
    }
}

impl<R: LogRenderer + 'static> Drop for LogPage<R> {
    fn drop(&mut self) {
        self.close();
    }
}

use gtk4 as gtk;
use gtk4::prelude::*;
use std::cell::RefCell;
use std::rc::Rc;

use chat_gtk::state::notification::{Banner, NOTIFICATION_TIMEOUT};

pub struct BannerView {
    revealer: gtk::Revealer,
    label: gtk::Label,
    state: RefCell<Banner>,
}

impl BannerView {
    pub fn new() -> Rc<Self> {
        let revealer = gtk::Revealer::new();
        revealer.set_transition_type(gtk::RevealerTransitionType::SlideDown);

        let row = gtk::Box::new(gtk::Orientation::Horizontal, 6);
        row.add_css_class("osd");
        row.set_margin_top(6);
        row.set_margin_bottom(6);
        row.set_margin_start(12);
        row.set_margin_end(12);

        let label = gtk::Label::new(None);
        label.set_hexpand(true);
        label.set_xalign(0.0);
        label.set_wrap(true);
        row.append(&label);

        let close = gtk::Button::from_icon_name("window-close-symbolic");
        close.add_css_class("flat");
        close.set_tooltip_text(Some("Dismiss"));
        row.append(&close);
        revealer.set_child(Some(&row));

        let this = Rc::new(Self { revealer, label, state: RefCell::new(Banner::default()) });
        {
            let weak = Rc::downgrade(&this);
            close.connect_clicked(move |_| {
                if let Some(this) = weak.upgrade() {
                    this.dismiss();
                }
            });
        }
        this
    }

    pub fn widget(&self) -> gtk::Widget {
        self.revealer.clone().upcast()
    }

    pub fn show(self: &Rc<Self>, message: &str) {
        let ticket = self.state.borrow_mut().show(message);
        self.render();
        let weak = Rc::downgrade(self);
        glib::timeout_add_local_once(NOTIFICATION_TIMEOUT, move || {
            if let Some(this) = weak.upgrade() {
                let expired = this.state.borrow_mut().expire(ticket);
                if expired {
                    this.render();
                }
            }
        });
    }

    pub fn dismiss(&self) {
        self.state.borrow_mut().dismiss();
        self.render();
    }

    fn render(&self) {
        let message = self.state.borrow().message().map(str::to_owned);
        match message {
            Some(text) => {
                self.label.set_label(&text);
                self.revealer.set_reveal_child(true);
            }
            None => self.revealer.set_reveal_child(false),
        }
    }
}

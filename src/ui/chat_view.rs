use gtk4::prelude::*;
use gtk4 as gtk;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use chat_gtk::api::client::ApiClient;
use chat_gtk::api::models::Message;
use chat_gtk::push::{Listener, PushChannel, PushEvent};
use chat_gtk::state::thread::{MessageView, Side, ThreadBody, ThreadState, EMPTY_THREAD};
use chat_gtk::utils::RUNTIME;

use crate::ui::banner::BannerView;
use crate::ui::{clear_box, glib_channel, run_async_to_main};

pub struct ChatView {
    root: gtk::Box,
    offline: gtk::Label,
    status: gtk::Label,
    scroller: gtk::ScrolledWindow,
    messages_box: gtk::Box,
    entry: gtk::Entry,
    auto_btn: gtk::Button,
    api: Arc<ApiClient>,
    push: Rc<PushChannel>,
    banner: Rc<BannerView>,
    state: RefCell<ThreadState>,
    listener: RefCell<Listener>,
    on_changed: RefCell<Option<Box<dyn Fn()>>>,
}

impl ChatView {
    pub fn new(api: Arc<ApiClient>, push: Rc<PushChannel>, banner: Rc<BannerView>) -> Rc<Self> {
        let root = gtk::Box::new(gtk::Orientation::Vertical, 6);
        root.set_margin_top(8);
        root.set_margin_bottom(8);
        root.set_margin_start(8);
        root.set_margin_end(8);

        let toolbar = gtk::Box::new(gtk::Orientation::Horizontal, 6);
        let offline = gtk::Label::new(None);
        offline.add_css_class("warning");
        offline.set_halign(gtk::Align::Start);
        offline.set_hexpand(true);
        offline.set_wrap(true);
        toolbar.append(&offline);
        let auto_btn = gtk::Button::with_label("Auto reply: off");
        auto_btn.add_css_class("flat");
        toolbar.append(&auto_btn);
        root.append(&toolbar);

        let status = gtk::Label::new(None);
        status.add_css_class("dim-label");
        status.set_vexpand(true);
        root.append(&status);

        let scroller = gtk::ScrolledWindow::builder()
            .vexpand(true)
            .hexpand(true)
            .build();
        let messages_box = gtk::Box::new(gtk::Orientation::Vertical, 6);
        scroller.set_child(Some(&messages_box));
        root.append(&scroller);

        // Input row
        let input_row = gtk::Box::new(gtk::Orientation::Horizontal, 6);
        let entry = gtk::Entry::new();
        entry.set_hexpand(true);
        entry.set_placeholder_text(Some("Type a message…"));
        let send_btn = gtk::Button::with_label("Send");
        send_btn.add_css_class("suggested-action");
        input_row.append(&entry);
        input_row.append(&send_btn);
        root.append(&input_row);

        let this = Rc::new(Self {
            root,
            offline,
            status,
            scroller,
            messages_box,
            entry,
            auto_btn,
            api,
            push,
            banner,
            state: RefCell::new(ThreadState::default()),
            listener: RefCell::new(Listener::default()),
            on_changed: RefCell::new(None),
        });

        {
            let this2 = this.clone();
            this.entry.connect_changed(move |e| this2.state.borrow_mut().set_draft(e.text().as_str()));
        }
        {
            let send: Rc<dyn Fn()> = {
                let this2 = this.clone();
                Rc::new(move || this2.send())
            };
            {
                let send = send.clone();
                send_btn.connect_clicked(move |_| (send)());
            }
            {
                let send = send.clone();
                this.entry.connect_activate(move |_| (send)());
            }
        }
        {
            let this2 = this.clone();
            this.auto_btn.connect_clicked(move |_| this2.toggle_auto_reply());
        }
        this.render();
        this
    }

    pub fn widget(&self) -> gtk::Widget {
        self.root.clone().upcast()
    }

    pub fn connect_changed<F: Fn() + 'static>(&self, f: F) {
        *self.on_changed.borrow_mut() = Some(Box::new(f));
    }

    pub fn messages(&self) -> Vec<Message> {
        self.state.borrow().messages().to_vec()
    }

    fn notify_changed(&self) {
        if let Some(cb) = self.on_changed.borrow().as_ref() {
            cb();
        }
    }

    /// Show the thread for `chat_id`, replacing whatever was open and moving
    /// the push subscription over to it.
    pub fn open(self: &Rc<Self>, chat_id: Option<&str>) {
        self.unsubscribe();
        let to_fetch = self.state.borrow_mut().open(chat_id);
        self.entry.set_text("");
        if let Some(chat_id) = to_fetch {
            self.subscribe();
            self.fetch(chat_id);
        }
        self.render();
    }

    /// Leave the thread. Late responses for it are dropped by the state.
    pub fn close(&self) {
        self.unsubscribe();
        let _ = self.state.borrow_mut().open(None);
    }

    fn fetch(self: &Rc<Self>, chat_id: String) {
        let api = self.api.clone();
        let rx = run_async_to_main(async move {
            let res = api.messages(&chat_id).await;
            (chat_id, res)
        });
        let this = self.clone();
        rx.attach(None, move |(chat_id, res)| {
            let applied = this.state.borrow_mut().finish_fetch(&chat_id, res);
            if applied {
                this.render();
                this.notify_changed();
            }
            glib::ControlFlow::Continue
        });
    }

    fn subscribe(self: &Rc<Self>) {
        let (tx, rx) = glib_channel::<PushEvent>();
        self.listener
            .borrow_mut()
            .follow(RUNTIME.handle(), &self.push, move |event| tx.send(event).is_ok());
        self.state.borrow_mut().set_live(self.push.is_connected());

        let this = self.clone();
        rx.attach(None, move |event| {
            this.on_push(&event);
            glib::ControlFlow::Continue
        });
    }

    fn unsubscribe(&self) {
        self.listener.borrow_mut().stop();
    }

    fn on_push(self: &Rc<Self>, event: &PushEvent) {
        let outcome = self.state.borrow_mut().on_push_event(event);
        self.render();
        if let Some(text) = outcome.notification {
            self.banner.show(&text);
        }
    }

    fn send(self: &Rc<Self>) {
        let Some(outgoing) = self.state.borrow().begin_send() else {
            return;
        };
        let api = self.api.clone();
        let rx = run_async_to_main(async move {
            let res = api.send_message(&outgoing).await;
            (outgoing.chat_id, res)
        });
        let this = self.clone();
        rx.attach(None, move |(chat_id, res)| {
            let refetch = this.state.borrow_mut().finish_send(&chat_id, res);
            if refetch {
                this.entry.set_text("");
                this.fetch(chat_id);
            } else {
                this.render();
            }
            glib::ControlFlow::Continue
        });
    }

    fn delete(self: &Rc<Self>, message_id: String) {
        let chat_id = {
            let state = self.state.borrow();
            if !state.can_delete(&message_id) {
                return;
            }
            match state.chat_id() {
                Some(id) => id.to_string(),
                None => return,
            }
        };
        let api = self.api.clone();
        let rx = run_async_to_main(async move {
            let res = api.delete_message(&message_id).await;
            (message_id, res)
        });
        let this = self.clone();
        rx.attach(None, move |(message_id, res)| {
            this.state.borrow_mut().finish_delete(&chat_id, &message_id, res);
            this.render();
            glib::ControlFlow::Continue
        });
    }

    fn toggle_auto_reply(self: &Rc<Self>) {
        let requested = self.state.borrow().requested_toggle();
        let api = self.api.clone();
        let rx = run_async_to_main(async move { api.toggle_auto_message(requested).await });
        let this = self.clone();
        rx.attach(None, move |res| {
            this.state.borrow_mut().finish_toggle(requested, res);
            this.render();
            glib::ControlFlow::Continue
        });
    }

    fn render(self: &Rc<Self>) {
        clear_box(&self.messages_box);

        let (views, auto_reply) = {
            let state = self.state.borrow();
            let message = match state.body() {
                ThreadBody::Loading => Some("Loading messages…".to_string()),
                ThreadBody::Error(err) => Some(err.to_string()),
                ThreadBody::Empty => Some(EMPTY_THREAD.to_string()),
                ThreadBody::Messages(_) => None,
            };
            match &message {
                Some(text) => self.status.set_label(text),
                None => self.status.set_label(""),
            }
            self.status.set_visible(message.is_some());
            self.scroller.set_visible(message.is_none());
            let notice = state.connection_notice();
            self.offline.set_label(notice.unwrap_or_default());
            self.offline.set_visible(notice.is_some());
            (state.views(), state.auto_reply())
        };

        self.auto_btn
            .set_label(if auto_reply { "Auto reply: on" } else { "Auto reply: off" });

        for view in views {
            let row = self.message_row(view);
            self.messages_box.append(&row);
        }
        let adj = self.scroller.vadjustment();
        adj.set_value(adj.upper());
    }

    fn message_row(self: &Rc<Self>, view: MessageView) -> gtk::Widget {
        let row = gtk::Box::new(gtk::Orientation::Horizontal, 6);
        let align = match view.side {
            Side::Start => gtk::Align::Start,
            Side::End => gtk::Align::End,
        };
        row.set_halign(align);

        let avatar = gtk::Label::new(Some(&view.avatar));
        avatar.add_css_class("dim-label");
        avatar.set_valign(gtk::Align::Start);

        let bubble = gtk::Box::new(gtk::Orientation::Vertical, 2);
        bubble.add_css_class("card");
        let text = gtk::Label::new(Some(&view.text));
        text.set_wrap(true);
        text.set_xalign(0.0);
        text.set_selectable(true);
        text.set_margin_top(6);
        text.set_margin_start(8);
        text.set_margin_end(8);
        bubble.append(&text);
        let time = gtk::Label::new(Some(&view.time));
        time.add_css_class("caption");
        time.add_css_class("dim-label");
        time.set_halign(align);
        time.set_margin_bottom(4);
        time.set_margin_start(8);
        time.set_margin_end(8);
        bubble.append(&time);

        match view.side {
            Side::Start => {
                row.append(&avatar);
                row.append(&bubble);
            }
            Side::End => {
                if view.deletable {
                    let delete_btn = gtk::Button::from_icon_name("user-trash-symbolic");
                    delete_btn.add_css_class("flat");
                    delete_btn.set_valign(gtk::Align::Center);
                    delete_btn.set_tooltip_text(Some("Delete message"));
                    let this = self.clone();
                    let message_id = view.id.clone();
                    delete_btn.connect_clicked(move |_| this.delete(message_id.clone()));
                    row.append(&delete_btn);
                }
                row.append(&bubble);
                row.append(&avatar);
            }
        }
        row.upcast()
    }
}

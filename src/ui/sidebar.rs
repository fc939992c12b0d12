use gtk4::prelude::*;
use gtk4 as gtk;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use chat_gtk::api::client::ApiClient;
use chat_gtk::api::models::{ChatDraft, ChatSummary};
use chat_gtk::state::chat_list::{ChatChange, ChatListState, EditDraft, ListBody, RowView, EMPTY_LIST};
use chat_gtk::state::dialogs::DELETE_CHAT_PROMPT;
use chat_gtk::state::search::{Debouncer, SearchBox, SEARCH_DEBOUNCE};
use chat_gtk::utils::RUNTIME;

use crate::ui::{dialogs, glib_channel, run_async_to_main};

/// Conversation list with search, inline rename, delete and create.
pub struct Sidebar {
    root: gtk::Box,
    list: gtk::ListBox,
    status: gtk::Label,
    parent: gtk::Window,
    api: Arc<ApiClient>,
    state: Rc<RefCell<ChatListState>>,
    search: RefCell<SearchBox>,
    debouncer: RefCell<Option<Debouncer<String>>>,
    row_ids: RefCell<Vec<String>>,
    on_select: RefCell<Option<Box<dyn Fn(String)>>>,
    on_changed: RefCell<Option<Box<dyn Fn()>>>,
}

impl Sidebar {
    pub fn new(api: Arc<ApiClient>, parent: gtk::Window) -> Rc<Self> {
        let root = gtk::Box::new(gtk::Orientation::Vertical, 6);
        root.set_margin_top(8);
        root.set_margin_bottom(8);
        root.set_margin_start(8);
        root.set_margin_end(8);
        root.set_width_request(300);

        let heading = gtk::Box::new(gtk::Orientation::Horizontal, 6);
        let title = gtk::Label::new(Some("Conversations"));
        title.add_css_class("heading");
        title.set_halign(gtk::Align::Start);
        title.set_hexpand(true);
        heading.append(&title);
        let new_chat_btn = gtk::Button::with_label("New Chat");
        new_chat_btn.add_css_class("suggested-action");
        heading.append(&new_chat_btn);
        root.append(&heading);

        let search_entry = gtk::SearchEntry::builder()
            .placeholder_text("Search chats...")
            .build();
        root.append(&search_entry);

        let status = gtk::Label::new(None);
        status.add_css_class("dim-label");
        status.set_halign(gtk::Align::Start);
        root.append(&status);

        let list = gtk::ListBox::new();
        list.add_css_class("navigation-sidebar");
        let scroller = gtk::ScrolledWindow::builder()
            .vexpand(true)
            .hscrollbar_policy(gtk::PolicyType::Never)
            .child(&list)
            .build();
        root.append(&scroller);

        let this = Rc::new(Self {
            root,
            list,
            status,
            parent,
            api,
            state: Rc::new(RefCell::new(ChatListState::default())),
            search: RefCell::new(SearchBox::default()),
            debouncer: RefCell::new(None),
            row_ids: RefCell::new(Vec::new()),
            on_select: RefCell::new(None),
            on_changed: RefCell::new(None),
        });

        {
            let this2 = this.clone();
            this.list.connect_row_activated(move |_, row| {
                let id = usize::try_from(row.index())
                    .ok()
                    .and_then(|idx| this2.row_ids.borrow().get(idx).cloned());
                if let Some(id) = id {
                    if let Some(cb) = this2.on_select.borrow().as_ref() {
                        cb(id);
                    }
                }
            });
        }
        {
            let this2 = this.clone();
            new_chat_btn.connect_clicked(move |_| this2.open_create());
        }
        this.wire_search(&search_entry);
        this
    }

    pub fn widget(&self) -> gtk::Widget {
        self.root.clone().upcast()
    }

    pub fn connect_select<F: Fn(String) + 'static>(&self, f: F) {
        *self.on_select.borrow_mut() = Some(Box::new(f));
    }

    pub fn connect_changed<F: Fn() + 'static>(&self, f: F) {
        *self.on_changed.borrow_mut() = Some(Box::new(f));
    }

    pub fn chats(&self) -> Vec<ChatSummary> {
        self.state.borrow().chats().to_vec()
    }

    fn notify_changed(&self) {
        if let Some(cb) = self.on_changed.borrow().as_ref() {
            cb();
        }
    }

    fn wire_search(self: &Rc<Self>, entry: &gtk::SearchEntry) {
        let (tx, rx) = glib_channel::<String>();
        let debouncer = Debouncer::spawn_on(RUNTIME.handle(), SEARCH_DEBOUNCE, move |query| {
            let _ = tx.send(query);
        });
        *self.debouncer.borrow_mut() = Some(debouncer);

        let this = self.clone();
        rx.attach(None, move |query| {
            this.run_search(&query);
            glib::ControlFlow::Continue
        });

        let this = self.clone();
        entry.connect_changed(move |e| {
            let text = e.text().to_string();
            this.search.borrow_mut().set_query(text.clone());
            if let Some(debouncer) = this.debouncer.borrow().as_ref() {
                debouncer.push(text);
            }
        });
    }

    fn run_search(self: &Rc<Self>, settled: &str) {
        let Some(request) = self.search.borrow_mut().settle(settled) else {
            return;
        };
        let ticket = self.state.borrow_mut().begin_search();
        let api = self.api.clone();
        let rx = run_async_to_main(async move { request.run(&api).await });
        let this = self.clone();
        rx.attach(None, move |res| {
            if this.state.borrow_mut().apply_search_results(ticket, res) {
                this.render();
                this.notify_changed();
            }
            glib::ControlFlow::Continue
        });
    }

    pub fn refresh(self: &Rc<Self>) {
        let ticket = self.state.borrow_mut().begin_fetch();
        self.render();
        let api = self.api.clone();
        let rx = run_async_to_main(async move { api.chats().await });
        let this = self.clone();
        rx.attach(None, move |res| {
            if this.state.borrow_mut().finish_fetch(ticket, res) {
                this.render();
                this.notify_changed();
            }
            glib::ControlFlow::Continue
        });
    }

    fn run_change(self: &Rc<Self>, change: ChatChange) {
        let kind = change.kind();
        let api = self.api.clone();
        let rx = run_async_to_main(async move { change.apply(&api).await });
        let this = self.clone();
        rx.attach(None, move |res| {
            let refetch = this.state.borrow_mut().finish_mutation(kind, res);
            if refetch {
                this.refresh();
            } else {
                this.render();
            }
            glib::ControlFlow::Continue
        });
    }

    fn open_create(self: &Rc<Self>) {
        if self.state.borrow().create.is_open() {
            return;
        }
        let this = self.clone();
        dialogs::create_chat(&self.parent, self.state.clone(), move |draft: ChatDraft| {
            this.run_change(ChatChange::Create(draft));
        });
    }

    fn ask_delete(self: &Rc<Self>, chat_id: &str) {
        self.state.borrow_mut().request_delete(chat_id);
        let this = self.clone();
        dialogs::confirm(&self.parent, DELETE_CHAT_PROMPT, move |confirmed| {
            if !confirmed {
                this.state.borrow_mut().cancel_delete();
                return;
            }
            let target = this.state.borrow_mut().confirm_delete();
            if let Some(chat_id) = target {
                this.run_change(ChatChange::Delete(chat_id));
            }
        });
    }

    fn render(self: &Rc<Self>) {
        while let Some(child) = self.list.first_child() {
            self.list.remove(&child);
        }
        self.row_ids.borrow_mut().clear();

        let (rows, editing) = {
            let state = self.state.borrow();
            let message = match state.body() {
                ListBody::Loading => Some("Loading chats…".to_string()),
                ListBody::Error(err) => Some(err.to_string()),
                ListBody::Empty => Some(EMPTY_LIST.to_string()),
                ListBody::Rows(_) => None,
            };
            match message {
                Some(text) => {
                    self.status.set_label(&text);
                    self.status.set_visible(true);
                    return;
                }
                None => self.status.set_visible(false),
            }
            (state.rows(), state.editing().cloned())
        };

        for view in rows {
            let row = gtk::ListBoxRow::new();
            let child = match editing.as_ref().filter(|e| e.chat_id == view.chat_id) {
                Some(edit) => self.edit_row(edit),
                None => self.view_row(&view),
            };
            row.set_child(Some(&child));
            self.list.append(&row);
            self.row_ids.borrow_mut().push(view.chat_id);
        }
    }

    fn view_row(self: &Rc<Self>, view: &RowView) -> gtk::Widget {
        let row = gtk::Box::new(gtk::Orientation::Horizontal, 6);
        row.set_margin_top(8);
        row.set_margin_bottom(8);
        row.set_margin_start(8);
        row.set_margin_end(8);

        let text = gtk::Box::new(gtk::Orientation::Vertical, 2);
        text.set_hexpand(true);
        let name = gtk::Label::new(Some(&view.title));
        name.set_halign(gtk::Align::Start);
        name.set_tooltip_text(Some(&view.link));
        text.append(&name);
        if let Some(preview) = &view.preview {
            let preview = gtk::Label::new(Some(preview));
            preview.add_css_class("dim-label");
            preview.set_halign(gtk::Align::Start);
            preview.set_ellipsize(gtk::pango::EllipsizeMode::End);
            text.append(&preview);
        }
        row.append(&text);

        if let Some(time) = &view.time {
            let time = gtk::Label::new(Some(time));
            time.add_css_class("caption");
            row.append(&time);
        }

        let edit_btn = gtk::Button::from_icon_name("document-edit-symbolic");
        edit_btn.add_css_class("flat");
        edit_btn.set_tooltip_text(Some("Edit"));
        {
            let this = self.clone();
            let chat_id = view.chat_id.clone();
            edit_btn.connect_clicked(move |_| {
                let started = this.state.borrow_mut().start_edit(&chat_id);
                if started {
                    this.render();
                }
            });
        }
        row.append(&edit_btn);

        let delete_btn = gtk::Button::from_icon_name("user-trash-symbolic");
        delete_btn.add_css_class("flat");
        delete_btn.set_tooltip_text(Some("Delete"));
        {
            let this = self.clone();
            let chat_id = view.chat_id.clone();
            delete_btn.connect_clicked(move |_| this.ask_delete(&chat_id));
        }
        row.append(&delete_btn);

        row.upcast()
    }

    fn edit_row(self: &Rc<Self>, edit: &EditDraft) -> gtk::Widget {
        let row = gtk::Box::new(gtk::Orientation::Vertical, 6);
        row.set_margin_top(8);
        row.set_margin_bottom(8);
        row.set_margin_start(8);
        row.set_margin_end(8);

        let first = gtk::Entry::new();
        first.set_text(&edit.first_name);
        first.set_placeholder_text(Some("First Name"));
        {
            let this = self.clone();
            first.connect_changed(move |e| this.state.borrow_mut().set_edit_first_name(e.text().as_str()));
        }
        row.append(&first);

        let last = gtk::Entry::new();
        last.set_text(&edit.last_name);
        last.set_placeholder_text(Some("Last Name"));
        {
            let this = self.clone();
            last.connect_changed(move |e| this.state.borrow_mut().set_edit_last_name(e.text().as_str()));
        }
        row.append(&last);

        let buttons = gtk::Box::new(gtk::Orientation::Horizontal, 6);
        buttons.set_halign(gtk::Align::End);
        let cancel_btn = gtk::Button::with_label("Cancel");
        {
            let this = self.clone();
            cancel_btn.connect_clicked(move |_| {
                this.state.borrow_mut().cancel_edit();
                this.render();
            });
        }
        buttons.append(&cancel_btn);
        let save_btn = gtk::Button::with_label("Save");
        save_btn.add_css_class("suggested-action");
        {
            let this = self.clone();
            save_btn.connect_clicked(move |_| {
                let change = this.state.borrow().pending_update();
                if let Some(change) = change {
                    this.run_change(change);
                }
            });
        }
        buttons.append(&save_btn);
        row.append(&buttons);

        row.upcast()
    }
}

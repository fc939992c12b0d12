use gtk4 as gtk;
use gtk4::prelude::*;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use chat_gtk::api::models::ChatDraft;
use chat_gtk::state::chat_list::ChatListState;

fn padded_box() -> gtk::Box {
    let content = gtk::Box::new(gtk::Orientation::Vertical, 12);
    content.set_margin_top(12);
    content.set_margin_bottom(12);
    content.set_margin_start(12);
    content.set_margin_end(12);
    content
}

/// Modal yes/no question. `on_answer` gets `true` only for Confirm; closing
/// the window counts as Cancel.
pub fn confirm<F>(parent: &gtk::Window, message: &str, on_answer: F)
where
    F: Fn(bool) + 'static,
{
    let dialog = gtk::Dialog::builder()
        .title("Confirm")
        .transient_for(parent)
        .modal(true)
        .build();

    let content = padded_box();
    let label = gtk::Label::new(Some(message));
    label.set_wrap(true);
    content.append(&label);
    dialog.content_area().append(&content);

    let _ = dialog.add_button("Cancel", gtk::ResponseType::Cancel);
    let ok_btn = dialog.add_button("Confirm", gtk::ResponseType::Accept);
    ok_btn.add_css_class("destructive-action");
    dialog.set_default_response(gtk::ResponseType::Cancel);

    // closing re-emits a delete-event response; answer once
    let answered = Cell::new(false);
    dialog.connect_response(move |dlg, resp| {
        if answered.replace(true) {
            return;
        }
        on_answer(resp == gtk::ResponseType::Accept);
        dlg.close();
    });
    dialog.present();
}

/// "Create New Chat" form. The draft fields and validation message live in
/// the chat list state; `on_create` fires only with a valid draft.
pub fn create_chat<F>(parent: &gtk::Window, state: Rc<RefCell<ChatListState>>, on_create: F)
where
    F: Fn(ChatDraft) + 'static,
{
    state.borrow_mut().create.open();

    let dialog = gtk::Dialog::builder()
        .title("Create New Chat")
        .transient_for(parent)
        .modal(true)
        .build();

    let content = padded_box();
    let error = gtk::Label::new(None);
    error.add_css_class("error");
    error.set_halign(gtk::Align::Start);
    error.set_visible(false);
    content.append(&error);

    let first = gtk::Entry::new();
    first.set_placeholder_text(Some("First Name"));
    first.set_hexpand(true);
    content.append(&first);

    let last = gtk::Entry::new();
    last.set_placeholder_text(Some("Last Name"));
    last.set_hexpand(true);
    content.append(&last);
    dialog.content_area().append(&content);

    let _ = dialog.add_button("Cancel", gtk::ResponseType::Cancel);
    let ok_btn = dialog.add_button("Create", gtk::ResponseType::Ok);
    ok_btn.add_css_class("suggested-action");
    dialog.set_default_response(gtk::ResponseType::Ok);

    let finished = Cell::new(false);
    dialog.connect_response(move |dlg, resp| {
        if finished.get() {
            return;
        }
        if resp != gtk::ResponseType::Ok {
            finished.set(true);
            state.borrow_mut().create.close();
            dlg.close();
            return;
        }

        let submitted = {
            let mut st = state.borrow_mut();
            st.create.first_name = first.text().to_string();
            st.create.last_name = last.text().to_string();
            st.create.submit()
        };
        match submitted {
            Some(draft) => {
                finished.set(true);
                on_create(draft);
                dlg.close();
            }
            None => {
                let st = state.borrow();
                error.set_label(st.create.error().unwrap_or_default());
                error.set_visible(true);
            }
        }
    });
    dialog.present();
}

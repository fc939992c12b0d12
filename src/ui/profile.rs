use adw::prelude::*;
use gtk4 as gtk;

use chat_gtk::app::AppConfig;
use chat_gtk::utils::normalize_url;

/// Connection settings page shown on `/profile`. Edits what the config file
/// holds; environment overrides stay out of it.
pub fn profile_page() -> gtk::Widget {
    let config = AppConfig::stored();
    let toast_overlay = adw::ToastOverlay::new();

    // Root container
    let root = gtk::Box::new(gtk::Orientation::Vertical, 12);
    root.set_margin_top(24);
    root.set_margin_bottom(24);
    root.set_margin_start(24);
    root.set_margin_end(24);
    root.set_valign(gtk::Align::Start);

    let title = gtk::Label::new(Some("Connection"));
    title.add_css_class("title-2");
    title.set_halign(gtk::Align::Start);
    root.append(&title);

    let api_entry = gtk::Entry::new();
    api_entry.set_placeholder_text(Some("API URL (e.g. http://localhost:5000)"));
    api_entry.set_text(&config.api_url);
    api_entry.set_hexpand(true);

    let push_entry = gtk::Entry::new();
    push_entry.set_placeholder_text(Some("Push URL"));
    push_entry.set_text(&config.push_url);
    push_entry.set_hexpand(true);

    let form = gtk::Box::new(gtk::Orientation::Vertical, 8);
    form.append(&api_entry);
    form.append(&push_entry);
    root.append(&form);

    // Status label (small, muted)
    let status = gtk::Label::new(None);
    status.add_css_class("dim-label");
    status.set_halign(gtk::Align::Start);
    root.append(&status);

    let save_btn = gtk::Button::with_label("Save");
    save_btn.add_css_class("suggested-action");
    save_btn.set_halign(gtk::Align::End);
    root.append(&save_btn);

    toast_overlay.set_child(Some(&root));

    let on_save = {
        let overlay = toast_overlay.clone();
        let api_entry = api_entry.clone();
        let push_entry = push_entry.clone();
        let base = config.clone();
        move || {
            let api_url = api_entry.text();
            let push_url = push_entry.text();
            if api_url.trim().is_empty() || push_url.trim().is_empty() {
                overlay.add_toast(adw::Toast::new("Please enter both URLs."));
                return;
            }
            let cfg = AppConfig {
                api_url: normalize_url(&api_url),
                push_url: normalize_url(&push_url),
                ..base.clone()
            };
            match cfg.save() {
                Ok(()) => {
                    log::info!("saved connection settings");
                    status.set_label("Saved. Restart to reconnect.");
                }
                Err(e) => {
                    log::error!("failed to save settings: {e}");
                    overlay.add_toast(adw::Toast::new(&format!("Failed to save settings: {}", e)));
                }
            }
        }
    };

    use std::rc::Rc;
    let on_save: Rc<dyn Fn()> = Rc::new(on_save);
    {
        let on_save = on_save.clone();
        save_btn.connect_clicked(move |_| (on_save)());
    }
    {
        let on_save = on_save.clone();
        api_entry.connect_activate(move |_| (on_save)());
    }
    {
        let on_save = on_save.clone();
        push_entry.connect_activate(move |_| (on_save)());
    }

    toast_overlay.upcast()
}

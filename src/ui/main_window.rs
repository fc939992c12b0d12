use adw::prelude::*;
use adw::Application;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use chat_gtk::api::client::ApiClient;
use chat_gtk::app::{AppConfig, DEFAULT_SERVER_URL};
use chat_gtk::push::PushChannel;
use chat_gtk::state::route::{header_title, Route};
use chat_gtk::utils::RUNTIME;

use crate::ui::banner::BannerView;
use crate::ui::chat_view::ChatView;
use crate::ui::sidebar::Sidebar;

const APP_TITLE: &str = "Chats";

/// Window shell: chat list on the left, and on the right the thread, the
/// welcome placeholder or the profile page depending on the route.
pub struct Shell {
    title: gtk4::Label,
    stack: gtk4::Stack,
    sidebar: Rc<Sidebar>,
    chat: Rc<ChatView>,
    route: RefCell<Route>,
}

impl Shell {
    pub fn navigate(&self, route: Route) {
        log::debug!("navigate to {route}");
        match &route {
            Route::Home => {
                self.chat.close();
                self.stack.set_visible_child_name("home");
            }
            Route::Profile => {
                self.chat.close();
                self.stack.set_visible_child_name("profile");
            }
            Route::Chat(id) => {
                self.chat.open(Some(id.as_str()));
                self.stack.set_visible_child_name("chat");
            }
        }
        *self.route.borrow_mut() = route;
        self.refresh_title();
    }

    fn refresh_title(&self) {
        let title = match &*self.route.borrow() {
            Route::Chat(id) => header_title(id, &self.sidebar.chats(), &self.chat.messages()),
            Route::Profile => "Profile".to_string(),
            Route::Home => APP_TITLE.to_string(),
        };
        self.title.set_label(&title);
    }
}

fn placeholder() -> gtk4::Widget {
    adw::StatusPage::builder()
        .icon_name("user-available-symbolic")
        .title("Welcome to the Chat App")
        .description("Please select a chat from the list to start messaging.\nOr create a new chat to begin the conversation!")
        .build()
        .upcast()
}

pub fn show_main_window(app: &Application, config: AppConfig, start: Route) {
    let window = adw::ApplicationWindow::builder()
        .application(app)
        .title(APP_TITLE)
        .default_width(960)
        .default_height(640)
        .build();

    let api = match ApiClient::new(&config.api_url) {
        Ok(api) => api,
        Err(e) => {
            log::error!("invalid api url {}: {e}, using {DEFAULT_SERVER_URL}", config.api_url);
            match ApiClient::new(DEFAULT_SERVER_URL) {
                Ok(api) => api,
                Err(e) => {
                    log::error!("cannot build api client: {e}");
                    return;
                }
            }
        }
    };
    let api = Arc::new(api);

    let push = match PushChannel::connect_on(RUNTIME.handle(), &config.push_url, config.reconnect_delay()) {
        Ok(push) => push,
        Err(e) => {
            log::error!("push channel disabled: {e}");
            PushChannel::offline()
        }
    };
    let push = Rc::new(push);

    let banner = BannerView::new();
    let parent: gtk4::Window = window.clone().upcast();
    let sidebar = Sidebar::new(api.clone(), parent);
    let chat = ChatView::new(api, push, banner.clone());

    let stack = gtk4::Stack::new();
    stack.set_hexpand(true);
    stack.add_named(&placeholder(), Some("home"));
    stack.add_named(&chat.widget(), Some("chat"));
    stack.add_named(&crate::ui::profile::profile_page(), Some("profile"));

    let split = adw::Flap::builder()
        .reveal_flap(true)
        .locked(true)
        .modal(false)
        .build();
    split.set_flap(Some(&sidebar.widget()));
    split.set_content(Some(&stack));

    let container = gtk4::Box::new(gtk4::Orientation::Vertical, 0);
    let header = adw::HeaderBar::new();
    let title = gtk4::Label::new(Some(APP_TITLE));
    title.add_css_class("title");
    header.set_title_widget(Some(&title));

    let home_btn = gtk4::Button::from_icon_name("go-home-symbolic");
    home_btn.set_tooltip_text(Some("Home"));
    header.pack_start(&home_btn);
    let profile_btn = gtk4::Button::from_icon_name("avatar-default-symbolic");
    profile_btn.set_tooltip_text(Some("Profile"));
    header.pack_end(&profile_btn);

    container.append(&header);
    container.append(&banner.widget());
    container.append(&split);
    split.set_vexpand(true);
    window.set_content(Some(&container));

    let shell = Rc::new(Shell {
        title,
        stack,
        sidebar: sidebar.clone(),
        chat: chat.clone(),
        route: RefCell::new(Route::Home),
    });

    {
        let shell = Rc::downgrade(&shell);
        sidebar.connect_select(move |chat_id| {
            if let Some(shell) = shell.upgrade() {
                shell.navigate(Route::Chat(chat_id));
            }
        });
    }
    {
        let shell = Rc::downgrade(&shell);
        sidebar.connect_changed(move || {
            if let Some(shell) = shell.upgrade() {
                shell.refresh_title();
            }
        });
    }
    {
        let shell = Rc::downgrade(&shell);
        chat.connect_changed(move || {
            if let Some(shell) = shell.upgrade() {
                shell.refresh_title();
            }
        });
    }
    {
        let shell = shell.clone();
        home_btn.connect_clicked(move |_| shell.navigate(Route::Home));
    }
    {
        let shell = shell.clone();
        profile_btn.connect_clicked(move |_| shell.navigate(Route::Profile));
    }

    window.present();
    sidebar.refresh();
    shell.navigate(start);
}

mod ui;

use adw::prelude::*;
use adw::Application;
use tracing_subscriber::EnvFilter;

use chat_gtk::app::AppConfig;
use chat_gtk::state::route::Route;

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() {
    init_logging();

    // An optional first argument picks the starting page, e.g. `/chat/42`.
    // GTK must not see it, it would treat it as a file to open.
    let mut args = std::env::args();
    let program = args.next().unwrap_or_default();
    let start = args.next().map(|path| Route::parse(&path)).unwrap_or_default();

    let app = Application::builder()
        .application_id("com.example.ChatGtk")
        .build();
    app.connect_activate(move |app| {
        let config = AppConfig::load();
        log::info!("api at {}, push at {}", config.api_url, config.push_url);
        crate::ui::main_window::show_main_window(app, config, start.clone());
    });
    app.run_with_args(&[program]);
}

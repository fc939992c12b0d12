pub mod banner;
pub mod chat_view;
pub mod dialogs;
pub mod main_window;
pub mod profile;
pub mod sidebar;

use glib::MainContext;

pub fn glib_channel<T: Send + 'static>() -> (glib::Sender<T>, glib::Receiver<T>) {
    MainContext::channel(glib::Priority::default())
}

/// Run `fut` on the shared Tokio runtime and deliver its output on the GTK
/// main loop.
pub fn run_async_to_main<T, Fut>(fut: Fut) -> glib::Receiver<T>
where
    T: Send + 'static,
    Fut: std::future::Future<Output = T> + Send + 'static,
{
    let (tx, rx) = glib_channel::<T>();
    chat_gtk::utils::spawn_async(async move {
        let res = fut.await;
        let _ = tx.send(res);
    });
    rx
}

/// Remove every child of a box-like container.
pub fn clear_box(container: &gtk4::Box) {
    use gtk4::prelude::*;
    while let Some(child) = container.first_child() {
        container.remove(&child);
    }
}

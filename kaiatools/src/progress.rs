use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tokio::{sync::watch, task::JoinHandle};

pub fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.enable_steady_tick(Duration::from_millis(100));
    let style = ProgressStyle::with_template("{spinner:5} {msg} [{elapsed}]")
        .map(|s| {
            s.tick_strings(&["🕛 ", "🕐 ", "🕑 ", "🕒 ", "🕓 ", "🕔 ", "🕕 ", "🕖 ", "🕗 ", "🕘 ", "🕙 ", "🕚 "])
        })
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(style);
    pb.set_message(message.to_string());
    pb
}

/// Mirrors every state published on `progress` onto the spinner, using `describe` to render it. Abort the returned
/// task once the run is over.
pub fn follow<S, F>(mut progress: watch::Receiver<Option<S>>, pb: ProgressBar, describe: F) -> JoinHandle<()>
where
    S: Clone + Send + Sync + 'static,
    F: Fn(&S) -> String + Send + 'static,
{
    tokio::spawn(async move {
        while progress.changed().await.is_ok() {
            let state = progress.borrow_and_update().clone();
            if let Some(state) = state {
                pb.set_message(describe(&state));
            }
        }
    })
}

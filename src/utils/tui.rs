use indicatif::{ProgressBar, ProgressStyle};

/// Spinner shown while a blocking request is in flight. Hidden when stderr
/// is not a terminal.
pub fn create_spinner(message: impl Into<String>) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .tick_strings(&["-", "\\", "|", "/", ""])
            .template("{msg} {spinner}")
            .expect("spinner template is valid"),
    );
    spinner.set_message(message.into());
    spinner.enable_steady_tick(std::time::Duration::from_millis(80));
    spinner
}

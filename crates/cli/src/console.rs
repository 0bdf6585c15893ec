use copilot_core::notice::{Notice, NoticeSeverity, NotificationSink};

/// Prints notices to stderr so stdout only carries conversation output.
#[derive(Clone, Copy, Debug, Default)]
pub struct ConsoleNotificationSink;

impl NotificationSink for ConsoleNotificationSink {
    fn notify(&self, notice: Notice) {
        eprintln!("{}", render_notice(&notice));
    }
}

pub fn render_notice(notice: &Notice) -> String {
    match notice.severity {
        NoticeSeverity::Informational => format!("{} - {}", notice.title, notice.description),
        NoticeSeverity::Destructive => format!("{} - {} [!]", notice.title, notice.description),
    }
}

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
}

/// A user-facing outcome of a task operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub title: String,
    pub detail: Option<String>,
}

impl Notice {
    pub fn success<T: Into<String>>(title: T) -> Self {
        Self {
            kind: NoticeKind::Success,
            title: title.into(),
            detail: None,
        }
    }

    pub fn error<T: Into<String>>(title: T, err: &AppError) -> Self {
        Self {
            kind: NoticeKind::Error,
            title: title.into(),
            detail: Some(err.message()),
        }
    }
}

pub trait Notifier {
    fn notify(&self, notice: &Notice) -> Result<(), AppError>;
}

pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _notice: &Notice) -> Result<(), AppError> {
        Ok(())
    }
}

/// Delivers `notice`, logging instead of failing when the notifier cannot.
pub fn deliver(notifier: &dyn Notifier, notice: Notice) {
    if let Err(err) = notifier.notify(&notice) {
        log::warn!(
            "event=notify module=notify status=error title={:?} error={}",
            notice.title,
            err
        );
    }
}

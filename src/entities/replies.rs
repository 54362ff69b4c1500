use std::cell::RefCell;

/// Output produced by the core or a feature unit, rendered onto the wire by
/// the command layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Numeric { code: u16, params: Vec<String> },
    Notice(String),
    /// Notice to opers subscribed to `snomask`.
    ServerNotice { snomask: char, text: String },
    /// Log the user in to the named oper block.
    OperLogin { oper: String },
}

impl Reply {
    pub fn numeric<I, S>(code: u16, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Reply::Numeric {
            code,
            params: params.into_iter().map(Into::into).collect(),
        }
    }

    pub fn notice(text: impl Into<String>) -> Self {
        Reply::Notice(text.into())
    }
}

/// Collector handed to listeners by reference. Dispatch is synchronous and
/// confined to one execution context, so interior mutability is enough.
#[derive(Debug, Default)]
pub struct Replies {
    inner: RefCell<Vec<Reply>>,
}

impl Replies {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, reply: Reply) {
        self.inner.borrow_mut().push(reply);
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().is_empty()
    }

    pub fn take(&self) -> Vec<Reply> {
        std::mem::take(&mut *self.inner.borrow_mut())
    }

    pub fn into_vec(self) -> Vec<Reply> {
        self.inner.into_inner()
    }
}

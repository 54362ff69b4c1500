//! Synchronous, priority-ordered event hooks.
//!
//! Each event kind owns one list of listener bindings, sorted by descending
//! priority and then by registration order. [`EventPipeline::raise`] walks a
//! snapshot of that list: `Deny` and `Allow` stop the walk, `Override`
//! replaces the payload and continues. Binding or unbinding replaces the
//! list wholesale, so a raise in progress keeps iterating the list it
//! started with and changes show up on the next raise.

pub mod hooks;
pub mod kinds;

pub use hooks::{BindingId, EventPipeline};
pub use kinds::{
    PostConnect, PostConnectPayload, PreCommand, PreCommandPayload, SetConnectClass,
    SetConnectClassPayload, WhoLine, WhoLinePayload, Whois, WhoisPayload,
};

/// An event kind. `Payload` may borrow from the caller for the duration of
/// one raise.
pub trait Event: 'static {
    const NAME: &'static str;
    type Payload<'a>;
}

/// What a listener wants done with the event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict<P> {
    /// Not interested; ask the next listener.
    Continue,
    /// Stop here and refuse the action.
    Deny,
    /// Stop here and permit the action, skipping the default checks.
    Allow,
    /// Replace the payload and keep going.
    Override(P),
}

/// Outcome of a raise as seen by the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
    /// No listener decided; apply the default behaviour.
    Passthru,
}

impl Decision {
    pub fn is_denied(self) -> bool {
        self == Decision::Deny
    }
}

/// Reacts to one event kind.
///
/// `'a` only appears through `E::Payload<'a>` here, which makes it an
/// early-bound parameter. Implementations that name the concrete payload
/// type must keep it early-bound as well, so they repeat the trivial
/// `where 'a: 'a` bound:
///
/// ```ignore
/// impl Listener<WhoLine> for MyListener {
///     fn on_event<'a>(&self, payload: &WhoLinePayload<'a>) -> Verdict<WhoLinePayload<'a>>
///     where
///         'a: 'a,
///     {
///         Verdict::Continue
///     }
/// }
/// ```
pub trait Listener<E: Event>: Send + Sync {
    fn on_event<'a>(&self, payload: &E::Payload<'a>) -> Verdict<E::Payload<'a>>;
}

//! Operations that need the user to say "yes" before they go ahead.
//!
//! Instead of blocking on a dialog, such an operation returns [`Decision::Confirm`] carrying a
//! [`Pending`] action. The caller shows `prompt`, and if the user agrees, hands the pending
//! value back to the matching `confirm_*` entry point. Dropping it is the same as declining.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision<T, A> {
    /// Completed without needing confirmation.
    Done(T),
    Confirm(Pending<A>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pending<A> {
    pub prompt: String,
    pub action: A,
}

impl<A> Pending<A> {
    pub fn new(prompt: impl Into<String>, action: A) -> Self {
        Self {
            prompt: prompt.into(),
            action,
        }
    }
}

impl<T, A> Decision<T, A> {
    pub fn confirm(prompt: impl Into<String>, action: A) -> Self {
        Decision::Confirm(Pending::new(prompt, action))
    }

    pub fn is_done(&self) -> bool {
        matches!(self, Decision::Done(_))
    }

    pub fn pending(self) -> Option<Pending<A>> {
        match self {
            Decision::Done(_) => None,
            Decision::Confirm(pending) => Some(pending),
        }
    }
}

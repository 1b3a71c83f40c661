use std::time::{Duration, Instant};

/// How long a toast stays visible.
pub const TOAST_DURATION: Duration = Duration::from_millis(1000);

/// Snapshot delivered to subscribers.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct ToastState {
    pub message: Option<String>,
    pub is_visible: bool,
    /// Bumped on every dispatch so repeated identical messages still re-trigger.
    pub key: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(&ToastState)>;

/// Publish/subscribe store for transient notifications, owned by the host.
/// Only one hide is ever pending: a new dispatch replaces it.
pub struct ToastStore {
    state: ToastState,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_id: u64,
    hide_at: Option<Instant>,
    duration: Duration,
}

impl Default for ToastStore {
    fn default() -> Self {
        Self::new(TOAST_DURATION)
    }
}

impl ToastStore {
    pub fn new(duration: Duration) -> Self {
        Self {
            state: ToastState::default(),
            listeners: Vec::new(),
            next_id: 0,
            hide_at: None,
            duration,
        }
    }

    pub fn state(&self) -> &ToastState {
        &self.state
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&ToastState) + 'static) -> SubscriptionId {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    pub fn dispatch(&mut self, message: impl Into<String>) {
        self.dispatch_at(message, Instant::now());
    }

    pub fn dispatch_at(&mut self, message: impl Into<String>, now: Instant) {
        let message = message.into();
        crate::log_info!("Toast: {}", message);
        self.state = ToastState {
            message: Some(message),
            is_visible: true,
            key: self.state.key + 1,
        };
        self.hide_at = Some(now + self.duration);
        self.notify();
    }

    /// Hide the toast once its time is up.  Call once per frame.
    pub fn tick(&mut self, now: Instant) {
        if let Some(at) = self.hide_at
            && now >= at
        {
            self.hide_at = None;
            self.state.is_visible = false;
            self.notify();
        }
    }

    fn notify(&mut self) {
        for (_, listener) in self.listeners.iter_mut() {
            listener(&self.state);
        }
    }
}

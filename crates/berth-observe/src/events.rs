use tracing::{debug, error, info, warn};

/// Stage reached while turning a declaration into a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    DeclarationLoaded,
    ParametersResolved,
    ValidationPassed,
    ValidationFailed,
    WarningRaised,
    OrderResolved,
    PlanBuilt,
    PlanProvisioned,
    TemplateRendered,
}

/// One pipeline event. Optional fields fall back to `"unknown"` / `0` when logged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub kind: EventKind,
    pub stack: Option<String>,
    pub unit: Option<String>,
    pub reason: Option<String>,
    pub count: Option<usize>,
}

impl Event {
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            stack: None,
            unit: None,
            reason: None,
            count: None,
        }
    }

    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }

    #[inline]
    fn as_stack(&self) -> &str {
        self.stack.as_deref().unwrap_or("unknown")
    }
    #[inline]
    fn as_unit(&self) -> &str {
        self.unit.as_deref().unwrap_or("unknown")
    }
    #[inline]
    fn as_reason(&self) -> &str {
        self.reason.as_deref().unwrap_or("unknown")
    }
    #[inline]
    fn count(&self) -> usize {
        self.count.unwrap_or(0)
    }
}

#[inline]
pub fn message_for(kind: EventKind) -> &'static str {
    match kind {
        // input
        EventKind::DeclarationLoaded => "declaration loaded",
        EventKind::ParametersResolved => "parameters resolved and applied",

        // validation
        EventKind::ValidationPassed => "declaration is valid",
        EventKind::ValidationFailed => "declaration rejected",
        EventKind::WarningRaised => "declaration warning",

        // output
        EventKind::OrderResolved => "start order resolved",
        EventKind::PlanBuilt => "deployment plan built",
        EventKind::PlanProvisioned => "plan handed to provisioner",
        EventKind::TemplateRendered => "stack template rendered",
    }
}

#[inline]
pub fn log_event(e: &Event) {
    let msg = message_for(e.kind);

    match e.kind {
        EventKind::DeclarationLoaded => {
            debug!(stack = e.as_stack(), source = e.as_reason(), "{msg}")
        }
        EventKind::ParametersResolved => {
            debug!(stack = e.as_stack(), parameters = e.count(), "{msg}")
        }
        EventKind::ValidationPassed => {
            info!(stack = e.as_stack(), warnings = e.count(), "{msg}")
        }
        EventKind::ValidationFailed => {
            error!(stack = e.as_stack(), errors = e.count(), "{msg}")
        }
        EventKind::WarningRaised => {
            if e.unit.is_some() {
                warn!(unit = e.as_unit(), reason = e.as_reason(), "{msg}");
            } else {
                warn!(reason = e.as_reason(), "{msg}");
            }
        }
        EventKind::OrderResolved => {
            info!(stack = e.as_stack(), units = e.count(), "{msg}")
        }
        EventKind::PlanBuilt => {
            info!(stack = e.as_stack(), units = e.count(), "{msg}")
        }
        EventKind::PlanProvisioned => {
            info!(stack = e.as_stack(), provisioner = e.as_reason(), "{msg}")
        }
        EventKind::TemplateRendered => {
            debug!(stack = e.as_stack(), variant = e.as_reason(), "{msg}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back() {
        let e = Event::new(EventKind::PlanBuilt);
        assert_eq!(e.as_stack(), "unknown");
        assert_eq!(e.as_unit(), "unknown");
        assert_eq!(e.count(), 0);
    }

    #[test]
    fn builders_fill_fields() {
        let e = Event::new(EventKind::WarningRaised)
            .with_stack("earnipay")
            .with_unit("frappe")
            .with_reason("mutable tag")
            .with_count(2);
        assert_eq!(e.as_stack(), "earnipay");
        assert_eq!(e.as_unit(), "frappe");
        assert_eq!(e.as_reason(), "mutable tag");
        assert_eq!(e.count(), 2);
    }

    #[test]
    fn every_kind_has_a_message() {
        let kinds = [
            EventKind::DeclarationLoaded,
            EventKind::ParametersResolved,
            EventKind::ValidationPassed,
            EventKind::ValidationFailed,
            EventKind::WarningRaised,
            EventKind::OrderResolved,
            EventKind::PlanBuilt,
            EventKind::PlanProvisioned,
            EventKind::TemplateRendered,
        ];
        for kind in kinds {
            assert!(!message_for(kind).is_empty());
            log_event(&Event::new(kind));
        }
    }
}

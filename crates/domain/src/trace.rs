use serde::Serialize;

/// Structured trace events emitted across the core. One variant per
/// telemetry point named or implied by the component design; each is
/// JSON-serialized and logged as a single `tracing` event so the same
/// payload can be forwarded to a client and inspected in logs without a
/// second formatting path.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    /// §4.F step 2 — local token estimate emitted on every loop iteration.
    ContextSize {
        step: u32,
        provider: String,
        model: String,
        input_tokens: u64,
        message_tokens: u64,
        tool_schema_tokens: u64,
        static_system_tokens: u64,
        dynamic_system_tokens: u64,
        runtime_dynamic_tokens: u64,
    },
    /// §4.D — a session's journal grew by one line.
    JournalAppend {
        session_id: String,
        event_type: String,
    },
    /// §4.D — `create_session` rotation point.
    SessionRotated {
        previous_session_id: String,
        new_session_id: String,
        reason: String,
    },
    /// §4.D — a close-side background callback ran.
    BackgroundTaskCompleted {
        session_id: String,
        turns: usize,
        ok: bool,
    },
    /// §4.B — a guarded action was denied or required confirmation.
    GuardrailDenied {
        action: String,
        reason: String,
    },
    /// §4.B — the policy file was hot-reloaded.
    PolicyReloaded { path: String },
    /// §4.G — one scheduler tick.
    PulseTick {
        due_count: usize,
        delivered: usize,
        skipped_in_flight: usize,
    },
    /// §4.G — a reminder occurrence was delivered (or failed).
    PulseDelivery {
        reminder_id: String,
        occurrence_id: String,
        ok: bool,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "ayati_event");
    }
}

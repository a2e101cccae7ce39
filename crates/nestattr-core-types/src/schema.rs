//! Field and event names shared by every structured log line
//!
//! The `log_op_*` macros emit these keys as identifiers, so each one must
//! stay a valid Rust identifier.

pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";
pub const FIELD_REQUEST_ID: &str = "request_id";

/// Association being reconciled
pub const FIELD_ASSOCIATION: &str = "association";
/// Id of the child a directive targets; empty for unsaved children
pub const FIELD_RECORD_ID: &str = "record_id";
/// Directive name: `build`, `update`, `destroy` or `none`
pub const FIELD_DIRECTIVE: &str = "directive";

pub const FIELD_EXISTING_LEN: &str = "existing_len";
pub const FIELD_DIRECTIVE_LEN: &str = "directive_len";

pub const FIELD_ERR_KIND: &str = "err_kind";
pub const FIELD_ERR_CODE: &str = "err_code";

pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";

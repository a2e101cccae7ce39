//! Canonical logging macros
//!
//! Every reconciliation entry point brackets its work with these macros so
//! that start, end and failure events share one field layout. Extra
//! `key = value` fields are passed through to `tracing` unchanged.

#[doc(hidden)]
#[macro_export]
macro_rules! __log_op_event {
    ($level:ident, $op:expr, $event:ident $(, $($field:tt)*)?) => {
        $crate::logging_facility::tracing::$level!(
            component = module_path!(),
            op = $op,
            event = $crate::logging_facility::schema::$event,
            $($($field)*)?
        )
    };
}

/// Log the start of an operation
///
/// ```
/// # use nestattr_core::log_op_start;
/// log_op_start!("reconcile_collection");
/// log_op_start!("reconcile_collection", association = "tasks", existing_len = 2u64);
/// ```
#[macro_export]
macro_rules! log_op_start {
    ($op:expr $(, $($field:tt)*)?) => {
        $crate::__log_op_event!(info, $op, EVENT_START $(, $($field)*)?)
    };
}

/// Log the successful end of an operation; `duration_ms` is required
///
/// ```
/// # use nestattr_core::log_op_end;
/// log_op_end!("reconcile_collection", duration_ms = 3u64, directive_len = 4u64);
/// ```
#[macro_export]
macro_rules! log_op_end {
    ($op:expr, duration_ms = $duration:expr $(, $($field:tt)*)?) => {
        $crate::__log_op_event!(
            info,
            $op,
            EVENT_END,
            duration_ms = $duration
            $(, $($field)*)?
        )
    };
}

/// Log a failed operation at error level
///
/// The error is converted into the canonical `ExError` so the event carries
/// its kind and stable code as `err_kind` and `err_code`.
///
/// ```
/// # use nestattr_core::{log_op_error, errors::ReconcileError};
/// let err = ReconcileError::RecordNotFound {
///     association: "tasks".to_string(),
///     id: "9".to_string(),
/// };
/// log_op_error!("reconcile_collection", err, duration_ms = 1u64, association = "tasks");
/// ```
#[macro_export]
macro_rules! log_op_error {
    ($op:expr, $err:expr, duration_ms = $duration:expr $(, $($field:tt)*)?) => {{
        let ex_err: $crate::errors::ExError = $err.into();
        $crate::__log_op_event!(
            error,
            $op,
            EVENT_END_ERROR,
            duration_ms = $duration,
            err_kind = ?ex_err.kind(),
            err_code = ex_err.code()
            $(, $($field)*)?
        )
    }};
}

//! Background processing: the notification dispatcher and its job worker.

pub mod dispatcher;

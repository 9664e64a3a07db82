pub mod bigquery;
pub mod event_decoder;

pub mod test_link_closes_once;
pub mod test_misaddressed_signals_ignored;
pub mod test_send_requires_open_link;

pub mod test_subscribe_snapshot_first;

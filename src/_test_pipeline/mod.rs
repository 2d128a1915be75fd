//! **(internal)** End-to-end test scenarios chaining graph construction,
//! identification, and estimation, including the ledger they leave behind.

mod _test_end_to_end;
mod _test_ledger_integrity;

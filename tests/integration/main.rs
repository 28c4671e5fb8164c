//! Integration tests for the Herald engine, run against the in-memory store,
//! preference source, cache and event source.


mod dispatch_test;
mod ingest_test;
mod scheduler_test;

//! Black box tests against a running library_api, e.g.
//! `DB_TYPE=inmemory cargo run -p library_api --features server` and then
//! `cargo test -p library_tests --features system_tests`.

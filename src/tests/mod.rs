//! tests/mod.rs
//! Pruebas de punta a punta: SQLite temporal + webhook local.

mod support;

mod handler_tests;

//! Tests for the synchronization primitives

mod gate_tests;

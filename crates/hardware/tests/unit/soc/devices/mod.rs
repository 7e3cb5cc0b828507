//! Tests for the co-simulated scriptable RTC.





/// Persisted-state save/restore behavior.
pub mod rtc_snapshot_tests;

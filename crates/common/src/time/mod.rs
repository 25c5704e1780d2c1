//! Time utilities and abstractions
//!
//! ```rust
//! use std::time::Duration;
//!
//! use keyturn_common::time::{Clock, MockClock};
//!
//! let clock = MockClock::new();
//! let before = clock.utc_now();
//! clock.advance(Duration::from_secs(300));
//! assert_eq!((clock.utc_now() - before).num_minutes(), 5);
//! ```

mod clock;

pub use clock::{Clock, MockClock, SystemClock};

//! Source selection: decide which hook handles a file.
//!
//! ## Example
//!
//! ```rust
//! use doconlylib::source::FilterConfig;
//!
//! let filter = FilterConfig::from_lines(["*.py", "!setup.py"]).unwrap();
//! assert!(filter.matches("pkg/module.py"));
//! assert!(!filter.matches("setup.py"));
//! ```

pub mod filter;

pub use filter::FilterConfig;

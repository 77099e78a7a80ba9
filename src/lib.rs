//! Satellite pass prediction over a ground station.
//!
//! [`predict::transits`] enumerates passes, and each [`predict::Transit`]
//! can be searched for its peak, trimmed to an elevation threshold, or
//! summarised by its heading and angular rate.

pub mod config;
pub mod predict;

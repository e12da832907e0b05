//! Data movement tools for the StreetSpectra citizen-science project.
//!
//! Three executables share this library: `epi5spectra` (Epicollect5 export and
//! remap), `actiontool` (ACTION observations database) and `zoonispectra`
//! (Zooniverse/Panoptes project management).

pub mod action;
pub mod args;
pub mod env;
pub mod epicollect;
pub mod error;
pub mod files;
pub mod http;
pub mod logging;
pub mod observation;
pub mod paginate;
pub mod runner;
pub mod session;
pub mod timefmt;
pub mod ui;
pub mod upload;
pub mod utils;
pub mod zooniverse;

const DEFAULT_DEV_VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "-dev");

pub const VERSION: &str = match option_env!("SPECTRA_VERSION_STRING") {
    Some(version) => version,
    None => DEFAULT_DEV_VERSION,
};

//! Configuration section definitions.
//!
//! Each module corresponds to a section in `assetline.toml`:
//!
//! | Module    | TOML Section | Purpose                                   |
//! |-----------|--------------|-------------------------------------------|
//! | `paths`   | `[paths]`    | Asset role → glob pattern registry        |
//! | `style`   | `[style]`    | Prefix targets, media-query ordering      |
//! | `script`  | `[script]`   | Minifier and bundle options               |
//! | `serve`   | `[serve]`    | Development server                        |
//! | `release` | `[release]`  | Distribution tree layout                  |

mod paths;
mod release;
mod script;
mod serve;
mod style;

pub use paths::{Patterns, PathsConfig};
pub use release::ReleaseConfig;
pub use script::{QuoteStyle, ScriptConfig};
pub use serve::ServeConfig;
pub use style::{MediaSort, StyleConfig};

//! Configuration section definitions.
//!
//! Each module corresponds to a section in `runnel.toml`:
//!
//! | Module     | TOML Section   | Purpose                                |
//! |------------|----------------|----------------------------------------|
//! | `paths`    | `[paths]`      | Source and output roots                |
//! | `style`    | `[style]`      | Style strategy (scss or plain css)     |
//! | `script`   | `[script]`     | Script libraries and bundle name       |
//! | `image`    | `[image]`      | Optimizers, WebP and AVIF encoding     |
//! | `critical` | `[critical]`   | Critical-style extraction              |
//! | `serve`    | `[serve]`      | Development server                     |
//! | `tasks`    | `[tasks]`      | User-defined composite tasks           |

mod critical;
mod image;
mod paths;
mod script;
mod serve;
mod style;
mod tasks;

pub use critical::CriticalConfig;
pub use image::{AvifConfig, ImageConfig, WebpConfig, WebpEncoder};
pub use paths::PathsConfig;
pub use script::ScriptConfig;
pub use serve::ServeConfig;
pub use style::{StyleConfig, StyleStrategy};
pub use tasks::{CompositeConfig, TasksConfig};

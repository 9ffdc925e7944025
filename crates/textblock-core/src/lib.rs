mod commands;
mod convert;
mod core;
mod error;
mod marks;
mod ops;
mod output;
mod position;
mod schema;
mod selection;
mod style;

pub use crate::commands::*;
pub use crate::convert::*;
pub use crate::core::*;
pub use crate::error::*;
pub use crate::marks::*;
pub use crate::ops::*;
pub use crate::output::*;
pub use crate::position::*;
pub use crate::schema::*;
pub use crate::selection::*;
pub use crate::style::*;

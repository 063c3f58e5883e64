pub mod api;
pub mod controller;
pub mod domain;
pub mod drawer;
pub mod inputter;
pub mod loader;
pub mod model;
pub mod roster;
pub mod schema;
pub mod table;
pub mod ui;
pub mod workspace;

pub use domain::{AppConfig, AppError, Message, ViewError};
pub use drawer::{DrawerState, SelectionDrawer};
pub use schema::{Record, Schema, SchemaBuilder};
pub use table::{TabularViewController, View};

//! Hierarchical file selection over a directory tree, with working-tree and
//! tracked-file status overlays.
//!
//! The engine ([`workspace`], [`tree`], [`selection`], [`status`]) is
//! independent of the terminal front end ([`app`], [`ui`], [`components`]).

pub mod app;
pub mod components;
pub mod config;
pub mod error;
pub mod event;
pub mod fs;
pub mod handler;
pub mod logging;
pub mod path;
pub mod selection;
pub mod status;
pub mod theme;
pub mod tree;
pub mod tui;
pub mod ui;
pub mod view;
pub mod workspace;

// src/lib.rs - krusty-node: networked 3D printer job client
pub mod config;
pub mod control;
pub mod file_manager;
pub mod gcode;
pub mod logging;
pub mod print_job;
pub mod printer;
pub mod service;
pub mod sim;
pub mod statistics;
pub mod ui;
